use std::collections::VecDeque;

use bytes::Bytes;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use jobdesk_core::ServerProgress;

use crate::{ApiError, ProgressEventPayload};

/// Incremental `text/event-stream` decoder. Feeds raw chunks, yields the
/// `data` block of every dispatched event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    data: String,
    after_cr: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut events = Vec::new();
        for &byte in chunk {
            if self.after_cr {
                self.after_cr = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\n' => self.end_line(&mut events),
                b'\r' => {
                    self.after_cr = true;
                    self.end_line(&mut events);
                }
                _ => self.line.push(byte),
            }
        }
        events
    }

    fn end_line(&mut self, events: &mut Vec<String>) {
        let line = String::from_utf8_lossy(&self.line).into_owned();
        self.line.clear();

        if line.is_empty() {
            if self.data.is_empty() {
                return;
            }
            let mut data = std::mem::take(&mut self.data);
            data.pop();
            events.push(data);
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_str(), ""),
        };
        // `event`, `id` and `retry` carry nothing the reporter uses.
        if field == "data" {
            self.data.push_str(value);
            self.data.push('\n');
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    Event(ServerProgress),
    /// Payload was not a progress event.
    Malformed(String),
    /// Transport failed while reading the body.
    Failed(ApiError),
}

pub(crate) fn decode_event(data: &str) -> StreamItem {
    match serde_json::from_str::<ProgressEventPayload>(data) {
        Ok(payload) => StreamItem::Event(payload.into_progress()),
        Err(err) => StreamItem::Malformed(err.to_string()),
    }
}

/// Progress events read from a push subscription.
pub struct ProgressStream {
    body: BoxStream<'static, Result<Bytes, ApiError>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

impl ProgressStream {
    pub fn new(body: impl Stream<Item = Result<Bytes, ApiError>> + Send + 'static) -> Self {
        Self {
            body: body.boxed(),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Returns `None` once the body has ended. An event left incomplete at
    /// the end of the body is discarded.
    pub async fn next_item(&mut self) -> Option<StreamItem> {
        loop {
            if let Some(data) = self.pending.pop_front() {
                return Some(decode_event(&data));
            }
            if self.finished {
                return None;
            }
            match self.body.next().await {
                Some(Ok(chunk)) => self.pending.extend(self.decoder.feed(&chunk)),
                Some(Err(err)) => {
                    self.finished = true;
                    return Some(StreamItem::Failed(err));
                }
                None => self.finished = true,
            }
        }
    }
}

impl std::fmt::Debug for ProgressStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStream")
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .finish()
    }
}
