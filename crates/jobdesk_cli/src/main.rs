mod cli;
mod config;
mod logging;
mod terminal;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use jobdesk_engine::{
    write_json_atomically, Backend, LogSink, OperationError, Operations, ProgressSink,
    ReqwestBackend,
};
use jobdesk_logging::{desk_info, desk_warn};

use cli::{CliArgs, Command};
use config::AppConfig;
use terminal::TerminalSink;

fn main() -> Result<()> {
    let args = CliArgs::parse();
    logging::initialize(logging::LogOptions {
        quiet: args.quiet,
        verbose: args.verbose,
        file: args.log_file.as_deref(),
    });

    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply_overrides(&args);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(run(args, config))
}

async fn run(args: CliArgs, config: AppConfig) -> Result<()> {
    let backend: Arc<dyn Backend> = Arc::new(
        ReqwestBackend::new(config.client_settings()).context("invalid backend settings")?,
    );
    let sink: Arc<dyn ProgressSink> = if args.quiet {
        Arc::new(LogSink)
    } else {
        Arc::new(TerminalSink::new())
    };
    let operations = Operations::new(backend, sink, config.driver_settings());

    let outcome = match args.command {
        Command::CheckUpdates => operations.check_updates().await.map(|_| ()),
        Command::Fetch { max_items, output } => {
            let max_items = max_items.unwrap_or(config.max_items);
            match operations.fetch_new_data(max_items).await {
                Ok(jobs) => {
                    if let Some(path) = output {
                        let written = write_json_atomically(&path, &jobs)
                            .with_context(|| format!("failed to save jobs to {path:?}"))?;
                        desk_info!("saved {} jobs to {:?}", jobs.len(), written);
                    }
                    Ok(())
                }
                Err(err) => Err(err),
            }
        }
        Command::BulkApply { urls, from_file } => {
            let urls = collect_urls(urls, from_file.as_deref())?;
            operations.bulk_apply(urls).await.map(|_| ())
        }
    };
    operations.shutdown().await;

    // Failures were already shown to the user by the reporter.
    if let Err(err) = outcome {
        report_failure(&err);
    }
    Ok(())
}

fn report_failure(err: &OperationError) {
    desk_warn!("operation did not succeed: {}", err);
}

/// Command-line URLs first, then non-empty lines of `from_file` that are not `#` comments.
fn collect_urls(mut urls: Vec<String>, from_file: Option<&Path>) -> Result<Vec<String>> {
    if let Some(path) = from_file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read URL list {path:?}"))?;
        urls.extend(parse_url_list(&text));
    }
    Ok(urls)
}

fn parse_url_list(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}
