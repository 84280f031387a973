use std::time::Duration;

use jobdesk_core::{ServerProgress, TerminalStatus};
use jobdesk_engine::{
    Backend, ClientSettings, FailureKind, ReqwestBackend, StreamItem, CSRF_HEADER,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> ReqwestBackend {
    let settings = ClientSettings {
        base_url: server.uri(),
        csrf_token: "token-123".to_string(),
        ..ClientSettings::default()
    };
    ReqwestBackend::new(settings).expect("client builds")
}

#[tokio::test]
async fn check_updates_sends_csrf_header_and_decodes_versions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/check_updates"))
        .and(header(CSRF_HEADER, "token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "update_available": true,
            "latest_version": "1.4.0",
            "current_version": "1.3.2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let status = backend_for(&server).check_updates().await.expect("ok");
    assert!(status.is_success());
    assert!(status.update_available);
    assert_eq!(status.latest_version.as_deref(), Some("1.4.0"));
    assert_eq!(status.current_version.as_deref(), Some("1.3.2"));
}

#[tokio::test]
async fn non_success_http_status_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fetch_new_data"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .fetch_new_data(Some(5))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(500));
}

#[tokio::test]
async fn invalid_json_body_is_a_decode_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fetch_new_data"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .fetch_new_data(None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
}

#[tokio::test]
async fn fetch_new_data_returns_jobs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fetch_new_data"))
        .and(body_json(json!({ "max_items": 3 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "jobs": [{"title": "a"}, {"title": "b"}]
        })))
        .mount(&server)
        .await;

    let response = backend_for(&server)
        .fetch_new_data(Some(3))
        .await
        .expect("ok");
    assert!(response.is_success());
    assert_eq!(response.jobs.len(), 2);
    assert_eq!(response.jobs[1]["title"], "b");
}

#[tokio::test]
async fn bulk_apply_posts_urls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bulk_apply"))
        .and(header(CSRF_HEADER, "token-123"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "urls": ["https://jobs.example.com/1", "https://jobs.example.com/2"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "bulk apply started",
            "count": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let urls = vec![
        "https://jobs.example.com/1".to_string(),
        "https://jobs.example.com/2".to_string(),
    ];
    let response = backend_for(&server).bulk_apply(&urls).await.expect("ok");
    assert!(response.is_success());
    assert_eq!(response.count, Some(2));
    assert_eq!(response.message.as_deref(), Some("bulk apply started"));
}

#[tokio::test]
async fn progress_subscription_yields_events() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"progress_percent\": 50, \"message\": \"1/2\", \"completed\": false}\n\n",
        "data: {\"progress_percent\": 100, \"completed\": true, \"status\": \"error\", \"message\": \"captcha\"}\n\n",
    );
    Mock::given(method("GET"))
        .and(path("/bulk_apply_progress"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let mut stream = backend_for(&server)
        .subscribe_progress()
        .await
        .expect("subscribed");

    assert_eq!(
        stream.next_item().await,
        Some(StreamItem::Event(ServerProgress {
            percent: 50,
            message: Some("1/2".to_string()),
            completed: false,
            status: None,
        }))
    );
    assert_eq!(
        stream.next_item().await,
        Some(StreamItem::Event(ServerProgress {
            percent: 100,
            message: Some("captcha".to_string()),
            completed: true,
            status: Some(TerminalStatus::Failure),
        }))
    );
    assert_eq!(stream.next_item().await, None);
}

#[tokio::test]
async fn progress_subscription_rejects_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bulk_apply_progress"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = backend_for(&server).subscribe_progress().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(503));
}

#[tokio::test]
async fn slow_one_shot_request_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/check_updates"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!({ "status": "success" })),
        )
        .mount(&server)
        .await;

    let settings = ClientSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_millis(50),
        ..ClientSettings::default()
    };
    let err = ReqwestBackend::new(settings)
        .unwrap()
        .check_updates()
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[test]
fn invalid_base_url_is_rejected() {
    let settings = ClientSettings {
        base_url: "not a url".to_string(),
        ..ClientSettings::default()
    };
    let err = ReqwestBackend::new(settings).unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
