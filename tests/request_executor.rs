mod common;

use common::{analyze_body, Reply, ScriptedTransport};
use pii_dashboard::clients::{ApiClient, Endpoint, TransportError, MAX_ATTEMPTS};
use pii_dashboard::{ApiErrorKind, Config};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

fn client(transport: &Arc<ScriptedTransport>) -> ApiClient {
    ApiClient::new(
        &Config::default(),
        Endpoint::remote("http://backend.test"),
        transport.clone(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_warming_then_success_retries_once_after_backoff() {
    let transport = ScriptedTransport::new();
    transport.script(
        "/analyze",
        [Reply::status(503), Reply::ok(analyze_body(true, "ALTO", 0.91))],
    );

    let start = Instant::now();
    let result = assert_ok!(client(&transport).analyze_text("Meu CPF é 123.456.789-09").await);

    assert_eq!(result.risk_label, "ALTO");
    let calls = transport.calls_to("/analyze");
    assert_eq!(calls.len(), 2);
    assert!(calls[1].at - calls[0].at >= Duration::from_secs(3));
    assert!(start.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_persistent_warming_surfaces_service_warming() {
    let transport = ScriptedTransport::new();
    transport.script("/analyze", [Reply::status(502), Reply::status(503), Reply::status(503)]);

    let err = assert_err!(client(&transport).analyze_text("texto").await);

    assert_eq!(err.kind, ApiErrorKind::ServiceWarming);
    assert!(err.is_transient());
    assert_eq!(transport.count("/analyze"), MAX_ATTEMPTS as usize);
}

#[tokio::test(start_paused = true)]
async fn test_offline_retries_after_two_seconds() {
    let transport = ScriptedTransport::new();
    transport.script("/analyze", [Reply::offline(), Reply::offline()]);

    let err = assert_err!(client(&transport).analyze_text("texto").await);

    assert_eq!(err.kind, ApiErrorKind::Offline);
    let calls = transport.calls_to("/analyze");
    assert_eq!(calls.len(), 2);
    assert!(calls[1].at - calls[0].at >= Duration::from_secs(2));
    assert!(calls[1].at - calls[0].at < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_retries_immediately() {
    let transport = ScriptedTransport::new();
    let slow = Reply::ok(analyze_body(false, "SEGURO", 0.1)).after(Duration::from_secs(20));
    transport.script("/analyze", [slow.clone(), slow]);

    let start = Instant::now();
    let err = assert_err!(client(&transport).analyze_text("texto").await);

    assert_eq!(err.kind, ApiErrorKind::Timeout);
    let calls = transport.calls_to("/analyze");
    assert_eq!(calls.len(), 2);
    // 第二次尝试紧跟在第一次超时之后
    let gap = calls[1].at - calls[0].at;
    assert!(gap >= Duration::from_secs(15) && gap < Duration::from_millis(15_100));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(30) && elapsed < Duration::from_millis(30_200));
}

#[tokio::test(start_paused = true)]
async fn test_transport_timeout_counts_as_timeout() {
    let transport = ScriptedTransport::new();
    transport.script(
        "/analyze",
        [
            Reply::fail(TransportError::TimedOut("deadline".into())),
            Reply::ok(analyze_body(false, "SEGURO", 0.05)),
        ],
    );

    let result = assert_ok!(client(&transport).analyze_text("texto").await);
    assert_eq!(result.risk_label, "SEGURO");
    assert_eq!(transport.count("/analyze"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cross_origin_is_not_retried() {
    let transport = ScriptedTransport::new();
    transport.script(
        "/analyze",
        [
            Reply::fail(TransportError::CrossOrigin("blocked by CORS policy".into())),
            Reply::ok(analyze_body(false, "SEGURO", 0.1)),
        ],
    );

    let err = assert_err!(client(&transport).analyze_text("texto").await);

    assert_eq!(err.kind, ApiErrorKind::CrossOriginDenied);
    assert!(!err.is_transient());
    assert_eq!(transport.count("/analyze"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_client_errors_are_unknown_and_not_retried() {
    for status in [400u16, 404, 422, 500] {
        let transport = ScriptedTransport::new();
        transport.script("/analyze", [Reply::status(status), Reply::ok(analyze_body(false, "SEGURO", 0.1))]);

        let err = assert_err!(client(&transport).analyze_text("texto").await);

        assert_eq!(err.kind, ApiErrorKind::Unknown, "status {}", status);
        assert_eq!(err.message, format!("HTTP error: {}", status));
        assert_eq!(transport.count("/analyze"), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_malformed_body_is_unknown() {
    let transport = ScriptedTransport::new();
    transport.script("/analyze", [Reply::raw(200, "<html>oops</html>")]);

    let err = assert_err!(client(&transport).analyze_text("texto").await);

    assert_eq!(err.kind, ApiErrorKind::Unknown);
    assert_eq!(transport.count("/analyze"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_analyze_item_sends_id_and_text() {
    let transport = ScriptedTransport::new();
    transport.script("/analyze", [Reply::ok(analyze_body(true, "CRÍTICO", 0.97))]);

    let item = pii_dashboard::WorkItem::new("PROT-1", "Telefone 61 99999-0000");
    assert_ok!(client(&transport).analyze_item(&item).await);

    let calls = transport.calls_to("/analyze");
    assert_eq!(
        calls[0].request.body,
        Some(json!({"id": "PROT-1", "text": "Telefone 61 99999-0000"}))
    );
    assert_eq!(calls[0].request.url, "http://backend.test/analyze");
}

#[tokio::test(start_paused = true)]
async fn test_health_check_semantics() {
    let transport = ScriptedTransport::new();
    transport.script(
        "/health",
        [
            Reply::ok(json!({"status": "ok"})),
            Reply::status(404),
            Reply::status(503),
            Reply::offline(),
            Reply::ok(json!({})).after(Duration::from_secs(9)),
        ],
    );
    let client = client(&transport);

    assert!(client.check_connection().await);
    assert!(client.check_connection().await, "4xx 仍视为在线");
    assert!(!client.check_connection().await);
    assert!(!client.check_connection().await);
    assert!(!client.check_connection().await, "超过 8 秒视为离线");

    assert_eq!(transport.count("/health"), 5);
    assert_eq!(transport.count("/analyze"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stats_and_visit_are_not_retried() {
    let transport = ScriptedTransport::new();
    transport.script("/stats", [Reply::status(503)]);
    transport.script("/stats/visit", [Reply::offline()]);
    let client = client(&transport);

    assert_err!(client.get_stats().await);
    assert_err!(client.register_visit().await);

    assert_eq!(transport.count("/stats"), 1);
    assert_eq!(transport.count("/stats/visit"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_feedback_endpoints() {
    let transport = ScriptedTransport::new();
    transport.script("/feedback/stats", [Reply::ok(json!({"total_feedbacks": 3, "accuracy": 0.66}))]);
    transport.script(
        "/feedback/export",
        [Reply::ok(json!({"total_records": 1, "feedbacks": [{}], "stats": {}, "exported_at": "agora"}))],
    );
    transport.script("/feedback/training-status", [Reply::status(422)]);
    let client = client(&transport);

    let stats = assert_ok!(client.get_feedback_stats().await);
    assert_eq!(stats.total_feedbacks, 3);

    let export = assert_ok!(client.export_feedback().await);
    assert_eq!(export.total_records, 1);

    let err = assert_err!(client.get_training_status().await);
    assert_eq!(err.kind, ApiErrorKind::Unknown);
    assert_eq!(transport.count("/feedback/training-status"), 1);
}
