mod common;

use common::{analyze_body, Reply, ScriptedTransport};
use pii_dashboard::clients::{ApiClient, Endpoint, TransportError};
use pii_dashboard::models::BatchSummary;
use pii_dashboard::{ApiErrorKind, BatchProcessor, Config, WorkItem};
use std::sync::Arc;
use std::time::Duration;

fn processor(transport: &Arc<ScriptedTransport>) -> BatchProcessor {
    BatchProcessor::new(ApiClient::new(
        &Config::default(),
        Endpoint::remote("http://backend.test"),
        transport.clone(),
    ))
}

fn items(n: usize) -> Vec<WorkItem> {
    (1..=n)
        .map(|i| WorkItem::new(format!("PED-{}", i), format!("Pedido número {}", i)))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_item_becomes_error_row() {
    let transport = ScriptedTransport::new();
    let slow = Reply::ok(analyze_body(false, "SEGURO", 0.1)).after(Duration::from_secs(60));
    transport.script(
        "/analyze",
        [
            Reply::ok(analyze_body(true, "ALTO", 0.8)),
            slow.clone(),
            slow,
            Reply::ok(analyze_body(false, "SEGURO", 0.1)),
        ],
    );

    let mut progress = Vec::new();
    let results = processor(&transport)
        .run_batch_with_progress(&items(3), |done, total| progress.push((done, total)))
        .await;

    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(results.len(), 3);

    assert_eq!(results[0].risk_label, "ALTO");
    assert!(!results[0].is_error());

    assert_eq!(results[1].id, "PED-2");
    assert_eq!(results[1].risk_label, "ERRO_TIMEOUT");
    assert_eq!(results[1].probability, 0.0);
    assert_eq!(results[1].error, Some(ApiErrorKind::Timeout));
    assert!(results[1].entities.is_empty());

    assert_eq!(results[2].risk_label, "SEGURO");
    // 第三条仍被提交
    assert_eq!(transport.count("/analyze"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_order_and_completeness_under_mixed_failures() {
    let transport = ScriptedTransport::new();
    transport.script(
        "/analyze",
        [
            Reply::fail(TransportError::CrossOrigin("CORS".into())),
            Reply::ok(analyze_body(true, "CRÍTICO", 0.99)),
            Reply::status(422),
            Reply::offline(),
            Reply::offline(),
            Reply::status(503),
            Reply::ok(analyze_body(false, "SEGURO", 0.02)),
        ],
    );

    let input = items(5);
    let results = processor(&transport).run_batch(&input).await;

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    let expected: Vec<&str> = input.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, expected);

    let labels: Vec<&str> = results.iter().map(|r| r.risk_label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["ERRO_CORS", "CRÍTICO", "ERRO_UNKNOWN", "ERRO_OFFLINE", "SEGURO"]
    );

    let summary = BatchSummary::from_results(&results);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 3);
}

#[tokio::test(start_paused = true)]
async fn test_one_request_in_flight() {
    let transport = ScriptedTransport::new();
    transport.script(
        "/analyze",
        (0..4).map(|_| Reply::ok(analyze_body(false, "SEGURO", 0.1)).after(Duration::from_secs(1))),
    );

    processor(&transport).run_batch(&items(4)).await;

    let calls = transport.calls_to("/analyze");
    assert_eq!(calls.len(), 4);
    for pair in calls.windows(2) {
        assert!(pair[1].at - pair[0].at >= Duration::from_secs(1));
    }
}

#[tokio::test]
async fn test_empty_batch() {
    let transport = ScriptedTransport::new();
    let mut calls = 0;

    let results = processor(&transport)
        .run_batch_with_progress(&[], |_, _| calls += 1)
        .await;

    assert!(results.is_empty());
    assert_eq!(calls, 0);
    assert!(transport.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_long_text_preview_is_truncated() {
    let transport = ScriptedTransport::new();
    transport.script("/analyze", [Reply::ok(analyze_body(false, "SEGURO", 0.1))]);

    let text = "palavra ".repeat(40);
    let results = processor(&transport)
        .run_batch(&[WorkItem::new("1", text.clone())])
        .await;

    assert_eq!(results[0].text_preview.chars().count(), 103);
    assert!(results[0].text_preview.ends_with("..."));
    assert_eq!(results[0].full_text, text);
}
