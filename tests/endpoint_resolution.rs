mod common;

use common::{analyze_body, path_of, Reply, ScriptedTransport};
use pii_dashboard::clients::{ApiClient, Endpoint, EndpointKind, EndpointResolver};
use pii_dashboard::Config;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const LOCAL: &str = "http://local.test:7860";
const REMOTE: &str = "http://remote.test";

fn resolver(transport: &Arc<ScriptedTransport>) -> EndpointResolver {
    EndpointResolver::with_candidates(
        Endpoint::local(LOCAL),
        Endpoint::remote(REMOTE),
        Duration::from_secs(2),
        transport.clone(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_slow_local_probe_falls_back_to_remote() {
    let transport = ScriptedTransport::new();
    transport.script("/health", [Reply::ok(json!({"status": "ok"})).after(Duration::from_millis(2500))]);
    transport.script("/analyze", [Reply::ok(analyze_body(false, "SEGURO", 0.1))]);

    let endpoint = resolver(&transport).resolve().await;
    assert_eq!(endpoint.kind, EndpointKind::Remote);
    assert_eq!(endpoint.base_url, REMOTE);

    let client = ApiClient::new(&Config::default(), endpoint, transport.clone());
    client.analyze_text("texto").await.unwrap();

    let analyze = transport.calls_to("/analyze");
    assert_eq!(analyze.len(), 1);
    assert!(analyze[0].request.url.starts_with(REMOTE));

    let health = transport.calls_to("/health");
    assert_eq!(health.len(), 1);
    assert!(health[0].request.url.starts_with(LOCAL));
}

#[tokio::test(start_paused = true)]
async fn test_fast_local_probe_selects_local() {
    let transport = ScriptedTransport::new();
    transport.script("/health", [Reply::ok(json!({"status": "ok"})).after(Duration::from_millis(300))]);

    let endpoint = resolver(&transport).resolve().await;

    assert_eq!(endpoint, Endpoint::local(LOCAL));
}

#[tokio::test(start_paused = true)]
async fn test_local_4xx_is_still_reachable() {
    let transport = ScriptedTransport::new();
    transport.script("/health", [Reply::status(404)]);

    assert_eq!(resolver(&transport).resolve().await.kind, EndpointKind::Local);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_local_selects_remote() {
    for reply in [Reply::offline(), Reply::status(503)] {
        let transport = ScriptedTransport::new();
        transport.script("/health", [reply]);

        assert_eq!(resolver(&transport).resolve().await.kind, EndpointKind::Remote);
    }
}

#[tokio::test(start_paused = true)]
async fn test_probe_runs_once() {
    let transport = ScriptedTransport::new();
    transport.script(
        "/health",
        [Reply::status(503).after(Duration::from_millis(100)), Reply::ok(json!({}))],
    );
    let resolver = resolver(&transport);
    assert!(resolver.resolved().is_none());

    let (a, b) = tokio::join!(resolver.resolve(), resolver.resolve());
    let c = resolver.resolve().await;

    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(c.kind, EndpointKind::Remote);
    assert_eq!(resolver.resolved(), Some(&c));
    assert_eq!(transport.count("/health"), 1);
    assert!(transport.calls().iter().all(|call| path_of(&call.request.url) == "/health"));
}
