//! 测试用的脚本化传输实现
//!
//! 按接口路径排队预设响应，记录每次请求及其发生时间（tokio 虚拟时钟）。

#![allow(dead_code)]

use futures::future::BoxFuture;
use futures::FutureExt;
use pii_dashboard::clients::{HttpRequest, HttpResponse, Transport, TransportError};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// 一次预设响应
#[derive(Debug, Clone)]
pub struct Reply {
    pub delay: Option<Duration>,
    pub outcome: Result<HttpResponse, TransportError>,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            delay: None,
            outcome: Ok(HttpResponse::new(status, body.to_string().into_bytes())),
        }
    }

    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    pub fn status(status: u16) -> Self {
        Self::json(status, json!({"detail": "scripted"}))
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            delay: None,
            outcome: Ok(HttpResponse::new(status, body.as_bytes().to_vec())),
        }
    }

    pub fn fail(err: TransportError) -> Self {
        Self {
            delay: None,
            outcome: Err(err),
        }
    }

    pub fn offline() -> Self {
        Self::fail(TransportError::Connect("connection refused".into()))
    }

    /// 延迟返回
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// 一次被记录的请求
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub at: Instant,
    pub request: HttpRequest,
}

#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 为某个路径追加预设响应（按顺序消费，耗尽后返回 404）
    pub fn script(&self, path: &str, replies: impl IntoIterator<Item = Reply>) {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .extend(replies);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| path_of(&c.request.url) == path)
            .collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.calls_to(path).len()
    }
}

/// `http://host:port/a/b` → `/a/b`
pub fn path_of(url: &str) -> &str {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    without_scheme
        .find('/')
        .map(|i| &without_scheme[i..])
        .unwrap_or("/")
}

impl Transport for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        let path = path_of(&request.url).to_string();
        self.calls.lock().unwrap().push(RecordedCall {
            at: Instant::now(),
            request,
        });

        let reply = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&path)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Reply::status(404));

        async move {
            if let Some(delay) = reply.delay {
                tokio::time::sleep(delay).await;
            }
            reply.outcome
        }
        .boxed()
    }
}

// ========== 常用响应体 ==========

pub fn analyze_body(has_pii: bool, risk: &str, confidence: f64) -> Value {
    let entities = if has_pii {
        json!([{"tipo": "CPF", "valor": "123.456.789-09", "confianca": 0.98, "fonte": "regex"}])
    } else {
        json!([])
    };
    json!({
        "has_pii": has_pii,
        "entities": entities,
        "risk_level": risk,
        "confidence_all_found": confidence,
        "total_entities": if has_pii { 1 } else { 0 },
        "sources_used": ["regex"]
    })
}

pub fn stats_body(site_visits: u64, classification_requests: u64) -> Value {
    json!({
        "site_visits": site_visits,
        "classification_requests": classification_requests,
        "last_updated": "2026-01-01T00:00:00"
    })
}
