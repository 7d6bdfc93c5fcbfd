//! HTTP 传输层
//!
//! 执行器只依赖 [`Transport`]，生产环境使用 `reqwest`，测试中可替换为脚本化实现。

use futures::future::BoxFuture;
use futures::FutureExt;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

static CROSS_ORIGIN_SIGNATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcors\b|cross-origin").expect("静态正则"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// 一次 HTTP 请求
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

/// 一次 HTTP 响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 健康检查语义：只要不是 5xx 就认为后端在线
    pub fn is_reachable(&self) -> bool {
        self.status < 500
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// 传输层失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// 无法建立连接（离线、DNS 失败、连接被拒绝）
    #[error("连接失败: {0}")]
    Connect(String),
    /// 传输层自身超时
    #[error("传输超时: {0}")]
    TimedOut(String),
    /// 跨域策略拒绝
    #[error("跨域拒绝: {0}")]
    CrossOrigin(String),
    #[error("传输错误: {0}")]
    Other(String),
}

/// 判断错误信息是否为跨域拒绝
pub fn is_cross_origin_signature(message: &str) -> bool {
    CROSS_ORIGIN_SIGNATURE.is_match(message)
}

/// HTTP 传输
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>>;
}

/// 基于 reqwest 的传输实现
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pii_dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn send_inner(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!("→ {:?} {}", request.method, request.url);

        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        }
        .header("Accept", "application/json");

        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder.send().await.map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(classify_reqwest_error)?;

        debug!("← {} {} ({} 字节)", status, request.url, body.len());
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        self.send_inner(request).boxed()
    }
}

/// 拼接完整的错误链，便于识别签名
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    let message = error_chain(&err);
    if is_cross_origin_signature(&message) {
        TransportError::CrossOrigin(message)
    } else if err.is_timeout() {
        TransportError::TimedOut(message)
    } else if err.is_connect() {
        TransportError::Connect(message)
    } else {
        TransportError::Other(message)
    }
}
