//! 后端 API 客户端
//!
//! 所有请求都经过 [`ApiClient::execute`]：每次尝试有独立的截止时间，
//! 瞬时故障（超时、离线、服务冷启动）最多重试一次，其余错误立即返回。

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::clients::endpoint::{probe_health, Endpoint};
use crate::clients::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use crate::config::Config;
use crate::error::{ApiError, ApiErrorKind, RequestOutcome};
use crate::models::feedback::{FeedbackExport, FeedbackRequest, FeedbackResponse, FeedbackStats, TrainingStatus};
use crate::models::{AnalysisResult, AnalyzeRequest, AnalyzeResponse, StatsResponse, WorkItem};

/// 单次逻辑请求的最大尝试次数（首次 + 一次重试）
pub const MAX_ATTEMPTS: u32 = 2;

// ========== 重试策略 ==========

/// 瞬时故障的退避时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 502 / 503 之后的等待
    pub warming_backoff: Duration,
    /// 连接失败之后的等待
    pub offline_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            warming_backoff: config.warming_backoff(),
            offline_backoff: config.offline_backoff(),
        }
    }

    /// 返回重试前的等待时间；`None` 表示该类错误不重试
    pub fn backoff_for(&self, kind: ApiErrorKind) -> Option<Duration> {
        match kind {
            ApiErrorKind::ServiceWarming => Some(self.warming_backoff),
            ApiErrorKind::Offline => Some(self.offline_backoff),
            ApiErrorKind::Timeout => Some(Duration::ZERO),
            ApiErrorKind::CrossOriginDenied | ApiErrorKind::Unknown => None,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// 各类接口的截止时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request: Duration,
    pub health: Duration,
    pub stats: Duration,
    pub export: Duration,
}

impl Timeouts {
    pub fn from_config(config: &Config) -> Self {
        Self {
            request: config.request_timeout(),
            health: config.health_timeout(),
            stats: config.stats_timeout(),
            export: config.export_timeout(),
        }
    }
}

// ========== 请求描述 ==========

/// 一次逻辑请求
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    /// 每次尝试的截止时间
    pub timeout: Duration,
    pub retry: bool,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
            timeout,
            retry: true,
        }
    }

    pub fn post(path: impl Into<String>, body: Option<Value>, timeout: Duration) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body,
            timeout,
            retry: true,
        }
    }

    pub fn without_retry(mut self) -> Self {
        self.retry = false;
        self
    }
}

/// 传输层失败 → 请求失败分类
fn classify_transport_error(err: TransportError) -> ApiError {
    match err {
        TransportError::Connect(message) => ApiError::new(ApiErrorKind::Offline, message),
        TransportError::TimedOut(message) => ApiError::new(ApiErrorKind::Timeout, message),
        TransportError::CrossOrigin(message) => ApiError::new(ApiErrorKind::CrossOriginDenied, message),
        TransportError::Other(message) => ApiError::new(ApiErrorKind::Unknown, message),
    }
}

/// HTTP 状态码 → 请求失败分类（仅非 2xx）
fn classify_status(status: u16) -> ApiError {
    match status {
        502 | 503 => ApiError::new(
            ApiErrorKind::ServiceWarming,
            format!("HTTP error: {} (serviço iniciando)", status),
        ),
        _ => ApiError::new(ApiErrorKind::Unknown, format!("HTTP error: {}", status)),
    }
}

// ========== 客户端 ==========

/// 后端 API 客户端
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    endpoint: Endpoint,
    policy: RetryPolicy,
    timeouts: Timeouts,
}

impl ApiClient {
    /// 创建客户端
    ///
    /// # 参数
    /// - `config`: 配置（超时、退避）
    /// - `endpoint`: 已解析的后端地址
    /// - `transport`: HTTP 传输实现
    pub fn new(config: &Config, endpoint: Endpoint, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            endpoint,
            policy: RetryPolicy::from_config(config),
            timeouts: Timeouts::from_config(config),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// 执行一次逻辑请求（含重试）
    ///
    /// 最多尝试 [`MAX_ATTEMPTS`] 次；仅瞬时故障会重试，且重试前按类型退避。
    pub async fn execute(&self, request: &ApiRequest) -> RequestOutcome<HttpResponse> {
        let url = self.endpoint.url(&request.path);
        let mut last_error = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let error = match self.attempt_once(&url, request).await {
                Ok(response) => {
                    if attempt > 1 {
                        info!("✓ 重试成功: {} (第 {} 次尝试)", request.path, attempt);
                    }
                    return Ok(response);
                }
                Err(e) => e,
            };

            let backoff = if request.retry {
                self.policy.backoff_for(error.kind)
            } else {
                None
            };

            match backoff {
                Some(delay) if attempt < MAX_ATTEMPTS => {
                    warn!(
                        "⚠️  {} 失败 ({})，{:?} 后重试: {}",
                        request.path, error.kind, delay, error.message
                    );
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    last_error = Some(error);
                }
                _ => {
                    debug!("✗ {} 失败 ({}): {}", request.path, error.kind, error.message);
                    return Err(error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ApiError::new(ApiErrorKind::Unknown, "重试次数耗尽")))
    }

    /// 单次尝试，截止时间到达时丢弃进行中的请求
    async fn attempt_once(&self, url: &str, request: &ApiRequest) -> RequestOutcome<HttpResponse> {
        let http_request = HttpRequest {
            method: request.method,
            url: url.to_string(),
            body: request.body.clone(),
        };

        match timeout(request.timeout, self.transport.send(http_request)).await {
            Err(_) => Err(ApiError::new(
                ApiErrorKind::Timeout,
                format!("sem resposta em {:?}", request.timeout),
            )),
            Ok(Err(e)) => Err(classify_transport_error(e)),
            Ok(Ok(response)) if response.is_success() => Ok(response),
            Ok(Ok(response)) => Err(classify_status(response.status)),
        }
    }

    /// 执行请求并解析 JSON 响应
    async fn call_json<T: DeserializeOwned>(&self, request: ApiRequest) -> RequestOutcome<T> {
        let response = self.execute(&request).await?;
        response.json().map_err(|e| {
            ApiError::new(
                ApiErrorKind::Unknown,
                format!("resposta inválida de {}: {}", request.path, e),
            )
        })
    }

    fn to_body<B: Serialize>(body: &B) -> RequestOutcome<Value> {
        serde_json::to_value(body)
            .map_err(|e| ApiError::new(ApiErrorKind::Unknown, format!("falha ao serializar: {}", e)))
    }

    // ========== 分析 ==========

    /// 分析单段文本
    pub async fn analyze_text(&self, text: &str) -> RequestOutcome<AnalysisResult> {
        self.analyze(AnalyzeRequest {
            id: None,
            text: text.to_string(),
        })
        .await
    }

    /// 分析批量中的一条
    pub async fn analyze_item(&self, item: &WorkItem) -> RequestOutcome<AnalysisResult> {
        self.analyze(AnalyzeRequest {
            id: Some(item.id.clone()),
            text: item.text.clone(),
        })
        .await
    }

    async fn analyze(&self, request: AnalyzeRequest) -> RequestOutcome<AnalysisResult> {
        let body = Self::to_body(&request)?;
        let response: AnalyzeResponse = self
            .call_json(ApiRequest::post("/analyze", Some(body), self.timeouts.request))
            .await?;
        Ok(AnalysisResult::from(response))
    }

    // ========== 健康检查与计数器 ==========

    /// 后端是否在线（`GET /health`，不重试，状态码 < 500 即在线）
    pub async fn check_connection(&self) -> bool {
        probe_health(self.transport.as_ref(), &self.endpoint, self.timeouts.health).await
    }

    pub async fn get_stats(&self) -> RequestOutcome<StatsResponse> {
        self.call_json(ApiRequest::get("/stats", self.timeouts.stats).without_retry())
            .await
    }

    /// 登记一次访问
    pub async fn register_visit(&self) -> RequestOutcome<()> {
        self.execute(&ApiRequest::post("/stats/visit", None, self.timeouts.stats).without_retry())
            .await
            .map(|_| ())
    }

    // ========== 人工反馈 ==========

    pub async fn submit_feedback(&self, feedback: &FeedbackRequest) -> RequestOutcome<FeedbackResponse> {
        let body = Self::to_body(feedback)?;
        self.call_json(ApiRequest::post("/feedback", Some(body), self.timeouts.request))
            .await
    }

    pub async fn get_feedback_stats(&self) -> RequestOutcome<FeedbackStats> {
        self.call_json(ApiRequest::get("/feedback/stats", self.timeouts.stats))
            .await
    }

    pub async fn export_feedback(&self) -> RequestOutcome<FeedbackExport> {
        self.call_json(ApiRequest::get("/feedback/export", self.timeouts.export))
            .await
    }

    pub async fn get_training_status(&self) -> RequestOutcome<TrainingStatus> {
        self.call_json(ApiRequest::get("/feedback/training-status", self.timeouts.stats))
            .await
    }
}
