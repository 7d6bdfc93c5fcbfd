//! 后端地址解析
//!
//! 启动时探测一次本地服务 `/health`，在限定时间内可达则使用本地地址，否则使用远程地址。
//! 结果在进程内缓存，之后不再重新探测。

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::clients::transport::{HttpRequest, Method, Transport};
use crate::config::Config;

pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Local,
    Remote,
}

/// 已解析的后端地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub kind: EndpointKind,
    pub base_url: String,
}

impl Endpoint {
    pub fn local(base_url: impl Into<String>) -> Self {
        Self {
            kind: EndpointKind::Local,
            base_url: base_url.into(),
        }
    }

    pub fn remote(base_url: impl Into<String>) -> Self {
        Self {
            kind: EndpointKind::Remote,
            base_url: base_url.into(),
        }
    }

    /// 拼接接口路径
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// 单次健康检查：不重试，超时或 5xx 视为不可达
pub async fn probe_health(transport: &dyn Transport, base: &Endpoint, deadline: Duration) -> bool {
    let request = HttpRequest {
        method: Method::Get,
        url: base.url(HEALTH_PATH),
        body: None,
    };

    match timeout(deadline, transport.send(request)).await {
        Ok(Ok(response)) => response.is_reachable(),
        Ok(Err(e)) => {
            debug!("健康检查失败 {}: {}", base.base_url, e);
            false
        }
        Err(_) => {
            debug!("健康检查超时 {} ({:?})", base.base_url, deadline);
            false
        }
    }
}

/// 后端地址解析器
pub struct EndpointResolver {
    local: Endpoint,
    remote: Endpoint,
    probe_timeout: Duration,
    transport: Arc<dyn Transport>,
    resolved: OnceCell<Endpoint>,
}

impl EndpointResolver {
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self::with_candidates(
            Endpoint::local(&config.local_api_url),
            Endpoint::remote(&config.remote_api_url),
            config.probe_timeout(),
            transport,
        )
    }

    pub fn with_candidates(
        local: Endpoint,
        remote: Endpoint,
        probe_timeout: Duration,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            local,
            remote,
            probe_timeout,
            transport,
            resolved: OnceCell::new(),
        }
    }

    /// 解析后端地址，并发调用只会探测一次
    pub async fn resolve(&self) -> Endpoint {
        self.resolved.get_or_init(|| self.probe()).await.clone()
    }

    /// 已解析的地址（尚未解析时为 `None`）
    pub fn resolved(&self) -> Option<&Endpoint> {
        self.resolved.get()
    }

    async fn probe(&self) -> Endpoint {
        info!("🔍 探测本地服务: {}", self.local.base_url);

        if probe_health(self.transport.as_ref(), &self.local, self.probe_timeout).await {
            info!("✓ 使用本地服务: {}", self.local.base_url);
            self.local.clone()
        } else {
            warn!("⚠️  本地服务不可用，使用远程服务: {}", self.remote.base_url);
            self.remote.clone()
        }
    }
}
