use serde::{Deserialize, Serialize};

/// `GET /stats` 响应
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub site_visits: u64,
    #[serde(default)]
    pub classification_requests: u64,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// 全局计数器（以服务端为准，客户端做乐观自增）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalCounters {
    pub site_visits: u64,
    pub total_requests: u64,
}

impl From<&StatsResponse> for GlobalCounters {
    fn from(stats: &StatsResponse) -> Self {
        Self {
            site_visits: stats.site_visits,
            total_requests: stats.classification_requests,
        }
    }
}
