use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 本地后端地址（开发环境）
    pub local_api_url: String,
    /// 远程后端地址（生产环境）
    pub remote_api_url: String,
    /// 探测本地后端的超时（毫秒）
    pub probe_timeout_ms: u64,
    /// 分析请求超时（毫秒）
    pub request_timeout_ms: u64,
    /// 健康检查超时（毫秒）
    pub health_timeout_ms: u64,
    /// 统计 / 访问登记请求超时（毫秒）
    pub stats_timeout_ms: u64,
    /// 反馈导出请求超时（毫秒）
    pub export_timeout_ms: u64,
    /// 服务冷启动时的重试等待（毫秒）
    pub warming_backoff_ms: u64,
    /// 网络断开时的重试等待（毫秒）
    pub offline_backoff_ms: u64,
    /// 全局计数器轮询间隔（秒）
    pub stats_poll_interval_secs: u64,
    /// 训练状态刷新间隔（秒）
    pub training_refresh_secs: u64,
    /// 会话历史上限
    pub history_capacity: usize,
    /// 待分析的批量文件（.csv / .xlsx）
    pub input_file: Option<String>,
    /// 单条分析的文本（未提供批量文件时使用）
    pub analyze_text: Option<String>,
    /// 历史导出文件
    pub output_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_api_url: "http://localhost:7860".to_string(),
            remote_api_url: "https://marinhothiago-desafio-participa-df.hf.space".to_string(),
            probe_timeout_ms: 2_000,
            request_timeout_ms: 15_000,
            health_timeout_ms: 8_000,
            stats_timeout_ms: 5_000,
            export_timeout_ms: 10_000,
            warming_backoff_ms: 3_000,
            offline_backoff_ms: 2_000,
            stats_poll_interval_secs: 30,
            training_refresh_secs: 10,
            history_capacity: 100,
            input_file: None,
            analyze_text: None,
            output_file: "historico_analises.csv".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 若设置了 `DASHBOARD_CONFIG`，先读取该 TOML 文件，再用环境变量覆盖。
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = match std::env::var("DASHBOARD_CONFIG") {
            Ok(path) => Self::from_toml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        base.with_env_overrides()?.validated()
    }

    /// 从 TOML 文件加载配置，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
            .map_err(|source| ConfigError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            })?
            .validated()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn with_env_overrides(self) -> Result<Self, ConfigError> {
        Ok(Self {
            local_api_url: env_string("LOCAL_API_URL").unwrap_or(self.local_api_url),
            remote_api_url: env_string("REMOTE_API_URL").unwrap_or(self.remote_api_url),
            probe_timeout_ms: env_parse("PROBE_TIMEOUT_MS", "u64")?
                .unwrap_or(self.probe_timeout_ms),
            request_timeout_ms: env_parse("REQUEST_TIMEOUT_MS", "u64")?
                .unwrap_or(self.request_timeout_ms),
            health_timeout_ms: env_parse("HEALTH_TIMEOUT_MS", "u64")?
                .unwrap_or(self.health_timeout_ms),
            stats_timeout_ms: env_parse("STATS_TIMEOUT_MS", "u64")?
                .unwrap_or(self.stats_timeout_ms),
            export_timeout_ms: env_parse("EXPORT_TIMEOUT_MS", "u64")?
                .unwrap_or(self.export_timeout_ms),
            warming_backoff_ms: env_parse("WARMING_BACKOFF_MS", "u64")?
                .unwrap_or(self.warming_backoff_ms),
            offline_backoff_ms: env_parse("OFFLINE_BACKOFF_MS", "u64")?
                .unwrap_or(self.offline_backoff_ms),
            stats_poll_interval_secs: env_parse("STATS_POLL_INTERVAL_SECS", "u64")?
                .unwrap_or(self.stats_poll_interval_secs),
            training_refresh_secs: env_parse("TRAINING_REFRESH_SECS", "u64")?
                .unwrap_or(self.training_refresh_secs),
            history_capacity: env_parse("HISTORY_CAPACITY", "usize")?
                .unwrap_or(self.history_capacity),
            input_file: env_string("INPUT_FILE").or(self.input_file),
            analyze_text: env_string("ANALYZE_TEXT").or(self.analyze_text),
            output_file: env_string("OUTPUT_FILE").unwrap_or(self.output_file),
            verbose_logging: env_parse("VERBOSE_LOGGING", "bool")?
                .unwrap_or(self.verbose_logging),
        })
    }

    /// 检查取值范围
    ///
    /// 轮询 / 刷新间隔为 0 时后台定时器无法创建，直接拒绝。
    pub fn validated(self) -> Result<Self, ConfigError> {
        let positive = [
            ("stats_poll_interval_secs", self.stats_poll_interval_secs),
            ("training_refresh_secs", self.training_refresh_secs),
            ("history_capacity", self.history_capacity as u64),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        Ok(self)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    pub fn stats_timeout(&self) -> Duration {
        Duration::from_millis(self.stats_timeout_ms)
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_millis(self.export_timeout_ms)
    }

    pub fn warming_backoff(&self) -> Duration {
        Duration::from_millis(self.warming_backoff_ms)
    }

    pub fn offline_backoff(&self) -> Duration {
        Duration::from_millis(self.offline_backoff_ms)
    }

    pub fn stats_poll_interval(&self) -> Duration {
        Duration::from_secs(self.stats_poll_interval_secs)
    }

    pub fn training_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.training_refresh_secs)
    }
}

fn env_string(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(
    var_name: &str,
    expected_type: &str,
) -> Result<Option<T>, ConfigError> {
    match env_string(var_name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
    }
}
