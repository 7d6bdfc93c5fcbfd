use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 后端调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 批量文件校验错误
    #[error("文件校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件读写错误
    #[error("文件错误 ({path}): {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

// ========== 请求失败分类 ==========

/// 单次逻辑请求的失败类型
///
/// 固定的五种分类，前三种为瞬时故障（允许重试一次）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorKind {
    /// 超过请求截止时间
    Timeout,
    /// 网络连接丢失
    Offline,
    /// 服务冷启动 / 过载（502、503）
    ServiceWarming,
    /// 跨域策略拒绝
    CrossOriginDenied,
    /// 其他未知错误
    Unknown,
}

impl ApiErrorKind {
    /// 是否为瞬时故障
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ApiErrorKind::Timeout | ApiErrorKind::Offline | ApiErrorKind::ServiceWarming
        )
    }

    /// 对外展示的类型代码，与前端历史数据保持一致
    pub fn code(self) -> &'static str {
        match self {
            ApiErrorKind::Timeout => "TIMEOUT",
            ApiErrorKind::Offline => "OFFLINE",
            ApiErrorKind::ServiceWarming => "WAKING_UP",
            ApiErrorKind::CrossOriginDenied => "CORS",
            ApiErrorKind::Unknown => "UNKNOWN",
        }
    }

    /// 批量失败行写入风险字段的标记，例如 `ERRO_TIMEOUT`
    pub fn sentinel(self) -> String {
        format!("ERRO_{}", self.code())
    }

    /// 从风险字段标记反解失败类型
    pub fn from_sentinel(label: &str) -> Option<Self> {
        let code = label.strip_prefix("ERRO_")?;
        [
            ApiErrorKind::Timeout,
            ApiErrorKind::Offline,
            ApiErrorKind::ServiceWarming,
            ApiErrorKind::CrossOriginDenied,
            ApiErrorKind::Unknown,
        ]
        .into_iter()
        .find(|kind| kind.code() == code)
    }

    /// 面向用户的提示信息
    pub fn user_message(self) -> &'static str {
        match self {
            ApiErrorKind::ServiceWarming => {
                "O motor de IA está acordando, por favor aguarde uns instantes..."
            }
            ApiErrorKind::Timeout => {
                "A API demorou muito para responder. O modelo pode estar processando. Tente novamente."
            }
            ApiErrorKind::Offline => {
                "Não foi possível conectar à API. Verifique sua conexão ou tente mais tarde."
            }
            ApiErrorKind::CrossOriginDenied => {
                "Erro de permissão ao acessar a API. Contate o administrador."
            }
            ApiErrorKind::Unknown => "Ocorreu um erro inesperado. Tente novamente.",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 请求最终失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}

// ========== 文件校验错误 ==========

/// 校验失败的大类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// 格式不支持 / 文件损坏 / 空表
    FileFormat,
    /// 缺少 id 或文本列
    MissingColumns,
    /// 某一行缺少字段
    RowData,
}

/// 批量文件校验错误
///
/// 消息直接展示给上传文件的用户。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Formato não suportado. Envie um arquivo .csv ou .xlsx.")]
    UnsupportedFormat { extension: Option<String> },

    #[error("Não foi possível ler o arquivo. Verifique se está corrompido.")]
    Unreadable { reason: String },

    #[error("Arquivo muito grande (mais de {limit} células). Divida o lote em arquivos menores.")]
    TooLarge { limit: usize },

    #[error("Arquivo sem dados. Adicione pelo menos uma linha.")]
    EmptySheet,

    #[error("Arquivo sem linhas de dados.")]
    NoDataRows,

    #[error(
        "Colunas obrigatórias ausentes. O arquivo deve conter uma coluna de id (ex: id, protocolo) e uma de texto (ex: texto, texto mascarado). Veja o exemplo."
    )]
    MissingColumns {
        has_id_column: bool,
        has_text_column: bool,
    },

    #[error("Linha {line}: id/texto ausente. Cada linha deve ter um id e um texto para análise.")]
    RowData { line: usize },
}

impl ValidationError {
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            ValidationError::UnsupportedFormat { .. }
            | ValidationError::Unreadable { .. }
            | ValidationError::TooLarge { .. }
            | ValidationError::EmptySheet
            | ValidationError::NoDataRows => ValidationErrorKind::FileFormat,
            ValidationError::MissingColumns { .. } => ValidationErrorKind::MissingColumns,
            ValidationError::RowData { .. } => ValidationErrorKind::RowData,
        }
    }

    /// 可供下载的示例文件内容
    pub fn example_template(&self) -> &'static str {
        crate::models::loaders::EXAMPLE_CSV
    }
}

// ========== 配置错误 ==========

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    InvalidValue { field: String, reason: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读写错误
    pub fn file(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File {
            path: path.into(),
            source,
        }
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Other(format!("CSV写入失败: {}", err))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 单次逻辑请求的结果
pub type RequestOutcome<T> = Result<T, ApiError>;
