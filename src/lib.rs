//! # PII Dashboard
//!
//! 个人信息检测服务的 Rust 客户端：单条 / 批量提交文本，汇总会话历史与全局计数。
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 传输层（Clients）
//! - `clients/transport` - `Transport` 抽象，生产实现基于 reqwest
//! - `clients/endpoint` - 启动时探测一次本地服务，决定本地或远程地址
//! - `clients/api_client` - 请求执行器：单次截止时间、瞬时故障重试一次、错误分类
//!
//! ### ② 业务能力层（Services）
//! - `SessionAggregator` - 会话历史与全局计数的唯一写入方
//! - `CounterSync` - 初始拉取、访问登记、定时轮询
//! - `FeedbackService` / `TrainingStatusMonitor` - 人工反馈与训练状态
//! - `export` - 历史导出
//!
//! ### ③ 流程层（Workflow）
//! - `ItemFlow` - 定义"一条文本"的处理流程，失败合成结果行
//!
//! ### ④ 编排层（Orchestration）
//! - `BatchProcessor` - 严格顺序处理批量，报告进度
//!
//! ### 数据与校验（Models）
//! - `models/loaders` - CSV / XLSX 批量文件校验
//! - `models/risk` - 风险等级推导
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use clients::{ApiClient, Endpoint, EndpointKind, EndpointResolver, Transport};
pub use config::Config;
pub use error::{ApiError, ApiErrorKind, AppError, AppResult, RequestOutcome, ValidationError};
pub use models::{BatchItemResult, HistoryRecord, RiskLevel, WorkItem};
pub use orchestrator::BatchProcessor;
pub use services::SessionAggregator;
pub use workflow::{ItemCtx, ItemFlow};
