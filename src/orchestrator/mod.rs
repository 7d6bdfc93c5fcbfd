//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 负责批量调度和进度统计，不做具体业务判断。
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<WorkItem>)
//!     ↓
//! workflow::ItemFlow (处理单条 WorkItem)
//!     ↓
//! clients::ApiClient (超时 / 重试 / 错误分类)
//!     ↓
//! clients::Transport (HTTP)
//! ```

pub mod batch_processor;

pub use batch_processor::BatchProcessor;
