//! 业务能力层（Services）
//!
//! 描述"我能做什么"，不关心调用顺序。

pub mod background;
pub mod counter_sync;
pub mod export;
pub mod feedback_service;
pub mod session_aggregator;

pub use background::BackgroundTask;
pub use counter_sync::{CounterSync, SessionFlags};
pub use export::{export_history_csv, export_history_json};
pub use feedback_service::{feedback_channel, FeedbackService, TrainingStatusMonitor};
pub use session_aggregator::SessionAggregator;
