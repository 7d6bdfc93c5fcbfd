pub mod analysis;
pub mod batch;
pub mod feedback;
pub mod history;
pub mod loaders;
pub mod risk;
pub mod stats;

pub use analysis::{AnalysisResult, AnalyzeRequest, AnalyzeResponse, Classification, Entity};
pub use batch::{BatchItemResult, BatchSummary, WorkItem};
pub use feedback::{FeedbackRequest, FeedbackSubmitted, TrainingStatus};
pub use history::{HistoryRecord, RecordKind, SessionMetrics};
pub use loaders::{validate_bytes, validate_file};
pub use risk::RiskLevel;
pub use stats::{GlobalCounters, StatsResponse};
