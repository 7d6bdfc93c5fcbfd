//! 条目处理流程 - 流程层
//!
//! 核心职责：定义"一条文本"的完整处理流程
//!
//! 流程顺序：
//! 1. 调用 `/analyze`（执行器内部处理超时与重试）
//! 2. 成功 → 映射为批量结果
//! 3. 失败 → 合成 `ERRO_<类型>` 结果行，绝不向上传播

use tracing::{debug, info, warn};

use crate::clients::ApiClient;
use crate::models::batch::PREVIEW_CHARS;
use crate::models::{BatchItemResult, WorkItem};
use crate::utils::truncate_text;
use crate::workflow::item_ctx::ItemCtx;

/// 条目处理流程
///
/// - 不持有状态，只依赖客户端
/// - 任何失败都被吸收为一条结果
pub struct ItemFlow {
    client: ApiClient,
    verbose_logging: bool,
}

impl ItemFlow {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            verbose_logging: false,
        }
    }

    pub fn with_verbose_logging(mut self, verbose: bool) -> Self {
        self.verbose_logging = verbose;
        self
    }

    /// 处理一条文本，总是返回恰好一条结果
    pub async fn run(&self, item: &WorkItem, ctx: &ItemCtx) -> BatchItemResult {
        if self.verbose_logging {
            debug!("{} 📝 {}", ctx, truncate_text(&item.text, PREVIEW_CHARS));
        }

        match self.client.analyze_item(item).await {
            Ok(analysis) => {
                info!(
                    "{} ✓ {} (置信度 {:.0}%，{} 项个人信息)",
                    ctx,
                    analysis.classification.label(),
                    analysis.confidence * 100.0,
                    analysis.entities.len()
                );
                BatchItemResult::from_analysis(item, analysis)
            }
            Err(e) => {
                warn!("{} ❌ 分析失败 ({}): {}", ctx, e.kind, e.message);
                BatchItemResult::failed(item, e.kind)
            }
        }
    }
}
