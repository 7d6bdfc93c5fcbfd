//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 把一组 [`WorkItem`] 逐条交给 [`ItemFlow`]，收集结果并报告进度。
//!
//! ## 保证
//!
//! - **严格顺序**：同一时刻只有一个请求在途
//! - **失败隔离**：单条失败不会中断后续条目
//! - **完整输出**：结果数量与 id 顺序和输入完全一致
//! - **进度回调**：每处理完一条调用一次 `(已完成, 总数)`，共调用 `总数` 次

use tracing::info;

use crate::clients::ApiClient;
use crate::models::{BatchItemResult, BatchSummary, WorkItem};
use crate::utils::logging::log_batch_complete;
use crate::workflow::{ItemCtx, ItemFlow};

/// 批量处理器
pub struct BatchProcessor {
    flow: ItemFlow,
}

impl BatchProcessor {
    pub fn new(client: ApiClient) -> Self {
        Self {
            flow: ItemFlow::new(client),
        }
    }

    pub fn with_flow(flow: ItemFlow) -> Self {
        Self { flow }
    }

    /// 处理整个批量（不关心进度）
    pub async fn run_batch(&self, items: &[WorkItem]) -> Vec<BatchItemResult> {
        self.run_batch_with_progress(items, |_, _| {}).await
    }

    /// 处理整个批量并报告进度
    ///
    /// # 参数
    /// - `items`: 待分析条目，按此顺序提交
    /// - `on_progress`: 每完成一条调用一次 `(已完成, 总数)`
    ///
    /// # 返回
    /// 与输入等长、同序的结果列表
    pub async fn run_batch_with_progress<F>(
        &self,
        items: &[WorkItem],
        mut on_progress: F,
    ) -> Vec<BatchItemResult>
    where
        F: FnMut(usize, usize),
    {
        let total = items.len();
        let mut results = Vec::with_capacity(total);

        if total == 0 {
            return results;
        }

        info!("📦 开始处理 {} 条", total);

        for (index, item) in items.iter().enumerate() {
            let ctx = ItemCtx::new(index + 1, total, item.id.clone());
            results.push(self.flow.run(item, &ctx).await);
            on_progress(index + 1, total);
        }

        log_batch_complete(&BatchSummary::from_results(&results));
        results
    }
}
