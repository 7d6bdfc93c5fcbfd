//! 条目处理上下文
//!
//! 封装"我正在处理批量中的第几条"这一信息

use std::fmt::Display;

/// 条目处理上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCtx {
    /// 条目在批量中的序号（从1开始，仅用于日志显示）
    pub position: usize,

    /// 批量总条数
    pub total: usize,

    /// 表格中的 id
    pub item_id: String,
}

impl ItemCtx {
    pub fn new(position: usize, total: usize, item_id: impl Into<String>) -> Self {
        Self {
            position,
            total,
            item_id: item_id.into(),
        }
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}/{} id#{}]", self.position, self.total, self.item_id)
    }
}
