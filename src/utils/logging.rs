/// 日志工具模块
///
/// 提供日志初始化以及格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::prelude::*;

use crate::clients::Endpoint;
use crate::models::{BatchSummary, SessionMetrics};
use crate::models::risk::RiskLevel;

/// 初始化全局日志
///
/// `RUST_LOG` 优先；未设置时 `verbose` 决定默认级别。
/// 重复调用时静默忽略（测试中常见）。
pub fn init(verbose: bool) {
    let default_filter = if verbose {
        "pii_dashboard=debug"
    } else {
        "pii_dashboard=info"
    };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `endpoint`: 已解析的后端地址
pub fn log_startup(endpoint: &Endpoint) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 个人信息检测客户端");
    info!("🌐 后端: {} ({:?})", endpoint.base_url, endpoint.kind);
    info!("{}", "=".repeat(60));
}

/// 记录批量开始信息
pub fn log_batch_start(total: usize, file_name: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始批量分析: {}", file_name);
    info!("📄 共 {} 条，逐条顺序提交", total);
    info!("{}", "=".repeat(60));
}

/// 记录批量完成信息
///
/// # 参数
/// - `summary`: 成功 / 失败统计
pub fn log_batch_complete(summary: &BatchSummary) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 批量完成: 成功 {}/{}，失败 {}",
        summary.succeeded,
        summary.total(),
        summary.failed
    );
    info!("{}", "─".repeat(60));
}

/// 打印会话统计
///
/// # 参数
/// - `metrics`: 由历史推导出的会话指标
/// - `export_path`: 历史导出文件（未导出时为 `None`）
pub fn print_session_metrics(metrics: &SessionMetrics, export_path: Option<&str>) {
    info!("\n{}", "=".repeat(60));
    info!("📊 会话统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📄 已处理: {}", metrics.total_processed);
    info!(
        "✅ 公开: {}  🔒 不公开: {}",
        metrics.public_count, metrics.non_public_count
    );
    info!("🎯 平均置信度: {:.1}%", metrics.average_confidence * 100.0);

    for level in RiskLevel::ALL {
        info!(
            "   {:<10} {}",
            level.label(),
            metrics.risk_distribution.get(level)
        );
    }

    if !metrics.pii_type_counts.is_empty() {
        info!("🔎 个人信息类型:");
        for (entity_type, count) in &metrics.pii_type_counts {
            info!("   {:<16} {}", entity_type, count);
        }
    }
    info!("{}", "=".repeat(60));

    if let Some(path) = export_path {
        info!("\n历史已导出至: {}", path);
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本，超长时以 `...` 结尾
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
