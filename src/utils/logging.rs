/// 日志工具模块
///
/// 初始化 tracing 订阅者，并提供阶段日志和格式化的辅助函数。
/// 日志统一写到 stderr，stdout 只留给最终报告。
use std::path::Path;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::UsageCounters;

/// 初始化日志
///
/// `RUST_LOG` 优先；未设置时按 `verbose` 选择 debug 或 info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 重复初始化（例如测试中）时忽略
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `config`: 配置
/// - `input`: 待处理文档
pub fn log_startup(config: &Config, input: &Path) {
    info!("{}", "=".repeat(60));
    info!(
        "🚀 开始处理 - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📄 文档: {}", input.display());
    info!(
        "🤖 模型: {} @ {}",
        config.llm_model_name, config.llm_api_base_url
    );
    info!(
        "📊 最大并发数: {}, 最大尝试次数: {}",
        config.max_concurrent_requests, config.max_attempts
    );
    info!("{}", "=".repeat(60));
}

/// 记录阶段开始
///
/// # 参数
/// - `step`: 当前阶段编号
/// - `total`: 阶段总数
/// - `name`: 阶段名称
pub fn log_stage(step: usize, total: usize, name: &str) {
    info!("{}", "─".repeat(60));
    info!("📦 [{}/{}] {}", step, total, name);
}

/// 打印最终统计信息
pub fn log_final_stats(units: usize, usage: &UsageCounters, elapsed: Duration) {
    info!("{}", "=".repeat(60));
    info!("📊 处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📄 页数: {}", units);
    info!("⏱️ 耗时: {:.1}s", elapsed.as_secs_f64());
    info!("🧮 {}", usage);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
