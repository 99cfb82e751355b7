//! 最终报告
//!
//! 输出可直接粘贴进 LaTeX 正文：摘要、分隔线、端点、模型和用量

use crate::models::UsageCounters;

/// 渲染报告
///
/// 用量行中的 `_` 转义为 `\_`
pub fn render_report(summary: &str, endpoint: &str, model: &str, usage: &UsageCounters) -> String {
    let mut report = String::new();
    report.push_str(summary);
    report.push_str("\\par\n");
    report.push_str("\\noindent\\rule{\\linewidth}{1pt}\\par\n");
    report.push_str(&format!("Endpoint: {}\\par\n", endpoint));
    report.push_str(&format!("Model: {}\\par\n", model));
    report.push_str(&usage.to_string().replace('_', "\\_"));
    report.push('\n');
    report
}
