//! Token 用量统计
//!
//! 每次 LLM 调用返回后累加一次，整个运行期间只增不减

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// 单次调用上报的用量，缺失的字段视为 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// 已缓存（已付费）的输入 token，包含在 prompt_tokens 内
    pub cached_tokens: Option<u64>,
}

/// 用量快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageCounters {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_tokens: u64,
}

impl fmt::Display for UsageCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cached_tokens > 0 {
            write!(
                f,
                "Usage(input_tokens={}, output_tokens={}, cached_tokens={})",
                self.input_tokens, self.output_tokens, self.cached_tokens
            )
        } else {
            write!(
                f,
                "Usage(input_tokens={}, output_tokens={})",
                self.input_tokens, self.output_tokens
            )
        }
    }
}

/// 用量累加器
///
/// 由流水线在开始时创建，通过 `Arc` 传给每一个调用方
#[derive(Debug, Default)]
pub struct UsageAccumulator {
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    cached_tokens: AtomicU64,
}

impl UsageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累加一次调用的用量
    ///
    /// 缓存命中的 token 从输入中扣除，单独计数
    pub fn record(&self, usage: Option<TokenUsage>) {
        let Some(usage) = usage else {
            return;
        };

        let cached = usage.cached_tokens.unwrap_or(0).min(usage.prompt_tokens);
        self.input_tokens
            .fetch_add(usage.prompt_tokens - cached, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(usage.completion_tokens, Ordering::Relaxed);
        self.cached_tokens.fetch_add(cached, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> UsageCounters {
        UsageCounters {
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
            cached_tokens: self.cached_tokens.load(Ordering::Relaxed),
        }
    }
}
