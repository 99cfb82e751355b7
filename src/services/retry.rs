//! 带并发限制和固定次数重试的 LLM 调用
//!
//! - 有限制器时先占一个名额，整个重试循环都在名额内完成，任何退出路径都会归还
//! - 任何错误（网络、限流、空回复、解析）都等待固定时间后重试
//! - 次数耗尽时返回该类型的空值，不向上传播，单页失败不会拖垮整个任务

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::clients::{ChatBackend, ChatRequest};
use crate::config::Config;
use crate::error::LlmError;
use crate::models::UsageAccumulator;

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: config.retry_delay(),
        }
    }
}

/// 重试调用器
#[derive(Clone)]
pub struct RetryingInvoker {
    backend: Arc<dyn ChatBackend>,
    limiter: Option<Arc<Semaphore>>,
    policy: RetryPolicy,
    usage: Arc<UsageAccumulator>,
}

impl RetryingInvoker {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        policy: RetryPolicy,
        usage: Arc<UsageAccumulator>,
    ) -> Self {
        Self {
            backend,
            limiter: None,
            policy,
            usage,
        }
    }

    /// 与其他调用方共享的并发限制器
    pub fn with_limiter(mut self, limiter: Arc<Semaphore>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn backend(&self) -> &dyn ChatBackend {
        self.backend.as_ref()
    }

    pub fn usage(&self) -> &Arc<UsageAccumulator> {
        &self.usage
    }

    /// 发送请求并用 `parse` 解析返回文本
    ///
    /// 重试耗尽后返回 `T::default()`
    pub async fn invoke<T, P>(&self, label: &str, request: &ChatRequest, parse: P) -> T
    where
        T: Default,
        P: Fn(&str) -> Result<T, LlmError>,
    {
        let _permit = match &self.limiter {
            Some(limiter) => match limiter.acquire().await {
                Ok(permit) => Some(permit),
                Err(e) => {
                    error!("[{}] ❌ 并发限制器已关闭: {}", label, e);
                    return T::default();
                }
            },
            None => None,
        };

        match self.run_attempts(label, request, &parse).await {
            Ok(value) => value,
            Err(last_error) => {
                match last_error {
                    Some(e) => error!(
                        "[{}] ❌ 已尝试 {} 次仍失败，返回空结果: {}",
                        label, self.policy.max_attempts, e
                    ),
                    None => error!("[{}] ❌ 未进行任何尝试，返回空结果", label),
                }
                T::default()
            }
        }
    }

    async fn run_attempts<T, P>(
        &self,
        label: &str,
        request: &ChatRequest,
        parse: &P,
    ) -> Result<T, Option<LlmError>>
    where
        P: Fn(&str) -> Result<T, LlmError>,
    {
        let max_attempts = self.policy.max_attempts;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.call_once(request, parse).await {
                Ok(value) => {
                    debug!("[{}] ✓ 第 {} 次调用成功", label, attempt);
                    return Ok(value);
                }
                Err(e) => {
                    warn!(
                        "[{}] ⚠️ 第 {}/{} 次调用失败 ({:?}): {}",
                        label,
                        attempt,
                        max_attempts,
                        e.kind(),
                        e
                    );
                    last_error = Some(e);
                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }

        Err(last_error)
    }

    async fn call_once<T, P>(&self, request: &ChatRequest, parse: &P) -> Result<T, LlmError>
    where
        P: Fn(&str) -> Result<T, LlmError>,
    {
        let reply = self.backend.complete(request).await?;
        // 服务端已计费，空回复或解析失败也要计入用量
        self.usage.record(reply.usage);
        if reply.content.is_empty() {
            return Err(LlmError::EmptyContent {
                model: self.backend.model_name().to_string(),
            });
        }
        parse(&reply.content)
    }
}
