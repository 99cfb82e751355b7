//! 可编排的 LLM 客户端，供测试使用
//!
//! 记录调用次数、请求内容以及同时在途的调用数峰值

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::clients::llm_client::{ChatBackend, ChatReply, ChatRequest};
use crate::error::LlmError;
use crate::models::TokenUsage;

type Responder = Box<dyn Fn(&ChatRequest) -> Result<String, LlmError> + Send + Sync>;

pub struct ScriptedLlmClient {
    responder: Responder,
    latency: Duration,
    usage: Option<TokenUsage>,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlmClient {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ChatRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            latency: Duration::ZERO,
            usage: None,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 每次都返回同一段文本
    pub fn always(content: impl Into<String>) -> Self {
        let content = content.into();
        Self::new(move |_| Ok(content.clone()))
    }

    /// 每次都返回传输错误
    pub fn always_failing() -> Self {
        Self::new(|_| {
            Err(LlmError::Transport {
                model: "mock".to_string(),
                message: "connection reset".to_string(),
            })
        })
    }

    /// 每次调用前等待的时间，用于制造并发重叠
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 每次成功调用上报的用量
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatBackend for ScriptedLlmClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);

        let content = (self.responder)(request)?;
        Ok(ChatReply {
            content: content.trim().to_string(),
            usage: self.usage,
        })
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }

    fn endpoint(&self) -> &str {
        "mock://llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_client_counts_calls() {
        let client = ScriptedLlmClient::always("  hello  ");
        let reply = client.complete(&ChatRequest::new("s", "u")).await.unwrap();

        assert_eq!(reply.content, "hello");
        assert_eq!(client.calls(), 1);
        assert_eq!(client.peak_concurrency(), 1);
        assert_eq!(client.requests()[0].user, "u");
    }

    #[tokio::test]
    async fn test_always_failing() {
        let client = ScriptedLlmClient::always_failing();
        let result = client.complete(&ChatRequest::new("s", "u")).await;
        assert!(result.is_err());
        assert_eq!(client.calls(), 1);
    }
}
