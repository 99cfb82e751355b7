//! LLM API 客户端
//!
//! 封装所有与 LLM API 相关的调用逻辑
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::LlmError;
use crate::models::TokenUsage;

/// 一次聊天请求：系统提示词 + 用户消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// 一次聊天的返回：去除首尾空白的文本（可能为空）+ 服务端上报的用量
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// 远程文本生成服务
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, LlmError>;

    fn model_name(&self) -> &str;

    fn endpoint(&self) -> &str;
}

/// 基于 async-openai 的 LLM 客户端
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    api_base_url: String,
    model_name: String,
}

impl OpenAiClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            api_base_url: config.llm_api_base_url.clone(),
            model_name: config.llm_model_name.clone(),
        }
    }

    fn build_messages(
        &self,
        request: &ChatRequest,
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(request.system.as_str())
            .build()
            .map_err(|e| LlmError::Request {
                message: e.to_string(),
            })?;

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(request.user.as_str())
            .build()
            .map_err(|e| LlmError::Request {
                message: e.to_string(),
            })?;

        Ok(vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ])
    }
}

#[async_trait]
impl ChatBackend for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, LlmError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", request.user.chars().count());

        let messages = self.build_messages(request)?;

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .build()
            .map_err(|e| LlmError::Request {
                message: e.to_string(),
            })?;

        let response = self.client.chat().create(chat_request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            LlmError::from_api_message(&self.model_name, e.to_string())
        })?;

        debug!("LLM API 调用成功");

        let usage = response.usage.as_ref().map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens as u64,
            completion_tokens: u.completion_tokens as u64,
            cached_tokens: u
                .prompt_tokens_details
                .as_ref()
                .and_then(|details| details.cached_tokens)
                .map(|cached| cached as u64),
        });

        // 没有内容时仍返回用量，由调用方判定为空回复
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();
        if content.trim().is_empty() {
            warn!("LLM 返回内容为空，模型: {}", self.model_name);
        }

        Ok(ChatReply {
            content: content.trim().to_string(),
            usage,
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn endpoint(&self) -> &str {
        &self.api_base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_client() -> OpenAiClient {
        let config = Config {
            llm_api_key: "sk-test".to_string(),
            llm_api_base_url: "http://localhost:9/v1".to_string(),
            llm_model_name: "test-model".to_string(),
            ..Config::default()
        };
        OpenAiClient::new(&config)
    }

    #[test]
    fn test_client_reports_configuration() {
        let client = create_test_client();
        assert_eq!(client.model_name(), "test-model");
        assert_eq!(client.endpoint(), "http://localhost:9/v1");
    }

    #[test]
    fn test_build_messages() {
        let client = create_test_client();
        let messages = client
            .build_messages(&ChatRequest::new("system", "user"))
            .unwrap();

        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
    }

    /// 测试真实 LLM 调用
    ///
    /// 运行方式：
    /// ```bash
    /// LLM_API_KEY=... cargo test test_complete_live -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_complete_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let mut config = Config::from_env().unwrap();
        config.validate().unwrap();
        config.max_attempts = 1;
        let client = OpenAiClient::new(&config);

        let reply = client
            .complete(&ChatRequest::new("你是一个简洁的助手，回答要简短。", "你好"))
            .await
            .unwrap();

        println!("{}", reply.content);
        assert!(!reply.content.is_empty());
    }
}
