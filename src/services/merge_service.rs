//! 合并服务 - 业务能力层
//!
//! 同一个合并操作用在两个层级：
//! - 按主题：把所有页的同一主题片段合并成一段
//! - 全文：把各主题段落合并成最终文本

use futures::future::join_all;
use tracing::{debug, info};

use crate::clients::ChatRequest;
use crate::error::LlmError;
use crate::models::{Topic, TopicCorpus, TopicSummary};
use crate::services::prompts::{gather_prompt, render_bullets, FINAL_MERGE_PROMPT};
use crate::services::retry::RetryingInvoker;

pub struct MergeService {
    invoker: RetryingInvoker,
}

impl MergeService {
    pub fn new(invoker: RetryingInvoker) -> Self {
        Self { invoker }
    }

    /// 合并一个主题的全部片段，失败时返回空字符串
    ///
    /// 没有任何片段（文档没有页）时不发请求
    pub async fn merge_topic(&self, topic: Topic, values: &[String]) -> String {
        if values.is_empty() {
            debug!("[主题 {}] 没有片段，跳过合并", topic);
            return String::new();
        }
        let request = ChatRequest::new(gather_prompt(topic), render_bullets(values));
        let label = format!("主题 {}", topic);
        self.invoker.invoke(&label, &request, parse_text).await
    }

    /// 所有主题并发合并
    pub async fn merge_corpus(&self, corpus: &TopicCorpus) -> TopicSummary {
        let merged = join_all(corpus.iter().map(|(topic, values)| async move {
            let text = self.merge_topic(topic, values).await;
            info!("✓ 主题 {} 合并完成 ({} 字符)", topic, text.chars().count());
            (topic, text)
        }))
        .await;

        merged.into_iter().collect()
    }

    /// 把各主题段落合并成最终文本，只发一次请求
    pub async fn merge_sections(&self, summary: &TopicSummary) -> String {
        let request = ChatRequest::new(FINAL_MERGE_PROMPT, summary.render());
        self.invoker.invoke("全文合并", &request, parse_text).await
    }
}

fn parse_text(content: &str) -> Result<String, LlmError> {
    Ok(content.trim().to_string())
}
