//! 逐页提取服务 - 业务能力层
//!
//! 每页发送一次提取请求，全部页并发提交，由共享限制器控制在途数量。
//! 返回顺序与页序一致。

use futures::future::join_all;
use serde_json::Value as JsonValue;
use tracing::info;

use crate::clients::ChatRequest;
use crate::error::LlmError;
use crate::models::{Document, Record, Unit};
use crate::services::prompts::EXTRACT_PROMPT;
use crate::services::retry::RetryingInvoker;
use crate::utils::logging::truncate_text;

pub struct ExtractionService {
    invoker: RetryingInvoker,
}

impl ExtractionService {
    pub fn new(invoker: RetryingInvoker) -> Self {
        Self { invoker }
    }

    /// 提取单页，失败时得到全空记录
    pub async fn extract(&self, unit: &Unit) -> Record {
        let request = ChatRequest::new(EXTRACT_PROMPT, unit.text.as_str());
        let label = format!("第 {} 页", unit.index);
        let record = self.invoker.invoke(&label, &request, parse_record).await;

        if record.is_empty() {
            info!("[{}] 本页没有可用内容", label);
        }
        record
    }

    /// 提取整篇文档，记录数与页数一一对应
    pub async fn extract_document(&self, document: &Document) -> Vec<Record> {
        join_all(document.units().iter().map(|unit| self.extract(unit))).await
    }
}

/// 解析提取结果
///
/// 允许外层包裹 markdown 代码块或少量说明文字，必须能找到一个 JSON 对象
pub fn parse_record(content: &str) -> Result<Record, LlmError> {
    let candidate = strip_code_fence(content);

    let value: JsonValue = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(first_error) => match outermost_object(candidate) {
            Some(object) => serde_json::from_str(object).map_err(|e| parse_error(content, e))?,
            None => return Err(parse_error(content, first_error)),
        },
    };

    let object = value.as_object().ok_or_else(|| LlmError::Parse {
        response: truncate_text(content, 200),
        message: "返回内容不是 JSON 对象".to_string(),
    })?;

    Ok(Record::from_json_object(object))
}

fn parse_error(content: &str, error: serde_json::Error) -> LlmError {
    LlmError::Parse {
        response: truncate_text(content, 200),
        message: error.to_string(),
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);

    // 跳过 ```json 这样的语言标记
    match rest.find('\n') {
        Some(pos) if rest[..pos].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            rest[pos + 1..].trim()
        }
        _ => rest.trim(),
    }
}

fn outermost_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (start < end).then(|| &content[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ScriptedLlmClient;
    use crate::models::{Topic, UsageAccumulator};
    use crate::services::retry::RetryPolicy;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    const INTRO_ONLY: &str = r#"{"introduction":"x","method":"","contribution":"","experiment":"","discussion":""}"#;

    fn service(client: Arc<ScriptedLlmClient>, max_attempts: u32) -> ExtractionService {
        let invoker = RetryingInvoker::new(
            client,
            RetryPolicy {
                max_attempts,
                delay: Duration::from_millis(1),
            },
            Arc::new(UsageAccumulator::new()),
        )
        .with_limiter(Arc::new(Semaphore::new(5)));
        ExtractionService::new(invoker)
    }

    #[test]
    fn test_parse_plain_json() {
        let record = parse_record(INTRO_ONLY).unwrap();
        assert_eq!(record.get(Topic::Introduction), "x");
        assert_eq!(record.get(Topic::Method), "");
    }

    #[test]
    fn test_parse_fenced_json() {
        let content = "```json\n{\"method\": \"transformer\"}\n```";
        let record = parse_record(content).unwrap();
        assert_eq!(record.get(Topic::Method), "transformer");
        assert_eq!(record.get(Topic::Introduction), "");

        let content = "```\n{\"discussion\": \"d\"}\n```";
        assert_eq!(parse_record(content).unwrap().get(Topic::Discussion), "d");
    }

    #[test]
    fn test_parse_json_with_surrounding_text() {
        let content = "好的，结果如下：{\"experiment\": \"e\"} 以上。";
        assert_eq!(parse_record(content).unwrap().get(Topic::Experiment), "e");
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(parse_record("[1, 2]"), Err(LlmError::Parse { .. })));
        assert!(matches!(
            parse_record("no json here"),
            Err(LlmError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_extract_document_keeps_unit_order() {
        let client = Arc::new(ScriptedLlmClient::new(|request| {
            Ok(format!(r#"{{"introduction": "{}"}}"#, request.user))
        }));
        let service = service(client.clone(), 1);
        let pages: Vec<String> = (0..9).map(|i| format!("page-{}", i)).collect();
        let document = Document::new("paper.txt", pages.clone());

        let records = service.extract_document(&document).await;

        assert_eq!(records.len(), 9);
        for (record, page) in records.iter().zip(&pages) {
            assert_eq!(record.get(Topic::Introduction), page);
            assert_eq!(record.iter().count(), Topic::ALL.len());
        }
    }

    #[tokio::test]
    async fn test_failed_unit_degrades_to_empty_record() {
        let client = Arc::new(ScriptedLlmClient::new(|request| {
            if request.user == "bad" {
                Ok("garbage".to_string())
            } else {
                Ok(INTRO_ONLY.to_string())
            }
        }));
        let service = service(client.clone(), 2);
        let document = Document::new(
            "paper.txt",
            vec!["good".to_string(), "bad".to_string(), "good".to_string()],
        );

        let records = service.extract_document(&document).await;

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get(Topic::Introduction), "x");
        assert!(records[1].is_empty());
        assert_eq!(records[2].get(Topic::Introduction), "x");
        // 2 次成功 + 坏页 2 次尝试
        assert_eq!(client.calls(), 4);
    }
}
