//! 文档摘要流水线 - 编排层
//!
//! ## 流程
//!
//! 1. **登记**：在共享登记表中登记文档，已登记则立即失败
//! 2. **加载**：把输入切分为页
//! 3. **逐页提取**：每页一次 LLM 调用，得到各主题片段
//! 4. **转置**：按主题分组，保持页序
//! 5. **按主题合并**：各主题并发合并
//! 6. **全文合并**：一次请求得到最终文本
//! 7. **注销**：无论 2-6 成功与否都从登记表移除
//!
//! 所有 LLM 调用共享同一个并发限制器，用量记入本次运行自己的累加器。

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::clients::{ChatBackend, OpenAiClient};
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{DocumentLoader, ExclusionGuard, TextDocumentLoader};
use crate::models::{TopicCorpus, TopicSummary, UsageAccumulator, UsageCounters};
use crate::services::{ExtractionService, MergeService, RetryPolicy, RetryingInvoker};
use crate::utils::logging::{log_final_stats, log_stage};

const TOTAL_STAGES: usize = 6;

/// 一次运行的产出
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// 登记表中使用的文档标识
    pub identity: String,
    pub units: usize,
    pub topics: TopicSummary,
    pub summary: String,
    pub usage: UsageCounters,
}

/// 流水线
pub struct Pipeline {
    config: Config,
    backend: Arc<dyn ChatBackend>,
    loader: Arc<dyn DocumentLoader>,
    guard: ExclusionGuard,
    limiter: Arc<Semaphore>,
}

impl Pipeline {
    /// 使用真实的 LLM 客户端和文本加载器
    pub async fn initialize(config: Config) -> AppResult<Self> {
        let backend: Arc<dyn ChatBackend> = Arc::new(OpenAiClient::new(&config));
        let loader: Arc<dyn DocumentLoader> = Arc::new(TextDocumentLoader::new());
        let guard = ExclusionGuard::from_config(&config).await?;
        Ok(Self::with_parts(config, backend, loader, guard))
    }

    pub fn with_parts(
        config: Config,
        backend: Arc<dyn ChatBackend>,
        loader: Arc<dyn DocumentLoader>,
        guard: ExclusionGuard,
    ) -> Self {
        let limiter = Arc::new(Semaphore::new(config.max_concurrent_requests));
        Self {
            config,
            backend,
            loader,
            guard,
            limiter,
        }
    }

    pub fn backend(&self) -> &dyn ChatBackend {
        self.backend.as_ref()
    }

    pub fn guard(&self) -> &ExclusionGuard {
        &self.guard
    }

    /// 处理一篇文档
    ///
    /// 文档已在处理中时返回错误，且不会触碰登记表、不发出任何 LLM 请求
    pub async fn run(&self, input: &Path) -> AppResult<PipelineOutput> {
        let identity = document_identity(input).await;

        log_stage(1, TOTAL_STAGES, "登记文档");
        self.guard.try_acquire(&identity).await?;

        let outcome = self.process(input, &identity).await;

        match self.guard.release(&identity).await {
            Ok(()) => {}
            Err(e) if outcome.is_ok() => {
                error!("⚠️ 摘要已生成，但注销 {} 失败，需要手动清理: {}", identity, e);
            }
            Err(e) => error!("注销 {} 失败: {}", identity, e),
        }

        outcome
    }

    async fn process(&self, input: &Path, identity: &str) -> AppResult<PipelineOutput> {
        let started = Instant::now();

        log_stage(2, TOTAL_STAGES, "加载文档");
        let document = self.loader.load(input).await?;
        if document.is_empty() {
            warn!("⚠️ 文档 {} 没有可用文本", input.display());
        } else {
            info!("✓ 共 {} 页", document.len());
        }

        let usage = Arc::new(UsageAccumulator::new());
        let invoker = RetryingInvoker::new(
            self.backend.clone(),
            RetryPolicy::from_config(&self.config),
            usage.clone(),
        )
        .with_limiter(self.limiter.clone());
        let extraction = ExtractionService::new(invoker.clone());
        let merge = MergeService::new(invoker);

        log_stage(3, TOTAL_STAGES, "逐页提取");
        let records = extraction.extract_document(&document).await;
        let degraded = records.iter().filter(|r| r.is_empty()).count();
        info!("✓ 提取完成: {} 页, 其中 {} 页无内容", records.len(), degraded);

        log_stage(4, TOTAL_STAGES, "按主题转置");
        let corpus = TopicCorpus::from_records(&records);

        log_stage(5, TOTAL_STAGES, "按主题合并");
        let topics = merge.merge_corpus(&corpus).await;

        log_stage(6, TOTAL_STAGES, "全文合并");
        let summary = merge.merge_sections(&topics).await;
        if summary.is_empty() {
            warn!("⚠️ 全文合并没有得到任何内容");
        }

        let usage = usage.snapshot();
        log_final_stats(document.len(), &usage, started.elapsed());

        Ok(PipelineOutput {
            identity: identity.to_string(),
            units: document.len(),
            topics,
            summary,
            usage,
        })
    }
}

/// 登记表使用的文档标识：能解析时使用绝对路径，否则使用原始参数
pub async fn document_identity(input: &Path) -> String {
    tokio::fs::canonicalize(input)
        .await
        .unwrap_or_else(|_| input.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identity_of_existing_file_is_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.txt");
        std::fs::write(&path, "text").unwrap();

        let identity = document_identity(&path).await;
        assert!(Path::new(&identity).is_absolute());
        assert!(identity.ends_with("paper.txt"));
    }

    #[tokio::test]
    async fn test_identity_of_missing_file_is_raw_argument() {
        let identity = document_identity(Path::new("no/such/doc1.pdf")).await;
        assert_eq!(identity, "no/such/doc1.pdf");
    }
}
