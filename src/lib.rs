//! # Paper Summarize
//!
//! 把一篇论文切成若干页，交给 LLM 逐页提取，再按主题和全文两级合并成一篇摘要
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有文件系统上的共享资源，只暴露能力
//! - `ExclusionGuard` - 跨进程登记"正在处理"的文档，防止重复处理
//! - `DocumentLoader` - 把输入切分成页
//!
//! ### ② 客户端（Clients）
//! - `clients/` - `ChatBackend` 抽象远程文本生成服务
//! - `OpenAiClient` - 基于 async-openai 的实现
//!
//! ### ③ 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `RetryingInvoker` - 限流 + 固定次数重试
//! - `ExtractionService` - 逐页提取（map）
//! - `MergeService` - 按主题合并、全文合并（reduce）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/pipeline` - 登记 → 提取 → 合并 → 注销
//! - `orchestrator/report` - 输出报告
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use clients::{ChatBackend, ChatReply, ChatRequest, OpenAiClient, ScriptedLlmClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{DocumentLoader, ExclusionGuard, TextDocumentLoader};
pub use models::{Document, Record, Topic, TopicCorpus, TopicSummary, UsageCounters};
pub use orchestrator::{render_report, Pipeline, PipelineOutput};
pub use services::{ExtractionService, MergeService, RetryPolicy, RetryingInvoker};
