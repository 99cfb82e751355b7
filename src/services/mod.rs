//! 业务能力层（Services）
//!
//! - `RetryingInvoker` - 限流 + 重试的 LLM 调用
//! - `ExtractionService` - 逐页提取（map）
//! - `MergeService` - 按主题合并与全文合并（reduce）

pub mod extraction_service;
pub mod merge_service;
pub mod prompts;
pub mod retry;

pub use extraction_service::ExtractionService;
pub use merge_service::MergeService;
pub use retry::{RetryPolicy, RetryingInvoker};
