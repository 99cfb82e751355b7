//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责把一篇文档从登记到出报告的整个过程串起来，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `pipeline` - 文档摘要流水线
//! - 登记 / 注销文档（ExclusionGuard）
//! - 创建本次运行的用量累加器和共享并发限制器（Semaphore）
//! - 逐页提取 → 按主题转置 → 按主题合并 → 全文合并
//!
//! ### `report` - 最终报告
//! - 把摘要和用量渲染成 LaTeX 友好的文本
//!
//! ## 层次关系
//!
//! ```text
//! pipeline (处理 Document)
//!     ↓
//! services (能力层：extraction / merge / retry)
//!     ↓
//! clients + infrastructure (LLM 客户端、登记表、文档加载)
//! ```

pub mod pipeline;
pub mod report;

pub use pipeline::{document_identity, Pipeline, PipelineOutput};
pub use report::render_report;
