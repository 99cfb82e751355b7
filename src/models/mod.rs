pub mod document;
pub mod record;
pub mod usage;

pub use document::{Document, Unit};
pub use record::{Record, Topic, TopicCorpus, TopicSummary};
pub use usage::{TokenUsage, UsageAccumulator, UsageCounters};
