//! 基础设施层（Infrastructure）
//!
//! 持有文件系统上的共享资源，只暴露能力：
//! - `FileLock` / `ExclusionGuard` - 跨进程的"正在处理"登记
//! - `DocumentLoader` - 把输入文件切分成页

pub mod document_loader;
pub mod exclusion_guard;
pub mod file_lock;

pub use document_loader::{DocumentLoader, TextDocumentLoader};
pub use exclusion_guard::ExclusionGuard;
pub use file_lock::{FileLock, LockMarker};
