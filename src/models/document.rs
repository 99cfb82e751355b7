//! 待处理文档
//!
//! 文档由若干页（Unit）组成，页与页之间互相独立，可以并发提取

use std::path::{Path, PathBuf};

/// 单页文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// 页码（从1开始，仅用于日志）
    pub index: usize,
    pub text: String,
}

/// 由文本提取器产出的文档，产出后不再修改
#[derive(Debug, Clone)]
pub struct Document {
    source: PathBuf,
    units: Vec<Unit>,
}

impl Document {
    pub fn new(source: impl Into<PathBuf>, pages: Vec<String>) -> Self {
        let units = pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| Unit { index: i + 1, text })
            .collect();
        Self {
            source: source.into(),
            units,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
