//! 文档加载
//!
//! 把输入文件切成互相独立的页。PDF 先用 `pdftotext` 之类的工具转成文本，
//! 页与页之间以换页符 (`\x0c`) 分隔。

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::error::FileError;
use crate::models::Document;

const PAGE_SEPARATOR: char = '\u{000C}';

#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Document, FileError>;
}

/// 纯文本加载器，按换页符分页
#[derive(Debug, Default, Clone, Copy)]
pub struct TextDocumentLoader;

impl TextDocumentLoader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentLoader for TextDocumentLoader {
    async fn load(&self, path: &Path) -> Result<Document, FileError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| FileError::from_io(path, e))?;
        let text = String::from_utf8_lossy(&bytes);
        let pages = split_pages(&text);

        debug!("{} 共 {} 页", path.display(), pages.len());
        Ok(Document::new(path, pages))
    }
}

/// 按换页符切分，丢弃只有空白的页
pub fn split_pages(text: &str) -> Vec<String> {
    text.split(PAGE_SEPARATOR)
        .filter(|page| !page.trim().is_empty())
        .map(|page| page.trim_end().to_string())
        .collect()
}
