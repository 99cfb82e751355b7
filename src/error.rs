use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 互斥守卫错误
    #[error("互斥守卫错误: {0}")]
    Guard(#[from] GuardError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// LLM 服务错误
///
/// 重试策略目前对所有种类一视同仁，分类只用于日志和后续扩展
#[derive(Debug, Error)]
pub enum LlmError {
    /// 构建请求失败
    #[error("构建 LLM 请求失败: {message}")]
    Request { message: String },
    /// 网络或服务端错误
    #[error("LLM API调用失败 (模型: {model}): {message}")]
    Transport { model: String, message: String },
    /// 请求频率限制
    #[error("LLM API请求频率限制 (模型: {model}): {message}")]
    RateLimited { model: String, message: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 返回内容无法解析
    #[error("无法解析LLM返回的内容 (响应: {response}): {message}")]
    Parse { response: String, message: String },
}

/// LLM 错误种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    Request,
    Transport,
    RateLimited,
    EmptyContent,
    Parse,
}

impl LlmError {
    pub fn kind(&self) -> LlmErrorKind {
        match self {
            LlmError::Request { .. } => LlmErrorKind::Request,
            LlmError::Transport { .. } => LlmErrorKind::Transport,
            LlmError::RateLimited { .. } => LlmErrorKind::RateLimited,
            LlmError::EmptyContent { .. } => LlmErrorKind::EmptyContent,
            LlmError::Parse { .. } => LlmErrorKind::Parse,
        }
    }

    /// 根据错误信息区分频率限制和其他传输错误
    pub fn from_api_message(model: impl Into<String>, message: impl Into<String>) -> Self {
        let model = model.into();
        let message = message.into();
        let lower = message.to_lowercase();
        let rate_limited = ["rate limit", "rate_limit", "429", "too many requests", "quota"]
            .iter()
            .any(|pattern| lower.contains(pattern));

        if rate_limited {
            LlmError::RateLimited { model, message }
        } else {
            LlmError::Transport { model, message }
        }
    }
}

/// 互斥守卫错误
#[derive(Debug, Error)]
pub enum GuardError {
    /// 同一文档已在处理中
    #[error("文件 {identity} 已在处理中")]
    AlreadyProcessing { identity: String },
    /// 标识为空或跨行，无法按行存储
    #[error("非法的文档标识: {identity:?}")]
    InvalidIdentity { identity: String },
    /// 等待锁超时
    #[error("等待锁文件 {} 超时 ({:?}), 持有者: {holder}", path.display(), waited)]
    LockTimeout {
        path: PathBuf,
        waited: Duration,
        holder: String,
    },
    /// 读写记录文件失败
    #[error("访问 {} 失败: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {}", path.display())]
    NotFound { path: PathBuf },
    /// 读取文件失败
    #[error("读取文件失败 ({}): {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({}): {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({}): {source}", path.display())]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// 缺少 API 密钥
    #[error("未设置 LLM API 密钥 (LLM_API_KEY)")]
    MissingApiKey,
    /// 配置值非法
    #[error("配置项 {field} 非法: {reason}")]
    InvalidValue { field: String, reason: String },
}

// ========== 便捷构造函数 ==========

impl GuardError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GuardError::Io {
            path: path.into(),
            source,
        }
    }
}

impl FileError {
    /// 根据 io 错误种类区分"不存在"和其他读取失败
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            FileError::NotFound { path }
        } else {
            FileError::ReadFailed { path, source }
        }
    }
}

impl AppError {
    /// 是否因文档已在处理中而被拒绝
    pub fn is_already_processing(&self) -> bool {
        matches!(self, AppError::Guard(GuardError::AlreadyProcessing { .. }))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_classification() {
        let err = LlmError::from_api_message("m", "Rate limit reached for requests");
        assert_eq!(err.kind(), LlmErrorKind::RateLimited);

        let err = LlmError::from_api_message("m", "status 429 Too Many Requests");
        assert_eq!(err.kind(), LlmErrorKind::RateLimited);

        let err = LlmError::from_api_message("m", "connection refused");
        assert_eq!(err.kind(), LlmErrorKind::Transport);
    }

    #[test]
    fn test_file_error_from_io() {
        let err = FileError::from_io(
            "a.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, FileError::NotFound { .. }));

        let err = FileError::from_io(
            "a.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, FileError::ReadFailed { .. }));
    }

    #[test]
    fn test_already_processing_detection() {
        let err: AppError = GuardError::AlreadyProcessing {
            identity: "doc1.pdf".to_string(),
        }
        .into();
        assert!(err.is_already_processing());
        assert!(err.to_string().contains("doc1.pdf"));
    }
}
