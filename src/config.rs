use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 同时在途的 LLM 请求数量上限
    pub max_concurrent_requests: usize,
    /// 单次调用的最大尝试次数
    pub max_attempts: u32,
    /// 两次尝试之间的固定等待（毫秒）
    pub retry_delay_ms: u64,
    // --- 互斥守卫配置 ---
    /// 记录"正在处理"文档的文件
    pub guard_file: PathBuf,
    /// 锁文件轮询间隔（毫秒）
    pub lock_poll_interval_ms: u64,
    /// 等待锁的最长时间（秒），0 表示一直等待
    pub lock_timeout_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4.1-mini".to_string(),
            max_concurrent_requests: 5,
            max_attempts: 5,
            retry_delay_ms: 1000,
            guard_file: PathBuf::from("processing.list"),
            lock_poll_interval_ms: 100,
            lock_timeout_secs: 60,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 按 默认值 < TOML 文件 < 环境变量 的顺序加载配置
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match config_path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 只使用默认值和环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn with_env_overrides(self) -> Result<Self, ConfigError> {
        Ok(Self {
            llm_api_key: env_string("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: env_string("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: env_string("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            max_concurrent_requests: env_parse(
                "MAX_CONCURRENT_REQUESTS",
                self.max_concurrent_requests,
            )?,
            max_attempts: env_parse("MAX_ATTEMPTS", self.max_attempts)?,
            retry_delay_ms: env_parse("RETRY_DELAY_MS", self.retry_delay_ms)?,
            guard_file: env_string("GUARD_FILE")
                .map(PathBuf::from)
                .unwrap_or(self.guard_file),
            lock_poll_interval_ms: env_parse("LOCK_POLL_INTERVAL_MS", self.lock_poll_interval_ms)?,
            lock_timeout_secs: env_parse("LOCK_TIMEOUT_SECS", self.lock_timeout_secs)?,
            verbose_logging: env_parse("VERBOSE_LOGGING", self.verbose_logging)?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrent_requests".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_attempts".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if self.lock_poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "lock_poll_interval_ms".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn lock_poll_interval(&self) -> Duration {
        Duration::from_millis(self.lock_poll_interval_ms)
    }

    /// `None` 表示无限等待
    pub fn lock_timeout(&self) -> Option<Duration> {
        (self.lock_timeout_secs > 0).then(|| Duration::from_secs(self.lock_timeout_secs))
    }
}

fn env_string(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok()
}

fn env_parse<T: FromStr>(var_name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }),
        Err(_) => Ok(default),
    }
}
