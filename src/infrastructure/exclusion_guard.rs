//! 跨进程的"正在处理"登记表
//!
//! 登记表是一个每行一个标识的文本文件，旁边的 `<登记表>.lock` 锁文件保护所有读写，
//! 因此"检查后追加"和"扫描后重写"对使用同一登记表的其他进程是原子的。
//! 重复行可以容忍，比较时去除首尾空白。

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::GuardError;
use crate::infrastructure::file_lock::FileLock;

pub struct ExclusionGuard {
    store: PathBuf,
    lock: FileLock,
}

impl ExclusionGuard {
    /// 打开登记表，不存在时创建空文件
    ///
    /// 相对路径在打开时按当前目录解析为绝对路径，之后不再随工作目录变化
    pub async fn open(
        store: impl Into<PathBuf>,
        poll_interval: Duration,
        lock_timeout: Option<Duration>,
    ) -> Result<Self, GuardError> {
        let store = store.into();
        let store = if store.is_absolute() {
            store
        } else {
            let cwd = std::env::current_dir().map_err(|e| GuardError::io(&store, e))?;
            resolve_store_path(&store, &cwd)
        };

        if let Some(parent) = store.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GuardError::io(parent, e))?;
        }
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&store)
            .await
            .map_err(|e| GuardError::io(&store, e))?;

        let lock = FileLock::new(lock_path_for(&store), poll_interval, lock_timeout);
        Ok(Self { store, lock })
    }

    /// 相对的 `guard_file` 放在可执行文件所在目录，
    /// 从不同目录启动的进程因此共用同一张登记表
    pub async fn from_config(config: &Config) -> Result<Self, GuardError> {
        let store = match program_dir() {
            Some(dir) => resolve_store_path(&config.guard_file, &dir),
            None => config.guard_file.clone(),
        };
        Self::open(
            store,
            config.lock_poll_interval(),
            config.lock_timeout(),
        )
        .await
    }

    pub fn store_path(&self) -> &Path {
        &self.store
    }

    pub fn lock_path(&self) -> &Path {
        self.lock.path()
    }

    /// 登记标识；已登记时返回 `AlreadyProcessing`，登记表保持不变
    pub async fn try_acquire(&self, identity: &str) -> Result<(), GuardError> {
        let identity = normalize(identity)?;

        self.with_lock(|| async move {
            let content = self.read_store().await?;
            if contains_identity(&content, identity) {
                return Err(GuardError::AlreadyProcessing {
                    identity: identity.to_string(),
                });
            }

            let mut line = String::new();
            if !content.is_empty() && !content.ends_with('\n') {
                line.push('\n');
            }
            line.push_str(identity);
            line.push('\n');

            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.store)
                .await
                .map_err(|e| GuardError::io(&self.store, e))?;
            file.write_all(line.as_bytes())
                .await
                .map_err(|e| GuardError::io(&self.store, e))?;
            file.flush()
                .await
                .map_err(|e| GuardError::io(&self.store, e))?;

            info!("📝 已登记: {}", identity);
            Ok(())
        })
        .await
    }

    /// 移除标识的全部登记行，未登记时什么也不做
    pub async fn release(&self, identity: &str) -> Result<(), GuardError> {
        let identity = normalize(identity)?;

        self.with_lock(|| async move {
            let content = self.read_store().await?;
            let kept: String = content
                .lines()
                .filter(|line| line.trim() != identity)
                .map(|line| format!("{}\n", line))
                .collect();

            // 先写临时文件再替换，崩溃时不会留下半截登记表
            let tmp = sibling_path(&self.store, ".tmp");
            tokio::fs::write(&tmp, kept.as_bytes())
                .await
                .map_err(|e| GuardError::io(&tmp, e))?;
            tokio::fs::rename(&tmp, &self.store)
                .await
                .map_err(|e| GuardError::io(&self.store, e))?;

            info!("🧹 已移除登记: {}", identity);
            Ok(())
        })
        .await
    }

    pub async fn contains(&self, identity: &str) -> Result<bool, GuardError> {
        let identity = normalize(identity)?;
        self.with_lock(|| async move {
            let content = self.read_store().await?;
            Ok(contains_identity(&content, identity))
        })
        .await
    }

    /// 持锁执行，无论成功失败都会释放锁
    async fn with_lock<T, F, Fut>(&self, op: F) -> Result<T, GuardError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GuardError>>,
    {
        let marker = self.lock.acquire().await?;
        let result = op().await;
        let unlocked = marker.release().await;

        match (result, unlocked) {
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e),
            (Ok(value), Ok(())) => Ok(value),
        }
    }

    async fn read_store(&self) -> Result<String, GuardError> {
        match tokio::fs::read_to_string(&self.store).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("登记表 {} 不存在，视为空", self.store.display());
                Ok(String::new())
            }
            Err(e) => Err(GuardError::io(&self.store, e)),
        }
    }
}

fn lock_path_for(store: &Path) -> PathBuf {
    sibling_path(store, ".lock")
}

/// 在完整文件名后追加后缀，不替换原有扩展名
fn sibling_path(store: &Path, suffix: &str) -> PathBuf {
    let mut name = store.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// 相对路径拼接到 `base` 下，绝对路径原样返回
pub fn resolve_store_path(store: &Path, base: &Path) -> PathBuf {
    if store.is_absolute() {
        store.to_path_buf()
    } else {
        base.join(store)
    }
}

fn program_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let exe = exe.canonicalize().unwrap_or(exe);
    exe.parent().map(Path::to_path_buf)
}

fn normalize(identity: &str) -> Result<&str, GuardError> {
    let trimmed = identity.trim();
    if trimmed.is_empty() || trimmed.contains(['\n', '\r']) {
        return Err(GuardError::InvalidIdentity {
            identity: identity.to_string(),
        });
    }
    Ok(trimmed)
}

fn contains_identity(content: &str, identity: &str) -> bool {
    content.lines().any(|line| line.trim() == identity)
}
