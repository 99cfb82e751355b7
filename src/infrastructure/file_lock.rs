//! 基于原子建文件的跨进程锁
//!
//! 锁文件存在即表示已被占用，内容只用于排查持有者。
//! 冲突时按固定间隔轮询，直到锁文件消失后再次尝试创建，不保证公平。

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::GuardError;

/// 锁文件
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl FileLock {
    /// `timeout` 为 `None` 时无限等待
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration, timeout: Option<Duration>) -> Self {
        Self {
            path: path.into(),
            poll_interval,
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 获取锁，冲突时轮询等待
    pub async fn acquire(&self) -> Result<LockMarker, GuardError> {
        let started = Instant::now();

        loop {
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.path)
                .await
            {
                Ok(mut file) => {
                    // 写入失败不影响锁语义
                    let written = match file.write_all(holder_info().as_bytes()).await {
                        Ok(()) => file.flush().await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = written {
                        debug!("写入锁文件持有者信息失败: {}", e);
                    }
                    debug!("🔒 已获取锁 {}", self.path.display());
                    return Ok(LockMarker {
                        path: self.path.clone(),
                        released: false,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    self.wait_for_release(started).await?;
                }
                Err(e) => return Err(GuardError::io(&self.path, e)),
            }
        }
    }

    async fn wait_for_release(&self, started: Instant) -> Result<(), GuardError> {
        while tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| GuardError::io(&self.path, e))?
        {
            if let Some(timeout) = self.timeout {
                let waited = started.elapsed();
                if waited >= timeout {
                    let holder = tokio::fs::read_to_string(&self.path)
                        .await
                        .ok()
                        .filter(|content| !content.trim().is_empty())
                        .unwrap_or_else(|| "unknown".to_string());
                    return Err(GuardError::LockTimeout {
                        path: self.path.clone(),
                        waited,
                        holder: holder.trim().to_string(),
                    });
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Ok(())
    }
}

/// 已持有的锁
///
/// 优先调用 `release`；被直接丢弃时同步删除锁文件
#[derive(Debug)]
pub struct LockMarker {
    path: PathBuf,
    released: bool,
}

impl LockMarker {
    /// 释放锁，锁文件已不存在视为成功
    pub async fn release(mut self) -> Result<(), GuardError> {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("🔓 已释放锁 {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GuardError::io(&self.path, e)),
        }
    }
}

impl Drop for LockMarker {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("释放锁文件 {} 失败: {}", self.path.display(), e),
        }
    }
}

fn holder_info() -> String {
    format!(
        "pid={} acquired_at={}",
        std::process::id(),
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn lock_in(dir: &tempfile::TempDir, timeout: Option<Duration>) -> FileLock {
        FileLock::new(
            dir.path().join("store.lock"),
            Duration::from_millis(5),
            timeout,
        )
    }

    #[tokio::test]
    async fn test_acquire_creates_and_release_removes_marker() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir, None);

        let marker = lock.acquire().await.unwrap();
        assert!(lock.path().exists());
        let content = std::fs::read_to_string(lock.path()).unwrap();
        assert!(content.contains(&format!("pid={}", std::process::id())));

        marker.release().await.unwrap();
        assert!(!lock.path().exists());
    }

    #[tokio::test]
    async fn test_holder_visible_to_waiter_on_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let holder = lock_in(&dir, None);
        let waiter = lock_in(&dir, Some(Duration::from_millis(20)));

        let marker = holder.acquire().await.unwrap();
        match waiter.acquire().await.unwrap_err() {
            GuardError::LockTimeout { holder, .. } => {
                assert!(holder.starts_with(&format!("pid={} ", std::process::id())))
            }
            other => panic!("unexpected error: {other}"),
        }
        marker.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_release_tolerates_missing_marker() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir, None);

        let marker = lock.acquire().await.unwrap();
        std::fs::remove_file(lock.path()).unwrap();
        assert!(marker.release().await.is_ok());
    }

    #[tokio::test]
    async fn test_drop_removes_marker() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir, None);
        {
            let _marker = lock.acquire().await.unwrap();
            assert!(lock.path().exists());
        }
        assert!(!lock.path().exists());
    }

    #[tokio::test]
    async fn test_times_out_on_stuck_marker() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir, Some(Duration::from_millis(30)));
        std::fs::write(lock.path(), "pid=1 acquired_at=yesterday").unwrap();

        let err = lock.acquire().await.unwrap_err();
        match err {
            GuardError::LockTimeout { holder, .. } => {
                assert_eq!(holder, "pid=1 acquired_at=yesterday")
            }
            other => panic!("unexpected error: {other}"),
        }
        // 超时不会删除他人的锁文件
        assert!(lock.path().exists());
    }

    #[tokio::test]
    async fn test_waits_until_marker_disappears() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir, Some(Duration::from_secs(5)));
        std::fs::write(lock.path(), "").unwrap();

        let path = lock.path().to_path_buf();
        let remover = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            std::fs::remove_file(path).unwrap();
        });

        let marker = lock.acquire().await.unwrap();
        remover.await.unwrap();
        marker.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_mutual_exclusion_between_contenders() {
        let dir = tempfile::tempdir().unwrap();
        let lock = Arc::new(lock_in(&dir, Some(Duration::from_secs(10))));
        let inside = Arc::new(AtomicUsize::new(0));
        let violations = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lock = lock.clone();
            let inside = inside.clone();
            let violations = violations.clone();
            handles.push(tokio::spawn(async move {
                let marker = lock.acquire().await.unwrap();
                if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                    violations.fetch_add(1, Ordering::SeqCst);
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
                marker.release().await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(violations.load(Ordering::SeqCst), 0);
        assert!(!lock.path().exists());
    }
}
