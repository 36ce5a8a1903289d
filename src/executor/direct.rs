use async_trait::async_trait;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Access denied, file in use, or a similar lock.
    PermissionOrLock,
    Other,
}

/// Why an in-process delete did not go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectRemovalError {
    pub kind: FailureKind,
    pub reason: String,
}

impl DirectRemovalError {
    pub fn permission(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::PermissionOrLock,
            reason: reason.into(),
        }
    }

    pub fn other(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Other,
            reason: reason.into(),
        }
    }
}

impl From<io::Error> for DirectRemovalError {
    fn from(e: io::Error) -> Self {
        let kind = if is_permission_or_lock(&e) {
            FailureKind::PermissionOrLock
        } else {
            FailureKind::Other
        };
        Self {
            kind,
            reason: e.to_string(),
        }
    }
}

impl fmt::Display for DirectRemovalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::PermissionOrLock => write!(f, "permission or lock: {}", self.reason),
            FailureKind::Other => write!(f, "{}", self.reason),
        }
    }
}

fn is_permission_or_lock(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::PermissionDenied {
        return true;
    }
    // ERROR_ACCESS_DENIED, ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
    #[cfg(windows)]
    let lock_codes: &[i32] = &[5, 32, 33];
    // EPERM, EBUSY, ETXTBSY
    #[cfg(not(windows))]
    let lock_codes: &[i32] = &[1, 16, 26];

    e.raw_os_error()
        .map(|code| lock_codes.contains(&code))
        .unwrap_or(false)
}

/// Native delete attempted before any escalation. Never retries.
#[async_trait]
pub trait DirectRemoval: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    async fn remove(&self, path: &Path) -> Result<(), DirectRemovalError>;

    /// Regular files under `path`, for the operator log only.
    async fn count_files(&self, path: &Path) -> Option<usize>;
}

/// Deletes through the local filesystem.
pub struct FsRemoval;

impl FsRemoval {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FsRemoval {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectRemoval for FsRemoval {
    async fn exists(&self, path: &Path) -> bool {
        // a dangling symlink still counts as something to remove
        tokio::fs::symlink_metadata(path).await.is_ok()
    }

    async fn remove(&self, path: &Path) -> Result<(), DirectRemovalError> {
        tokio::fs::remove_dir_all(path).await.map_err(|e| {
            let err = DirectRemovalError::from(e);
            tracing::debug!(path = %path.display(), kind = ?err.kind, "direct removal failed");
            err
        })
    }

    async fn count_files(&self, path: &Path) -> Option<usize> {
        let root: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            WalkDir::new(root)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .count()
        })
        .await
        .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_permission_denied_is_classified() {
        let err = DirectRemovalError::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.kind, FailureKind::PermissionOrLock);
    }

    #[test]
    fn test_not_found_is_other() {
        let err = DirectRemovalError::from(io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.kind, FailureKind::Other);
    }

    #[tokio::test]
    async fn test_removes_tree() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("victim");
        std::fs::create_dir_all(target.join("nested")).unwrap();
        std::fs::write(target.join("nested/file.txt"), "data").unwrap();

        let fs = FsRemoval::new();
        assert!(fs.exists(&target).await);
        assert_eq!(fs.count_files(&target).await, Some(1));

        fs.remove(&target).await.unwrap();
        assert!(!fs.exists(&target).await);
    }

    #[tokio::test]
    async fn test_missing_path() {
        let temp = tempdir().unwrap();
        let fs = FsRemoval::new();
        let missing = temp.path().join("nope");

        assert!(!fs.exists(&missing).await);
        assert!(fs.remove(&missing).await.is_err());
    }
}
