use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{MigrateError, Result};

pub const PROJECTS: &str = "gitlab-projects.json";
pub const USERS: &str = "gitlab-users.json";
pub const SOURCE_ISSUES: &str = "jira-issues.json";
pub const INTERIM_ISSUES: &str = "interim-issues.json";
pub const ISSUE_METADATA: &str = "att-comm.json";
pub const POSTED_ISSUES: &str = "gitlab-issues.json";
pub const POSTED_NOTES: &str = "gitlab-notes.json";
pub const POSTED_ISSUES_ERROR: &str = "gitlab-issues-error.json";

/// The payload directory: pretty-printed JSON snapshots of every stage of a
/// run, plus the downloaded attachment binaries.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| MigrateError::Snapshot {
                path: self.dir.clone(),
                source: e,
            })
    }

    /// Overwrite `name` with the pretty-printed JSON of `value`.
    pub async fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.path(name);
        let contents = serde_json::to_string_pretty(value)?;

        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| MigrateError::Snapshot {
                path: path.clone(),
                source: e,
            })?;

        tracing::debug!(path = %path.display(), "wrote snapshot");
        Ok(path)
    }
}
