use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parley_types::{Message, Task, TaskAndHistory};
use serde::{Deserialize, Serialize};

use crate::{KeyedLocks, Result, StoreError, TaskStore, validate_task_id};

/// Directory used when none is configured.
pub const DEFAULT_STORE_DIR: &str = ".a2a-tasks";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryRecord {
    message_history: Vec<Message>,
}

/// File-backed store.
///
/// Layout: `{dir}/{task_id}.json` holds the task and
/// `{dir}/{task_id}.history.json` holds `{"messageHistory": [...]}`.
pub struct FileTaskStore {
    dir: PathBuf,
    locks: KeyedLocks,
}

impl FileTaskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: KeyedLocks::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a task record. The id must already be validated.
    pub fn task_path(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("{task_id}.json"))
    }

    /// Path of a history record. The id must already be validated.
    pub fn history_path(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("{task_id}.history.json"))
    }

    async fn read_history(&self, task_id: &str) -> Vec<Message> {
        let path = self.history_path(task_id);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::error!(task_id, path = %path.display(), error = %e, "Failed to read task history");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<HistoryRecord>(&raw) {
            Ok(record) => record.message_history,
            Err(e) => {
                tracing::warn!(task_id, path = %path.display(), error = %e, "Malformed task history, starting empty");
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for FileTaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTaskStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl Default for FileTaskStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_DIR)
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn load(&self, task_id: &str) -> Result<Option<TaskAndHistory>> {
        validate_task_id(task_id)?;
        let _guard = self.locks.lock(task_id).await;

        let path = self.task_path(task_id);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let task: Task = serde_json::from_slice(&raw)
            .map_err(|source| StoreError::Serialization { path, source })?;

        let history = self.read_history(task_id).await;
        Ok(Some(TaskAndHistory::new(task, history)))
    }

    async fn save(&self, data: &TaskAndHistory) -> Result<()> {
        let task_id = data.task.id.as_str();
        validate_task_id(task_id)?;
        let _guard = self.locks.lock(task_id).await;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let task_path = self.task_path(task_id);
        let task_json = serde_json::to_vec_pretty(&data.task).map_err(|source| {
            StoreError::Serialization {
                path: task_path.clone(),
                source,
            }
        })?;
        write_atomic(&task_path, &task_json).await?;

        let history_path = self.history_path(task_id);
        let record = HistoryRecord {
            message_history: data.history.clone(),
        };
        let history_json = serde_json::to_vec_pretty(&record).map_err(|source| {
            StoreError::Serialization {
                path: history_path.clone(),
                source,
            }
        })?;
        write_atomic(&history_path, &history_json).await?;

        tracing::debug!(task_id, state = %data.task.status.state, "Saved task");
        Ok(())
    }
}

/// Write to a sibling temp file, then rename over the target.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
}
