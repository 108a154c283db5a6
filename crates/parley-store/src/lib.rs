//! Task persistence.
//!
//! A [`TaskStore`] loads and saves a [`TaskAndHistory`] as one unit. Two
//! backends ship with the crate:
//!
//! - [`InMemoryTaskStore`], for tests and ephemeral servers
//! - [`FileTaskStore`], which keeps `<id>.json` and `<id>.history.json`
//!   records under a base directory

mod error;
mod file;
mod locks;
mod memory;

pub use error::{Result, StoreError};
pub use file::{DEFAULT_STORE_DIR, FileTaskStore};
pub use locks::{KeyedGuard, KeyedLocks};
pub use memory::InMemoryTaskStore;

use async_trait::async_trait;
use parley_types::TaskAndHistory;

/// Persistence contract for tasks and their history.
///
/// Both operations are atomic per task id. Values are copied in and out, so
/// callers never share state with the store.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Load a task and its history. `Ok(None)` when the task does not exist.
    async fn load(&self, task_id: &str) -> Result<Option<TaskAndHistory>>;

    /// Persist a task and its history, replacing any previous record.
    async fn save(&self, data: &TaskAndHistory) -> Result<()>;
}

/// Reject ids that are unsafe to turn into file names.
///
/// Empty ids, `.`, anything containing `..`, path separators or NUL bytes
/// are refused. So are ids ending in `.history` (any case): the task record
/// of `x.history` would land on the history record of `x`.
pub fn validate_task_id(task_id: &str) -> Result<()> {
    let unsafe_id = task_id.is_empty()
        || task_id == "."
        || task_id.contains("..")
        || task_id.contains(['/', '\\', '\0'])
        || has_history_suffix(task_id);

    if unsafe_id {
        return Err(StoreError::InvalidTaskId(task_id.to_string()));
    }
    Ok(())
}

fn has_history_suffix(task_id: &str) -> bool {
    const SUFFIX: &str = ".history";
    let bytes = task_id.as_bytes();
    bytes.len() >= SUFFIX.len()
        && bytes[bytes.len() - SUFFIX.len()..].eq_ignore_ascii_case(SUFFIX.as_bytes())
}
