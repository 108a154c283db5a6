use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use parley_types::TaskAndHistory;

use crate::{Result, TaskStore};

/// Process-lifetime store keyed by task id.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, TaskAndHistory>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks.
    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn load(&self, task_id: &str) -> Result<Option<TaskAndHistory>> {
        Ok(self.tasks.read().get(task_id).cloned())
    }

    async fn save(&self, data: &TaskAndHistory) -> Result<()> {
        self.tasks
            .write()
            .insert(data.task.id.clone(), data.clone());
        Ok(())
    }
}
