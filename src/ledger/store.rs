use std::collections::HashMap;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::error::{LedgerError, Result};
use super::record::TaskRecord;

/// In-memory task store: the single source of truth for task state.
///
/// Not synchronised on its own; the scheduler owns it behind its state lock.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: HashMap<String, TaskRecord>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh `queued` record and return its id
    pub fn create(&mut self, url: impl Into<String>, quality: u32) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        if self.tasks.contains_key(&id) {
            return Err(LedgerError::IdCollision(id));
        }

        let record = TaskRecord::new(id.clone(), url.into(), quality, Utc::now());
        self.tasks.insert(id.clone(), record);
        debug!(task_id = %id, "Task created");
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Option<&TaskRecord> {
        self.tasks.get(id)
    }

    /// Apply an in-place mutation to one record
    pub fn update<F, R>(&mut self, id: &str, mutate: F) -> Result<R>
    where
        F: FnOnce(&mut TaskRecord) -> R,
    {
        self.tasks
            .get_mut(id)
            .map(mutate)
            .ok_or_else(|| LedgerError::TaskNotFound(id.to_string()))
    }

    pub fn delete(&mut self, id: &str) -> Result<TaskRecord> {
        let record = self
            .tasks
            .remove(id)
            .ok_or_else(|| LedgerError::TaskNotFound(id.to_string()))?;
        debug!(task_id = %id, "Task deleted");
        Ok(record)
    }

    /// Snapshot of every record
    pub fn list(&self) -> Vec<TaskRecord> {
        self.tasks.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TaskStatus;

    #[test]
    fn test_create_and_get() {
        let mut store = TaskStore::new();
        let id = store.create("https://youtu.be/x", 1080).unwrap();

        let record = store.get(&id).unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.url, "https://youtu.be/x");
        assert_eq!(record.quality_requested, 1080);
        assert_eq!(record.status, TaskStatus::Queued);
        assert_eq!(record.progress, 0);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut store = TaskStore::new();
        let a = store.create("https://youtu.be/a", 720).unwrap();
        let b = store.create("https://youtu.be/b", 720).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_update() {
        let mut store = TaskStore::new();
        let id = store.create("https://youtu.be/x", 720).unwrap();

        let started = store.update(&id, |record| record.start()).unwrap();
        assert!(started);
        assert_eq!(store.get(&id).unwrap().status, TaskStatus::Processing);
    }

    #[test]
    fn test_update_missing() {
        let mut store = TaskStore::new();
        let result = store.update("missing", |record| record.start());
        assert!(matches!(result, Err(LedgerError::TaskNotFound(_))));
    }

    #[test]
    fn test_delete_is_permanent() {
        let mut store = TaskStore::new();
        let id = store.create("https://youtu.be/x", 720).unwrap();

        store.delete(&id).unwrap();
        assert!(store.get(&id).is_none());
        assert!(store.is_empty());
        assert!(matches!(store.delete(&id), Err(LedgerError::TaskNotFound(_))));
    }

    #[test]
    fn test_list_snapshot() {
        let mut store = TaskStore::new();
        store.create("https://youtu.be/a", 720).unwrap();
        store.create("https://youtu.be/b", 720).unwrap();

        let snapshot = store.list();
        assert_eq!(snapshot.len(), 2);
    }
}
