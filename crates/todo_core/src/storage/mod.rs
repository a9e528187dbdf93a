//! Task persistence.
//!
//! Stores are explicit handles: they are opened (or constructed), passed to
//! whoever needs them and closed once. A closed store rejects every call.

pub mod json_store;
pub mod memory_store;

use crate::error::AppError;
use crate::model::Task;
use std::path::PathBuf;
use std::sync::Arc;

pub use json_store::JsonFileStore;
pub use memory_store::MemoryStore;

const MEMORY_SCHEME: &str = "memory";
const FILE_SCHEME: &str = "file://";

pub trait TaskStore: Send + Sync {
    /// All tasks, newest first.
    fn list_all(&self) -> Result<Vec<Task>, AppError>;

    fn create(&self, text: &str) -> Result<Task, AppError>;

    fn get_by_id(&self, id: &str) -> Result<Option<Task>, AppError>;

    /// Replaces the stored task with the same id.
    fn update(&self, task: &Task) -> Result<Task, AppError>;

    /// Returns whether a task was removed. Unknown ids are not an error.
    fn delete_by_id(&self, id: &str) -> Result<bool, AppError>;

    fn close(&self) -> Result<(), AppError>;
}

/// Opens the store named by a database url.
///
/// `memory://` selects the in-process store, `file://<path>` or a bare path
/// selects the JSON document file.
pub fn open_store(database_url: &str) -> Result<Arc<dyn TaskStore>, AppError> {
    let trimmed = database_url.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("database url is required"));
    }

    if trimmed == MEMORY_SCHEME || trimmed == "memory://" {
        tracing::info!("using in-memory task store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    if let Some(path) = trimmed.strip_prefix(FILE_SCHEME) {
        return Ok(Arc::new(JsonFileStore::open(PathBuf::from(path))?));
    }

    if trimmed.contains("://") {
        return Err(AppError::invalid_input(format!(
            "unsupported database url: {trimmed}"
        )));
    }

    Ok(Arc::new(JsonFileStore::open(PathBuf::from(trimmed))?))
}

/// Tasks in insertion order, shared by the store implementations.
#[derive(Debug, Clone, Default)]
pub(crate) struct TaskTable {
    tasks: Vec<Task>,
}

impl TaskTable {
    pub(crate) fn from_tasks(tasks: Vec<Task>) -> Result<Self, AppError> {
        for (index, task) in tasks.iter().enumerate() {
            if tasks[..index].iter().any(|other| other.id == task.id) {
                return Err(AppError::invalid_data(format!(
                    "duplicate task id {}",
                    task.id
                )));
            }
        }
        Ok(Self { tasks })
    }

    pub(crate) fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    // Stable sort over reversed insertion order keeps ties newest-first.
    pub(crate) fn sorted(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.iter().rev().cloned().collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    pub(crate) fn insert(&mut self, task: Task) -> Result<(), AppError> {
        if self.tasks.iter().any(|existing| existing.id == task.id) {
            return Err(AppError::storage(format!("duplicate task id {}", task.id)));
        }
        self.tasks.push(task);
        Ok(())
    }

    pub(crate) fn get(&self, id: &str) -> Option<Task> {
        self.tasks.iter().find(|task| task.id == id).cloned()
    }

    pub(crate) fn update(&mut self, task: &Task) -> Result<Task, AppError> {
        let stored = self
            .tasks
            .iter_mut()
            .find(|existing| existing.id == task.id)
            .ok_or_else(|| AppError::not_found(format!("task {} not found", task.id)))?;
        *stored = task.clone();
        Ok(stored.clone())
    }

    pub(crate) fn remove(&mut self, id: &str) -> bool {
        match self.tasks.iter().position(|task| task.id == id) {
            Some(index) => {
                self.tasks.remove(index);
                true
            }
            None => false,
        }
    }
}

pub(crate) fn closed_error() -> AppError {
    AppError::storage("store is closed")
}

pub(crate) fn poisoned_error() -> AppError {
    AppError::storage("store lock poisoned")
}

#[cfg(test)]
mod tests {
    use super::{TaskTable, open_store};
    use crate::model::Task;
    use time::Duration;

    fn task_at(text: &str, offset_secs: i64) -> Task {
        let mut task = Task::new(text).unwrap();
        task.created_at += Duration::seconds(offset_secs);
        task
    }

    #[test]
    fn sorted_is_newest_first_regardless_of_insertion_order() {
        let mut table = TaskTable::default();
        table.insert(task_at("middle", 10)).unwrap();
        table.insert(task_at("oldest", 0)).unwrap();
        table.insert(task_at("newest", 20)).unwrap();

        let texts: Vec<String> = table.sorted().into_iter().map(|task| task.text).collect();
        assert_eq!(texts, vec!["newest", "middle", "oldest"]);
    }

    #[test]
    fn sorted_breaks_ties_by_latest_insertion() {
        let first = Task::new("first").unwrap();
        let mut second = Task::new("second").unwrap();
        second.created_at = first.created_at;

        let table = TaskTable::from_tasks(vec![first, second]).unwrap();
        let texts: Vec<String> = table.sorted().into_iter().map(|task| task.text).collect();
        assert_eq!(texts, vec!["second", "first"]);
    }

    #[test]
    fn from_tasks_rejects_duplicate_ids() {
        let task = Task::new("demo").unwrap();
        let err = TaskTable::from_tasks(vec![task.clone(), task]).unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn update_reports_missing_task() {
        let mut table = TaskTable::default();
        let err = table.update(&Task::new("ghost").unwrap()).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn open_store_selects_memory_backend() {
        let store = open_store("memory://").unwrap();
        store.create("demo").unwrap();
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn open_store_selects_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let url = format!("file://{}", path.display());

        let store = open_store(&url).unwrap();
        store.create("demo").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn open_store_rejects_unknown_scheme() {
        let err = open_store("mongodb://localhost:27017/todo").err().unwrap();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn open_store_rejects_blank_url() {
        let err = open_store("  ").err().unwrap();
        assert_eq!(err.code(), "invalid_input");
    }
}
