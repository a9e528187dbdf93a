use crate::error::AppError;
use crate::model::Task;
use crate::storage::{TaskStore, TaskTable, closed_error, poisoned_error};
use std::sync::{Mutex, MutexGuard};

/// Process-local store. Contents are lost when the handle is dropped.
#[derive(Debug)]
pub struct MemoryStore {
    table: Mutex<Option<TaskTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Some(TaskTable::default())),
        }
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Result<Self, AppError> {
        Ok(Self {
            table: Mutex::new(Some(TaskTable::from_tasks(tasks)?)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<TaskTable>>, AppError> {
        self.table.lock().map_err(|_| poisoned_error())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore for MemoryStore {
    fn list_all(&self) -> Result<Vec<Task>, AppError> {
        let guard = self.lock()?;
        let table = guard.as_ref().ok_or_else(closed_error)?;
        Ok(table.sorted())
    }

    fn create(&self, text: &str) -> Result<Task, AppError> {
        let task = Task::new(text)?;
        let mut guard = self.lock()?;
        let table = guard.as_mut().ok_or_else(closed_error)?;
        table.insert(task.clone())?;
        Ok(task)
    }

    fn get_by_id(&self, id: &str) -> Result<Option<Task>, AppError> {
        let guard = self.lock()?;
        let table = guard.as_ref().ok_or_else(closed_error)?;
        Ok(table.get(id))
    }

    fn update(&self, task: &Task) -> Result<Task, AppError> {
        let mut guard = self.lock()?;
        let table = guard.as_mut().ok_or_else(closed_error)?;
        table.update(task)
    }

    fn delete_by_id(&self, id: &str) -> Result<bool, AppError> {
        let mut guard = self.lock()?;
        let table = guard.as_mut().ok_or_else(closed_error)?;
        Ok(table.remove(id))
    }

    fn close(&self) -> Result<(), AppError> {
        let mut guard = self.lock()?;
        guard.take().ok_or_else(closed_error)?;
        tracing::debug!("in-memory task store closed");
        Ok(())
    }
}
