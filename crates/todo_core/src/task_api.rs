use crate::error::AppError;
use crate::model::Task;
use crate::storage::TaskStore;

pub fn list_tasks(store: &dyn TaskStore) -> Result<Vec<Task>, AppError> {
    store.list_all()
}

pub fn create_task(store: &dyn TaskStore, text: Option<&str>) -> Result<Task, AppError> {
    let text = match text {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Err(AppError::invalid_input("text is required")),
    };

    let task = store.create(text)?;
    tracing::debug!(id = %task.id, "created task");
    Ok(task)
}

/// Flips completion of the task and persists it.
pub fn toggle_task(store: &dyn TaskStore, id: &str) -> Result<Task, AppError> {
    let trimmed_id = require_id(id)?;

    let mut task = store
        .get_by_id(trimmed_id)?
        .ok_or_else(|| AppError::not_found("task not found"))?;
    task.toggle();
    let updated = store.update(&task)?;

    tracing::debug!(id = %updated.id, completed = updated.completed, "toggled task");
    Ok(updated)
}

/// Deleting an unknown id succeeds and reports `false`.
pub fn delete_task(store: &dyn TaskStore, id: &str) -> Result<bool, AppError> {
    let trimmed_id = require_id(id)?;
    let removed = store.delete_by_id(trimmed_id)?;
    tracing::debug!(id = trimmed_id, removed, "deleted task");
    Ok(removed)
}

fn require_id(id: &str) -> Result<&str, AppError> {
    let trimmed_id = id.trim();
    if trimmed_id.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }
    Ok(trimmed_id)
}
