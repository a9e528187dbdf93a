use crate::error::ApiErrorResponse;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use todo_core::error::AppError;
use todo_core::model::Task;
use todo_core::storage::TaskStore;
use todo_core::task_api;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// Store calls block on the mutex and possibly on disk.
async fn with_store<T, F>(state: &AppState, operation: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&dyn TaskStore) -> Result<T, AppError> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || operation(store.as_ref()))
        .await
        .map_err(|err| AppError::storage(format!("store task failed: {err}")))?
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiErrorResponse> {
    let tasks = with_store(&state, task_api::list_tasks)
        .await
        .map_err(|err| ApiErrorResponse::from_app_error(err, "failed to load tasks"))?;
    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiErrorResponse> {
    let Json(request) = payload?;
    tracing::debug!(text = ?request.text, "create task request");

    let task = with_store(&state, move |store| {
        task_api::create_task(store, request.text.as_deref())
    })
    .await
    .map_err(|err| ApiErrorResponse::from_app_error(err, "failed to create task"))?;

    tracing::info!(id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn toggle_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiErrorResponse> {
    let task = with_store(&state, move |store| task_api::toggle_task(store, &id))
        .await
        .map_err(|err| ApiErrorResponse::from_app_error(err, "failed to update task"))?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiErrorResponse> {
    let removed = with_store(&state, move |store| task_api::delete_task(store, &id))
        .await
        .map_err(|err| ApiErrorResponse::from_app_error(err, "failed to delete task"))?;

    let message = if removed {
        "task deleted"
    } else {
        "task already absent"
    };
    Ok(Json(MessageResponse {
        message: message.to_string(),
    }))
}
