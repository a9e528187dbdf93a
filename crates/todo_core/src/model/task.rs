use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

/// A single to-do item.
///
/// Fields the service does not know about are kept in `extra` and written
/// back untouched, so documents created by other tools survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    /// Builds a fresh, pending task stamped with the current time.
    pub fn new(text: &str) -> Result<Self, AppError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("text is required"));
        }

        Ok(Self {
            id: Uuid::new_v4().simple().to_string(),
            text: trimmed.to_string(),
            completed: false,
            created_at: OffsetDateTime::now_utc(),
            extra: Map::new(),
        })
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn toggle(&mut self) {
        self.completed = !self.completed;
    }

    /// Case-insensitive substring match. Only the empty query matches
    /// everything; whitespace is part of the query.
    pub fn matches_search(&self, query: &str) -> bool {
        query.is_empty() || self.text.to_lowercase().contains(&query.to_lowercase())
    }
}
