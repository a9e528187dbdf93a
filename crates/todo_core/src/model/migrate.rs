//! Normalization of task documents written by older versions of the app.
//!
//! Older documents may use `_id`, `title`, `done`, `status` or `created_at`
//! instead of the current field names. Every document read from disk or
//! from the wire goes through [`normalize_document`], which resolves the
//! aliases once and drops them, so the rest of the code only sees
//! [`Task`].

use crate::error::AppError;
use crate::model::Task;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const COMPLETED_STATUSES: [&str; 2] = ["done", "completed"];
const DROPPED_FIELDS: [&str; 1] = ["__v"];

/// Returns true when any completion-representing field marks the document
/// as done.
pub fn is_completed_document(fields: &Map<String, Value>) -> bool {
    let flag = |key: &str| fields.get(key).and_then(Value::as_bool) == Some(true);
    let status = fields
        .get("status")
        .and_then(Value::as_str)
        .map(|status| COMPLETED_STATUSES.contains(&status.trim().to_ascii_lowercase().as_str()))
        .unwrap_or(false);

    flag("completed") || flag("done") || status
}

pub fn normalize_document(value: Value) -> Result<Task, AppError> {
    let Value::Object(mut fields) = value else {
        return Err(AppError::invalid_data("task document must be a JSON object"));
    };

    check_flag_type(&fields, "completed")?;
    check_flag_type(&fields, "done")?;
    let completed = is_completed_document(&fields);

    let id = take_identifier(&mut fields, "id");
    let legacy_id = take_identifier(&mut fields, "_id");
    let id = first_non_blank(id, legacy_id)
        .ok_or_else(|| AppError::invalid_data("task document has no id"))?;

    let text = take_string(&mut fields, "text");
    let title = take_string(&mut fields, "title");
    let text = first_non_blank(text, title)
        .ok_or_else(|| AppError::invalid_data(format!("task {id} has no text")))?;

    let created_at = take_timestamp(&mut fields, "createdAt")?;
    let legacy_created_at = take_timestamp(&mut fields, "created_at")?;
    let created_at = created_at
        .or(legacy_created_at)
        .ok_or_else(|| AppError::invalid_data(format!("task {id} has no createdAt")))?;

    for key in ["completed", "done", "status"]
        .into_iter()
        .chain(DROPPED_FIELDS)
    {
        fields.remove(key);
    }

    Ok(Task {
        id,
        text,
        completed,
        created_at,
        extra: fields,
    })
}

pub fn normalize_documents(values: Vec<Value>) -> Result<Vec<Task>, AppError> {
    values.into_iter().map(normalize_document).collect()
}

fn check_flag_type(fields: &Map<String, Value>, key: &str) -> Result<(), AppError> {
    match fields.get(key) {
        None | Some(Value::Null) | Some(Value::Bool(_)) => Ok(()),
        Some(other) => Err(AppError::invalid_data(format!(
            "{key} must be a boolean, got {other}"
        ))),
    }
}

fn first_non_blank(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary
        .filter(|value| !value.trim().is_empty())
        .or_else(|| fallback.filter(|value| !value.trim().is_empty()))
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key)? {
        Value::String(value) => Some(value),
        _ => None,
    }
}

// Accepts plain strings, numbers and extended JSON (`{"$oid": "..."}`).
fn take_identifier(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key)? {
        Value::String(value) => Some(value),
        Value::Number(value) => Some(value.to_string()),
        Value::Object(mut wrapper) => match wrapper.remove("$oid") {
            Some(Value::String(value)) => Some(value),
            _ => None,
        },
        _ => None,
    }
}

fn take_timestamp(
    fields: &mut Map<String, Value>,
    key: &str,
) -> Result<Option<OffsetDateTime>, AppError> {
    let raw = match fields.remove(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(value)) => value,
        Some(Value::Object(mut wrapper)) => match wrapper.remove("$date") {
            Some(Value::String(value)) => value,
            _ => return Err(AppError::invalid_data(format!("{key} must be RFC3339"))),
        },
        Some(_) => return Err(AppError::invalid_data(format!("{key} must be RFC3339"))),
    };

    OffsetDateTime::parse(raw.trim(), &Rfc3339)
        .map(Some)
        .map_err(|_| AppError::invalid_data(format!("{key} must be RFC3339")))
}

#[cfg(test)]
mod tests {
    use super::{is_completed_document, normalize_document};
    use serde_json::{Value, json};

    fn fields(value: Value) -> serde_json::Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn status_done_counts_as_completed() {
        let legacy = fields(json!({ "status": "done" }));
        let current = fields(json!({ "completed": true }));

        assert!(is_completed_document(&legacy));
        assert_eq!(
            is_completed_document(&legacy),
            is_completed_document(&current)
        );
    }

    #[test]
    fn completion_predicate_covers_every_alias() {
        assert!(is_completed_document(&fields(json!({ "done": true }))));
        assert!(is_completed_document(&fields(json!({ "status": "completed" }))));
        assert!(is_completed_document(&fields(json!({ "status": " Done " }))));
        assert!(!is_completed_document(&fields(json!({ "status": "pending" }))));
        assert!(!is_completed_document(&fields(json!({ "completed": false }))));
        assert!(!is_completed_document(&fields(json!({}))));
    }

    #[test]
    fn normalizes_legacy_mongo_document() {
        let task = normalize_document(json!({
            "_id": { "$oid": "65a1b2c3d4e5f60718293a4b" },
            "title": "Buy milk",
            "status": "done",
            "done": false,
            "createdAt": { "$date": "2025-12-20T00:00:00Z" },
            "__v": 0,
            "priority": "high"
        }))
        .unwrap();

        assert_eq!(task.id, "65a1b2c3d4e5f60718293a4b");
        assert_eq!(task.text, "Buy milk");
        assert!(task.completed);
        assert_eq!(task.extra.len(), 1);
        assert_eq!(task.extra["priority"], "high");
    }

    #[test]
    fn text_wins_over_title_unless_blank() {
        let task = normalize_document(json!({
            "id": "task-1",
            "text": "current",
            "title": "legacy",
            "createdAt": "2025-12-20T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(task.text, "current");

        let task = normalize_document(json!({
            "id": "task-1",
            "text": "  ",
            "title": "legacy",
            "created_at": "2025-12-20T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(task.text, "legacy");
        assert!(task.extra.get("title").is_none());
        assert!(task.extra.get("created_at").is_none());
    }

    #[test]
    fn current_document_is_unchanged() {
        let original = crate::model::Task::new("demo").unwrap();
        let value = serde_json::to_value(&original).unwrap();

        let normalized = normalize_document(value).unwrap();

        assert_eq!(normalized, original);
    }

    #[test]
    fn rejects_document_without_id() {
        let err = normalize_document(json!({
            "text": "demo",
            "createdAt": "2025-12-20T00:00:00Z"
        }))
        .unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn rejects_document_without_created_at() {
        let err = normalize_document(json!({ "id": "task-1", "text": "demo" })).unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn rejects_non_boolean_completed_field() {
        let err = normalize_document(json!({
            "id": "task-1",
            "text": "demo",
            "completed": "yes",
            "createdAt": "2025-12-20T00:00:00Z"
        }))
        .unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn rejects_non_object_document() {
        let err = normalize_document(json!(["task"])).unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }
}
