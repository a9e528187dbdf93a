use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use todo_core::error::AppError;
use todo_core::model::{Task, normalize_document, normalize_documents};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote task operations, as seen by the board.
pub trait TaskApi {
    fn fetch_tasks(&self) -> Result<Vec<Task>, AppError>;
    fn add_task(&self, text: &str) -> Result<Task, AppError>;
    fn toggle_task(&self, id: &str) -> Result<Task, AppError>;
    fn delete_task(&self, id: &str) -> Result<(), AppError>;
}

/// Blocking client for the task service.
///
/// Every task in a response is passed through the document migration, so
/// servers that still return `_id`, `title` or `status` are understood.
#[derive(Debug, Clone)]
pub struct TaskClient {
    agent: ureq::Agent,
    base_url: String,
}

impl TaskClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("api url is required"));
        }
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(AppError::invalid_input(format!(
                "api url must start with http:// or https://, got '{trimmed}'"
            )));
        }

        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Ok(Self {
            agent,
            base_url: trimmed.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn tasks_url(&self) -> String {
        format!("{}/tasks", self.base_url)
    }

    fn task_url(&self, id: &str) -> Result<String, AppError> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("id is required"));
        }
        if trimmed.contains(['/', '?', '#']) {
            return Err(AppError::invalid_input(format!("invalid task id '{trimmed}'")));
        }
        Ok(format!("{}/tasks/{}", self.base_url, trimmed))
    }
}

impl TaskApi for TaskClient {
    fn fetch_tasks(&self) -> Result<Vec<Task>, AppError> {
        let documents: Vec<Value> = read_json(self.agent.get(&self.tasks_url()).call())?;
        normalize_documents(documents)
    }

    fn add_task(&self, text: &str) -> Result<Task, AppError> {
        let response = self
            .agent
            .post(&self.tasks_url())
            .send_json(json!({ "text": text }));
        normalize_document(read_json(response)?)
    }

    fn toggle_task(&self, id: &str) -> Result<Task, AppError> {
        let url = self.task_url(id)?;
        normalize_document(read_json(self.agent.put(&url).call())?)
    }

    fn delete_task(&self, id: &str) -> Result<(), AppError> {
        let url = self.task_url(id)?;
        let _: Value = read_json(self.agent.delete(&url).call())?;
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(
    response: Result<ureq::Response, ureq::Error>,
) -> Result<T, AppError> {
    match response {
        Ok(resp) => resp
            .into_json()
            .map_err(|err| AppError::invalid_data(format!("invalid response body: {err}"))),
        Err(ureq::Error::Status(code, resp)) => {
            let body = resp.into_string().unwrap_or_default();
            Err(status_error(code, &body))
        }
        Err(err) => Err(AppError::io(err.to_string())),
    }
}

/// Builds an error from an HTTP failure status and its `{error}` or
/// `{message}` body.
pub fn status_error(code: u16, body: &str) -> AppError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });

    match (code, message) {
        (400, Some(message)) => AppError::invalid_input(message),
        (404, Some(message)) => AppError::not_found(message),
        (400, None) => AppError::invalid_input(format!("HTTP {code}")),
        (404, None) => AppError::not_found(format!("HTTP {code}")),
        (_, Some(message)) => AppError::io(format!("HTTP {code}: {message}")),
        (_, None) => AppError::io(format!("HTTP {code}")),
    }
}

#[cfg(test)]
mod tests {
    use super::{TaskClient, status_error};

    #[test]
    fn new_trims_trailing_slashes() {
        let client = TaskClient::new(" http://localhost:5000// ").unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(client.tasks_url(), "http://localhost:5000/tasks");
    }

    #[test]
    fn new_rejects_blank_or_schemeless_urls() {
        assert_eq!(TaskClient::new("  ").unwrap_err().code(), "invalid_input");
        assert_eq!(
            TaskClient::new("localhost:5000").unwrap_err().code(),
            "invalid_input"
        );
    }

    #[test]
    fn task_url_rejects_blank_and_path_ids() {
        let client = TaskClient::new("http://localhost:5000").unwrap();
        assert_eq!(
            client.task_url(" abc ").unwrap(),
            "http://localhost:5000/tasks/abc"
        );
        assert_eq!(client.task_url("").unwrap_err().code(), "invalid_input");
        assert_eq!(client.task_url("a/b").unwrap_err().code(), "invalid_input");
    }

    #[test]
    fn status_error_uses_body_message() {
        let err = status_error(404, r#"{"error":"task not found"}"#);
        assert_eq!(err.code(), "not_found");
        assert_eq!(err.message(), "task not found");

        let err = status_error(400, r#"{"message":"bad"}"#);
        assert_eq!(err.code(), "invalid_input");
        assert_eq!(err.message(), "bad");
    }

    #[test]
    fn status_error_falls_back_to_status_code() {
        let err = status_error(500, "<html>oops</html>");
        assert_eq!(err.code(), "io_error");
        assert_eq!(err.message(), "HTTP 500");

        let err = status_error(503, r#"{"error":"failed to load tasks"}"#);
        assert_eq!(err.message(), "HTTP 503: failed to load tasks");
    }
}
