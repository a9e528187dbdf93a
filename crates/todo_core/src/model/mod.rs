mod migrate;
mod task;

pub use migrate::{is_completed_document, normalize_document, normalize_documents};
pub use task::Task;
