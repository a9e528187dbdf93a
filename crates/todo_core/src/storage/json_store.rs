use crate::error::AppError;
use crate::model::{Task, normalize_documents};
use crate::storage::{TaskStore, TaskTable, closed_error, poisoned_error};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub const SCHEMA_VERSION: u32 = 2;
const STORE_FILE_NAME: &str = "tasks.json";

#[derive(Debug, Serialize)]
struct StoredTasks<'a> {
    schema_version: u32,
    tasks: &'a [Task],
}

#[derive(Debug, Deserialize)]
struct RawStoredTasks {
    schema_version: u32,
    #[serde(default)]
    tasks: Vec<Value>,
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("todoapp").join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("todoapp")
            .join(STORE_FILE_NAME))
    }
}

/// Reads the document file, migrating legacy documents. A missing file is
/// an empty store.
pub fn load_tasks(path: &Path) -> Result<Vec<Task>, AppError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)?;
    let stored: RawStoredTasks = serde_json::from_str(&content)?;

    if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    if stored.schema_version < SCHEMA_VERSION {
        tracing::info!(
            from = stored.schema_version,
            to = SCHEMA_VERSION,
            count = stored.tasks.len(),
            "migrating legacy task documents"
        );
    }

    normalize_documents(stored.tasks)
}

pub fn save_tasks(path: &Path, tasks: &[Task]) -> Result<(), AppError> {
    let stored = StoredTasks {
        schema_version: SCHEMA_VERSION,
        tasks,
    };
    replace_file(path, |file| {
        serde_json::to_writer_pretty(&mut *file, &stored)?;
        Ok(())
    })
}

/// Writes a sibling temp file and renames it over `path`. The previous
/// file stays intact until the rename, and a failed write leaves no
/// temp file behind.
fn replace_file(
    path: &Path,
    write: impl FnOnce(&mut File) -> Result<(), AppError>,
) -> Result<(), AppError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    write(staged.as_file_mut())?;
    staged.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(staged.path(), permissions)?;
    }

    staged.persist(path).map_err(|err| AppError::from(err.error))?;
    Ok(())
}

/// Store backed by a single JSON document file.
///
/// The whole file is rewritten after every mutation; the in-memory copy is
/// only replaced once the write succeeded.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    table: Mutex<Option<TaskTable>>,
}

impl JsonFileStore {
    pub fn open(path: PathBuf) -> Result<Self, AppError> {
        let tasks = load_tasks(&path)?;
        let table = TaskTable::from_tasks(tasks)?;
        tracing::info!(
            path = %path.display(),
            tasks = table.tasks().len(),
            "opened task store"
        );
        Ok(Self {
            path,
            table: Mutex::new(Some(table)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<TaskTable>>, AppError> {
        self.table.lock().map_err(|_| poisoned_error())
    }

    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut TaskTable) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut guard = self.lock()?;
        let table = guard.as_mut().ok_or_else(closed_error)?;
        let mut next = table.clone();
        let result = apply(&mut next)?;
        self.commit(table, next)?;
        Ok(result)
    }

    fn commit(&self, table: &mut TaskTable, next: TaskTable) -> Result<(), AppError> {
        save_tasks(&self.path, next.tasks()).map_err(|err| {
            tracing::error!(path = %self.path.display(), %err, "failed to write task store");
            AppError::storage(err.message())
        })?;
        *table = next;
        Ok(())
    }
}

impl TaskStore for JsonFileStore {
    fn list_all(&self) -> Result<Vec<Task>, AppError> {
        let guard = self.lock()?;
        let table = guard.as_ref().ok_or_else(closed_error)?;
        Ok(table.sorted())
    }

    fn create(&self, text: &str) -> Result<Task, AppError> {
        let task = Task::new(text)?;
        self.mutate(|table| {
            table.insert(task.clone())?;
            Ok(task)
        })
    }

    fn get_by_id(&self, id: &str) -> Result<Option<Task>, AppError> {
        let guard = self.lock()?;
        let table = guard.as_ref().ok_or_else(closed_error)?;
        Ok(table.get(id))
    }

    fn update(&self, task: &Task) -> Result<Task, AppError> {
        self.mutate(|table| table.update(task))
    }

    // Absent ids leave the file untouched.
    fn delete_by_id(&self, id: &str) -> Result<bool, AppError> {
        let mut guard = self.lock()?;
        let table = guard.as_mut().ok_or_else(closed_error)?;
        let mut next = table.clone();
        if !next.remove(id) {
            return Ok(false);
        }
        self.commit(table, next)?;
        Ok(true)
    }

    fn close(&self) -> Result<(), AppError> {
        let mut guard = self.lock()?;
        let table = guard.take().ok_or_else(closed_error)?;
        save_tasks(&self.path, table.tasks())?;
        tracing::info!(path = %self.path.display(), "closed task store");
        Ok(())
    }
}
