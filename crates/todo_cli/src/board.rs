//! Local view of the task list.
//!
//! The board owns the tasks last received from the service and is only
//! changed from successful responses. Search and filter are applied
//! locally and never reach the service.

use crate::client::TaskApi;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use todo_core::error::AppError;
use todo_core::model::Task;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Active => !task.is_completed(),
            Self::Completed => task.is_completed(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub percent: f64,
}

impl Summary {
    pub fn of(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|task| task.is_completed()).count();
        let percent = if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total,
            completed,
            active: total - completed,
            percent,
        }
    }

    pub fn focus_message(&self) -> String {
        let remaining = plural_tasks(self.active);
        if self.total == 0 {
            "Start the day by adding a new task!".to_string()
        } else if self.active == 0 {
            "Excellent! Every task is done.".to_string()
        } else if self.percent > 70.0 {
            format!("Almost there! Only {remaining} left, you can do it!")
        } else if self.percent > 40.0 {
            format!("Nearly halfway! Keep going, {remaining} to go.")
        } else {
            let verb = if self.active == 1 { "is" } else { "are" };
            format!("{remaining} {verb} waiting today. Take them one at a time.")
        }
    }
}

fn plural_tasks(count: usize) -> String {
    if count == 1 {
        "1 task".to_string()
    } else {
        format!("{count} tasks")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Board {
    tasks: Vec<Task>,
    search: String,
    filter: Filter,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            ..Self::default()
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    /// Replaces the local list with the service's.
    pub fn load(&mut self, api: &dyn TaskApi) -> Result<usize, AppError> {
        let tasks = api.fetch_tasks().inspect_err(|err| {
            tracing::warn!(%err, "failed to fetch tasks");
        })?;
        self.tasks = tasks;
        Ok(self.tasks.len())
    }

    /// Blank input is dropped locally and yields `Ok(None)` without a
    /// request.
    pub fn add(&mut self, api: &dyn TaskApi, text: &str) -> Result<Option<Task>, AppError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let task = api.add_task(text).inspect_err(|err| {
            tracing::warn!(%err, "failed to add task");
        })?;
        self.tasks.insert(0, task.clone());
        Ok(Some(task))
    }

    pub fn toggle(&mut self, api: &dyn TaskApi, id: &str) -> Result<Task, AppError> {
        let updated = api.toggle_task(id).inspect_err(|err| {
            tracing::warn!(%err, id, "failed to toggle task");
        })?;
        for task in &mut self.tasks {
            if task.id == updated.id {
                *task = updated.clone();
            }
        }
        Ok(updated)
    }

    pub fn delete(&mut self, api: &dyn TaskApi, id: &str) -> Result<(), AppError> {
        api.delete_task(id).inspect_err(|err| {
            tracing::warn!(%err, id, "failed to delete task");
        })?;
        let trimmed = id.trim();
        self.tasks.retain(|task| task.id != trimmed);
        Ok(())
    }

    /// Tasks matching the current search and filter, in board order.
    pub fn visible(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| task.matches_search(&self.search) && self.filter.matches(task))
            .collect()
    }

    pub fn summary(&self) -> Summary {
        Summary::of(&self.tasks)
    }
}
