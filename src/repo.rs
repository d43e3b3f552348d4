use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use thiserror::Error;

use crate::backup::BackupDocument;
use crate::core::history::History;
use crate::core::task::{Task, TaskDraft, TaskPatch};
use crate::reminder::ReminderScheduler;
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("task title must not be empty")]
    EmptyTitle,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a restore actually applied; absent backup fields leave their
/// documents untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOutcome {
    pub tasks: Option<usize>,
    pub history: bool,
    pub settings: bool,
}

/// Owner of the in-memory task list and completion history, and the only
/// writer of their persisted documents.
pub struct TaskRepository {
    store: Store,
    tasks: Vec<Task>,
    history: History,
    reminders: Option<Arc<ReminderScheduler>>,
}

impl TaskRepository {
    /// Load both documents from the store; missing or corrupt data starts empty.
    pub fn open(store: Store) -> Self {
        let tasks = store.load_tasks();
        let history = store.load_history();
        log::debug!("loaded {} tasks, {} history days", tasks.len(), history.len());
        Self {
            store,
            tasks,
            history,
            reminders: None,
        }
    }

    /// Attach a scheduler so mutations can schedule and retract alerts.
    pub fn with_reminders(mut self, reminders: Arc<ReminderScheduler>) -> Self {
        self.reminders = Some(reminders);
        self
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Create a task from the draft and prepend it, so new tasks sort first
    /// among equal sort keys.
    pub fn add(&mut self, draft: TaskDraft) -> Result<Task, RepoError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(RepoError::EmptyTitle);
        }
        let mut task = Task::new(title, Utc::now());
        task.description = draft.description.trim().to_string();
        task.date = draft.date;
        task.time = draft.time;
        task.priority = draft.priority.unwrap_or_default();
        task.category = draft.category.unwrap_or_default();
        task.reminder = draft.reminder;

        self.tasks.insert(0, task.clone());
        self.store.save_tasks(&self.tasks)?;

        if let Some(ref reminders) = self.reminders {
            reminders.schedule(&task);
        }
        Ok(task)
    }

    /// Merge `patch` over the task with the given id. Unknown ids are ignored;
    /// returns whether a task matched.
    pub fn update(&mut self, id: &str, patch: TaskPatch) -> Result<bool, RepoError> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            log::debug!("update for unknown task {}", id);
            return Ok(false);
        };
        patch.apply(task);
        let task = task.clone();
        self.store.save_tasks(&self.tasks)?;

        // A moved or disabled alert must not fire at the stale moment
        if patch.touches_schedule() {
            if let Some(ref reminders) = self.reminders {
                reminders.reschedule(&task);
            }
        }
        Ok(true)
    }

    /// Remove the task with the given id, retracting any pending alert.
    pub fn delete(&mut self, id: &str) -> Result<bool, RepoError> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return Ok(false);
        }
        self.store.save_tasks(&self.tasks)?;
        if let Some(ref reminders) = self.reminders {
            reminders.cancel(id);
        }
        Ok(true)
    }

    /// Flip completion. The false→true transition records one completion in
    /// the history under `today` (the day of the toggle, not the task's due
    /// date). The reverse transition takes nothing back.
    ///
    /// Returns the new completed state, or `None` for an unknown id.
    pub fn toggle_complete(
        &mut self,
        id: &str,
        today: NaiveDate,
    ) -> Result<Option<bool>, RepoError> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            log::debug!("toggle for unknown task {}", id);
            return Ok(None);
        };
        task.completed = !task.completed;
        let completed = task.completed;
        self.store.save_tasks(&self.tasks)?;
        if completed {
            self.history.record(today);
            self.store.save_history(&self.history)?;
        }
        Ok(Some(completed))
    }

    /// Remove every completed task; returns how many went away.
    pub fn clear_completed(&mut self) -> Result<usize, RepoError> {
        let removed: Vec<String> = self
            .tasks
            .iter()
            .filter(|t| t.completed)
            .map(|t| t.id.clone())
            .collect();
        if removed.is_empty() {
            return Ok(0);
        }
        self.tasks.retain(|t| !t.completed);
        self.store.save_tasks(&self.tasks)?;
        if let Some(ref reminders) = self.reminders {
            for id in &removed {
                reminders.cancel(id);
            }
        }
        Ok(removed.len())
    }

    /// Snapshot of the full local dataset.
    pub fn export(&self, exported_at: chrono::DateTime<Utc>) -> BackupDocument {
        BackupDocument {
            tasks: Some(self.tasks.clone()),
            history: Some(self.history.clone()),
            settings: self.store.load_settings_value(),
            export_date: Some(exported_at),
        }
    }

    /// Apply a parsed backup. Each field replaces its document independently;
    /// absent fields leave local state untouched.
    pub fn restore(&mut self, document: BackupDocument) -> Result<RestoreOutcome, RepoError> {
        let mut outcome = RestoreOutcome::default();
        if let Some(tasks) = document.tasks {
            outcome.tasks = Some(tasks.len());
            self.tasks = tasks;
            self.store.save_tasks(&self.tasks)?;
        }
        if let Some(history) = document.history {
            self.history = history;
            self.store.save_history(&self.history)?;
            outcome.history = true;
        }
        if let Some(settings) = document.settings {
            self.store.save_settings_value(&settings)?;
            outcome.settings = true;
        }
        Ok(outcome)
    }
}
