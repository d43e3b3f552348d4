use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDateTime};
use tokio::task::JoinHandle;

use crate::core::task::Task;

/// Whether the platform will show alerts at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Unsupported,
}

/// Platform notification facility. Delivery is entirely the platform's
/// business; the scheduler only decides when (and whether) to call it.
pub trait Notifier: Send + Sync + 'static {
    fn permission(&self) -> Permission;
    fn notify(&self, title: &str, body: &str);
}

/// Stand-in notifier that delivers alerts through the journal.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn notify(&self, title: &str, body: &str) {
        log::info!("[reminder] {}: {}", title, body);
        println!("🔔 {}: {}", title, body);
    }
}

/// One-shot task alerts with retraction. Every pending alert is held by task
/// id, so deleting or rescheduling a task can take its alert back; an edit
/// must not leave a stale alert firing at the old moment.
pub struct ReminderScheduler {
    notifier: Arc<dyn Notifier>,
    pending: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl ReminderScheduler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Schedule the task's alert. Skips silently (returning false) when the
    /// task has no reminder, no full date+time, the moment is already past,
    /// or permission is missing.
    pub fn schedule(&self, task: &Task) -> bool {
        if !task.reminder {
            return false;
        }
        let Some(fire_at) = task.reminder_moment() else {
            return false;
        };
        match self.notifier.permission() {
            Permission::Granted => {}
            other => {
                log::info!("skipping reminder for {}: permission {:?}", task.id, other);
                return false;
            }
        }
        self.schedule_at(&task.id, &task.title, fire_at)
    }

    /// Cancel any pending alert, then schedule from the task's current state.
    pub fn reschedule(&self, task: &Task) -> bool {
        self.cancel(&task.id);
        self.schedule(task)
    }

    /// Retract a pending alert; returns whether one was pending.
    pub fn cancel(&self, id: &str) -> bool {
        if let Some(handle) = self.pending.lock().unwrap().remove(id) {
            handle.abort();
            true
        } else {
            false
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    fn schedule_at(&self, id: &str, title: &str, fire_at: NaiveDateTime) -> bool {
        let delay = fire_at - Local::now().naive_local();
        let Ok(delay) = delay.to_std() else {
            // Already past
            return false;
        };

        self.cancel(id);

        let notifier = Arc::clone(&self.notifier);
        let pending = Arc::clone(&self.pending);
        let id_owned = id.to_string();
        let title = title.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            notifier.notify("TaskForge Reminder", &title);
            pending.lock().unwrap().remove(&id_owned);
        });
        self.pending.lock().unwrap().insert(id.to_string(), handle);
        log::debug!("scheduled reminder for {} at {}", id, fire_at);
        true
    }
}
