use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::AppConfig;
use crate::core::history::History;
use crate::core::settings::Settings;
use crate::core::task::Task;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize {doc}: {source}")]
    Serialize {
        doc: &'static str,
        source: serde_json::Error,
    },
}

/// Three independent JSON documents under the data directory: the task list,
/// the completion history, and the settings. There are no transactions across
/// them; each read and write touches exactly one file.
#[derive(Debug, Clone)]
pub struct Store {
    config: AppConfig,
}

impl Store {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// A missing or unreadable document is an empty task list, never an error.
    pub fn load_tasks(&self) -> Vec<Task> {
        self.read_doc(&self.config.tasks_path(), "tasks")
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        self.write_doc(&self.config.tasks_path(), "tasks", &tasks)
    }

    pub fn load_history(&self) -> History {
        self.read_doc(&self.config.history_path(), "history")
    }

    pub fn save_history(&self, history: &History) -> Result<(), StoreError> {
        self.write_doc(&self.config.history_path(), "history", history)
    }

    pub fn load_settings(&self) -> Settings {
        self.read_doc(&self.config.settings_path(), "settings")
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        self.write_doc(&self.config.settings_path(), "settings", settings)
    }

    /// Raw settings document for export; `None` when absent or unreadable.
    pub fn load_settings_value(&self) -> Option<serde_json::Value> {
        let path = self.config.settings_path();
        if !path.exists() {
            return None;
        }
        let raw = std::fs::read_to_string(&path).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Write a restored settings document without interpreting it.
    pub fn save_settings_value(&self, value: &serde_json::Value) -> Result<(), StoreError> {
        self.write_doc(&self.config.settings_path(), "settings", value)
    }

    fn read_doc<T: DeserializeOwned + Default>(&self, path: &Path, doc: &'static str) -> T {
        if !path.exists() {
            return T::default();
        }
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("could not read {}: {}; starting empty", path.display(), e);
                return T::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("corrupt {} document ({}); starting empty", doc, e);
                T::default()
            }
        }
    }

    fn write_doc<T: Serialize + ?Sized>(
        &self,
        path: &Path,
        doc: &'static str,
        value: &T,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(value).map_err(|source| StoreError::Serialize {
            doc,
            source,
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, json).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
