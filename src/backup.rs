use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::history::History;
use crate::core::task::Task;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("invalid backup file: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Point-in-time snapshot of the full local dataset. Every field is optional
/// on the way in: a restore applies only the fields the document carries.
/// The settings document rides along opaquely; the codec never looks inside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<History>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
    #[serde(rename = "exportDate", default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<DateTime<Utc>>,
}

impl BackupDocument {
    /// Serialize for download; pretty-printed like the original export.
    pub fn to_json(&self) -> Result<String, BackupError> {
        serde_json::to_string_pretty(self).map_err(BackupError::Malformed)
    }

    /// Parse a backup document. This is all-or-nothing: a document that does
    /// not match the expected shape yields `Malformed` and nothing else
    /// happens. Field-level application only starts after a clean parse.
    pub fn parse(raw: &str) -> Result<Self, BackupError> {
        serde_json::from_str(raw).map_err(BackupError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn export_then_parse_reproduces_tasks_field_for_field() {
        let mut task = Task::new("Backup me", Utc::now());
        task.date = NaiveDate::from_ymd_opt(2024, 7, 1);
        let history: History = [(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(), 3)]
            .into_iter()
            .collect();
        let doc = BackupDocument {
            tasks: Some(vec![task.clone()]),
            history: Some(history.clone()),
            settings: Some(serde_json::json!({ "accent": "#EF4444" })),
            export_date: Some(Utc::now()),
        };

        let parsed = BackupDocument::parse(&doc.to_json().unwrap()).unwrap();
        assert_eq!(parsed.tasks.as_deref(), Some(&[task][..]));
        assert_eq!(parsed.history, Some(history));
    }

    #[test]
    fn missing_fields_parse_as_absent() {
        let parsed = BackupDocument::parse(r#"{ "tasks": [] }"#).unwrap();
        assert_eq!(parsed.tasks.as_deref(), Some(&[][..]));
        assert!(parsed.history.is_none());
        assert!(parsed.settings.is_none());
        assert!(parsed.export_date.is_none());
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(matches!(
            BackupDocument::parse("not json at all"),
            Err(BackupError::Malformed(_))
        ));
        // Structurally wrong: tasks must be a list
        assert!(matches!(
            BackupDocument::parse(r#"{ "tasks": 42 }"#),
            Err(BackupError::Malformed(_))
        ));
    }
}
