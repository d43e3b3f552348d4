use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Low
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Coding,
    College,
    Health,
    Personal,
    Projects,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coding => "coding",
            Self::College => "college",
            Self::Health => "health",
            Self::Personal => "personal",
            Self::Projects => "projects",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "coding" => Some(Self::Coding),
            "college" => Some(Self::College),
            "health" => Some(Self::Health),
            "personal" => Some(Self::Personal),
            "projects" => Some(Self::Projects),
            _ => None,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Coding => "💻",
            Self::College => "🎓",
            Self::Health => "💪",
            Self::Personal => "🏠",
            Self::Projects => "🚀",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::College
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "opt_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, with = "opt_time")]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub reminder: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            // Time-ordered plus random; uniqueness across the store is a hard invariant
            id: Uuid::now_v7().to_string(),
            title: title.into(),
            description: String::new(),
            date: None,
            time: None,
            priority: Priority::Low,
            category: Category::College,
            reminder: false,
            completed: false,
            created_at,
        }
    }

    pub fn is_due_on(&self, day: NaiveDate) -> bool {
        self.date == Some(day)
    }

    /// Wall-clock moment the reminder should fire, when the task has both a date and a time.
    pub fn reminder_moment(&self) -> Option<chrono::NaiveDateTime> {
        match (self.date, self.time) {
            (Some(date), Some(time)) => Some(date.and_time(time)),
            _ => None,
        }
    }
}

/// Creation input: title is required, everything else falls back to defaults.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub reminder: bool,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update: absent fields leave the task untouched. `date` and `time`
/// distinguish "leave alone" (outer None) from "clear" (inner None).
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<Option<NaiveDate>>,
    pub time: Option<Option<NaiveTime>>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub reminder: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.time.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.reminder.is_none()
    }

    /// True when applying this patch can move or retract a scheduled reminder.
    pub fn touches_schedule(&self) -> bool {
        self.date.is_some() || self.time.is_some() || self.reminder.is_some()
    }

    /// Merge into `task`. A title that trims to empty is dropped rather than
    /// applied, keeping the non-empty-title invariant.
    pub fn apply(&self, task: &mut Task) {
        if let Some(ref title) = self.title {
            let trimmed = title.trim();
            if trimmed.is_empty() {
                log::warn!("ignoring empty title in update for task {}", task.id);
            } else {
                task.title = trimmed.to_string();
            }
        }
        if let Some(ref description) = self.description {
            task.description = description.trim().to_string();
        }
        if let Some(date) = self.date {
            task.date = date;
        }
        if let Some(time) = self.time {
            task.time = time;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(reminder) = self.reminder {
            task.reminder = reminder;
        }
    }
}

// The original documents write dates as "YYYY-MM-DD" and times as "HH:MM",
// with the empty string standing in for "not set".
mod opt_date {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<NaiveDate>, ser: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => ser.serialize_str(&d.format("%Y-%m-%d").to_string()),
            None => ser.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(de)?;
        match raw.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

mod opt_time {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<NaiveTime>, ser: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => ser.serialize_str(&t.format("%H:%M").to_string()),
            None => ser.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(de)?;
        match raw.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => NaiveTime::parse_from_str(s, "%H:%M")
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
