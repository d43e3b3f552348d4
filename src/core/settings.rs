use serde::{Deserialize, Serialize};

pub const DEFAULT_ACCENT: &str = "#3B82F6";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Accent color as a CSS color value.
    #[serde(default = "default_accent")]
    pub accent: String,
    #[serde(default)]
    pub notifications: bool,
}

fn default_accent() -> String {
    DEFAULT_ACCENT.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            accent: default_accent(),
            notifications: false,
        }
    }
}

/// Partial settings update; absent fields keep their prior value.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub accent: Option<String>,
    pub notifications: Option<bool>,
}

impl SettingsPatch {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(ref accent) = self.accent {
            settings.accent = accent.clone();
        }
        if let Some(notifications) = self.notifications {
            settings.notifications = notifications;
        }
    }
}
