use crate::collaborators::AppMetadata;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DAYS_UNTIL_PROMPT: i64 = 30;
pub const DEFAULT_USES_UNTIL_PROMPT: i64 = 20;
/// Sentinel: any non-negative event count satisfies it.
pub const SIGNIFICANT_EVENTS_NOT_REQUIRED: i64 = -1;
pub const DEFAULT_TIME_BEFORE_REMINDING_DAYS: i64 = 1;

const DEFAULT_CANCEL_BUTTON: &str = "No, Thanks";
const DEFAULT_RATE_LATER_BUTTON: &str = "Remind me later";

/// Thresholds and prompt text for one app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingSettings {
    /// Store-assigned numeric id, embedded in the review URL.
    pub app_id: u64,
    pub app_name: String,
    pub message: String,
    pub message_title: String,
    pub cancel_button: String,
    pub rate_button: String,
    pub rate_later_button: String,
    /// Days the same version must be installed before prompting.
    pub days_until_prompt: i64,
    /// Launches or foreground entries of the same version before prompting.
    pub uses_until_prompt: i64,
    /// Significant events before prompting; `-1` disables the criterion.
    pub significant_events_until_prompt: i64,
    /// Days to wait after "remind me later".
    pub time_before_reminding: i64,
    /// Show the prompt on every call, ignoring all counters.
    pub debug: bool,
}

impl RatingSettings {
    pub fn new(app_id: u64, app_name: impl Into<String>) -> Self {
        Self::with_debug(app_id, app_name, false)
    }

    pub fn with_debug(app_id: u64, app_name: impl Into<String>, debug: bool) -> Self {
        let app_name = app_name.into();
        Self {
            app_id,
            message: default_message(&app_name),
            message_title: default_title(&app_name),
            cancel_button: DEFAULT_CANCEL_BUTTON.to_string(),
            rate_button: default_rate_button(&app_name),
            rate_later_button: DEFAULT_RATE_LATER_BUTTON.to_string(),
            days_until_prompt: DEFAULT_DAYS_UNTIL_PROMPT,
            uses_until_prompt: DEFAULT_USES_UNTIL_PROMPT,
            significant_events_until_prompt: SIGNIFICANT_EVENTS_NOT_REQUIRED,
            time_before_reminding: DEFAULT_TIME_BEFORE_REMINDING_DAYS,
            debug,
            app_name,
        }
    }

    /// Uses the running app's display name.
    pub fn from_metadata(app_id: u64, metadata: &dyn AppMetadata) -> Self {
        Self::new(app_id, metadata.display_name())
    }
}

fn default_message(app_name: &str) -> String {
    format!(
        "If you enjoy using {app_name}, would you mind taking a moment to rate it? \
         It won't take more than a minute. Thanks for your support!"
    )
}

fn default_title(app_name: &str) -> String {
    format!("Rate {app_name}")
}

fn default_rate_button(app_name: &str) -> String {
    format!("Rate {app_name}")
}

/// On-disk form of [`RatingSettings`]. Every field is optional; text that is
/// left out is derived from the app name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RatingSettingsFile {
    pub app_id: Option<u64>,
    pub app_name: Option<String>,
    pub message: Option<String>,
    pub message_title: Option<String>,
    pub cancel_button: Option<String>,
    pub rate_button: Option<String>,
    pub rate_later_button: Option<String>,
    pub days_until_prompt: Option<i64>,
    pub uses_until_prompt: Option<i64>,
    pub significant_events_until_prompt: Option<i64>,
    pub time_before_reminding: Option<i64>,
    pub debug: Option<bool>,
}

impl RatingSettingsFile {
    pub fn into_settings(self, fallback_app_name: &str) -> RatingSettings {
        let app_name = self
            .app_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| fallback_app_name.to_string());
        let mut settings = RatingSettings::with_debug(
            self.app_id.unwrap_or_default(),
            app_name,
            self.debug.unwrap_or(false),
        );

        if let Some(message) = self.message {
            settings.message = message;
        }
        if let Some(title) = self.message_title {
            settings.message_title = title;
        }
        if let Some(cancel) = self.cancel_button {
            settings.cancel_button = cancel;
        }
        if let Some(rate) = self.rate_button {
            settings.rate_button = rate;
        }
        if let Some(later) = self.rate_later_button {
            settings.rate_later_button = later;
        }
        if let Some(days) = self.days_until_prompt {
            settings.days_until_prompt = days;
        }
        if let Some(uses) = self.uses_until_prompt {
            settings.uses_until_prompt = uses;
        }
        if let Some(events) = self.significant_events_until_prompt {
            settings.significant_events_until_prompt = events;
        }
        if let Some(days) = self.time_before_reminding {
            settings.time_before_reminding = days;
        }

        settings
    }
}
