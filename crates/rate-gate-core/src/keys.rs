pub const DEFAULT_KEY_PREFIX: &str = "rate-gate.";

pub const FIRST_USE_DATE: &str = "first-use-date";
pub const USE_COUNT: &str = "use-count";
pub const SIGNIFICANT_EVENT_COUNT: &str = "significant-event-count";
pub const CURRENT_VERSION: &str = "current-version";
pub const RATED_CURRENT_VERSION: &str = "rated-current-version";
pub const DECLINED_TO_RATE: &str = "declined-to-rate";
pub const REMINDER_REQUEST_DATE: &str = "reminder-request-date";

/// Fully qualified preference keys, namespaced so the gate can share a store
/// with its host app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceKeys {
    pub first_use_date: String,
    pub use_count: String,
    pub significant_event_count: String,
    pub current_version: String,
    pub rated_current_version: String,
    pub declined_to_rate: String,
    pub reminder_request_date: String,
}

impl PreferenceKeys {
    pub fn with_prefix(prefix: &str) -> Self {
        let key = |name: &str| format!("{prefix}{name}");
        Self {
            first_use_date: key(FIRST_USE_DATE),
            use_count: key(USE_COUNT),
            significant_event_count: key(SIGNIFICANT_EVENT_COUNT),
            current_version: key(CURRENT_VERSION),
            rated_current_version: key(RATED_CURRENT_VERSION),
            declined_to_rate: key(DECLINED_TO_RATE),
            reminder_request_date: key(REMINDER_REQUEST_DATE),
        }
    }

    pub fn all(&self) -> [&str; 7] {
        [
            &self.first_use_date,
            &self.use_count,
            &self.significant_event_count,
            &self.current_version,
            &self.rated_current_version,
            &self.declined_to_rate,
            &self.reminder_request_date,
        ]
    }
}

impl Default for PreferenceKeys {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_KEY_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prefix_namespaces_every_key() {
        let keys = PreferenceKeys::default();
        assert_eq!(keys.use_count, "rate-gate.use-count");
        assert!(keys.all().iter().all(|key| key.starts_with("rate-gate.")));
    }

    #[test]
    fn empty_prefix_keeps_bare_names() {
        let keys = PreferenceKeys::with_prefix("");
        assert_eq!(keys.first_use_date, FIRST_USE_DATE);
        assert_eq!(keys.reminder_request_date, REMINDER_REQUEST_DATE);
    }
}
