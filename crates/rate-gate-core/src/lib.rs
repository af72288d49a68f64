pub mod collaborators;
pub mod conditions;
pub mod keys;
pub mod settings;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use collaborators::{
    AppMetadata, Clock, ManualClock, NetworkReachability, OpenError, PromptRequest, PromptService,
    SystemClock, UiDispatcher, UiJob, UrlOpener,
};
pub use conditions::{
    from_timestamp, rating_conditions_met, to_timestamp, unmet_condition, TrackingSnapshot,
    UnmetCondition,
};
pub use keys::PreferenceKeys;
pub use settings::{RatingSettings, RatingSettingsFile};

pub const TEMPLATE_REVIEW_URL: &str = "macappstore://itunes.apple.com/app/id{app_id}?mt=12";

/// Store review page for the given app id.
pub fn review_url(app_id: u64) -> String {
    TEMPLATE_REVIEW_URL.replace("{app_id}", &app_id.to_string())
}

/// Which button the user picked on the rating prompt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PromptChoice {
    Rate,
    Decline,
    RemindLater,
}

impl PromptChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptChoice::Rate => "rate",
            PromptChoice::Decline => "decline",
            PromptChoice::RemindLater => "remind-later",
        }
    }
}

impl fmt::Display for PromptChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptChoice {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "rate" | "yes" => Ok(PromptChoice::Rate),
            "decline" | "no" | "cancel" => Ok(PromptChoice::Decline),
            "remind-later" | "remind_later" | "later" | "remind" => Ok(PromptChoice::RemindLater),
            other => Err(format!("Unknown choice: {other}")),
        }
    }
}

/// The counter an increment call bumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageCounter {
    Uses,
    SignificantEvents,
}

impl UsageCounter {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageCounter::Uses => "use",
            UsageCounter::SignificantEvents => "significant-event",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_url_embeds_app_id() {
        assert_eq!(
            review_url(12345),
            "macappstore://itunes.apple.com/app/id12345?mt=12"
        );
    }

    #[test]
    fn prompt_choice_parses_aliases() {
        assert_eq!("Rate".parse::<PromptChoice>(), Ok(PromptChoice::Rate));
        assert_eq!("no".parse::<PromptChoice>(), Ok(PromptChoice::Decline));
        assert_eq!(
            " later ".parse::<PromptChoice>(),
            Ok(PromptChoice::RemindLater)
        );
        assert!("maybe".parse::<PromptChoice>().is_err());
    }

    #[test]
    fn prompt_choice_display_matches_parse() {
        for choice in [
            PromptChoice::Rate,
            PromptChoice::Decline,
            PromptChoice::RemindLater,
        ] {
            assert_eq!(choice.to_string().parse::<PromptChoice>(), Ok(choice));
        }
    }
}
