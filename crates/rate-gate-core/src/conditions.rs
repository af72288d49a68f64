use crate::settings::RatingSettings;
use chrono::{DateTime, Utc};
use std::fmt;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Persisted timestamps are fractional Unix seconds; `0.0` means "never".
pub fn to_timestamp(at: DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}

pub fn from_timestamp(seconds: f64) -> Option<DateTime<Utc>> {
    if seconds == 0.0 || !seconds.is_finite() {
        return None;
    }
    DateTime::from_timestamp_micros((seconds * 1_000_000.0).round() as i64)
}

/// Everything the predicate reads, as loaded from the preference store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingSnapshot {
    pub current_version: Option<String>,
    pub first_use_date: f64,
    pub use_count: i64,
    pub significant_event_count: i64,
    pub rated_current_version: bool,
    pub declined_to_rate: bool,
    pub reminder_request_date: f64,
}

/// First failing check, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmetCondition {
    TooSoon,
    TooFewUses,
    TooFewSignificantEvents,
    Declined,
    AlreadyRated,
    ReminderPending,
}

impl UnmetCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnmetCondition::TooSoon => "too-soon",
            UnmetCondition::TooFewUses => "too-few-uses",
            UnmetCondition::TooFewSignificantEvents => "too-few-significant-events",
            UnmetCondition::Declined => "declined",
            UnmetCondition::AlreadyRated => "already-rated",
            UnmetCondition::ReminderPending => "reminder-pending",
        }
    }
}

impl fmt::Display for UnmetCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn days_elapsed_since(timestamp: f64, now: DateTime<Utc>) -> f64 {
    (to_timestamp(now) - timestamp) / SECONDS_PER_DAY
}

/// Ignores `settings.debug`; see [`rating_conditions_met`].
pub fn unmet_condition(
    settings: &RatingSettings,
    snapshot: &TrackingSnapshot,
    now: DateTime<Utc>,
) -> Option<UnmetCondition> {
    if days_elapsed_since(snapshot.first_use_date, now) < settings.days_until_prompt as f64 {
        return Some(UnmetCondition::TooSoon);
    }

    if snapshot.use_count < settings.uses_until_prompt {
        return Some(UnmetCondition::TooFewUses);
    }

    // -1 threshold disables this check for any non-negative count.
    if snapshot.significant_event_count < settings.significant_events_until_prompt {
        return Some(UnmetCondition::TooFewSignificantEvents);
    }

    if snapshot.declined_to_rate {
        return Some(UnmetCondition::Declined);
    }

    if snapshot.rated_current_version {
        return Some(UnmetCondition::AlreadyRated);
    }

    // An unset reminder date is the epoch, so this passes trivially.
    if days_elapsed_since(snapshot.reminder_request_date, now)
        < settings.time_before_reminding as f64
    {
        return Some(UnmetCondition::ReminderPending);
    }

    None
}

pub fn rating_conditions_met(
    settings: &RatingSettings,
    snapshot: &TrackingSnapshot,
    now: DateTime<Utc>,
) -> bool {
    settings.debug || unmet_condition(settings, snapshot, now).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn settings() -> RatingSettings {
        RatingSettings::new(12345, "Atlas")
    }

    fn ready_snapshot() -> TrackingSnapshot {
        TrackingSnapshot {
            current_version: Some("1.0".to_string()),
            first_use_date: to_timestamp(day0()),
            use_count: 20,
            significant_event_count: 0,
            ..TrackingSnapshot::default()
        }
    }

    #[test]
    fn met_once_days_and_uses_reached() {
        let now = day0() + Duration::days(31);
        assert_eq!(unmet_condition(&settings(), &ready_snapshot(), now), None);
        assert!(rating_conditions_met(&settings(), &ready_snapshot(), now));
    }

    #[test]
    fn exact_day_boundary_counts_as_elapsed() {
        let now = day0() + Duration::days(30);
        assert!(rating_conditions_met(&settings(), &ready_snapshot(), now));
        let just_before = now - Duration::seconds(1);
        assert_eq!(
            unmet_condition(&settings(), &ready_snapshot(), just_before),
            Some(UnmetCondition::TooSoon)
        );
    }

    #[test]
    fn too_few_uses_blocks() {
        let snapshot = TrackingSnapshot {
            use_count: 19,
            ..ready_snapshot()
        };
        assert_eq!(
            unmet_condition(&settings(), &snapshot, day0() + Duration::days(40)),
            Some(UnmetCondition::TooFewUses)
        );
    }

    #[test]
    fn disabled_significant_event_threshold_never_blocks() {
        let now = day0() + Duration::days(31);
        for count in [0, 1, 7, i64::MAX] {
            let snapshot = TrackingSnapshot {
                significant_event_count: count,
                ..ready_snapshot()
            };
            assert!(rating_conditions_met(&settings(), &snapshot, now));
        }
    }

    #[test]
    fn significant_event_threshold_blocks_when_set() {
        let mut settings = settings();
        settings.significant_events_until_prompt = 2;
        let snapshot = TrackingSnapshot {
            significant_event_count: 1,
            ..ready_snapshot()
        };
        assert_eq!(
            unmet_condition(&settings, &snapshot, day0() + Duration::days(31)),
            Some(UnmetCondition::TooFewSignificantEvents)
        );
    }

    #[test]
    fn rated_and_declined_are_terminal() {
        let now = day0() + Duration::days(365);
        let rated = TrackingSnapshot {
            rated_current_version: true,
            use_count: 10_000,
            ..ready_snapshot()
        };
        let declined = TrackingSnapshot {
            declined_to_rate: true,
            ..ready_snapshot()
        };
        assert_eq!(
            unmet_condition(&settings(), &rated, now),
            Some(UnmetCondition::AlreadyRated)
        );
        assert_eq!(
            unmet_condition(&settings(), &declined, now),
            Some(UnmetCondition::Declined)
        );
    }

    #[test]
    fn reminder_waits_configured_days() {
        let asked_at = day0() + Duration::days(31);
        let snapshot = TrackingSnapshot {
            reminder_request_date: to_timestamp(asked_at),
            ..ready_snapshot()
        };
        assert_eq!(
            unmet_condition(&settings(), &snapshot, asked_at),
            Some(UnmetCondition::ReminderPending)
        );
        assert!(rating_conditions_met(
            &settings(),
            &snapshot,
            asked_at + Duration::days(1)
        ));
    }

    #[test]
    fn debug_overrides_every_check() {
        let mut settings = settings();
        settings.debug = true;
        let snapshot = TrackingSnapshot {
            declined_to_rate: true,
            rated_current_version: true,
            first_use_date: to_timestamp(day0()),
            ..TrackingSnapshot::default()
        };
        assert!(rating_conditions_met(&settings, &snapshot, day0()));
    }

    #[test]
    fn zero_timestamp_is_unset() {
        assert_eq!(from_timestamp(0.0), None);
        let roundtrip = from_timestamp(to_timestamp(day0())).expect("timestamp");
        assert_eq!(roundtrip, day0());
    }
}
