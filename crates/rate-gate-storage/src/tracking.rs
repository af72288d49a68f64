use crate::{PreferenceStore, StorageError};
use chrono::{DateTime, Utc};
use rate_gate_core::{to_timestamp, PreferenceKeys, TrackingSnapshot, UsageCounter};

/// Typed view of the gate's keys inside a [`PreferenceStore`].
pub struct TrackingRecord<'a> {
    store: &'a dyn PreferenceStore,
    keys: &'a PreferenceKeys,
}

impl<'a> TrackingRecord<'a> {
    pub fn new(store: &'a dyn PreferenceStore, keys: &'a PreferenceKeys) -> Self {
        Self { store, keys }
    }

    pub fn snapshot(&self) -> Result<TrackingSnapshot, StorageError> {
        Ok(TrackingSnapshot {
            current_version: self.tracked_version()?,
            first_use_date: self.store.double(&self.keys.first_use_date)?,
            use_count: self.store.integer(&self.keys.use_count)?,
            significant_event_count: self.store.integer(&self.keys.significant_event_count)?,
            rated_current_version: self.store.boolean(&self.keys.rated_current_version)?,
            declined_to_rate: self.store.boolean(&self.keys.declined_to_rate)?,
            reminder_request_date: self.store.double(&self.keys.reminder_request_date)?,
        })
    }

    /// Tracked version, treating an empty string as absent.
    pub fn tracked_version(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .store
            .string(&self.keys.current_version)?
            .filter(|version| !version.is_empty()))
    }

    pub fn set_tracked_version(&self, version: &str) -> Result<(), StorageError> {
        self.store.set_string(&self.keys.current_version, version)
    }

    /// Sets the first-use date to `now` if it is still the zero sentinel.
    pub fn ensure_first_use_date(&self, now: DateTime<Utc>) -> Result<f64, StorageError> {
        let first_use = self.store.double(&self.keys.first_use_date)?;
        if first_use != 0.0 {
            return Ok(first_use);
        }
        let first_use = to_timestamp(now);
        self.store.set_double(&self.keys.first_use_date, first_use)?;
        Ok(first_use)
    }

    /// Bumps the counter and returns its new value.
    pub fn increment(&self, counter: UsageCounter) -> Result<i64, StorageError> {
        let key = match counter {
            UsageCounter::Uses => &self.keys.use_count,
            UsageCounter::SignificantEvents => &self.keys.significant_event_count,
        };
        let next = self.store.integer(key)?.saturating_add(1);
        self.store.set_integer(key, next)?;
        Ok(next)
    }

    /// Starts a fresh tracking cycle for `version`.
    pub fn reset(&self, version: &str, now: DateTime<Utc>) -> Result<(), StorageError> {
        self.store.set_string(&self.keys.current_version, version)?;
        self.store
            .set_double(&self.keys.first_use_date, to_timestamp(now))?;
        self.store.set_integer(&self.keys.use_count, 1)?;
        self.store.set_integer(&self.keys.significant_event_count, 0)?;
        self.store
            .set_boolean(&self.keys.rated_current_version, false)?;
        self.store.set_boolean(&self.keys.declined_to_rate, false)?;
        self.store.set_double(&self.keys.reminder_request_date, 0.0)
    }

    pub fn mark_rated(&self) -> Result<(), StorageError> {
        self.store
            .set_boolean(&self.keys.rated_current_version, true)
    }

    pub fn mark_declined(&self) -> Result<(), StorageError> {
        self.store.set_boolean(&self.keys.declined_to_rate, true)
    }

    pub fn set_reminder_request_date(&self, now: DateTime<Utc>) -> Result<(), StorageError> {
        self.store
            .set_double(&self.keys.reminder_request_date, to_timestamp(now))
    }

    pub fn synchronize(&self) -> Result<(), StorageError> {
        self.store.synchronize()
    }
}
