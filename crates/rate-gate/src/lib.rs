mod dispatch;

pub use dispatch::{ChannelUiDispatcher, InlineUiDispatcher, UiQueue};

use chrono::{DateTime, Utc};
use rate_gate_core::{
    rating_conditions_met, review_url, unmet_condition, AppMetadata, Clock, NetworkReachability,
    OpenError, PreferenceKeys, PromptChoice, PromptRequest, PromptService, RatingSettings,
    TrackingSnapshot, UiDispatcher, UnmetCondition, UrlOpener, UsageCounter,
};
use rate_gate_storage::{PreferenceStore, StorageError, TrackingRecord};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum GateError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("open error: {0}")]
    Open(#[from] OpenError),
    #[error("failed to spawn background worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// What one increment-and-check pass decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateOutcome {
    /// Counter updated; the caller asked not to prompt.
    Suppressed,
    NotEligible,
    /// Eligible, but the store is unreachable.
    Offline,
    /// Prompt handed to the UI dispatcher.
    Prompted,
}

/// Host services the gate drives.
#[derive(Clone)]
pub struct GateServices {
    pub metadata: Arc<dyn AppMetadata>,
    pub reachability: Arc<dyn NetworkReachability>,
    pub prompt: Arc<dyn PromptService>,
    pub opener: Arc<dyn UrlOpener>,
    pub ui: Arc<dyn UiDispatcher>,
    pub clock: Arc<dyn Clock>,
}

struct GateInner {
    settings: RatingSettings,
    keys: PreferenceKeys,
    store: Arc<dyn PreferenceStore>,
    services: GateServices,
    last_prompt: Mutex<Option<PromptRequest>>,
}

/// Decides when to ask for a store rating and records the answer.
///
/// Cheap to clone; clones share the same store and services.
#[derive(Clone)]
pub struct RatingGate {
    inner: Arc<GateInner>,
}

impl RatingGate {
    pub fn new(
        settings: RatingSettings,
        store: Arc<dyn PreferenceStore>,
        services: GateServices,
    ) -> Self {
        Self::with_keys(settings, PreferenceKeys::default(), store, services)
    }

    pub fn with_keys(
        settings: RatingSettings,
        keys: PreferenceKeys,
        store: Arc<dyn PreferenceStore>,
        services: GateServices,
    ) -> Self {
        Self {
            inner: Arc::new(GateInner {
                settings,
                keys,
                store,
                services,
                last_prompt: Mutex::new(None),
            }),
        }
    }

    pub fn settings(&self) -> &RatingSettings {
        &self.inner.settings
    }

    pub fn keys(&self) -> &PreferenceKeys {
        &self.inner.keys
    }

    fn record(&self) -> TrackingRecord<'_> {
        TrackingRecord::new(self.inner.store.as_ref(), &self.inner.keys)
    }

    fn now(&self) -> DateTime<Utc> {
        self.inner.services.clock.now()
    }

    /// Counts a launch, then prompts on the UI thread if everything lines up.
    /// Passing `false` still counts the launch but postpones any prompt.
    pub fn record_launch(&self, can_prompt: bool) -> Result<JoinHandle<()>, GateError> {
        self.spawn_increment(UsageCounter::Uses, can_prompt)
    }

    /// Same as `record_launch(true)`.
    pub fn record_launch_default(&self) -> Result<JoinHandle<()>, GateError> {
        self.record_launch(true)
    }

    /// Returning to the foreground counts as a use.
    pub fn record_foreground(&self, can_prompt: bool) -> Result<JoinHandle<()>, GateError> {
        self.spawn_increment(UsageCounter::Uses, can_prompt)
    }

    pub fn record_significant_event(
        &self,
        can_prompt: bool,
    ) -> Result<JoinHandle<()>, GateError> {
        self.spawn_increment(UsageCounter::SignificantEvents, can_prompt)
    }

    fn spawn_increment(
        &self,
        counter: UsageCounter,
        can_prompt: bool,
    ) -> Result<JoinHandle<()>, GateError> {
        let gate = self.clone();
        let handle = std::thread::Builder::new()
            .name("rate-gate".to_string())
            .spawn(move || {
                if let Err(err) = gate.increment_and_rate(counter, can_prompt) {
                    warn!(
                        event = "increment_failed",
                        counter = counter.as_str(),
                        error = %err
                    );
                }
            })?;
        Ok(handle)
    }

    /// Body of the background task: count, evaluate, and hand the prompt to
    /// the UI dispatcher when allowed.
    pub fn increment_and_rate(
        &self,
        counter: UsageCounter,
        can_prompt: bool,
    ) -> Result<RateOutcome, GateError> {
        self.increment_counter(counter)?;

        if !can_prompt {
            return Ok(RateOutcome::Suppressed);
        }
        if !self.eligible()? {
            return Ok(RateOutcome::NotEligible);
        }
        if !self.inner.services.reachability.is_reachable() {
            info!(event = "prompt_skipped_offline");
            return Ok(RateOutcome::Offline);
        }

        let gate = self.clone();
        self.inner.services.ui.run_on_ui(Box::new(move || {
            if let Err(err) = gate.show_prompt() {
                warn!(event = "prompt_failed", error = %err);
            }
        }));
        Ok(RateOutcome::Prompted)
    }

    /// Bumps `counter` for the running version, or starts a fresh cycle when
    /// the version changed.
    pub fn increment_counter(&self, counter: UsageCounter) -> Result<(), GateError> {
        let version = self.inner.services.metadata.version();
        let record = self.record();
        let now = self.now();

        let tracking_version = match record.tracked_version()? {
            Some(tracked) => tracked,
            None => {
                record.set_tracked_version(&version)?;
                version.clone()
            }
        };

        if self.inner.settings.debug {
            debug!(event = "tracking_version", version = %tracking_version);
        }

        if tracking_version == version {
            record.ensure_first_use_date(now)?;
            let count = record.increment(counter)?;
            if self.inner.settings.debug {
                debug!(event = "count", counter = counter.as_str(), count);
            }
        } else {
            info!(
                event = "version_changed",
                tracked = %tracking_version,
                running = %version
            );
            record.reset(&version, now)?;
        }

        record.synchronize()?;
        Ok(())
    }

    /// Starts a fresh tracking cycle for the running version.
    pub fn reset_tracking(&self) -> Result<(), GateError> {
        let version = self.inner.services.metadata.version();
        let record = self.record();
        record.reset(&version, self.now())?;
        record.synchronize()?;
        Ok(())
    }

    pub fn snapshot(&self) -> Result<TrackingSnapshot, GateError> {
        Ok(self.record().snapshot()?)
    }

    pub fn eligible(&self) -> Result<bool, GateError> {
        self.eligible_at(self.now())
    }

    pub fn eligible_at(&self, now: DateTime<Utc>) -> Result<bool, GateError> {
        if self.inner.settings.debug {
            return Ok(true);
        }
        let snapshot = self.snapshot()?;
        Ok(rating_conditions_met(&self.inner.settings, &snapshot, now))
    }

    /// First check that currently blocks the prompt, ignoring debug mode.
    pub fn unmet_condition(&self) -> Result<Option<UnmetCondition>, GateError> {
        let snapshot = self.snapshot()?;
        Ok(unmet_condition(&self.inner.settings, &snapshot, self.now()))
    }

    pub fn prompt_request(&self) -> PromptRequest {
        let settings = &self.inner.settings;
        PromptRequest {
            title: settings.message_title.clone(),
            message: settings.message.clone(),
            rate_button: settings.rate_button.clone(),
            cancel_button: settings.cancel_button.clone(),
            rate_later_button: settings.rate_later_button.clone(),
        }
    }

    /// Most recently presented prompt.
    pub fn last_prompt(&self) -> Option<PromptRequest> {
        self.inner
            .last_prompt
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Presents the prompt and records the answer. Call on the UI thread.
    pub fn show_prompt(&self) -> Result<PromptChoice, GateError> {
        let request = self.prompt_request();
        match self.inner.last_prompt.lock() {
            Ok(mut guard) => *guard = Some(request.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(request.clone()),
        }

        let choice = self.inner.services.prompt.present(&request);
        info!(event = "prompt_answered", choice = choice.as_str());
        self.record_user_response(choice)?;
        Ok(choice)
    }

    pub fn record_user_response(&self, choice: PromptChoice) -> Result<(), GateError> {
        match choice {
            PromptChoice::Rate => self.rate_app(),
            PromptChoice::Decline => {
                let record = self.record();
                record.mark_declined()?;
                record.synchronize()?;
                Ok(())
            }
            PromptChoice::RemindLater => {
                let record = self.record();
                record.set_reminder_request_date(self.now())?;
                record.synchronize()?;
                Ok(())
            }
        }
    }

    /// Marks this version rated and opens its store review page. Use directly
    /// for an explicit "Rate this app" command.
    pub fn rate_app(&self) -> Result<(), GateError> {
        let url = review_url(self.inner.settings.app_id);
        let record = self.record();
        record.mark_rated()?;
        record.synchronize()?;

        info!(event = "open_review_page", url = %url);
        self.inner.services.opener.open(&url)?;
        Ok(())
    }
}
