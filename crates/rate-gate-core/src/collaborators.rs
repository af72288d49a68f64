//! Host-supplied services the gate consumes.
//!
//! The gate never touches a preference system, a dialog toolkit or the OS URL
//! handler directly; every side effect goes through one of these traits.

use crate::PromptChoice;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use thiserror::Error;

/// Read-only facts about the running application.
pub trait AppMetadata: Send + Sync {
    fn version(&self) -> String;
    fn display_name(&self) -> String;
}

pub trait NetworkReachability: Send + Sync {
    fn is_reachable(&self) -> bool;
}

/// Title, body and button labels for one rating prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub title: String,
    pub message: String,
    pub rate_button: String,
    pub cancel_button: String,
    pub rate_later_button: String,
}

/// Modal dialog. Only called from inside a job handed to [`UiDispatcher`].
pub trait PromptService: Send + Sync {
    fn present(&self, request: &PromptRequest) -> PromptChoice;
}

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("failed to launch url handler: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("url handler exited with {status}")]
    HandlerFailed { status: String },
}

pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<(), OpenError>;
}

pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Marshals work onto the thread that owns the UI.
pub trait UiDispatcher: Send + Sync {
    fn run_on_ui(&self, job: UiJob);
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = at;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
