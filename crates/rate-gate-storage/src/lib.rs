mod memory;
mod sqlite;
mod tracking;

pub use memory::MemoryPreferences;
pub use sqlite::{SqlitePreferences, PREFERENCES_SCHEMA_VERSION};
pub use tracking::TrackingRecord;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("unknown value kind {kind} for key {key}")]
    UnknownValueKind { key: String, kind: String },
    #[error("unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },
    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

/// A single stored preference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
}

impl PrefValue {
    pub fn kind(&self) -> &'static str {
        match self {
            PrefValue::Boolean(_) => "boolean",
            PrefValue::Integer(_) => "integer",
            PrefValue::Double(_) => "double",
            PrefValue::String(_) => "string",
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self {
            PrefValue::String(value) => Some(value.clone()),
            PrefValue::Integer(value) => Some(value.to_string()),
            PrefValue::Double(value) => Some(value.to_string()),
            PrefValue::Boolean(_) => None,
        }
    }

    pub fn as_integer(&self) -> i64 {
        match self {
            PrefValue::Integer(value) => *value,
            PrefValue::Double(value) => value.trunc() as i64,
            PrefValue::Boolean(value) => i64::from(*value),
            PrefValue::String(value) => {
                let trimmed = value.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().map(|v| v.trunc() as i64))
                    .unwrap_or(0)
            }
        }
    }

    pub fn as_double(&self) -> f64 {
        match self {
            PrefValue::Double(value) => *value,
            PrefValue::Integer(value) => *value as f64,
            PrefValue::Boolean(value) => f64::from(u8::from(*value)),
            PrefValue::String(value) => value.trim().parse::<f64>().unwrap_or(0.0),
        }
    }

    pub fn as_boolean(&self) -> bool {
        match self {
            PrefValue::Boolean(value) => *value,
            PrefValue::Integer(value) => *value != 0,
            PrefValue::Double(value) => *value != 0.0,
            PrefValue::String(value) => matches!(
                value.trim().to_lowercase().as_str(),
                "true" | "yes" | "1"
            ),
        }
    }
}

/// Flat key/value persistence scoped to one app installation.
///
/// Reads of a missing key fall back to the zero value of the requested type,
/// which the gate treats as "never happened". Writes become durable on
/// [`PreferenceStore::synchronize`]; implementations must make them visible
/// to reads before that.
pub trait PreferenceStore: Send + Sync {
    fn value(&self, key: &str) -> Result<Option<PrefValue>, StorageError>;
    fn set_value(&self, key: &str, value: PrefValue) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    fn synchronize(&self) -> Result<(), StorageError>;

    fn string(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.value(key)?.and_then(|value| value.as_string()))
    }

    fn integer(&self, key: &str) -> Result<i64, StorageError> {
        Ok(self.value(key)?.map(|value| value.as_integer()).unwrap_or(0))
    }

    fn double(&self, key: &str) -> Result<f64, StorageError> {
        Ok(self.value(key)?.map(|value| value.as_double()).unwrap_or(0.0))
    }

    fn boolean(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.value(key)?.map(|value| value.as_boolean()).unwrap_or(false))
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_value(key, PrefValue::String(value.to_string()))
    }

    fn set_integer(&self, key: &str, value: i64) -> Result<(), StorageError> {
        self.set_value(key, PrefValue::Integer(value))
    }

    fn set_double(&self, key: &str, value: f64) -> Result<(), StorageError> {
        self.set_value(key, PrefValue::Double(value))
    }

    fn set_boolean(&self, key: &str, value: bool) -> Result<(), StorageError> {
        self.set_value(key, PrefValue::Boolean(value))
    }
}
