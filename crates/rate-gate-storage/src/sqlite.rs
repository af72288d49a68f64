use crate::{PrefValue, PreferenceStore, StorageError};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

pub const PREFERENCES_SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone)]
enum PendingWrite {
    Set(PrefValue),
    Remove,
}

/// SQLite-backed preferences. Writes are buffered in memory, visible to
/// reads right away, and committed in one transaction by `synchronize`.
pub struct SqlitePreferences {
    conn: Mutex<Connection>,
    pending: Mutex<BTreeMap<String, PendingWrite>>,
}

impl SqlitePreferences {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        let store = Self {
            conn: Mutex::new(conn),
            pending: Mutex::new(BTreeMap::new()),
        };
        store.migrate()?;
        Ok(store)
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Poisoned("sqlite connection"))
    }

    fn pending(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, PendingWrite>>, StorageError> {
        self.pending
            .lock()
            .map_err(|_| StorageError::Poisoned("pending writes"))
    }

    pub fn schema_version(&self) -> Result<i64, StorageError> {
        Ok(self
            .conn()?
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    pub fn migrate(&self) -> Result<(), StorageError> {
        let current = self.schema_version()?;
        if current > PREFERENCES_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchemaVersion {
                found: current,
                supported: PREFERENCES_SCHEMA_VERSION,
            });
        }

        if current < 1 {
            let conn = self.conn()?;
            let sql = include_str!("../migrations/0001_preferences.sql");
            conn.execute_batch(sql)?;
            conn.execute("PRAGMA user_version = 1", []).map(|_| ())?;
        }

        Ok(())
    }

    /// Writes not yet committed by `synchronize`.
    pub fn pending_count(&self) -> Result<usize, StorageError> {
        Ok(self.pending()?.len())
    }

    fn stored_value(&self, key: &str) -> Result<Option<PrefValue>, StorageError> {
        let row = self
            .conn()?
            .query_row(
                "SELECT value_kind, value_json FROM preferences WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        row.map(|(kind, json)| decode_value(key, &kind, &json))
            .transpose()
    }
}

impl PreferenceStore for SqlitePreferences {
    fn value(&self, key: &str) -> Result<Option<PrefValue>, StorageError> {
        if let Some(write) = self.pending()?.get(key) {
            return Ok(match write {
                PendingWrite::Set(value) => Some(value.clone()),
                PendingWrite::Remove => None,
            });
        }
        self.stored_value(key)
    }

    fn set_value(&self, key: &str, value: PrefValue) -> Result<(), StorageError> {
        self.pending()?
            .insert(key.to_string(), PendingWrite::Set(value));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.pending()?.insert(key.to_string(), PendingWrite::Remove);
        Ok(())
    }

    fn synchronize(&self) -> Result<(), StorageError> {
        let mut pending = self.pending()?;
        if pending.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let updated_at = Utc::now().to_rfc3339();
        for (key, write) in pending.iter() {
            match write {
                PendingWrite::Set(value) => {
                    let json = serde_json::to_string(value)
                        .map_err(|err| StorageError::Serialization(err.to_string()))?;
                    tx.execute(
                        "
                        INSERT INTO preferences (key, value_kind, value_json, updated_at)
                        VALUES (?1, ?2, ?3, ?4)
                        ON CONFLICT(key) DO UPDATE SET
                            value_kind=excluded.value_kind,
                            value_json=excluded.value_json,
                            updated_at=excluded.updated_at
                        ",
                        params![key, value.kind(), json, updated_at],
                    )?;
                }
                PendingWrite::Remove => {
                    tx.execute("DELETE FROM preferences WHERE key = ?1", params![key])?;
                }
            }
        }
        tx.commit()?;
        pending.clear();
        Ok(())
    }
}

impl Drop for SqlitePreferences {
    fn drop(&mut self) {
        let _ = self.synchronize();
    }
}

fn decode_value(key: &str, kind: &str, json: &str) -> Result<PrefValue, StorageError> {
    let serialization = |err: serde_json::Error| StorageError::Serialization(err.to_string());
    match kind {
        "boolean" => serde_json::from_str(json)
            .map(PrefValue::Boolean)
            .map_err(serialization),
        "integer" => serde_json::from_str(json)
            .map(PrefValue::Integer)
            .map_err(serialization),
        "double" => serde_json::from_str(json)
            .map(PrefValue::Double)
            .map_err(serialization),
        "string" => serde_json::from_str(json)
            .map(PrefValue::String)
            .map_err(serialization),
        other => Err(StorageError::UnknownValueKind {
            key: key.to_string(),
            kind: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn migrate_sets_schema_version() {
        let store = SqlitePreferences::open_in_memory().expect("open db");
        assert_eq!(
            store.schema_version().expect("schema version"),
            PREFERENCES_SCHEMA_VERSION
        );
        store.migrate().expect("second migrate is a no-op");
    }

    #[test]
    fn rejects_newer_schema() {
        let file = NamedTempFile::new().expect("temp db");
        {
            let conn = Connection::open(file.path()).expect("open raw");
            conn.execute("PRAGMA user_version = 9", []).expect("bump");
        }
        match SqlitePreferences::open(file.path()) {
            Err(StorageError::UnsupportedSchemaVersion { found, supported }) => {
                assert_eq!(found, 9);
                assert_eq!(supported, PREFERENCES_SCHEMA_VERSION);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("newer schema should be rejected"),
        }
    }

    #[test]
    fn unsynchronized_writes_are_readable_but_not_durable() {
        let store = SqlitePreferences::open_in_memory().expect("open db");
        store.set_integer("uses", 3).expect("set");
        assert_eq!(store.integer("uses").expect("get"), 3);
        assert_eq!(store.pending_count().expect("pending"), 1);
        assert_eq!(store.stored_value("uses").expect("stored"), None);

        store.synchronize().expect("sync");
        assert_eq!(store.pending_count().expect("pending"), 0);
        assert_eq!(
            store.stored_value("uses").expect("stored"),
            Some(PrefValue::Integer(3))
        );
    }

    #[test]
    fn values_survive_reopen_with_their_kinds() {
        let file = NamedTempFile::new().expect("temp db");
        {
            let store = SqlitePreferences::open(file.path()).expect("open db");
            store.set_string("version", "1.4.2").expect("set");
            store.set_double("first-use", 1_709_283_600.25).expect("set");
            store.set_boolean("rated", true).expect("set");
            store.set_integer("uses", 21).expect("set");
            store.synchronize().expect("sync");
        }

        let store = SqlitePreferences::open(file.path()).expect("reopen db");
        assert_eq!(
            store.string("version").expect("get").as_deref(),
            Some("1.4.2")
        );
        assert_eq!(store.double("first-use").expect("get"), 1_709_283_600.25);
        assert!(store.boolean("rated").expect("get"));
        assert_eq!(store.integer("uses").expect("get"), 21);
    }

    #[test]
    fn remove_deletes_on_synchronize() {
        let store = SqlitePreferences::open_in_memory().expect("open db");
        store.set_boolean("declined", true).expect("set");
        store.synchronize().expect("sync");

        store.remove("declined").expect("remove");
        assert_eq!(store.value("declined").expect("get"), None);
        store.synchronize().expect("sync");
        assert_eq!(store.stored_value("declined").expect("stored"), None);
    }

    #[test]
    fn drop_flushes_pending_writes() {
        let file = NamedTempFile::new().expect("temp db");
        {
            let store = SqlitePreferences::open(file.path()).expect("open db");
            store.set_integer("events", 2).expect("set");
        }
        let store = SqlitePreferences::open(file.path()).expect("reopen db");
        assert_eq!(store.integer("events").expect("get"), 2);
    }
}
