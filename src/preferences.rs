use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::StoreError;

/// Account identifier as asserted by the authenticating gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub id: String,
    pub occupation: String,
    pub industry: String,
    pub interests: Vec<String>,
}

/// Who the analysis is for.
#[derive(Debug, Clone, PartialEq)]
pub enum PersonalizationContext {
    Anonymous,
    Profiled(UserPreferences),
}

/// Single-record-per-user preference storage.
pub struct PreferenceStore {
    conn: Mutex<Connection>,
}

impl PreferenceStore {
    pub fn open(path: &str) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let conn =
            Connection::open(path).with_context(|| format!("Failed to open database: {}", path))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to enable WAL mode")?;

        let store = PreferenceStore {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let store = PreferenceStore {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        self.lock()?
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS user_preferences (
                id TEXT PRIMARY KEY,
                occupation TEXT NOT NULL DEFAULT '',
                industry TEXT NOT NULL DEFAULT '',
                interests TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
            )
            .context("Failed to run database migrations")?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn get(&self, user: &UserId) -> Result<Option<UserPreferences>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, occupation, industry, interests FROM user_preferences WHERE id = ?1",
                params![user.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, occupation, industry, interests)) => Ok(Some(UserPreferences {
                id,
                occupation,
                industry,
                interests: serde_json::from_str(&interests)?,
            })),
            None => Ok(None),
        }
    }

    /// Insert or replace the record keyed by `prefs.id`.
    pub fn upsert(&self, prefs: &UserPreferences) -> Result<(), StoreError> {
        let interests = serde_json::to_string(&prefs.interests)?;
        self.lock()?.execute(
            "INSERT INTO user_preferences (id, occupation, industry, interests) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(id) DO UPDATE SET \
                occupation = excluded.occupation, \
                industry = excluded.industry, \
                interests = excluded.interests, \
                updated_at = datetime('now')",
            params![prefs.id, prefs.occupation, prefs.industry, interests],
        )?;
        debug!("Saved preferences for user {}", prefs.id);
        Ok(())
    }

    /// Best-effort lookup: no identity, no record, or a store failure all
    /// resolve to `Anonymous`.
    pub fn resolve(&self, user: Option<&UserId>) -> PersonalizationContext {
        let Some(user) = user else {
            return PersonalizationContext::Anonymous;
        };
        match self.get(user) {
            Ok(Some(prefs)) => PersonalizationContext::Profiled(prefs),
            Ok(None) => {
                debug!("No stored preferences for user {}", user);
                PersonalizationContext::Anonymous
            }
            Err(e) => {
                warn!("Preference lookup failed for user {}, treating as anonymous: {}", user, e);
                PersonalizationContext::Anonymous
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) {
        self.lock().unwrap().execute_batch(sql).unwrap();
    }
}
