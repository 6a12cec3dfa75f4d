//! User preference repository

use chrono::Utc;

use super::DbPool;
use crate::voice::VoiceSpeed;
use crate::{Error, Result};

/// Key under which the speech rate preference is stored
const VOICE_SPEED_KEY: &str = "voice_speed";

/// User preference repository
#[derive(Clone)]
pub struct PreferenceRepo {
    pool: DbPool,
}

impl PreferenceRepo {
    /// Create a new preference repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Fetch a preference value
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn get(&self, user_id: &str, key: &str) -> Result<Option<String>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM user_preferences WHERE user_id = ?1 AND key = ?2",
                [user_id, key],
                |row| row.get(0),
            )
            .ok();

        Ok(value)
    }

    /// Store a preference value, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn set(&self, user_id: &str, key: &str, value: &str) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO user_preferences (user_id, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, key) DO UPDATE SET value = ?3, updated_at = ?4",
            [user_id, key, value, &now],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    /// Speech rate for a user; normal when unset
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn voice_speed(&self, user_id: &str) -> Result<VoiceSpeed> {
        Ok(self
            .get(user_id, VOICE_SPEED_KEY)?
            .map_or(VoiceSpeed::Normal, |v| VoiceSpeed::from_preference(&v)))
    }

    /// Store a user's speech rate
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn set_voice_speed(&self, user_id: &str, speed: VoiceSpeed) -> Result<()> {
        self.set(user_id, VOICE_SPEED_KEY, speed.as_str())
    }
}
