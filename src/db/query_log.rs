//! Query history repository

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DbPool;
use crate::{Error, Result};

/// One handled query
#[derive(Debug, Clone)]
pub struct QueryLog {
    pub id: String,
    pub user_id: String,
    pub query_text: String,
    pub intent: String,
    pub confidence: f64,
    pub response_text: String,
    pub success: bool,
    pub stt_engine: Option<String>,
    pub elapsed_ms: u64,
    pub location: Option<(f64, f64)>,
    pub created_at: DateTime<Utc>,
}

/// Fields for one new history row
#[derive(Debug, Clone, Copy, Default)]
pub struct NewQueryLog<'a> {
    pub user_id: &'a str,
    pub query_text: &'a str,
    pub intent: &'a str,
    pub confidence: f64,
    pub response_text: &'a str,
    pub success: bool,
    pub stt_engine: Option<&'a str>,
    pub elapsed_ms: u64,
    pub location: Option<(f64, f64)>,
}

/// Query history repository
#[derive(Clone)]
pub struct QueryLogRepo {
    pool: DbPool,
}

impl QueryLogRepo {
    /// Create a new query log repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append one query record
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn record(&self, entry: &NewQueryLog<'_>) -> Result<String> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let (lat, lon) = match entry.location {
            Some((lat, lon)) => (Some(lat), Some(lon)),
            None => (None, None),
        };

        conn.execute(
            "INSERT INTO query_log
                (id, user_id, query_text, intent, confidence, response_text, success,
                 stt_engine, elapsed_ms, lat, lon, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                id,
                entry.user_id,
                entry.query_text,
                entry.intent,
                entry.confidence,
                entry.response_text,
                i32::from(entry.success),
                entry.stt_engine,
                entry.elapsed_ms,
                lat,
                lon,
                now,
            ],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(id)
    }

    /// Most recent queries for a user, newest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn recent(&self, user_id: &str, limit: u32) -> Result<Vec<QueryLog>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT id, user_id, query_text, intent, confidence, response_text, success,
                    stt_engine, elapsed_ms, lat, lon, created_at
             FROM query_log WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2",
        )?;

        let rows = stmt.query_map(rusqlite::params![user_id, limit], |row| {
            let lat: Option<f64> = row.get(9)?;
            let lon: Option<f64> = row.get(10)?;
            Ok(QueryLog {
                id: row.get(0)?,
                user_id: row.get(1)?,
                query_text: row.get(2)?,
                intent: row.get(3)?,
                confidence: row.get(4)?,
                response_text: row.get(5)?,
                success: row.get::<_, i32>(6)? != 0,
                stt_engine: row.get(7)?,
                elapsed_ms: row.get(8)?,
                location: lat.zip(lon),
                created_at: parse_datetime(&row.get::<_, String>(11)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Total handled queries for a user
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn count(&self, user_id: &str) -> Result<u64> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM query_log WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;

        Ok(count)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_record_and_recent() {
        let pool = db::init_memory().unwrap();
        let repo = QueryLogRepo::new(pool);

        repo.record(&NewQueryLog {
            user_id: "u1",
            query_text: "dónde está la parada más cercana",
            intent: "nearest_stop",
            confidence: 0.85,
            response_text: "La parada más cercana es Colón",
            success: true,
            stt_engine: Some("local"),
            elapsed_ms: 412,
            location: Some((39.4699, -0.3763)),
        })
        .unwrap();
        repo.record(&NewQueryLog {
            user_id: "u1",
            query_text: "hola",
            intent: "greeting",
            confidence: 1.0,
            response_text: "¡Hola!",
            success: true,
            ..NewQueryLog::default()
        })
        .unwrap();

        let recent = repo.recent("u1", 10).unwrap();
        assert_eq!(recent.len(), 2);

        let stop = recent.iter().find(|q| q.intent == "nearest_stop").unwrap();
        assert_eq!(stop.elapsed_ms, 412);
        assert_eq!(stop.location, Some((39.4699, -0.3763)));

        let greeting = recent.iter().find(|q| q.intent == "greeting").unwrap();
        assert!(greeting.location.is_none());

        assert_eq!(repo.count("u1").unwrap(), 2);
        assert_eq!(repo.count("nobody").unwrap(), 0);
    }

    #[test]
    fn test_recent_respects_limit() {
        let pool = db::init_memory().unwrap();
        let repo = QueryLogRepo::new(pool);
        for i in 0..5 {
            let query_text = format!("q{i}");
            repo.record(&NewQueryLog {
                user_id: "u1",
                query_text: &query_text,
                intent: "general",
                confidence: 0.3,
                response_text: "r",
                ..NewQueryLog::default()
            })
            .unwrap();
        }
        assert_eq!(repo.recent("u1", 3).unwrap().len(), 3);
    }
}
