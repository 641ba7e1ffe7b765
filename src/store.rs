use crate::error::BotResult;
use crate::model::{normalize_start, EventRecord, Occurrence, StoredEvent};
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Persists event records and answers duplicate queries
pub struct EventStore {
    conn: Connection,
}

/// Minimal view of a stored payload used for duplicate checks.
/// Older rows carry a single top-level date_time instead of occurrences.
#[derive(Debug, Deserialize)]
struct StoredPayload {
    #[serde(default)]
    occurrences: Vec<Occurrence>,
    #[serde(default)]
    date_time: Option<String>,
}

impl StoredPayload {
    fn dedup_start(&self) -> Option<String> {
        self.occurrences
            .first()
            .map(Occurrence::dedup_start)
            .or_else(|| self.date_time.as_deref().map(normalize_start))
    }
}

impl EventStore {
    /// Open the event database, creating the table if it does not exist
    pub fn open(path: &str) -> BotResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS events
             (unique_id TEXT PRIMARY KEY,
              email_address TEXT,
              event_name TEXT,
              timestamp DATETIME,
              event_data TEXT)",
            [],
        )?;
        Ok(Self { conn })
    }

    /// Check whether an event with the same name and first occurrence start
    /// has already been stored
    pub fn is_duplicate(&self, record: &EventRecord) -> BotResult<bool> {
        let Some(candidate) = record.first_dedup_start() else {
            // No occurrences: a stored row with the same name is enough
            let exists = self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM events WHERE event_name = ?1)",
                params![record.name],
                |row| row.get::<_, bool>(0),
            )?;
            return Ok(exists);
        };

        let mut stmt = self
            .conn
            .prepare("SELECT event_data FROM events WHERE event_name = ?1")?;
        let payloads = stmt.query_map(params![record.name], |row| row.get::<_, String>(0))?;

        for payload in payloads {
            let payload = payload?;
            match serde_json::from_str::<StoredPayload>(&payload) {
                Ok(stored) => {
                    if stored.dedup_start().as_deref() == Some(candidate.as_str()) {
                        return Ok(true);
                    }
                }
                Err(e) => {
                    warn!("Skipping undecodable stored payload in duplicate check: {}", e);
                }
            }
        }

        Ok(false)
    }

    /// Persist a record unless it is a duplicate.
    ///
    /// Returns None when the record was skipped as a duplicate; an insert
    /// failure propagates to the caller and is not retried.
    pub fn persist(
        &self,
        mailbox_address: &str,
        record: &EventRecord,
    ) -> BotResult<Option<StoredEvent>> {
        if self.is_duplicate(record)? {
            return Ok(None);
        }

        let event = StoredEvent {
            id: Uuid::new_v4().to_string(),
            mailbox_address: mailbox_address.to_string(),
            name: record.name.clone(),
            created_at: Utc::now(),
            payload: serde_json::to_string(record)?,
        };

        self.conn.execute(
            "INSERT INTO events (unique_id, email_address, event_name, timestamp, event_data)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.id,
                event.mailbox_address,
                event.name,
                event.created_at.to_rfc3339(),
                event.payload
            ],
        )?;

        info!("Stored event '{}' as {}", event.name, event.id);
        Ok(Some(event))
    }

    /// Number of stored rows
    pub fn count(&self) -> BotResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
