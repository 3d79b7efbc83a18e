//! SQLite-backed [`SendStore`].

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use rusqlite::{types::Value, Connection};
use uuid::Uuid;

use crate::store::{NewScheduledSend, SendStore, SendUpdate, StoreError};
use crate::types::{ScheduledSend, SendPayload, SendStatus};

/// Initialise the scheduled-send schema in `conn`.
///
/// Creates the `scheduled_sends` table (idempotent) and an index on `status`
/// so rehydration stays efficient with thousands of historical records.
pub fn init_db(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS scheduled_sends (
            id              TEXT    NOT NULL PRIMARY KEY,
            destination     TEXT    NOT NULL,
            payload         TEXT    NOT NULL,   -- JSON-encoded SendPayload enum
            scheduled_time  TEXT    NOT NULL,   -- RFC 3339 with local offset
            cron_expression TEXT,
            repeat          INTEGER NOT NULL DEFAULT 0,
            status          TEXT    NOT NULL DEFAULT 'pending',
            sent            INTEGER NOT NULL DEFAULT 0,
            error           TEXT,
            last_sent_at    TEXT,               -- RFC 3339 or NULL
            created_at      TEXT    NOT NULL
        ) STRICT;

        -- Rehydration: SELECT … WHERE status = 'pending'
        CREATE INDEX IF NOT EXISTS idx_scheduled_sends_status ON scheduled_sends (status);
        ",
    )?;
    Ok(())
}

const SELECT_COLUMNS: &str = "id, destination, payload, scheduled_time, cron_expression,
        repeat, status, sent, error, last_sent_at, created_at";

/// SQLite implementation of [`SendStore`].
///
/// Holds its own `Connection` behind a mutex so the engine's spawned jobs can
/// write outcomes without conflicting with callers creating new records.
pub struct SqliteSendStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSendStore {
    /// Wrap an open connection, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self, StoreError> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open (or create) the database at `path` in WAL mode.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::new(conn)
    }
}

type RawRow = (
    String,         // id
    String,         // destination
    String,         // payload JSON
    String,         // scheduled_time
    Option<String>, // cron_expression
    bool,           // repeat
    String,         // status
    bool,           // sent
    Option<String>, // error
    Option<String>, // last_sent_at
    String,         // created_at
);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
    ))
}

fn parse_local(s: &str) -> Option<DateTime<Local>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Local))
}

/// Decode a raw row; rows with undecodable columns are dropped by callers.
fn decode_row(raw: RawRow) -> Option<ScheduledSend> {
    let (
        id,
        destination,
        payload_json,
        scheduled_time,
        cron_expression,
        repeat,
        status_str,
        sent,
        error,
        last_sent_at,
        created_at,
    ) = raw;
    let payload: SendPayload = serde_json::from_str(&payload_json).ok()?;
    let status: SendStatus = status_str.parse().ok()?;
    Some(ScheduledSend {
        id,
        destination,
        payload,
        scheduled_time: parse_local(&scheduled_time)?,
        cron_expression,
        repeat,
        status,
        sent,
        error,
        last_sent_at: last_sent_at.as_deref().and_then(parse_local),
        created_at: parse_local(&created_at)?,
    })
}

#[async_trait]
impl SendStore for SqliteSendStore {
    async fn find_pending(&self) -> Result<Vec<ScheduledSend>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM scheduled_sends
             WHERE status = 'pending' ORDER BY created_at"
        ))?;
        let records = stmt
            .query_map([], read_row)?
            .filter_map(|r| r.ok())
            .filter_map(decode_row)
            .collect();
        Ok(records)
    }

    async fn insert(&self, new: NewScheduledSend) -> Result<ScheduledSend, StoreError> {
        let conn = self.conn.lock().unwrap();
        let id = Uuid::new_v4().to_string();
        let now = Local::now();
        let payload_json = serde_json::to_string(&new.payload)?;

        conn.execute(
            "INSERT INTO scheduled_sends
             (id, destination, payload, scheduled_time, cron_expression,
              repeat, status, sent, error, last_sent_at, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,'pending',0,NULL,NULL,?7)",
            rusqlite::params![
                id,
                new.destination,
                payload_json,
                new.scheduled_time.to_rfc3339(),
                new.cron_expression,
                new.repeat,
                now.to_rfc3339(),
            ],
        )?;

        Ok(ScheduledSend {
            id,
            destination: new.destination,
            payload: new.payload,
            scheduled_time: new.scheduled_time,
            cron_expression: new.cron_expression,
            repeat: new.repeat,
            status: SendStatus::Pending,
            sent: false,
            error: None,
            last_sent_at: None,
            created_at: now,
        })
    }

    async fn update_by_id(&self, id: &str, update: SendUpdate) -> Result<(), StoreError> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(status) = update.status {
            sets.push("status = ?");
            values.push(Value::Text(status.to_string()));
            sets.push("sent = ?");
            values.push(Value::Integer(i64::from(status == SendStatus::Sent)));
        }
        if let Some(at) = update.last_sent_at {
            sets.push("last_sent_at = ?");
            values.push(Value::Text(at.to_rfc3339()));
        }
        if let Some(note) = update.error {
            sets.push("error = ?");
            values.push(Value::Text(note));
        }
        if sets.is_empty() {
            return Ok(());
        }
        values.push(Value::Text(id.to_string()));

        let sql = format!(
            "UPDATE scheduled_sends SET {} WHERE id = ?",
            sets.join(", ")
        );
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        if n == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ScheduledSend>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM scheduled_sends WHERE id = ?1"
        ))?;
        let mut rows = stmt.query_map([id], read_row)?;
        match rows.next() {
            Some(raw) => Ok(decode_row(raw?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store() -> SqliteSendStore {
        SqliteSendStore::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn text_send(destination: &str) -> NewScheduledSend {
        NewScheduledSend {
            destination: destination.to_string(),
            payload: SendPayload::Text {
                body: "hello".to_string(),
            },
            scheduled_time: Local::now() + Duration::minutes(5),
            repeat: false,
            cron_expression: None,
        }
    }

    #[tokio::test]
    async fn insert_then_find_pending() {
        let store = store();
        let record = store.insert(text_send("123@c.us")).await.unwrap();
        assert_eq!(record.status, SendStatus::Pending);
        assert!(!record.sent);

        let pending = store.find_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, record.id);
        assert_eq!(pending[0].destination, "123@c.us");
        assert_eq!(pending[0].payload, record.payload);
    }

    #[tokio::test]
    async fn delivered_update_sets_terminal_state_and_mirror() {
        let store = store();
        let record = store.insert(text_send("x")).await.unwrap();
        let fired_at = Local::now();

        store
            .update_by_id(&record.id, SendUpdate::delivered(fired_at))
            .await
            .unwrap();

        let current = store.find_by_id(&record.id).await.unwrap().unwrap();
        assert_eq!(current.status, SendStatus::Sent);
        assert!(current.sent);
        assert!(current.last_sent_at.is_some());
        // Terminal records no longer rehydrate.
        assert!(store.find_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_update_records_note_and_clears_mirror() {
        let store = store();
        let record = store.insert(text_send("x")).await.unwrap();

        store
            .update_by_id(&record.id, SendUpdate::failed("scheduled time is in the past"))
            .await
            .unwrap();

        let current = store.find_by_id(&record.id).await.unwrap().unwrap();
        assert_eq!(current.status, SendStatus::Failed);
        assert!(!current.sent);
        assert_eq!(
            current.error.as_deref(),
            Some("scheduled time is in the past")
        );
    }

    #[tokio::test]
    async fn fired_update_moves_timestamp_only() {
        let store = store();
        let mut new = text_send("x");
        new.repeat = true;
        new.cron_expression = Some("*/1 * * * * *".to_string());
        let record = store.insert(new).await.unwrap();

        store
            .update_by_id(&record.id, SendUpdate::fired(Local::now()))
            .await
            .unwrap();

        let current = store.find_by_id(&record.id).await.unwrap().unwrap();
        assert_eq!(current.status, SendStatus::Pending);
        assert!(current.last_sent_at.is_some());
        // Still pending, so still eligible for rehydration.
        assert_eq!(store.find_pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let store = store();
        let err = store
            .update_by_id("missing", SendUpdate::failed("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn media_payload_round_trips() {
        let store = store();
        let mut new = text_send("x");
        new.payload = SendPayload::Media {
            body: "caption".to_string(),
            path: "/var/media/report.pdf".to_string(),
        };
        let record = store.insert(new).await.unwrap();

        let current = store.find_by_id(&record.id).await.unwrap().unwrap();
        assert_eq!(
            current.payload,
            SendPayload::Media {
                body: "caption".to_string(),
                path: "/var/media/report.pdf".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn find_by_id_missing_is_none() {
        let store = store();
        assert!(store.find_by_id("missing").await.unwrap().is_none());
    }
}
