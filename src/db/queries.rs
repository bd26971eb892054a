use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use super::{Database, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotRow {
    pub id: i64,
    pub fetched_at: String,
    pub fingerprint: String,
    pub record_count: i64,
    pub records_json: String,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

pub fn upsert_setting(
    db: &Database,
    key: &str,
    value_json: &str,
    updated_at: &str,
) -> Result<(), DbError> {
    let conn = db.conn()?;
    conn.execute(
        "INSERT INTO settings (key, value_json, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key)
         DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
        params![key, value_json, updated_at],
    )?;
    Ok(())
}

pub fn get_setting(db: &Database, key: &str) -> Result<Option<String>, DbError> {
    let conn = db.conn()?;
    let value = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

// ---------------------------------------------------------------------------
// Snapshots (only the latest one is kept)
// ---------------------------------------------------------------------------

pub fn replace_snapshot(
    db: &Database,
    fetched_at: &str,
    fingerprint: &str,
    records_json: &str,
) -> Result<(), DbError> {
    let record_count = serde_json::from_str::<serde_json::Value>(records_json)
        .ok()
        .and_then(|value| value.as_array().map(|items| items.len() as i64))
        .unwrap_or(0);

    let conn = db.conn()?;
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM snapshots", [])?;
    tx.execute(
        "INSERT INTO snapshots (fetched_at, fingerprint, record_count, records_json)
         VALUES (?1, ?2, ?3, ?4)",
        params![fetched_at, fingerprint, record_count, records_json],
    )?;
    tx.commit()?;
    Ok(())
}

pub fn latest_snapshot(db: &Database) -> Result<Option<SnapshotRow>, DbError> {
    let conn = db.conn()?;
    let row = conn
        .query_row(
            "SELECT id, fetched_at, fingerprint, record_count, records_json
             FROM snapshots ORDER BY id DESC LIMIT 1",
            [],
            |row| {
                Ok(SnapshotRow {
                    id: row.get(0)?,
                    fetched_at: row.get(1)?,
                    fingerprint: row.get(2)?,
                    record_count: row.get(3)?,
                    records_json: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}
