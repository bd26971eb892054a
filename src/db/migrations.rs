use rusqlite::Connection;

use super::DbError;

/// Schema steps; step `i` moves `PRAGMA user_version` from `i` to `i + 1`.
/// Append only.
const STEPS: &[&str] = &[
    // v1: key/value settings
    r#"
CREATE TABLE settings (
    key         TEXT PRIMARY KEY,
    value_json  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
"#,
    // v2: last-known-good collection
    r#"
CREATE TABLE snapshots (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    fetched_at    TEXT NOT NULL,
    fingerprint   TEXT NOT NULL,
    record_count  INTEGER NOT NULL,
    records_json  TEXT NOT NULL
);
"#,
];

/// Bring the schema up to date and return the resulting version.
pub(super) fn migrate(conn: &mut Connection) -> Result<usize, DbError> {
    let current: usize = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current > STEPS.len() {
        return Err(DbError::Migration(format!(
            "database is at v{current}, newer than this build (v{})",
            STEPS.len()
        )));
    }

    for (index, sql) in STEPS.iter().enumerate().skip(current) {
        let target = index + 1;
        tracing::info!("migrating database to v{target}");
        let tx = conn.transaction()?;
        tx.execute_batch(sql)
            .map_err(|e| DbError::Migration(format!("v{target}: {e}")))?;
        tx.pragma_update(None, "user_version", target as i64)?;
        tx.commit()?;
    }

    Ok(STEPS.len())
}
