//! Database schema migrations for remindroom.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: base reminders and settings tables.
///
/// Databases written by older builds already have these tables, possibly
/// without the audit columns; `IF NOT EXISTS` leaves them untouched for v2.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS reminders (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL,
            message     TEXT,
            due_time    TEXT NOT NULL,
            recurrence  TEXT,
            enabled     INTEGER DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS settings (
            key   TEXT PRIMARY KEY,
            value TEXT
        );",
    )?;
    set_schema_version(conn, 1)?;
    Ok(())
}

/// Migration v2: audit timestamps.
///
/// Adds `created_at` and `last_modified` when missing and backfills NULLs,
/// then indexes the poller's scan order.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    let columns = table_columns(&tx, "reminders")?;
    if !columns.iter().any(|c| c == "created_at") {
        tx.execute_batch("ALTER TABLE reminders ADD COLUMN created_at TEXT;")?;
    }
    if !columns.iter().any(|c| c == "last_modified") {
        tx.execute_batch("ALTER TABLE reminders ADD COLUMN last_modified TEXT;")?;
    }

    tx.execute_batch(
        "UPDATE reminders
            SET created_at = COALESCE(created_at, datetime('now')),
                last_modified = COALESCE(last_modified, datetime('now'))
          WHERE created_at IS NULL OR last_modified IS NULL;

        CREATE INDEX IF NOT EXISTS idx_reminders_enabled_due ON reminders(enabled, due_time, id);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> SqliteResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<SqliteResult<Vec<_>>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
        let columns = table_columns(&conn, "reminders").unwrap();
        assert!(columns.contains(&"created_at".to_string()));
        assert!(columns.contains(&"last_modified".to_string()));
    }

    #[test]
    fn legacy_table_gains_audit_columns_and_backfill() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE reminders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                message TEXT,
                due_time TEXT NOT NULL,
                recurrence TEXT,
                enabled INTEGER DEFAULT 1
            );
            INSERT INTO reminders (title, due_time) VALUES ('legacy', '2024-01-10 09:00');",
        )
        .unwrap();

        migrate(&conn).unwrap();

        let created: Option<String> = conn
            .query_row("SELECT created_at FROM reminders WHERE title = 'legacy'", [], |r| r.get(0))
            .unwrap();
        assert!(created.is_some());
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }
}
