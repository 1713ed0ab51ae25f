//! Readiness checks for caller-owned connections.

use super::migrations::{current_user_version, latest_version};
use super::{DbError, DbResult};
use rusqlite::Connection;

const REQUIRED_TABLES: [&str; 4] = ["samplekind", "sample", "tray", "place"];

/// Verifies that `conn` is migrated to the latest schema and exposes every
/// table the repositories query.
///
/// Does not mutate the connection; callers that opened the connection
/// themselves must run [`super::migrations::apply_migrations`] first.
pub fn ensure_connection_ready(conn: &Connection) -> DbResult<()> {
    let actual_version = current_user_version(conn)?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(DbError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            return Err(DbError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
