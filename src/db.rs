//! SQLite bootstrap: connection opening and schema migrations

use crate::error::{FeedError, Result};
use crate::sqlite_pragma::apply_optimized_pragmas;
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Connection handle injected into the reader, the feed store and the publisher.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Open (or create) the database and apply the tuned pragmas.
///
/// Creates the parent directory if it is missing.
pub fn open_connection(db_path: impl AsRef<Path>) -> Result<Connection> {
    let db_path = db_path.as_ref();
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(db_path)?;
    apply_optimized_pragmas(&conn)?;
    Ok(conn)
}

pub fn shared(conn: Connection) -> SharedConnection {
    Arc::new(Mutex::new(conn))
}

/// Run schema migrations from SQL files
///
/// Reads all .sql files from `schema_dir`, sorted by file name (01_, 02_, ...),
/// and executes each one. Every file must use `IF NOT EXISTS` so that running
/// the migrations on an existing database is a no-op.
///
/// Returns the number of files executed.
pub fn run_schema_migrations(conn: &Connection, schema_dir: impl AsRef<Path>) -> Result<usize> {
    let schema_path = schema_dir.as_ref();

    if !schema_path.is_dir() {
        return Err(FeedError::Schema(format!(
            "schema directory not found: {}",
            schema_path.display()
        )));
    }

    let mut sql_files: Vec<_> = fs::read_dir(schema_path)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("sql"))
        .collect();

    sql_files.sort();

    log::info!("🔧 Running schema migrations from: {}", schema_path.display());

    for path in &sql_files {
        let sql = fs::read_to_string(path)?;
        conn.execute_batch(&sql).map_err(|e| {
            FeedError::Schema(format!("{} failed: {}", path.display(), e))
        })?;
        log::debug!("   ├─ applied {}", path.display());
    }

    log::info!("✅ {} schema files applied", sql_files.len());

    Ok(sql_files.len())
}
