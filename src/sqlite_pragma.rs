//! Connection-level SQLite tuning shared by every connection the sweeper opens

use rusqlite::Connection;
use std::time::Duration;

/// Apply WAL + pragmas tuned for one writer and short transactions.
///
/// - `journal_mode = WAL`: readers (the activity logger) never block on the sweeper
/// - `synchronous = NORMAL`: safe with WAL, fewer fsyncs
/// - `foreign_keys = ON`: feed items and actions must reference real users/teams
/// - busy timeout 5s: the logger and the sweeper share the file
pub fn apply_optimized_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    // journal_mode answers with the resulting mode
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "wal_autocheckpoint", 1000)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(())
}
