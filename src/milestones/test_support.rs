//! Shared fixtures for the unit tests in this module tree

use super::types::ActivityRecord;
use crate::db::{open_connection, run_schema_migrations, shared, SharedConnection};
use rusqlite::params;
use std::path::Path;
use tempfile::TempDir;

pub struct SeedDb {
    pub _dir: TempDir,
    pub conn: SharedConnection,
}

/// Temp database with the full schema and reference rows:
///
/// - action types: 1 BEER, 2 IMAGE, 3 TEXT
/// - teams: 1 Tiimi, 2 Kilta
/// - users: 1 Alice (Tiimi), 2 Bob (Tiimi), 3 Carol (Kilta)
pub fn seed_db() -> SeedDb {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_connection(dir.path().join("feed.db")).unwrap();
    run_schema_migrations(&conn, Path::new(env!("CARGO_MANIFEST_DIR")).join("sql")).unwrap();

    conn.execute_batch(
        "INSERT INTO action_types (id, code, name, value) VALUES
             (1, 'BEER', 'Mead', 10), (2, 'IMAGE', 'Image', 0), (3, 'TEXT', 'Text', 0);
         INSERT INTO teams (id, name) VALUES (1, 'Tiimi'), (2, 'Kilta');
         INSERT INTO users (id, name, team_id) VALUES
             (1, 'Alice', 1), (2, 'Bob', 1), (3, 'Carol', 2);",
    )
    .unwrap();

    SeedDb {
        _dir: dir,
        conn: shared(conn),
    }
}

/// Insert unannounced BEER actions given as `(id, user_id, team_id)`.
pub fn insert_actions(conn: &SharedConnection, rows: &[(i64, i64, i64)]) {
    let c = conn.lock().unwrap();
    for (id, user_id, team_id) in rows {
        c.execute(
            "INSERT INTO actions (id, action_type_id, user_id, team_id, created_at)
             VALUES (?1, 1, ?2, ?3, 0)",
            params![id, user_id, team_id],
        )
        .unwrap();
    }
}

/// Insert `count` consecutive BEER actions for one owner, starting at `first_id`.
pub fn insert_run(
    conn: &SharedConnection,
    first_id: i64,
    count: i64,
    user_id: i64,
    team_id: i64,
    announced: bool,
) {
    let c = conn.lock().unwrap();
    for id in first_id..first_id + count {
        c.execute(
            "INSERT INTO actions (id, action_type_id, user_id, team_id, aggregated, created_at)
             VALUES (?1, 1, ?2, ?3, ?4, 0)",
            params![id, user_id, team_id, announced],
        )
        .unwrap();
    }
}

/// In-memory record with generated owner names.
pub fn record(id: i64, user_id: i64, team_id: i64, announced: bool) -> ActivityRecord {
    ActivityRecord {
        id,
        location: None,
        announced,
        action_type_code: "BEER".to_string(),
        user_id,
        user_name: format!("user-{}", user_id),
        team_id,
        team_name: format!("team-{}", team_id),
    }
}
