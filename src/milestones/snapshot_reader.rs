//! SQLite activity snapshot reader
//!
//! Reads the full set of actions of one type (announced and pending) on every
//! sweep. No cursor and no cache: the announced flag lives in the table, so a
//! fresh full read is what keeps the counters exact.

use super::types::{ActivityRecord, Location};
use crate::db::SharedConnection;
use crate::error::{FeedError, Result};
use async_trait::async_trait;

/// Read side of the activity store
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Every action whose type code matches, ascending by id.
    ///
    /// Storage errors are returned unchanged; no retry.
    async fn read_snapshot(&self, action_type_code: &str) -> Result<Vec<ActivityRecord>>;
}

pub struct SqliteActivitySource {
    conn: SharedConnection,
}

impl SqliteActivitySource {
    const SNAPSHOT_SQL: &'static str = "SELECT actions.id, actions.latitude, actions.longitude,
                actions.aggregated, action_types.code,
                users.id, users.name, teams.id, teams.name
         FROM actions
         JOIN action_types ON action_types.id = actions.action_type_id
         JOIN users ON users.id = actions.user_id
         JOIN teams ON teams.id = actions.team_id
         WHERE action_types.code = ?1
         ORDER BY actions.id ASC";

    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ActivitySource for SqliteActivitySource {
    async fn read_snapshot(&self, action_type_code: &str) -> Result<Vec<ActivityRecord>> {
        let conn = self.conn.lock().map_err(|_| FeedError::LockPoisoned)?;
        let mut stmt = conn.prepare_cached(Self::SNAPSHOT_SQL)?;

        let rows = stmt.query_map([action_type_code], |row| {
            Ok(ActivityRecord {
                id: row.get(0)?,
                location: Location::from_columns(row.get(1)?, row.get(2)?),
                announced: row.get(3)?,
                action_type_code: row.get(4)?,
                user_id: row.get(5)?,
                user_name: row.get(6)?,
                team_id: row.get(7)?,
                team_name: row.get(8)?,
            })
        })?;

        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        log::debug!(
            "📥 Snapshot read: {} '{}' actions",
            records.len(),
            action_type_code
        );

        Ok(records)
    }
}
