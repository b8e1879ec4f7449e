//! Fold a flat activity snapshot into per-user and per-team progress

use super::types::{ActivityRecord, EntityProgress};
use std::collections::BTreeMap;

/// Per-entity progress for one sweep, keyed by entity id
#[derive(Debug, Default)]
pub struct ProgressSnapshot {
    pub users: BTreeMap<i64, EntityProgress>,
    pub teams: BTreeMap<i64, EntityProgress>,
}

impl ProgressSnapshot {
    pub fn record_count(&self) -> u64 {
        self.users.values().map(EntityProgress::total).sum()
    }
}

pub struct ProgressAggregator;

impl ProgressAggregator {
    /// Group records by user and by team.
    ///
    /// Records must arrive ascending by id (the reader's ORDER BY); pending
    /// lists inherit that order. Announced records only bump the counter.
    pub fn aggregate(records: &[ActivityRecord]) -> ProgressSnapshot {
        let mut snapshot = ProgressSnapshot::default();
        let mut last_id: Option<i64> = None;

        for record in records {
            if let Some(prev) = last_id {
                if record.id <= prev {
                    debug_assert!(false, "snapshot not ascending: {} after {}", record.id, prev);
                    log::error!(
                        "Snapshot not ascending by id ({} after {}); pending order is unreliable",
                        record.id,
                        prev
                    );
                }
            }
            last_id = Some(record.id);

            let user = snapshot
                .users
                .entry(record.user_id)
                .or_insert_with(|| EntityProgress::new(record.user_name.as_str()));
            Self::count(user, record);

            let team = snapshot
                .teams
                .entry(record.team_id)
                .or_insert_with(|| EntityProgress::new(record.team_name.as_str()));
            Self::count(team, record);
        }

        snapshot
    }

    fn count(progress: &mut EntityProgress, record: &ActivityRecord) {
        if record.announced {
            progress.announced_count += 1;
        } else {
            progress.pending_count += 1;
            progress.pending_records.push(record.clone());
        }
    }
}
