//! Transactional announcement publisher
//!
//! ## Milestone path
//!
//! One SQLite transaction per detected event:
//!
//! 1. claim the `(entity_kind, entity_id, trigger_action_id)` marker in
//!    `milestone_ledger` (`INSERT OR IGNORE`); already claimed → drop, no-op
//! 2. create the feed item through the [`FeedItemStore`]
//! 3. flip `aggregated` on the entity's actions with `id <= trigger` that are
//!    still unannounced
//! 4. link the marker to the feed item, commit
//!
//! Dropping the transaction on any error rolls all four steps back.
//!
//! The announced flag is shared by the user and the team side of an action,
//! so step 3 may legitimately match nothing (the user event for the same
//! action committed first). The marker, not the update count, decides whether
//! an event was already published.
//!
//! ## Immediate path
//!
//! IMAGE and TEXT submissions are posted as they arrive, inside the
//! transaction the ingestion path already holds.

use super::feed_store::{ActionStore, FeedItemStore};
use super::types::{
    ActionKind, Announcement, AnnouncementDraft, EntityKind, FeedItemKind, IncomingAction,
    MilestoneEvent,
};
use crate::db::SharedConnection;
use crate::error::{FeedError, Result};
use rusqlite::{params, Transaction};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    Published {
        announcement: Announcement,
        rows_marked: usize,
    },
    /// The marker for this (entity, trigger) already exists
    AlreadyPublished,
}

pub struct AnnouncementPublisher {
    conn: SharedConnection,
    feed: Arc<dyn FeedItemStore>,
    actions: Arc<dyn ActionStore>,
}

impl AnnouncementPublisher {
    pub fn new(
        conn: SharedConnection,
        feed: Arc<dyn FeedItemStore>,
        actions: Arc<dyn ActionStore>,
    ) -> Self {
        Self { conn, feed, actions }
    }

    /// Publish one milestone event atomically.
    pub fn publish(&self, event: &MilestoneEvent) -> Result<PublishOutcome> {
        let owner = match event.entity.kind {
            EntityKind::User => event.trigger.user_id,
            EntityKind::Team => event.trigger.team_id,
        };
        if owner != event.entity.id {
            return Err(FeedError::InvariantViolation(format!(
                "trigger action {} does not belong to {}",
                event.trigger.id, event.entity
            )));
        }

        let mut conn = self.conn.lock().map_err(|_| FeedError::LockPoisoned)?;
        let tx = conn.transaction()?;

        let claimed = tx.execute(
            "INSERT OR IGNORE INTO milestone_ledger (
                entity_kind, entity_id, trigger_action_id, milestone, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.entity.kind.as_str(),
                event.entity.id,
                event.trigger.id,
                event.milestone as i64,
                chrono::Utc::now().timestamp(),
            ],
        )?;

        if claimed == 0 {
            log::debug!(
                "⏭️  {} milestone {} (trigger {}) already published",
                event.entity,
                event.milestone,
                event.trigger.id
            );
            return Ok(PublishOutcome::AlreadyPublished);
        }

        let announcement = self.feed.create_announcement(&event.draft, &tx)?;
        let rows_marked =
            Self::mark_announced(&tx, event.entity.kind, event.entity.id, event.trigger.id)?;

        tx.execute(
            "UPDATE milestone_ledger SET feed_item_id = ?1
             WHERE entity_kind = ?2 AND entity_id = ?3 AND trigger_action_id = ?4",
            params![
                announcement.id,
                event.entity.kind.as_str(),
                event.entity.id,
                event.trigger.id,
            ],
        )?;

        tx.commit()?;

        log::info!(
            "🎉 {} reached milestone {} (trigger action {}, {} actions marked)",
            event.entity,
            event.milestone,
            event.trigger.id,
            rows_marked
        );

        Ok(PublishOutcome::Published {
            announcement,
            rows_marked,
        })
    }

    /// Flip the entity's unannounced actions up to and including the trigger.
    ///
    /// Catches earlier actions left over from a failed publish too, not only
    /// the ones in this sweep's pending list.
    fn mark_announced(
        tx: &Transaction<'_>,
        kind: EntityKind,
        entity_id: i64,
        trigger_id: i64,
    ) -> Result<usize> {
        let sql = match kind {
            EntityKind::User => {
                "UPDATE actions SET aggregated = 1
                 WHERE user_id = ?1 AND id <= ?2 AND aggregated = 0"
            }
            EntityKind::Team => {
                "UPDATE actions SET aggregated = 1
                 WHERE team_id = ?1 AND id <= ?2 AND aggregated = 0"
            }
        };

        Ok(tx.execute(sql, params![entity_id, trigger_id])?)
    }

    /// Post an IMAGE or TEXT submission right away.
    ///
    /// Runs inside the caller's transaction; errors go back to the caller and
    /// the caller decides whether to roll back. Other kinds are left to the
    /// sweep and return `None`.
    pub fn publish_immediate(
        &self,
        action: &IncomingAction,
        tx: &Transaction<'_>,
    ) -> Result<Option<Announcement>> {
        publish_immediate_with(self.feed.as_ref(), self.actions.as_ref(), action, tx)
    }
}

/// Immediate path against explicit stores.
pub fn publish_immediate_with(
    feed: &dyn FeedItemStore,
    actions: &dyn ActionStore,
    action: &IncomingAction,
    tx: &Transaction<'_>,
) -> Result<Option<Announcement>> {
    if !action.kind.is_immediate() {
        return Ok(None);
    }

    let draft = AnnouncementDraft {
        kind: match action.kind {
            ActionKind::Image => FeedItemKind::Image,
            _ => FeedItemKind::Text,
        },
        target: None,
        author_id: Some(action.user_id),
        text: action.text.clone(),
        image_path: action.image_path.clone(),
        location: action.location,
    };

    let announcement = feed.create_announcement(&draft, tx)?;
    actions.mark_processed(action.id, tx)?;

    log::debug!(
        "📰 Action {} posted immediately as feed item {}",
        action.id,
        announcement.id
    );

    Ok(Some(announcement))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milestones::feed_store::{SqliteActionStore, SqliteFeedItemStore};
    use crate::milestones::test_support::{insert_actions, record, seed_db, SeedDb};
    use crate::milestones::types::{ActivityRecord, EntityRef, Location};
    use rusqlite::Connection;

    fn publisher(conn: &SharedConnection) -> AnnouncementPublisher {
        AnnouncementPublisher::new(
            conn.clone(),
            Arc::new(SqliteFeedItemStore),
            Arc::new(SqliteActionStore),
        )
    }

    fn event(entity: EntityRef, milestone: u64, trigger: ActivityRecord) -> MilestoneEvent {
        MilestoneEvent {
            entity,
            milestone,
            draft: AnnouncementDraft::milestone(entity, format!("{} made it", entity), None),
            trigger,
        }
    }

    fn announced_ids(conn: &Connection) -> Vec<i64> {
        conn.prepare("SELECT id FROM actions WHERE aggregated = 1 ORDER BY id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap()
    }

    fn feed_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM feed_items", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_publish_marks_entity_rows_up_to_trigger() {
        let SeedDb { _dir, conn } = seed_db();
        // (id, user, team)
        insert_actions(&conn, &[(1, 1, 1), (2, 2, 1), (3, 1, 1), (4, 1, 1)]);

        let outcome = publisher(&conn)
            .publish(&event(EntityRef::user(1), 1, record(3, 1, 1, false)))
            .unwrap();

        let PublishOutcome::Published { announcement, rows_marked } = outcome else {
            panic!("expected a published announcement");
        };
        assert_eq!(rows_marked, 2);
        assert_eq!(announcement.draft.target, Some(EntityRef::user(1)));

        let c = conn.lock().unwrap();
        // Bob's action 2 and Alice's later action 4 stay pending
        assert_eq!(announced_ids(&c), vec![1, 3]);
        assert_eq!(feed_count(&c), 1);

        let linked: i64 = c
            .query_row(
                "SELECT feed_item_id FROM milestone_ledger
                 WHERE entity_kind = 'user' AND entity_id = 1 AND trigger_action_id = 3",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(linked, announcement.id);
    }

    #[test]
    fn test_foreign_trigger_is_rejected() {
        let SeedDb { _dir, conn } = seed_db();
        insert_actions(&conn, &[(1, 2, 1)]);

        let err = publisher(&conn)
            .publish(&event(EntityRef::user(1), 1, record(1, 2, 1, false)))
            .unwrap_err();

        assert!(matches!(err, FeedError::InvariantViolation(_)));
        let c = conn.lock().unwrap();
        assert_eq!(feed_count(&c), 0);
        assert!(announced_ids(&c).is_empty());
    }

    #[test]
    fn test_team_scope_uses_team_column() {
        let SeedDb { _dir, conn } = seed_db();
        insert_actions(&conn, &[(1, 1, 1), (2, 3, 2), (3, 2, 1), (4, 2, 1)]);

        publisher(&conn)
            .publish(&event(EntityRef::team(1), 1, record(3, 2, 1, false)))
            .unwrap();

        let c = conn.lock().unwrap();
        assert_eq!(announced_ids(&c), vec![1, 3]);
    }

    #[test]
    fn test_second_publish_is_noop() {
        let SeedDb { _dir, conn } = seed_db();
        insert_actions(&conn, &[(1, 1, 1), (2, 1, 1)]);
        let publisher = publisher(&conn);
        let event = event(EntityRef::user(1), 1, record(1, 1, 1, false));

        assert!(matches!(
            publisher.publish(&event).unwrap(),
            PublishOutcome::Published { rows_marked: 1, .. }
        ));
        assert_eq!(publisher.publish(&event).unwrap(), PublishOutcome::AlreadyPublished);

        let c = conn.lock().unwrap();
        assert_eq!(feed_count(&c), 1);
        assert_eq!(announced_ids(&c), vec![1]);
    }

    #[test]
    fn test_user_and_team_share_trigger() {
        // Alice's first beer is also her team's first beer; both get announced
        // even though the team update finds nothing left to flip.
        let SeedDb { _dir, conn } = seed_db();
        insert_actions(&conn, &[(1, 1, 1)]);
        let publisher = publisher(&conn);

        let user = publisher
            .publish(&event(EntityRef::user(1), 1, record(1, 1, 1, false)))
            .unwrap();
        let team = publisher
            .publish(&event(EntityRef::team(1), 1, record(1, 1, 1, false)))
            .unwrap();

        assert!(matches!(user, PublishOutcome::Published { rows_marked: 1, .. }));
        assert!(matches!(team, PublishOutcome::Published { rows_marked: 0, .. }));
        assert_eq!(feed_count(&conn.lock().unwrap()), 2);
    }

    #[test]
    fn test_failure_rolls_back_marker_and_flags() {
        struct FailingFeed;

        impl FeedItemStore for FailingFeed {
            fn create_announcement(
                &self,
                _draft: &AnnouncementDraft,
                _tx: &Transaction<'_>,
            ) -> Result<Announcement> {
                Err(FeedError::Database(rusqlite::Error::InvalidQuery))
            }
        }

        let SeedDb { _dir, conn } = seed_db();
        insert_actions(&conn, &[(1, 1, 1)]);
        let failing = AnnouncementPublisher::new(
            conn.clone(),
            Arc::new(FailingFeed),
            Arc::new(SqliteActionStore),
        );
        let event = event(EntityRef::user(1), 1, record(1, 1, 1, false));

        assert!(failing.publish(&event).is_err());

        {
            let c = conn.lock().unwrap();
            assert!(announced_ids(&c).is_empty());
            let markers: i64 = c
                .query_row("SELECT COUNT(*) FROM milestone_ledger", [], |row| row.get(0))
                .unwrap();
            assert_eq!(markers, 0);
        }

        // The next attempt with a healthy store goes through
        assert!(matches!(
            publisher(&conn).publish(&event).unwrap(),
            PublishOutcome::Published { rows_marked: 1, .. }
        ));
    }

    #[test]
    fn test_concurrent_publishes_for_disjoint_entities() {
        let SeedDb { _dir, conn } = seed_db();
        insert_actions(&conn, &[(1, 1, 1), (2, 3, 2), (3, 1, 1), (4, 3, 2)]);
        let publisher = Arc::new(publisher(&conn));

        let work = [
            (EntityRef::user(1), record(3, 1, 1, false)),
            (EntityRef::user(3), record(4, 3, 2, false)),
        ];
        let handles: Vec<_> = work
            .into_iter()
            .map(|(entity, trigger)| {
                let publisher = publisher.clone();
                std::thread::spawn(move || publisher.publish(&event(entity, 1, trigger)))
            })
            .collect();

        for handle in handles {
            let outcome = handle.join().unwrap().unwrap();
            assert!(matches!(outcome, PublishOutcome::Published { rows_marked: 2, .. }));
        }

        let c = conn.lock().unwrap();
        assert_eq!(announced_ids(&c), vec![1, 2, 3, 4]);
        assert_eq!(feed_count(&c), 2);
    }

    #[test]
    fn test_immediate_text_and_image() {
        let SeedDb { _dir, conn } = seed_db();
        insert_actions(&conn, &[(1, 1, 1), (2, 2, 1)]);
        let publisher = publisher(&conn);
        let mut c = conn.lock().unwrap();

        let tx = c.transaction().unwrap();
        let text = IncomingAction {
            id: 1,
            kind: ActionKind::Text,
            user_id: 1,
            text: Some("Hyvää wappua!".to_string()),
            image_path: None,
            location: Some(Location { latitude: 60.1, longitude: 24.9 }),
        };
        let image = IncomingAction {
            id: 2,
            kind: ActionKind::Image,
            user_id: 2,
            text: None,
            image_path: Some("user_content/abc.jpg".to_string()),
            location: None,
        };

        let posted_text = publisher.publish_immediate(&text, &tx).unwrap().unwrap();
        let posted_image = publisher.publish_immediate(&image, &tx).unwrap().unwrap();
        tx.commit().unwrap();

        assert_eq!(posted_text.draft.kind, FeedItemKind::Text);
        assert_eq!(posted_text.draft.author_id, Some(1));
        assert_eq!(posted_text.draft.target, None);
        assert_eq!(posted_image.draft.kind, FeedItemKind::Image);
        assert_eq!(posted_image.draft.image_path.as_deref(), Some("user_content/abc.jpg"));

        assert_eq!(announced_ids(&c), vec![1, 2]);
        assert_eq!(feed_count(&c), 2);
    }

    #[test]
    fn test_immediate_ignores_counted_actions() {
        let SeedDb { _dir, conn } = seed_db();
        insert_actions(&conn, &[(1, 1, 1)]);
        let publisher = publisher(&conn);
        let mut c = conn.lock().unwrap();

        let tx = c.transaction().unwrap();
        let beer = IncomingAction {
            id: 1,
            kind: ActionKind::Other("BEER".to_string()),
            user_id: 1,
            text: None,
            image_path: None,
            location: None,
        };
        assert_eq!(publisher.publish_immediate(&beer, &tx).unwrap(), None);
        tx.commit().unwrap();

        assert!(announced_ids(&c).is_empty());
        assert_eq!(feed_count(&c), 0);
    }
}
