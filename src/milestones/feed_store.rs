//! Feed item and action stores
//!
//! Both stores only ever run inside a transaction opened by the caller, so a
//! feed item and the flag flips that go with it commit or roll back together.

use super::types::{Announcement, AnnouncementDraft};
use crate::error::Result;
use rusqlite::{params, Transaction};

/// Persists feed items (announcements)
pub trait FeedItemStore: Send + Sync {
    fn create_announcement(
        &self,
        draft: &AnnouncementDraft,
        tx: &Transaction<'_>,
    ) -> Result<Announcement>;
}

/// Write side of the activity log used by the immediate hook
pub trait ActionStore: Send + Sync {
    /// Flip one action's announced flag.
    fn mark_processed(&self, action_id: i64, tx: &Transaction<'_>) -> Result<()>;
}

/// `feed_items` table backend
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteFeedItemStore;

impl FeedItemStore for SqliteFeedItemStore {
    fn create_announcement(
        &self,
        draft: &AnnouncementDraft,
        tx: &Transaction<'_>,
    ) -> Result<Announcement> {
        let created_at = chrono::Utc::now().timestamp();

        tx.execute(
            "INSERT INTO feed_items (
                type, user_id, entity_kind, entity_id, text, image_path,
                latitude, longitude, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                draft.kind.as_str(),
                draft.author_id,
                draft.target.map(|t| t.kind.as_str()),
                draft.target.map(|t| t.id),
                draft.text,
                draft.image_path,
                draft.location.map(|l| l.latitude),
                draft.location.map(|l| l.longitude),
                created_at,
            ],
        )?;

        let announcement = Announcement {
            id: tx.last_insert_rowid(),
            created_at,
            draft: draft.clone(),
        };

        log::debug!(
            "📰 Feed item {} created ({})",
            announcement.id,
            draft.kind.as_str()
        );

        Ok(announcement)
    }
}

/// `actions` table backend
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteActionStore;

impl ActionStore for SqliteActionStore {
    fn mark_processed(&self, action_id: i64, tx: &Transaction<'_>) -> Result<()> {
        tx.execute(
            "UPDATE actions SET aggregated = 1 WHERE id = ?1",
            params![action_id],
        )?;
        Ok(())
    }
}
