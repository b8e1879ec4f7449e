//! Milestones - Aggregation and Idempotent Announcement Engine
//!
//! Periodically counts counted activity per user and per team, detects the
//! first item and every interval boundary, and posts exactly one feed item
//! per milestone.
//!
//! # Architecture
//!
//! ```text
//! SQLite actions ⋈ users ⋈ teams → SqliteActivitySource
//!     ↓
//! ProgressAggregator (per-entity announced / pending split)
//!     ↓
//! MilestoneDetector (first item, interval boundary)
//!     ↓
//! AnnouncementPublisher (ledger claim + feed item + flag flips, one transaction)
//!     ↓
//! AggregationScheduler (fixed interval, reentrancy guard)
//! ```
//!
//! IMAGE and TEXT submissions skip the sweep and go straight through
//! [`AggregationScheduler::handle_action`].

pub mod detector;
pub mod engine;
pub mod feed_store;
pub mod progress;
pub mod publisher;
pub mod scheduler;
pub mod snapshot_reader;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use detector::MilestoneDetector;
pub use engine::{MilestonePipeline, SweepReport};
pub use feed_store::{ActionStore, FeedItemStore, SqliteActionStore, SqliteFeedItemStore};
pub use progress::{ProgressAggregator, ProgressSnapshot};
pub use publisher::{AnnouncementPublisher, PublishOutcome};
pub use scheduler::{AggregationScheduler, SchedulerState, SweepOutcome};
pub use snapshot_reader::{ActivitySource, SqliteActivitySource};
pub use types::{
    ActionKind, ActivityRecord, Announcement, AnnouncementDraft, EntityKind, EntityProgress,
    EntityRef, FeedItemKind, IncomingAction, Location, MilestoneEvent,
};
