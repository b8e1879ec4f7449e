//! Sweeper configuration from environment variables

use std::env;
use std::time::Duration;

/// Configuration for the milestone sweeper
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Path to SQLite database file
    pub db_path: String,

    /// Directory holding the ordered `*.sql` schema files
    pub schema_dir: String,

    /// Period between two sweeps, in seconds
    pub aggregate_interval_secs: u64,

    /// Activity type code whose actions count towards milestones
    pub action_type_code: String,

    /// Announce every time a lifetime count crosses a multiple of this
    pub milestone_interval: u64,

    /// Word used for one counted item in announcement texts
    pub item_noun: String,
}

impl FeedConfig {
    pub const DEFAULT_DB_PATH: &'static str = "data/milestone_feed.db";
    pub const DEFAULT_INTERVAL_SECS: u64 = 60;
    pub const DEFAULT_MILESTONE_INTERVAL: u64 = 100;

    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `FEED_DB_PATH` (default: data/milestone_feed.db)
    /// - `FEED_SCHEMA_DIR` (default: sql)
    /// - `AGGREGATE_INTERVAL_SECS` (default: 60)
    /// - `MILESTONE_ACTION_TYPE` (default: BEER)
    /// - `MILESTONE_INTERVAL` (default: 100)
    /// - `MILESTONE_ITEM_NOUN` (default: mead)
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("FEED_DB_PATH")
                .unwrap_or_else(|_| Self::DEFAULT_DB_PATH.to_string()),

            schema_dir: env::var("FEED_SCHEMA_DIR").unwrap_or_else(|_| "sql".to_string()),

            aggregate_interval_secs: env::var("AGGREGATE_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(Self::DEFAULT_INTERVAL_SECS),

            action_type_code: env::var("MILESTONE_ACTION_TYPE")
                .unwrap_or_else(|_| "BEER".to_string()),

            milestone_interval: env::var("MILESTONE_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|interval| *interval > 0)
                .unwrap_or(Self::DEFAULT_MILESTONE_INTERVAL),

            item_noun: env::var("MILESTONE_ITEM_NOUN").unwrap_or_else(|_| "mead".to_string()),
        }
    }

    pub fn aggregate_interval(&self) -> Duration {
        Duration::from_secs(self.aggregate_interval_secs)
    }
}
