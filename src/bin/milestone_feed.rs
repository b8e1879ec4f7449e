//! Milestone Feed - periodic milestone sweeper
//!
//! Opens the activity database, applies the schema and then sweeps on a fixed
//! interval until CTRL+C.
//!
//! Usage:
//!   cargo run --release --bin milestone_feed [-- --once]
//!
//! Environment variables:
//!   FEED_DB_PATH - SQLite database path (default: data/milestone_feed.db)
//!   FEED_SCHEMA_DIR - Schema directory (default: sql)
//!   AGGREGATE_INTERVAL_SECS - Sweep interval (default: 60)
//!   MILESTONE_ACTION_TYPE - Counted action type code (default: BEER)
//!   MILESTONE_INTERVAL - Announce every N items (default: 100)
//!   MILESTONE_ITEM_NOUN - Item word in texts (default: mead)

use log::{error, info};
use milestone_feed::db::{open_connection, run_schema_migrations, shared};
use milestone_feed::milestones::{
    AggregationScheduler, AnnouncementPublisher, MilestoneDetector, MilestonePipeline,
    SqliteActionStore, SqliteActivitySource, SqliteFeedItemStore, SweepOutcome,
};
use milestone_feed::FeedConfig;
use std::env;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    Continuous,
    Once,
}

fn parse_mode_from_args() -> RunMode {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "--once") {
        return RunMode::Once;
    }
    RunMode::Continuous
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let config = FeedConfig::from_env();
    let mode = parse_mode_from_args();

    info!("🚀 Milestone Feed");
    info!("   ├─ Database: {}", config.db_path);
    info!("   ├─ Schema dir: {}", config.schema_dir);
    info!("   ├─ Action type: {}", config.action_type_code);
    info!(
        "   ├─ Milestone every: {} {}s",
        config.milestone_interval, config.item_noun
    );
    info!("   ├─ Sweep interval: {}s", config.aggregate_interval_secs);
    info!("   └─ Mode: {:?}", mode);

    info!("🔧 Initializing database...");
    let conn = open_connection(&config.db_path)?;
    let applied = run_schema_migrations(&conn, &config.schema_dir)?;
    let conn = shared(conn);
    info!("✅ Database initialized ({} schema files)", applied);

    let publisher = Arc::new(AnnouncementPublisher::new(
        conn.clone(),
        Arc::new(SqliteFeedItemStore),
        Arc::new(SqliteActionStore),
    ));
    let pipeline = Arc::new(MilestonePipeline::new(
        Arc::new(SqliteActivitySource::new(conn)),
        MilestoneDetector::new(config.milestone_interval, config.item_noun.clone()),
        publisher,
        config.action_type_code.clone(),
    ));
    let scheduler = Arc::new(AggregationScheduler::new(
        pipeline,
        config.aggregate_interval(),
    ));

    if mode == RunMode::Once {
        return match scheduler.run_sweep().await {
            SweepOutcome::Failed(reason) => Err(reason.into()),
            _ => Ok(()),
        };
    }

    scheduler.start()?;
    info!("✅ Sweeper running (press CTRL+C to stop)");

    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("");
            info!("⚠️  Received CTRL+C, shutting down...");
        }
        Err(e) => {
            error!("❌ Failed to listen for CTRL+C: {}", e);
        }
    }

    scheduler.stop();
    info!("✅ Milestone Feed stopped");

    Ok(())
}
