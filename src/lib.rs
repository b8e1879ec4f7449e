pub mod config;
pub mod db;
pub mod error;
pub mod milestones;
pub mod sqlite_pragma;

pub use config::FeedConfig;
pub use error::{FeedError, Result};
