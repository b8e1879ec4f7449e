//! Core data structures shared by the sweep stages

use serde::{Deserialize, Serialize};
use std::fmt;

/// GPS position attached to an action or a feed item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Both columns must be present for a usable position.
    pub fn from_columns(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Self { latitude, longitude }),
            _ => None,
        }
    }
}

/// One counted action joined with its owners, as read by a sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub location: Option<Location>,
    pub announced: bool,
    pub action_type_code: String,
    pub user_id: i64,
    pub user_name: String,
    pub team_id: i64,
    pub team_name: String,
}

/// Which side of an action owns a progress counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Team,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Team => "team",
        }
    }

    pub fn from_column(s: &str) -> Option<Self> {
        match s {
            "user" => Some(EntityKind::User),
            "team" => Some(EntityKind::Team),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: i64,
}

impl EntityRef {
    pub fn user(id: i64) -> Self {
        Self { kind: EntityKind::User, id }
    }

    pub fn team(id: i64) -> Self {
        Self { kind: EntityKind::Team, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// Progress of one user or one team within a single sweep
///
/// `pending_records` is ascending by id, and its i-th element is the
/// (`announced_count` + i + 1)-th lifetime item of the entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityProgress {
    pub name: String,
    pub announced_count: u64,
    pub pending_count: u64,
    pub pending_records: Vec<ActivityRecord>,
}

impl EntityProgress {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn total(&self) -> u64 {
        self.announced_count + self.pending_count
    }
}

/// Feed item kinds understood by the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedItemKind {
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "IMAGE")]
    Image,
}

impl FeedItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedItemKind::Text => "TEXT",
            FeedItemKind::Image => "IMAGE",
        }
    }

    pub fn from_column(s: &str) -> Option<Self> {
        match s {
            "TEXT" => Some(FeedItemKind::Text),
            "IMAGE" => Some(FeedItemKind::Image),
            _ => None,
        }
    }
}

/// A feed item about to be created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementDraft {
    pub kind: FeedItemKind,
    /// Entity a milestone announcement celebrates
    pub target: Option<EntityRef>,
    /// User who posted the item (immediate submissions only)
    pub author_id: Option<i64>,
    pub text: Option<String>,
    pub image_path: Option<String>,
    pub location: Option<Location>,
}

impl AnnouncementDraft {
    pub fn milestone(target: EntityRef, text: String, location: Option<Location>) -> Self {
        Self {
            kind: FeedItemKind::Text,
            target: Some(target),
            author_id: None,
            text: Some(text),
            image_path: None,
            location,
        }
    }
}

/// A persisted feed item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: i64,
    pub created_at: i64,
    #[serde(flatten)]
    pub draft: AnnouncementDraft,
}

/// Result of the milestone decision for one entity (never persisted)
#[derive(Debug, Clone, PartialEq)]
pub struct MilestoneEvent {
    pub entity: EntityRef,
    /// 1 for the first item, otherwise the announced total
    pub milestone: u64,
    pub draft: AnnouncementDraft,
    /// Record that crossed the boundary; bounds the flag update
    pub trigger: ActivityRecord,
}

/// Kinds of actions arriving through the ingestion path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    #[serde(rename = "IMAGE")]
    Image,
    #[serde(rename = "TEXT")]
    Text,
    /// Any counted action type, by code (e.g. "BEER")
    Other(String),
}

impl ActionKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "IMAGE" => ActionKind::Image,
            "TEXT" => ActionKind::Text,
            other => ActionKind::Other(other.to_string()),
        }
    }

    /// Kinds published to the feed right away instead of waiting for a sweep.
    pub fn is_immediate(&self) -> bool {
        matches!(self, ActionKind::Image | ActionKind::Text)
    }
}

/// An action just written by the ingestion path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingAction {
    pub id: i64,
    pub kind: ActionKind,
    pub user_id: i64,
    pub text: Option<String>,
    pub image_path: Option<String>,
    pub location: Option<Location>,
}
