//! Sweep orchestration: read → aggregate → detect → publish

use super::detector::MilestoneDetector;
use super::progress::{ProgressAggregator, ProgressSnapshot};
use super::publisher::{AnnouncementPublisher, PublishOutcome};
use super::snapshot_reader::ActivitySource;
use super::types::{EntityRef, MilestoneEvent};
use crate::error::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Counters for one completed sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    pub records_scanned: usize,
    pub users: usize,
    pub teams: usize,
    pub events_detected: usize,
    pub published: usize,
    pub already_published: usize,
    pub rows_marked: usize,
    pub duration_ms: u128,
}

impl SweepReport {
    /// Single-line JSON rendering for the sweep log.
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One full sweep over a single activity type
pub struct MilestonePipeline {
    source: Arc<dyn ActivitySource>,
    detector: MilestoneDetector,
    publisher: Arc<AnnouncementPublisher>,
    action_type_code: String,
}

impl MilestonePipeline {
    pub fn new(
        source: Arc<dyn ActivitySource>,
        detector: MilestoneDetector,
        publisher: Arc<AnnouncementPublisher>,
        action_type_code: impl Into<String>,
    ) -> Self {
        Self {
            source,
            detector,
            publisher,
            action_type_code: action_type_code.into(),
        }
    }

    pub fn publisher(&self) -> &Arc<AnnouncementPublisher> {
        &self.publisher
    }

    pub fn action_type_code(&self) -> &str {
        &self.action_type_code
    }

    /// Every milestone crossed in this snapshot, users first, then teams.
    pub fn detect_all(&self, snapshot: &ProgressSnapshot) -> Vec<MilestoneEvent> {
        let users = snapshot
            .users
            .iter()
            .map(|(id, progress)| (EntityRef::user(*id), progress));
        let teams = snapshot
            .teams
            .iter()
            .map(|(id, progress)| (EntityRef::team(*id), progress));

        users
            .chain(teams)
            .filter_map(|(entity, progress)| {
                self.detector.detect(
                    entity,
                    &progress.name,
                    progress.announced_count,
                    &progress.pending_records,
                )
            })
            .collect()
    }

    /// Run one sweep.
    ///
    /// The first storage error aborts the sweep. Events published before it
    /// stay committed; the rest are detected again next sweep.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let started = Instant::now();

        let records = self.source.read_snapshot(&self.action_type_code).await?;
        let snapshot = ProgressAggregator::aggregate(&records);
        let events = self.detect_all(&snapshot);

        let mut report = SweepReport {
            records_scanned: records.len(),
            users: snapshot.users.len(),
            teams: snapshot.teams.len(),
            events_detected: events.len(),
            ..SweepReport::default()
        };

        for event in &events {
            match self.publisher.publish(event)? {
                PublishOutcome::Published { rows_marked, .. } => {
                    report.published += 1;
                    report.rows_marked += rows_marked;
                }
                PublishOutcome::AlreadyPublished => report.already_published += 1,
            }
        }

        report.duration_ms = started.elapsed().as_millis();
        Ok(report)
    }
}
