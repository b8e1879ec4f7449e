//! Milestone detection: first item and every multiple of the interval

use super::types::{ActivityRecord, AnnouncementDraft, EntityRef, MilestoneEvent};

pub struct MilestoneDetector {
    interval: u64,
    item_noun: String,
}

impl MilestoneDetector {
    pub fn new(interval: u64, item_noun: impl Into<String>) -> Self {
        Self {
            interval: interval.max(1),
            item_noun: item_noun.into(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(100, "mead")
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Decide whether `pending` pushes the entity over a milestone
    ///
    /// `before` is the entity's announced count; `pending` its unannounced
    /// records, ascending by id.
    ///
    /// # Rules (first match wins)
    /// 1. nothing pending: no event
    /// 2. `before == 0`: first-item event, triggered by `pending[0]`
    /// 3. `before / interval != after / interval`: the record that reaches the
    ///    next multiple triggers; the text reports `(after / interval) * interval`
    ///
    /// A batch spanning several boundaries still yields a single event; the
    /// next sweep picks up the remaining boundaries from the new `before`.
    pub fn detect(
        &self,
        entity: EntityRef,
        name: &str,
        before: u64,
        pending: &[ActivityRecord],
    ) -> Option<MilestoneEvent> {
        let first = pending.first()?;

        if before == 0 {
            let text = format!(
                "{} starts wappu! Congratulations on the first {}!",
                name, self.item_noun
            );
            return Some(Self::event(entity, 1, text, first));
        }

        let after = before + pending.len() as u64;
        if before / self.interval == after / self.interval {
            return None;
        }

        let reached = (after / self.interval) * self.interval;
        let idx = (self.interval - before % self.interval - 1) as usize;

        let Some(trigger) = pending.get(idx) else {
            debug_assert!(false, "trigger index {} out of {} pending", idx, pending.len());
            log::error!(
                "Milestone trigger index {} out of range for {} ({} pending, before={})",
                idx,
                entity,
                pending.len(),
                before
            );
            return None;
        };

        let text = format!(
            "Such wow. {} has had already {} {}s.",
            name, reached, self.item_noun
        );
        Some(Self::event(entity, reached, text, trigger))
    }

    fn event(
        entity: EntityRef,
        milestone: u64,
        text: String,
        trigger: &ActivityRecord,
    ) -> MilestoneEvent {
        MilestoneEvent {
            entity,
            milestone,
            draft: AnnouncementDraft::milestone(entity, text, trigger.location),
            trigger: trigger.clone(),
        }
    }
}
