//! Engagement stage classification.
//!
//! A pure projection over a client's event history with one trainer.
//! Nothing here writes; the record is recomputed on every read.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::stage::{EngagementEvent, EngagementEventKind, EngagementRecord, EngagementStage};

#[derive(Debug, Default)]
struct Projection {
    stage: EngagementStage,
    /// Furthest point reached on the common path, ignoring likes.
    furthest: EngagementStage,
    liked: bool,
    entered_at: BTreeMap<EngagementStage, DateTime<Utc>>,
}

impl Projection {
    fn enter(&mut self, stage: EngagementStage, at: DateTime<Utc>) {
        self.stage = stage;
        self.entered_at.entry(stage).or_insert(at);
    }

    fn apply(&mut self, event: &EngagementEvent) {
        let at = event.occurred_at;
        match event.kind {
            EngagementEventKind::Unliked => {
                self.liked = false;
                // Only a bare like is revoked; later milestones stand.
                if self.stage == EngagementStage::Liked {
                    self.stage = self.furthest;
                }
            }
            kind => {
                let Some(target) = kind.target_stage() else {
                    return;
                };
                if target.is_branch() {
                    if self.stage != target {
                        self.enter(target, at);
                    }
                    return;
                }
                if kind == EngagementEventKind::Liked {
                    self.liked = true;
                } else if target.has_reached(self.furthest) {
                    self.furthest = target;
                }
                // Re-entry from a branch lands on the furthest point reached.
                let landing = if self.liked && !self.furthest.has_reached(EngagementStage::Liked) {
                    EngagementStage::Liked
                } else {
                    self.furthest
                };
                if self.stage.is_branch() || self.stage.can_transition_to(landing) {
                    self.enter(landing, at);
                }
            }
        }
    }
}

fn project(events: &[EngagementEvent]) -> Projection {
    let mut ordered: Vec<&EngagementEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.occurred_at);

    let mut projection = Projection::default();
    for event in ordered {
        projection.apply(event);
    }
    projection
}

/// Current stage implied by `events`, in any order.
pub fn classify(events: &[EngagementEvent]) -> EngagementStage {
    project(events).stage
}

/// Whether the client should be treated as having finished the intake survey.
///
/// True when the explicit flag is set, or when the history shows a milestone
/// that is only reachable after the survey (a completed discovery call,
/// becoming a client, or being matched). Such clients are never re-prompted.
pub fn has_implicit_survey_completion(explicit_flag: bool, events: &[EngagementEvent]) -> bool {
    explicit_flag || events.iter().any(|e| e.kind.is_advanced_milestone())
}

/// Full read-time record for one client/trainer pair.
pub fn build_record(
    client_id: Uuid,
    trainer_id: Uuid,
    events: &[EngagementEvent],
    explicit_survey_flag: bool,
) -> EngagementRecord {
    let projection = project(events);
    EngagementRecord {
        client_id,
        trainer_id,
        stage: projection.stage,
        stage_entered_at: projection.entered_at,
        survey_completed: has_implicit_survey_completion(explicit_survey_flag, events),
    }
}

/// What a client may see of a trainer's profile at a given stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContentVisibility {
    pub full_packages: bool,
    pub booking_link: bool,
    pub contact_details: bool,
    pub client_resources: bool,
}

impl ContentVisibility {
    pub fn for_stage(stage: EngagementStage) -> Self {
        use EngagementStage::*;
        let (full_packages, booking_link, contact_details, client_resources) = match stage {
            Browsing | Declined => (false, false, false, false),
            Liked | Shortlisted => (true, false, false, false),
            DiscoveryInProgress => (true, true, false, false),
            DiscoveryCompleted | Waitlist => (true, true, true, false),
            ActiveClient => (true, true, true, true),
        };
        Self {
            full_packages,
            booking_link,
            contact_details,
            client_resources,
        }
    }
}
