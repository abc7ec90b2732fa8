//! Client ↔ trainer engagement stages and the events that move them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a client stands with a particular trainer.
///
/// The common path is ordered: Browsing → Liked → Shortlisted →
/// DiscoveryInProgress → DiscoveryCompleted → ActiveClient. Waitlist and
/// Declined are branches off that path.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EngagementStage {
    #[default]
    Browsing,
    Liked,
    Shortlisted,
    DiscoveryInProgress,
    DiscoveryCompleted,
    ActiveClient,
    Waitlist,
    Declined,
}

impl EngagementStage {
    /// Position on the common path, or `None` for a branch stage.
    pub fn ordinal(&self) -> Option<u8> {
        use EngagementStage::*;
        match self {
            Browsing => Some(0),
            Liked => Some(1),
            Shortlisted => Some(2),
            DiscoveryInProgress => Some(3),
            DiscoveryCompleted => Some(4),
            ActiveClient => Some(5),
            Waitlist | Declined => None,
        }
    }

    pub fn is_branch(&self) -> bool {
        self.ordinal().is_none()
    }

    /// Check if a transition from `self` to `target` is valid.
    ///
    /// Moves along the common path only go forward. Any stage may branch,
    /// and a branch may re-enter the common path at any point.
    pub fn can_transition_to(&self, target: EngagementStage) -> bool {
        match (self.ordinal(), target.ordinal()) {
            (Some(from), Some(to)) => to > from,
            (_, None) => *self != target,
            (None, Some(_)) => true,
        }
    }

    /// Whether the client has at least reached `other` on the common path.
    pub fn has_reached(&self, other: EngagementStage) -> bool {
        match (self.ordinal(), other.ordinal()) {
            (Some(a), Some(b)) => a >= b,
            _ => self == &other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Browsing => "browsing",
            Self::Liked => "liked",
            Self::Shortlisted => "shortlisted",
            Self::DiscoveryInProgress => "discovery_in_progress",
            Self::DiscoveryCompleted => "discovery_completed",
            Self::ActiveClient => "active_client",
            Self::Waitlist => "waitlist",
            Self::Declined => "declined",
        }
    }

    pub fn from_str_db(s: &str) -> Option<Self> {
        use EngagementStage::*;
        [
            Browsing,
            Liked,
            Shortlisted,
            DiscoveryInProgress,
            DiscoveryCompleted,
            ActiveClient,
            Waitlist,
            Declined,
        ]
        .into_iter()
        .find(|stage| stage.as_str() == s)
    }
}

impl std::fmt::Display for EngagementStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something a client did (or had done to them) with respect to a trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngagementEventKind {
    Liked,
    Unliked,
    Shortlisted,
    DiscoveryBooked,
    DiscoveryCompleted,
    BecameClient,
    Matched,
    Waitlisted,
    Declined,
    /// A stage written directly by an admin or a legacy import.
    StageRecorded { stage: EngagementStage },
}

impl EngagementEventKind {
    /// Stage this event moves the client into, if it names one.
    pub fn target_stage(&self) -> Option<EngagementStage> {
        use EngagementEventKind as K;
        match self {
            K::Liked => Some(EngagementStage::Liked),
            K::Unliked => None,
            K::Shortlisted => Some(EngagementStage::Shortlisted),
            K::DiscoveryBooked => Some(EngagementStage::DiscoveryInProgress),
            K::DiscoveryCompleted => Some(EngagementStage::DiscoveryCompleted),
            K::BecameClient | K::Matched => Some(EngagementStage::ActiveClient),
            K::Waitlisted => Some(EngagementStage::Waitlist),
            K::Declined => Some(EngagementStage::Declined),
            K::StageRecorded { stage } => Some(*stage),
        }
    }

    /// Milestones that prove the client got past the intake survey.
    pub fn is_advanced_milestone(&self) -> bool {
        use EngagementEventKind as K;
        match self {
            K::DiscoveryCompleted | K::BecameClient | K::Matched => true,
            K::StageRecorded { stage } => stage.has_reached(EngagementStage::DiscoveryCompleted),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        use EngagementEventKind as K;
        match self {
            K::Liked => "liked",
            K::Unliked => "unliked",
            K::Shortlisted => "shortlisted",
            K::DiscoveryBooked => "discovery_booked",
            K::DiscoveryCompleted => "discovery_completed",
            K::BecameClient => "became_client",
            K::Matched => "matched",
            K::Waitlisted => "waitlisted",
            K::Declined => "declined",
            K::StageRecorded { .. } => "stage_recorded",
        }
    }

    /// Rebuild from the stored `kind` column and optional `stage` column.
    pub fn from_db(kind: &str, stage: Option<&str>) -> Option<Self> {
        use EngagementEventKind as K;
        Some(match kind {
            "liked" => K::Liked,
            "unliked" => K::Unliked,
            "shortlisted" => K::Shortlisted,
            "discovery_booked" => K::DiscoveryBooked,
            "discovery_completed" => K::DiscoveryCompleted,
            "became_client" => K::BecameClient,
            "matched" => K::Matched,
            "waitlisted" => K::Waitlisted,
            "declined" => K::Declined,
            "stage_recorded" => K::StageRecorded {
                stage: EngagementStage::from_str_db(stage?)?,
            },
            _ => return None,
        })
    }
}

/// A recorded engagement event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementEvent {
    pub id: Uuid,
    pub client_id: Uuid,
    pub trainer_id: Uuid,
    #[serde(flatten)]
    pub kind: EngagementEventKind,
    pub occurred_at: DateTime<Utc>,
}

impl EngagementEvent {
    pub fn new(client_id: Uuid, trainer_id: Uuid, kind: EngagementEventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            trainer_id,
            kind,
            occurred_at: Utc::now(),
        }
    }

    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }
}

/// Read-time projection of a client's engagement with one trainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngagementRecord {
    pub client_id: Uuid,
    pub trainer_id: Uuid,
    pub stage: EngagementStage,
    /// First time each stage was entered.
    pub stage_entered_at: BTreeMap<EngagementStage, DateTime<Utc>>,
    pub survey_completed: bool,
}
