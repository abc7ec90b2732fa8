//! Auxiliary records read alongside a profile draft.
//!
//! None of these live on the draft itself: discovery-call settings, the
//! coach availability schedule, verification checks and the
//! document-not-applicable flags each come from their own table and may
//! still be loading when a step is evaluated.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Day of the week, ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// A half-open time range within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }
}

// ── Discovery calls ─────────────────────────────────────────────────

/// A bookable discovery-call window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverySlot {
    pub day: Weekday,
    #[serde(flatten)]
    pub slot: TimeSlot,
    pub enabled: bool,
}

/// Discovery-call settings for a trainer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryCallSettings {
    /// `None` until the trainer answers the yes/no question.
    #[serde(default)]
    pub offers_discovery_calls: Option<bool>,
    #[serde(default)]
    pub calendar_link: Option<String>,
    #[serde(default)]
    pub availability_slots: Vec<DiscoverySlot>,
}

impl DiscoveryCallSettings {
    pub fn has_calendar_link(&self) -> bool {
        self.calendar_link
            .as_deref()
            .is_some_and(|link| !link.trim().is_empty())
    }

    pub fn has_enabled_slot(&self) -> bool {
        self.availability_slots.iter().any(|s| s.enabled)
    }
}

// ── Working hours ───────────────────────────────────────────────────

/// Whether a coach is taking on new clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    /// Matches the column default in the availability table.
    #[default]
    Accepting,
    Waitlist,
    Unavailable,
}

/// Working hours for a single weekday.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub enabled: bool,
    #[serde(default)]
    pub slots: Vec<TimeSlot>,
}

/// Coach availability record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySchedule {
    #[serde(default)]
    pub status: AvailabilityStatus,
    /// Set only when the trainer picks a status themselves. The status
    /// column always has a value, so it cannot signal intent on its own.
    #[serde(default)]
    pub status_confirmed: bool,
    #[serde(default)]
    pub days: BTreeMap<Weekday, DaySchedule>,
}

impl AvailabilitySchedule {
    /// Days that are switched on and carry at least one slot.
    pub fn working_days(&self) -> impl Iterator<Item = Weekday> + '_ {
        self.days
            .iter()
            .filter(|(_, d)| d.enabled && !d.slots.is_empty())
            .map(|(day, _)| *day)
    }
}

// ── Professional documents ──────────────────────────────────────────

/// Professional documents a trainer is asked to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    QualificationCertificate,
    Insurance,
    FirstAid,
}

/// Document types that count toward the Professional Documents step.
pub const REQUIRED_DOCUMENT_TYPES: [DocumentType; 3] = [
    DocumentType::QualificationCertificate,
    DocumentType::Insurance,
    DocumentType::FirstAid,
];

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QualificationCertificate => "qualification_certificate",
            Self::Insurance => "insurance",
            Self::FirstAid => "first_aid",
        }
    }

    pub fn from_str_db(s: &str) -> Option<Self> {
        match s {
            "qualification_certificate" => Some(Self::QualificationCertificate),
            "insurance" => Some(Self::Insurance),
            "first_aid" => Some(Self::FirstAid),
            _ => None,
        }
    }
}

/// Review state of a verification check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pending,
    Submitted,
    Verified,
    Rejected,
    Expired,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }

    pub fn from_str_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "submitted" => Some(Self::Submitted),
            "verified" => Some(Self::Verified),
            "rejected" => Some(Self::Rejected),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Submitted or awaiting review.
    pub fn is_in_review(&self) -> bool {
        matches!(self, Self::Pending | Self::Submitted)
    }
}

/// One verification check recorded against a trainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationCheck {
    pub check_type: DocumentType,
    pub status: CheckStatus,
    pub updated_at: DateTime<Utc>,
}

// ── Bundle ──────────────────────────────────────────────────────────

/// Everything a step rule may read besides the draft.
///
/// Each member is `None` until its fetch completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideData {
    pub discovery: Option<DiscoveryCallSettings>,
    pub availability: Option<AvailabilitySchedule>,
    pub verification_checks: Option<Vec<VerificationCheck>>,
    pub not_applicable_documents: Option<BTreeSet<DocumentType>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn availability_defaults_to_accepting() {
        assert_eq!(AvailabilityStatus::default(), AvailabilityStatus::Accepting);
    }

    #[test]
    fn calendar_link_blank_is_absent() {
        let settings = DiscoveryCallSettings {
            calendar_link: Some("   ".into()),
            ..Default::default()
        };
        assert!(!settings.has_calendar_link());
    }

    #[test]
    fn working_days_require_enabled_and_slots() {
        let mut schedule = AvailabilitySchedule::default();
        schedule.days.insert(
            Weekday::Monday,
            DaySchedule {
                enabled: true,
                slots: vec![],
            },
        );
        schedule.days.insert(
            Weekday::Tuesday,
            DaySchedule {
                enabled: false,
                slots: vec![TimeSlot { start: hm(9, 0), end: hm(12, 0) }],
            },
        );
        schedule.days.insert(
            Weekday::Friday,
            DaySchedule {
                enabled: true,
                slots: vec![TimeSlot { start: hm(9, 0), end: hm(12, 0) }],
            },
        );
        let days: Vec<_> = schedule.working_days().collect();
        assert_eq!(days, vec![Weekday::Friday]);
    }

    #[test]
    fn availability_defaults_to_accepting_unconfirmed() {
        let schedule: AvailabilitySchedule = serde_json::from_str("{}").unwrap();
        assert_eq!(schedule.status, AvailabilityStatus::Accepting);
        assert!(!schedule.status_confirmed);
        assert!(schedule.days.is_empty());
    }

    #[test]
    fn discovery_slot_serde_is_flat() {
        let slot = DiscoverySlot {
            day: Weekday::Wednesday,
            slot: TimeSlot { start: hm(8, 30), end: hm(9, 0) },
            enabled: true,
        };
        let json = serde_json::to_value(&slot).unwrap();
        assert_eq!(json["day"], "wednesday");
        assert_eq!(json["start"], "08:30:00");
        assert_eq!(json["enabled"], true);
    }

    #[test]
    fn document_type_db_strings() {
        for ty in REQUIRED_DOCUMENT_TYPES {
            assert_eq!(DocumentType::from_str_db(ty.as_str()), Some(ty));
        }
        assert_eq!(DocumentType::from_str_db("passport"), None);
    }

    #[test]
    fn check_status_review_states() {
        assert!(CheckStatus::Pending.is_in_review());
        assert!(CheckStatus::Submitted.is_in_review());
        assert!(!CheckStatus::Verified.is_in_review());
        assert!(!CheckStatus::Rejected.is_in_review());
    }

    #[test]
    fn time_slot_validity() {
        assert!(TimeSlot { start: hm(9, 0), end: hm(10, 0) }.is_valid());
        assert!(!TimeSlot { start: hm(10, 0), end: hm(10, 0) }.is_valid());
    }
}
