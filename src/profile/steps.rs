//! Setup wizard steps, per-step completion tags and the weight table.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// The twelve steps of the trainer profile setup wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupStep {
    BasicInfo,
    Qualifications,
    Expertise,
    LocationAndClientFit,
    Packages,
    DiscoveryCalls,
    Testimonials,
    WaysOfWorking,
    Images,
    WorkingHours,
    Terms,
    ProfessionalDocuments,
}

/// Total number of steps in the wizard.
pub const TOTAL_STEPS: u8 = 12;

/// Minimum step number (1-based).
pub const MIN_STEP: u8 = 1;

/// Maximum step number (1-based).
pub const MAX_STEP: u8 = 12;

impl SetupStep {
    /// Every step in wizard order.
    pub const ALL: [SetupStep; TOTAL_STEPS as usize] = [
        Self::BasicInfo,
        Self::Qualifications,
        Self::Expertise,
        Self::LocationAndClientFit,
        Self::Packages,
        Self::DiscoveryCalls,
        Self::Testimonials,
        Self::WaysOfWorking,
        Self::Images,
        Self::WorkingHours,
        Self::Terms,
        Self::ProfessionalDocuments,
    ];

    /// Convert a 1-based step number to a `SetupStep`.
    pub fn from_number(n: u8) -> Result<Self, EngineError> {
        if !(MIN_STEP..=MAX_STEP).contains(&n) {
            return Err(EngineError::InvalidStep(n));
        }
        Ok(Self::ALL[usize::from(n - 1)])
    }

    /// Convert to a 1-based step number.
    pub fn to_number(self) -> u8 {
        match self {
            Self::BasicInfo => 1,
            Self::Qualifications => 2,
            Self::Expertise => 3,
            Self::LocationAndClientFit => 4,
            Self::Packages => 5,
            Self::DiscoveryCalls => 6,
            Self::Testimonials => 7,
            Self::WaysOfWorking => 8,
            Self::Images => 9,
            Self::WorkingHours => 10,
            Self::Terms => 11,
            Self::ProfessionalDocuments => 12,
        }
    }

    /// Human-readable label for breadcrumbs.
    pub fn label(self) -> &'static str {
        match self {
            Self::BasicInfo => "Basic Info",
            Self::Qualifications => "Qualifications",
            Self::Expertise => "Expertise",
            Self::LocationAndClientFit => "Location & Client Fit",
            Self::Packages => "Packages",
            Self::DiscoveryCalls => "Discovery Calls",
            Self::Testimonials => "Testimonials",
            Self::WaysOfWorking => "Ways of Working",
            Self::Images => "Images",
            Self::WorkingHours => "Working Hours",
            Self::Terms => "Terms & Conditions",
            Self::ProfessionalDocuments => "Professional Documents",
        }
    }

    /// Percentage weight of this step in the overall completion score.
    pub fn weight(self) -> u8 {
        STEP_WEIGHTS[usize::from(self.to_number() - 1)].weight
    }

    /// Next step in wizard order, if any.
    pub fn next(self) -> Option<SetupStep> {
        Self::from_number(self.to_number() + 1).ok()
    }

    /// Previous step in wizard order, if any.
    pub fn previous(self) -> Option<SetupStep> {
        self.to_number()
            .checked_sub(1)
            .and_then(|n| Self::from_number(n).ok())
    }
}

impl std::fmt::Display for SetupStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.to_number(), self.label())
    }
}

// ---------------------------------------------------------------------------
// Completion tags
// ---------------------------------------------------------------------------

/// Completion state of a single step. Derived, never stored.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StepCompletion {
    #[default]
    NotStarted,
    Partial,
    Completed,
}

impl StepCompletion {
    /// Contribution in half-weight units: 2 for completed, 1 for partial.
    pub fn half_units(self) -> u32 {
        match self {
            Self::NotStarted => 0,
            Self::Partial => 1,
            Self::Completed => 2,
        }
    }

    /// Collapse a "how many of N are present" count into a tag.
    pub fn from_counts(present: usize, required: usize) -> Self {
        if required > 0 && present >= required {
            Self::Completed
        } else if present > 0 {
            Self::Partial
        } else {
            Self::NotStarted
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Partial => "partial",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for StepCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Weight table
// ---------------------------------------------------------------------------

/// Weight of one step in the overall percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepWeight {
    pub step: SetupStep,
    pub weight: u8,
}

/// Static step weights, in wizard order. Sums to 100.
pub const STEP_WEIGHTS: [StepWeight; TOTAL_STEPS as usize] = [
    StepWeight { step: SetupStep::BasicInfo, weight: 13 },
    StepWeight { step: SetupStep::Qualifications, weight: 10 },
    StepWeight { step: SetupStep::Expertise, weight: 10 },
    StepWeight { step: SetupStep::LocationAndClientFit, weight: 8 },
    StepWeight { step: SetupStep::Packages, weight: 12 },
    StepWeight { step: SetupStep::DiscoveryCalls, weight: 7 },
    StepWeight { step: SetupStep::Testimonials, weight: 6 },
    StepWeight { step: SetupStep::WaysOfWorking, weight: 8 },
    StepWeight { step: SetupStep::Images, weight: 6 },
    StepWeight { step: SetupStep::WorkingHours, weight: 8 },
    StepWeight { step: SetupStep::Terms, weight: 6 },
    StepWeight { step: SetupStep::ProfessionalDocuments, weight: 6 },
];

/// Check that a weight table sums to exactly 100.
pub fn validate_weights(weights: &[StepWeight]) -> Result<(), EngineError> {
    let sum: u32 = weights.iter().map(|w| u32::from(w.weight)).sum();
    if sum != 100 {
        return Err(EngineError::WeightsMismatch { sum });
    }
    Ok(())
}
