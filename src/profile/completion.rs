//! Weighted completion aggregation and the publish gate.

use serde::Serialize;
use tracing::debug;

use super::model::ProfileDraft;
use super::rules::evaluate_all;
use super::side::SideData;
use super::steps::{STEP_WEIGHTS, SetupStep, StepCompletion, StepWeight};
use crate::error::EngineError;

/// Overall completion derived from per-step tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverallCompletion {
    pub percentage: u8,
    pub is_fully_complete: bool,
}

/// Combine step weights and completion tags into an overall percentage.
///
/// Weights and completions are paired by position. Completed contributes
/// the full weight, partial half of it. The sum is truncated (never
/// rounded) and clamped to 0..=100, so 99.5 reports as 99.
pub fn aggregate(weights: &[StepWeight], completions: &[StepCompletion]) -> OverallCompletion {
    if weights.len() != completions.len() {
        debug!(
            weights = weights.len(),
            completions = completions.len(),
            "Weight and completion counts differ; unmatched entries ignored"
        );
    }

    // Work in half-percent units to keep the arithmetic exact.
    let half_points: u32 = weights
        .iter()
        .zip(completions)
        .map(|(w, c)| u32::from(w.weight) * c.half_units())
        .sum();

    let percentage = (half_points / 2).min(100) as u8;
    OverallCompletion {
        percentage,
        is_fully_complete: percentage == 100,
    }
}

/// One row of the step indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepStatus {
    pub step: SetupStep,
    pub number: u8,
    pub label: &'static str,
    pub weight: u8,
    pub completion: StepCompletion,
}

/// Per-step tags plus the overall score for one draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionReport {
    pub steps: Vec<StepStatus>,
    #[serde(flatten)]
    pub overall: OverallCompletion,
}

impl CompletionReport {
    /// Evaluate every step of `draft` and aggregate with the static weights.
    pub fn compute(draft: &ProfileDraft, side: &SideData) -> Self {
        let evaluated = evaluate_all(draft, side);
        let completions: Vec<StepCompletion> = evaluated.iter().map(|(_, c)| *c).collect();
        let overall = aggregate(&STEP_WEIGHTS, &completions);

        let steps = evaluated
            .into_iter()
            .map(|(step, completion)| StepStatus {
                step,
                number: step.to_number(),
                label: step.label(),
                weight: step.weight(),
                completion,
            })
            .collect();

        Self { steps, overall }
    }

    /// Tag for a single step.
    pub fn completion_of(&self, step: SetupStep) -> StepCompletion {
        self.steps
            .iter()
            .find(|s| s.step == step)
            .map(|s| s.completion)
            .unwrap_or_default()
    }

    /// Steps that are not yet completed, in wizard order.
    pub fn incomplete_steps(&self) -> Vec<SetupStep> {
        self.steps
            .iter()
            .filter(|s| s.completion != StepCompletion::Completed)
            .map(|s| s.step)
            .collect()
    }

    /// Publishing requires every step to be completed.
    pub fn ensure_publishable(&self) -> Result<(), EngineError> {
        if self.overall.is_fully_complete {
            return Ok(());
        }
        Err(EngineError::NotPublishable {
            steps: self.incomplete_steps(),
        })
    }
}
