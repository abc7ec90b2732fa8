//! Error types for fitmatch.

use crate::profile::steps::SetupStep;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A single inline field error raised while validating a step.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Validation failure for the current step. Blocks advancement only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Step {step} is missing required fields: {}", field_names(.errors))]
pub struct ValidationErrors {
    pub step: SetupStep,
    pub errors: Vec<FieldError>,
}

/// Errors raised by the save path of a setup session.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// The draft was never initialised from a persisted profile.
    #[error("Profile draft has not been loaded; refusing to save")]
    NotInitialized,

    /// The payload would blank critical fields that are populated in storage.
    #[error("Refusing to overwrite populated fields with empty values: {}", joined(.fields))]
    DataLossGuard { fields: Vec<String> },

    /// The backing store rejected or failed the write. Dirty fields are kept.
    #[error("Persistence failed: {0}")]
    Persistence(#[from] DatabaseError),

    /// The step being left did not pass validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// The background save task ended without reporting a result.
    #[error("Save task aborted: {0}")]
    Aborted(String),
}

impl SaveError {
    /// Whether retrying the same save can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Aborted(_))
    }
}

/// Errors from the completion engine itself.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid step number {0}")]
    InvalidStep(u8),

    #[error("Step weights sum to {sum}, expected 100")]
    WeightsMismatch { sum: u32 },

    #[error("Profile is not ready to publish; incomplete steps: {}", step_labels(.steps))]
    NotPublishable { steps: Vec<SetupStep> },
}

fn field_names(errors: &[FieldError]) -> String {
    errors.iter().map(|e| e.field).collect::<Vec<_>>().join(", ")
}

fn joined(values: &[String]) -> String {
    values.join(", ")
}

fn step_labels(steps: &[SetupStep]) -> String {
    steps.iter().map(|s| s.label()).collect::<Vec<_>>().join(", ")
}
