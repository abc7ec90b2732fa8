//! Client engagement stages and their read-time classification.

pub mod classifier;
pub mod stage;

pub use classifier::{ContentVisibility, build_record, classify, has_implicit_survey_completion};
pub use stage::{EngagementEvent, EngagementEventKind, EngagementRecord, EngagementStage};
