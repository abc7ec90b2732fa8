//! Trainer profile setup: step rules, weighted completion and incremental
//! saving of the wizard draft.

pub mod completion;
pub mod dirty;
pub mod model;
pub mod payload;
pub mod rules;
pub mod session;
pub mod side;
pub mod steps;
pub mod validation;

pub use completion::{CompletionReport, OverallCompletion, StepStatus, aggregate};
pub use dirty::{DirtyFieldTracker, DirtySnapshot};
pub use model::{ProfileDraft, ProfileField, ProfileRecord};
pub use rules::{evaluate, evaluate_all};
pub use session::{ProfileSetupSession, SaveOutcome};
pub use side::SideData;
pub use steps::{STEP_WEIGHTS, SetupStep, StepCompletion, StepWeight};
