//! Per-step completion rules.
//!
//! Each step has one pure predicate over the draft and its side data. The
//! registry maps a step to its predicate so every rule can be evaluated (and
//! tested) on its own. Rules never fail: missing side data reads as
//! `NotStarted`.

use super::model::ProfileDraft;
use super::side::{CheckStatus, DocumentType, REQUIRED_DOCUMENT_TYPES, SideData};
use super::steps::{SetupStep, StepCompletion};

/// Signature shared by every step rule.
pub type StepRule = fn(&ProfileDraft, &SideData) -> StepCompletion;

/// Look up the rule for a step.
pub fn rule_for(step: SetupStep) -> StepRule {
    match step {
        SetupStep::BasicInfo => basic_info,
        SetupStep::Qualifications => qualifications,
        SetupStep::Expertise => expertise,
        SetupStep::LocationAndClientFit => location_and_client_fit,
        SetupStep::Packages => packages,
        SetupStep::DiscoveryCalls => discovery_calls,
        SetupStep::Testimonials => testimonials,
        SetupStep::WaysOfWorking => ways_of_working,
        SetupStep::Images => images,
        SetupStep::WorkingHours => working_hours,
        SetupStep::Terms => terms,
        SetupStep::ProfessionalDocuments => professional_documents,
    }
}

/// Evaluate a single step.
pub fn evaluate(step: SetupStep, draft: &ProfileDraft, side: &SideData) -> StepCompletion {
    rule_for(step)(draft, side)
}

/// Evaluate every step, in wizard order.
pub fn evaluate_all(draft: &ProfileDraft, side: &SideData) -> Vec<(SetupStep, StepCompletion)> {
    SetupStep::ALL
        .iter()
        .map(|&step| (step, evaluate(step, draft, side)))
        .collect()
}

fn filled(s: &str) -> bool {
    !s.trim().is_empty()
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn basic_info(draft: &ProfileDraft, _side: &SideData) -> StepCompletion {
    let present = draft
        .identity_fields()
        .iter()
        .filter(|(_, value)| filled(value))
        .count();
    match present {
        4 => StepCompletion::Completed,
        3 => StepCompletion::Partial,
        _ => StepCompletion::NotStarted,
    }
}

fn qualifications(draft: &ProfileDraft, _side: &SideData) -> StepCompletion {
    match draft.qualifications.len() {
        0 => StepCompletion::NotStarted,
        1 => StepCompletion::Partial,
        _ => StepCompletion::Completed,
    }
}

fn expertise(draft: &ProfileDraft, _side: &SideData) -> StepCompletion {
    let present = [
        !draft.specializations.is_empty(),
        !draft.training_types.is_empty(),
    ]
    .iter()
    .filter(|p| **p)
    .count();
    StepCompletion::from_counts(present, 2)
}

fn location_and_client_fit(draft: &ProfileDraft, _side: &SideData) -> StepCompletion {
    let has_client_fit = !draft.ideal_client_types.is_empty()
        || !draft.ideal_client_personality.is_empty()
        || filled(&draft.coaching_style);
    let present = [
        filled(&draft.location),
        draft.delivery_format.is_some(),
        has_client_fit,
    ]
    .iter()
    .filter(|p| **p)
    .count();
    StepCompletion::from_counts(present, 3)
}

/// Binary: a package either exists or the step has not been started.
fn packages(draft: &ProfileDraft, _side: &SideData) -> StepCompletion {
    if draft.packages.is_empty() {
        StepCompletion::NotStarted
    } else {
        StepCompletion::Completed
    }
}

fn discovery_calls(_draft: &ProfileDraft, side: &SideData) -> StepCompletion {
    let Some(settings) = side.discovery.as_ref() else {
        return StepCompletion::NotStarted;
    };
    match settings.offers_discovery_calls {
        None => StepCompletion::NotStarted,
        // Opting out is a decision, so the step is done.
        Some(false) => StepCompletion::Completed,
        Some(true) if settings.has_calendar_link() || settings.has_enabled_slot() => {
            StepCompletion::Completed
        }
        Some(true) => StepCompletion::Partial,
    }
}

fn testimonials(draft: &ProfileDraft, _side: &SideData) -> StepCompletion {
    if draft.testimonials.iter().any(|t| t.is_complete()) {
        StepCompletion::Completed
    } else if draft.testimonials.is_empty() {
        StepCompletion::NotStarted
    } else {
        StepCompletion::Partial
    }
}

fn ways_of_working(draft: &ProfileDraft, _side: &SideData) -> StepCompletion {
    let wow = &draft.ways_of_working;
    let total = wow.sections().len();
    let filled_sections = wow.filled_sections();
    if filled_sections == total {
        StepCompletion::Completed
    } else if filled_sections > 0 || !wow.activity_assignments.is_empty() {
        StepCompletion::Partial
    } else {
        StepCompletion::NotStarted
    }
}

fn images(draft: &ProfileDraft, _side: &SideData) -> StepCompletion {
    if !draft.images.selected.is_empty() {
        StepCompletion::Completed
    } else if !draft.images.uploaded.is_empty() {
        StepCompletion::Partial
    } else {
        StepCompletion::NotStarted
    }
}

/// Only an enabled day with a slot completes this step. The status column
/// has a database default, so its value alone says nothing.
fn working_hours(_draft: &ProfileDraft, side: &SideData) -> StepCompletion {
    let Some(schedule) = side.availability.as_ref() else {
        return StepCompletion::NotStarted;
    };
    if schedule.working_days().next().is_some() {
        StepCompletion::Completed
    } else if schedule.status_confirmed {
        StepCompletion::Partial
    } else {
        StepCompletion::NotStarted
    }
}

fn terms(draft: &ProfileDraft, _side: &SideData) -> StepCompletion {
    let present = [draft.terms_agreed, draft.accuracy_confirmed]
        .iter()
        .filter(|p| **p)
        .count();
    StepCompletion::from_counts(present, 2)
}

fn professional_documents(_draft: &ProfileDraft, side: &SideData) -> StepCompletion {
    let not_applicable = side.not_applicable_documents.as_ref();
    let applicable: Vec<_> = REQUIRED_DOCUMENT_TYPES
        .iter()
        .filter(|ty| not_applicable.is_none_or(|na| !na.contains(*ty)))
        .collect();

    if applicable.is_empty() {
        return StepCompletion::Completed;
    }

    let Some(checks) = side.verification_checks.as_ref() else {
        return StepCompletion::NotStarted;
    };

    // Latest check per type wins.
    let latest_status = |ty: &DocumentType| {
        checks
            .iter()
            .filter(|c| &c.check_type == ty)
            .max_by_key(|c| c.updated_at)
            .map(|c| c.status)
    };

    let mut verified = 0;
    let mut in_review = 0;
    for ty in &applicable {
        match latest_status(*ty) {
            Some(CheckStatus::Verified) => verified += 1,
            Some(status) if status.is_in_review() => in_review += 1,
            _ => {}
        }
    }

    if verified == applicable.len() {
        StepCompletion::Completed
    } else if verified + in_review > 0 {
        StepCompletion::Partial
    } else {
        StepCompletion::NotStarted
    }
}
