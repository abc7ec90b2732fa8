//! Partial-update payloads and the reverse mapping from stored records.
//!
//! The stored shape differs from the editor shape in two places: the single
//! delivery format is stored as a one-element list, and the comma-separated
//! coaching style is stored as a list of trimmed entries. Free-text fields
//! are stored trimmed; the draft keeps what was typed until the next load.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::warn;

use super::dirty::DirtySnapshot;
use super::model::{ProfileDraft, ProfileField, ProfileRecord, value_has_content};
use crate::error::{DatabaseError, SaveError};

/// Field name → stored value, containing only the fields being saved.
pub type UpdatePayload = Map<String, Value>;

static STYLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*,\s*").expect("static regex"));

/// Split a comma-separated style string into trimmed, non-empty entries.
pub fn split_style(raw: &str) -> Vec<String> {
    STYLE_SEPARATOR
        .split(raw.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn to_value<T: serde::Serialize>(field: ProfileField, value: &T) -> Result<Value, DatabaseError> {
    serde_json::to_value(value)
        .map_err(|e| DatabaseError::Serialization(format!("{field}: {e}")))
}

/// Encode one draft field into its stored form.
pub fn encode_field(draft: &ProfileDraft, field: ProfileField) -> Result<Value, DatabaseError> {
    let value = match field {
        ProfileField::FirstName => json!(draft.first_name.trim()),
        ProfileField::LastName => json!(draft.last_name.trim()),
        ProfileField::Tagline => json!(draft.tagline.trim()),
        ProfileField::Bio => json!(draft.bio.trim()),
        ProfileField::Qualifications => to_value(field, &draft.qualifications)?,
        ProfileField::Specializations => to_value(field, &draft.specializations)?,
        ProfileField::TrainingTypes => to_value(field, &draft.training_types)?,
        ProfileField::Location => json!(draft.location.trim()),
        ProfileField::DeliveryFormat => match draft.delivery_format {
            Some(format) => json!([format.as_str()]),
            None => json!([]),
        },
        ProfileField::IdealClientTypes => to_value(field, &draft.ideal_client_types)?,
        ProfileField::IdealClientPersonality => to_value(field, &draft.ideal_client_personality)?,
        ProfileField::CoachingStyle => json!(split_style(&draft.coaching_style)),
        ProfileField::Packages => to_value(field, &draft.packages)?,
        ProfileField::Testimonials => to_value(field, &draft.testimonials)?,
        ProfileField::WaysOfWorking => to_value(field, &draft.ways_of_working)?,
        ProfileField::Images => to_value(field, &draft.images)?,
        ProfileField::TermsAgreed => json!(draft.terms_agreed),
        ProfileField::AccuracyConfirmed => json!(draft.accuracy_confirmed),
        ProfileField::VerificationPreference => to_value(field, &draft.verification_preference)?,
        ProfileField::ProfessionalDocuments => to_value(field, &draft.professional_documents)?,
    };
    Ok(value)
}

/// Build the payload for the fields captured in `snapshot`.
pub fn build_payload(
    draft: &ProfileDraft,
    snapshot: &DirtySnapshot,
) -> Result<UpdatePayload, DatabaseError> {
    let mut payload = Map::with_capacity(snapshot.len());
    for field in snapshot.fields() {
        payload.insert(field.as_str().to_string(), encode_field(draft, field)?);
    }
    Ok(payload)
}

/// Refuse payloads that would blank every critical field of a populated record.
///
/// Only trips when the payload carries at least one critical field, all the
/// critical fields it carries are empty, and storage currently holds content
/// for at least one of them.
pub fn check_data_loss(payload: &UpdatePayload, existing: &ProfileRecord) -> Result<(), SaveError> {
    let critical: Vec<_> = ProfileField::CRITICAL
        .iter()
        .filter_map(|f| payload.get(f.as_str()).map(|v| (*f, v)))
        .collect();

    if critical.is_empty() || critical.iter().any(|(_, v)| value_has_content(v)) {
        return Ok(());
    }

    let clobbered: Vec<String> = critical
        .iter()
        .filter(|(f, _)| existing.has_content(*f))
        .map(|(f, _)| f.as_str().to_string())
        .collect();

    if clobbered.is_empty() {
        Ok(())
    } else {
        Err(SaveError::DataLossGuard { fields: clobbered })
    }
}

fn decode<T: DeserializeOwned + Default>(record: &ProfileRecord, field: ProfileField) -> T {
    let Some(value) = record.fields.get(field.as_str()) else {
        return T::default();
    };
    if value.is_null() {
        return T::default();
    }
    serde_json::from_value(value.clone()).unwrap_or_else(|e| {
        warn!(
            trainer_id = %record.trainer_id,
            field = %field,
            error = %e,
            "Unreadable stored profile field; using empty value"
        );
        T::default()
    })
}

/// Build a draft from a stored record, undoing the storage transforms.
pub fn draft_from_record(record: &ProfileRecord) -> ProfileDraft {
    use ProfileField as F;

    let delivery: Vec<_> = decode(record, F::DeliveryFormat);
    let style: Vec<String> = decode(record, F::CoachingStyle);

    ProfileDraft {
        first_name: decode(record, F::FirstName),
        last_name: decode(record, F::LastName),
        tagline: decode(record, F::Tagline),
        bio: decode(record, F::Bio),
        qualifications: decode(record, F::Qualifications),
        specializations: decode(record, F::Specializations),
        training_types: decode(record, F::TrainingTypes),
        location: decode(record, F::Location),
        delivery_format: delivery.into_iter().next(),
        ideal_client_types: decode(record, F::IdealClientTypes),
        ideal_client_personality: decode(record, F::IdealClientPersonality),
        coaching_style: style.join(", "),
        packages: decode(record, F::Packages),
        testimonials: decode(record, F::Testimonials),
        ways_of_working: decode(record, F::WaysOfWorking),
        images: decode(record, F::Images),
        terms_agreed: decode(record, F::TermsAgreed),
        accuracy_confirmed: decode(record, F::AccuracyConfirmed),
        verification_preference: decode(record, F::VerificationPreference),
        professional_documents: decode(record, F::ProfessionalDocuments),
    }
}
