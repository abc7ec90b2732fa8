//! Field-level checks that gate moving forward from a step.
//!
//! Validation is stricter than completion in a few places (a package with a
//! negative price still counts toward completion but cannot be saved past)
//! and looser in others: most steps may be skipped while empty.

use rust_decimal::Decimal;

use super::model::ProfileDraft;
use super::side::SideData;
use super::steps::SetupStep;
use crate::error::{FieldError, ValidationErrors};

/// Longest bio accepted on the Basic Info step.
pub const MAX_BIO_CHARS: usize = 2000;

/// Longest tagline accepted on the Basic Info step.
pub const MAX_TAGLINE_CHARS: usize = 120;

fn error(field: &'static str, message: impl Into<String>) -> FieldError {
    FieldError {
        field,
        message: message.into(),
    }
}

fn is_web_link(link: &str) -> bool {
    let link = link.trim();
    link.starts_with("https://") || link.starts_with("http://")
}

/// Check the fields of `step` that must be valid before advancing past it.
pub fn validate_step(
    step: SetupStep,
    draft: &ProfileDraft,
    side: &SideData,
) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    match step {
        SetupStep::BasicInfo => {
            if draft.first_name.trim().is_empty() {
                errors.push(error("first_name", "First name is required"));
            }
            if draft.last_name.trim().is_empty() {
                errors.push(error("last_name", "Last name is required"));
            }
            if draft.tagline.chars().count() > MAX_TAGLINE_CHARS {
                errors.push(error(
                    "tagline",
                    format!("Tagline must be at most {MAX_TAGLINE_CHARS} characters"),
                ));
            }
            if draft.bio.chars().count() > MAX_BIO_CHARS {
                errors.push(error(
                    "bio",
                    format!("Bio must be at most {MAX_BIO_CHARS} characters"),
                ));
            }
        }
        SetupStep::Qualifications => {
            if draft.qualifications.iter().any(|q| q.title.trim().is_empty()) {
                errors.push(error("qualifications", "Every qualification needs a title"));
            }
        }
        SetupStep::Packages => {
            for package in &draft.packages {
                if package.name.trim().is_empty() {
                    errors.push(error("packages", "Every package needs a name"));
                }
                if package.price < Decimal::ZERO {
                    errors.push(error(
                        "packages",
                        format!("Package '{}' has a negative price", package.name),
                    ));
                }
                if package.currency.trim().is_empty() {
                    errors.push(error(
                        "packages",
                        format!("Package '{}' needs a currency", package.name),
                    ));
                }
            }
        }
        SetupStep::DiscoveryCalls => {
            if let Some(settings) = &side.discovery {
                if let Some(link) = settings.calendar_link.as_deref() {
                    if !link.trim().is_empty() && !is_web_link(link) {
                        errors.push(error("calendar_link", "Calendar link must be a web address"));
                    }
                }
                if settings.availability_slots.iter().any(|s| !s.slot.is_valid()) {
                    errors.push(error(
                        "availability_slots",
                        "Discovery slots must end after they start",
                    ));
                }
            }
        }
        SetupStep::Testimonials => {
            let started_but_incomplete = draft
                .testimonials
                .iter()
                .any(|t| t.is_started() && !t.is_complete());
            if started_but_incomplete {
                errors.push(error(
                    "testimonials",
                    "Each testimonial needs both a client name and a quote",
                ));
            }
        }
        SetupStep::WorkingHours => {
            let bad_slot = side.availability.as_ref().is_some_and(|a| {
                a.days
                    .values()
                    .flat_map(|d| d.slots.iter())
                    .any(|s| !s.is_valid())
            });
            if bad_slot {
                errors.push(error("working_hours", "Working hours must end after they start"));
            }
        }
        SetupStep::Terms => {
            if !draft.terms_agreed {
                errors.push(error("terms_agreed", "You must agree to the terms"));
            }
            if !draft.accuracy_confirmed {
                errors.push(error(
                    "accuracy_confirmed",
                    "Confirm that your profile information is accurate",
                ));
            }
        }
        SetupStep::Expertise
        | SetupStep::LocationAndClientFit
        | SetupStep::WaysOfWorking
        | SetupStep::Images
        | SetupStep::ProfessionalDocuments => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { step, errors })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::profile::model::{PackageOption, Qualification, Testimonial};
    use crate::profile::side::{
        AvailabilitySchedule, DaySchedule, DiscoveryCallSettings, TimeSlot, Weekday,
    };

    fn fields(err: &ValidationErrors) -> Vec<&'static str> {
        err.errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn basic_info_requires_names() {
        let draft = ProfileDraft {
            first_name: "  ".into(),
            ..Default::default()
        };
        let err = validate_step(SetupStep::BasicInfo, &draft, &SideData::default()).unwrap_err();
        assert_eq!(err.step, SetupStep::BasicInfo);
        assert_eq!(fields(&err), vec!["first_name", "last_name"]);
        assert!(err.to_string().contains("first_name, last_name"));
    }

    #[test]
    fn basic_info_allows_missing_tagline_and_bio() {
        let draft = ProfileDraft {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            ..Default::default()
        };
        assert!(validate_step(SetupStep::BasicInfo, &draft, &SideData::default()).is_ok());
    }

    #[test]
    fn overlong_bio_is_rejected() {
        let draft = ProfileDraft {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            bio: "x".repeat(MAX_BIO_CHARS + 1),
            ..Default::default()
        };
        let err = validate_step(SetupStep::BasicInfo, &draft, &SideData::default()).unwrap_err();
        assert_eq!(fields(&err), vec!["bio"]);
    }

    #[test]
    fn empty_optional_steps_pass() {
        let draft = ProfileDraft::default();
        let side = SideData::default();
        for step in [
            SetupStep::Qualifications,
            SetupStep::Expertise,
            SetupStep::Packages,
            SetupStep::DiscoveryCalls,
            SetupStep::Testimonials,
            SetupStep::Images,
            SetupStep::WorkingHours,
            SetupStep::ProfessionalDocuments,
        ] {
            assert!(validate_step(step, &draft, &side).is_ok(), "{step}");
        }
    }

    #[test]
    fn untitled_qualification_is_rejected() {
        let draft = ProfileDraft {
            qualifications: vec![Qualification {
                title: " ".into(),
                issuer: None,
                year: None,
            }],
            ..Default::default()
        };
        assert!(validate_step(SetupStep::Qualifications, &draft, &SideData::default()).is_err());
    }

    #[test]
    fn negative_package_price_is_rejected() {
        let draft = ProfileDraft {
            packages: vec![PackageOption::new("Refund", dec!(-1), "GBP")],
            ..Default::default()
        };
        let err = validate_step(SetupStep::Packages, &draft, &SideData::default()).unwrap_err();
        assert!(err.errors[0].message.contains("negative price"));
    }

    #[test]
    fn calendar_link_must_be_web_address() {
        let side = SideData {
            discovery: Some(DiscoveryCallSettings {
                offers_discovery_calls: Some(true),
                calendar_link: Some("call me maybe".into()),
                availability_slots: vec![],
            }),
            ..Default::default()
        };
        let err =
            validate_step(SetupStep::DiscoveryCalls, &ProfileDraft::default(), &side).unwrap_err();
        assert_eq!(fields(&err), vec!["calendar_link"]);
    }

    #[test]
    fn half_written_testimonial_is_rejected() {
        let draft = ProfileDraft {
            testimonials: vec![Testimonial {
                client_name: "Sam".into(),
                quote: String::new(),
                outcome: None,
            }],
            ..Default::default()
        };
        assert!(validate_step(SetupStep::Testimonials, &draft, &SideData::default()).is_err());
    }

    #[test]
    fn blank_testimonial_row_is_allowed() {
        let draft = ProfileDraft {
            testimonials: vec![Testimonial {
                client_name: "  ".into(),
                quote: String::new(),
                outcome: None,
            }],
            ..Default::default()
        };
        assert!(validate_step(SetupStep::Testimonials, &draft, &SideData::default()).is_ok());
    }

    #[test]
    fn inverted_working_hours_are_rejected() {
        let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        let mut schedule = AvailabilitySchedule::default();
        schedule.days.insert(
            Weekday::Monday,
            DaySchedule {
                enabled: true,
                slots: vec![TimeSlot { start: t(17), end: t(9) }],
            },
        );
        let side = SideData {
            availability: Some(schedule),
            ..Default::default()
        };
        assert!(validate_step(SetupStep::WorkingHours, &ProfileDraft::default(), &side).is_err());
    }

    #[test]
    fn terms_require_both_confirmations() {
        let draft = ProfileDraft {
            terms_agreed: true,
            ..Default::default()
        };
        let err = validate_step(SetupStep::Terms, &draft, &SideData::default()).unwrap_err();
        assert_eq!(fields(&err), vec!["accuracy_confirmed"]);
    }
}
