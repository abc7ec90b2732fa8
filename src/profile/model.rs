//! Trainer profile draft and persisted record models.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::side::DocumentType;

/// A recorded qualification (certificate, diploma, course).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualification {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

/// How sessions are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFormat {
    InPerson,
    Online,
    Hybrid,
}

impl DeliveryFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InPerson => "in_person",
            Self::Online => "online",
            Self::Hybrid => "hybrid",
        }
    }
}

/// A priced package offered to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageOption {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions: Option<u32>,
    #[serde(default)]
    pub description: String,
}

impl PackageOption {
    pub fn new(name: &str, price: Decimal, currency: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
            currency: currency.to_string(),
            sessions: None,
            description: String::new(),
        }
    }
}

/// A client testimonial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Testimonial {
    pub client_name: String,
    pub quote: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

impl Testimonial {
    /// Has both an attribution and some text.
    pub fn is_complete(&self) -> bool {
        !self.client_name.trim().is_empty() && !self.quote.trim().is_empty()
    }

    /// Has an attribution or some text.
    pub fn is_started(&self) -> bool {
        !self.client_name.trim().is_empty() || !self.quote.trim().is_empty()
    }
}

/// Structured "how I work with clients" text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaysOfWorking {
    #[serde(default)]
    pub onboarding: Vec<String>,
    #[serde(default)]
    pub first_week: Vec<String>,
    #[serde(default)]
    pub ongoing_structure: Vec<String>,
    #[serde(default)]
    pub tracking_tools: Vec<String>,
    #[serde(default)]
    pub client_expectations: Vec<String>,
    #[serde(default)]
    pub what_i_bring: Vec<String>,
    /// Activity name → section it was dragged into.
    #[serde(default)]
    pub activity_assignments: BTreeMap<String, String>,
}

impl WaysOfWorking {
    /// Named sections, in display order.
    pub fn sections(&self) -> [(&'static str, &[String]); 6] {
        [
            ("onboarding", self.onboarding.as_slice()),
            ("first_week", self.first_week.as_slice()),
            ("ongoing_structure", self.ongoing_structure.as_slice()),
            ("tracking_tools", self.tracking_tools.as_slice()),
            ("client_expectations", self.client_expectations.as_slice()),
            ("what_i_bring", self.what_i_bring.as_slice()),
        ]
    }

    /// Number of sections with at least one non-blank item.
    pub fn filled_sections(&self) -> usize {
        self.sections()
            .iter()
            .filter(|(_, items)| items.iter().any(|i| !i.trim().is_empty()))
            .count()
    }
}

/// Uploaded and selected gallery images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSelection {
    #[serde(default)]
    pub uploaded: Vec<String>,
    #[serde(default)]
    pub selected: Vec<String>,
}

/// Whether the trainer wants their documents verified now or later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationPreference {
    VerifyNow,
    Later,
    Skip,
}

/// In-progress trainer profile, edited field by field in the setup wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileDraft {
    pub first_name: String,
    pub last_name: String,
    pub tagline: String,
    pub bio: String,
    pub qualifications: Vec<Qualification>,
    pub specializations: Vec<String>,
    pub training_types: Vec<String>,
    pub location: String,
    pub delivery_format: Option<DeliveryFormat>,
    pub ideal_client_types: Vec<String>,
    pub ideal_client_personality: Vec<String>,
    /// Comma-separated in the editor; stored as a list.
    pub coaching_style: String,
    pub packages: Vec<PackageOption>,
    pub testimonials: Vec<Testimonial>,
    pub ways_of_working: WaysOfWorking,
    pub images: ImageSelection,
    pub terms_agreed: bool,
    pub accuracy_confirmed: bool,
    pub verification_preference: Option<VerificationPreference>,
    /// Uploaded document references by type.
    pub professional_documents: BTreeMap<DocumentType, String>,
}

impl ProfileDraft {
    /// The four identity fields shown on the Basic Info step.
    pub fn identity_fields(&self) -> [(ProfileField, &str); 4] {
        [
            (ProfileField::FirstName, self.first_name.as_str()),
            (ProfileField::LastName, self.last_name.as_str()),
            (ProfileField::Tagline, self.tagline.as_str()),
            (ProfileField::Bio, self.bio.as_str()),
        ]
    }
}

/// A persisted trainer profile: a JSON document of column → value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub trainer_id: Uuid,
    pub fields: serde_json::Map<String, serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    pub fn new(trainer_id: Uuid) -> Self {
        Self {
            trainer_id,
            fields: serde_json::Map::new(),
            updated_at: Utc::now(),
        }
    }

    /// Whether the stored value of `field` carries any content.
    pub fn has_content(&self, field: ProfileField) -> bool {
        self.fields.get(field.as_str()).is_some_and(value_has_content)
    }
}

/// `null`, blank strings, empty arrays and empty objects count as empty.
pub fn value_has_content(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => !s.trim().is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
        serde_json::Value::Bool(_) | serde_json::Value::Number(_) => true,
    }
}

/// Editable profile fields. The string form is the persisted column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    FirstName,
    LastName,
    Tagline,
    Bio,
    Qualifications,
    Specializations,
    TrainingTypes,
    Location,
    DeliveryFormat,
    IdealClientTypes,
    IdealClientPersonality,
    CoachingStyle,
    Packages,
    Testimonials,
    WaysOfWorking,
    Images,
    TermsAgreed,
    AccuracyConfirmed,
    VerificationPreference,
    ProfessionalDocuments,
}

impl ProfileField {
    pub const ALL: [ProfileField; 20] = [
        Self::FirstName,
        Self::LastName,
        Self::Tagline,
        Self::Bio,
        Self::Qualifications,
        Self::Specializations,
        Self::TrainingTypes,
        Self::Location,
        Self::DeliveryFormat,
        Self::IdealClientTypes,
        Self::IdealClientPersonality,
        Self::CoachingStyle,
        Self::Packages,
        Self::Testimonials,
        Self::WaysOfWorking,
        Self::Images,
        Self::TermsAgreed,
        Self::AccuracyConfirmed,
        Self::VerificationPreference,
        Self::ProfessionalDocuments,
    ];

    /// Fields whose wholesale blanking is treated as data loss.
    pub const CRITICAL: [ProfileField; 4] = [
        Self::FirstName,
        Self::LastName,
        Self::Tagline,
        Self::Bio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Tagline => "tagline",
            Self::Bio => "bio",
            Self::Qualifications => "qualifications",
            Self::Specializations => "specializations",
            Self::TrainingTypes => "training_types",
            Self::Location => "location",
            Self::DeliveryFormat => "delivery_format",
            Self::IdealClientTypes => "ideal_client_types",
            Self::IdealClientPersonality => "ideal_client_personality",
            Self::CoachingStyle => "coaching_style",
            Self::Packages => "packages",
            Self::Testimonials => "testimonials",
            Self::WaysOfWorking => "ways_of_working",
            Self::Images => "images",
            Self::TermsAgreed => "terms_agreed",
            Self::AccuracyConfirmed => "accuracy_confirmed",
            Self::VerificationPreference => "verification_preference",
            Self::ProfessionalDocuments => "professional_documents",
        }
    }

    pub fn from_str_db(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }
}

impl std::fmt::Display for ProfileField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn field_names_roundtrip_and_match_serde() {
        for field in ProfileField::ALL {
            assert_eq!(ProfileField::from_str_db(field.as_str()), Some(field));
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{field}\""));
        }
        assert_eq!(ProfileField::from_str_db("nickname"), None);
    }

    #[test]
    fn testimonial_completeness() {
        let t = Testimonial {
            client_name: "Sam".into(),
            quote: "  ".into(),
            outcome: None,
        };
        assert!(!t.is_complete());
    }

    #[test]
    fn filled_sections_ignores_blank_items() {
        let wow = WaysOfWorking {
            onboarding: vec!["Intro call".into()],
            first_week: vec!["   ".into()],
            ..Default::default()
        };
        assert_eq!(wow.filled_sections(), 1);
    }

    #[test]
    fn value_content_rules() {
        assert!(!value_has_content(&json!(null)));
        assert!(!value_has_content(&json!("  ")));
        assert!(!value_has_content(&json!([])));
        assert!(!value_has_content(&json!({})));
        assert!(value_has_content(&json!(false)));
        assert!(value_has_content(&json!(["a"])));
    }

    #[test]
    fn package_price_serializes_as_string() {
        let pkg = PackageOption::new("12-week plan", dec!(349.99), "GBP");
        let json = serde_json::to_value(&pkg).unwrap();
        assert_eq!(json["price"], "349.99");
        let back: PackageOption = serde_json::from_value(json).unwrap();
        assert_eq!(back.price, dec!(349.99));
    }

    #[test]
    fn record_has_content() {
        let mut record = ProfileRecord::new(Uuid::new_v4());
        record.fields.insert("bio".into(), json!("Coach"));
        record.fields.insert("tagline".into(), json!(""));
        assert!(record.has_content(ProfileField::Bio));
        assert!(!record.has_content(ProfileField::Tagline));
        assert!(!record.has_content(ProfileField::FirstName));
    }
}
