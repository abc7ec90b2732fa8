//! `ProfileStore` trait, the single async interface for all persistence.

use std::collections::BTreeSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::engagement::EngagementEvent;
use crate::error::DatabaseError;
use crate::profile::model::ProfileRecord;
use crate::profile::payload::UpdatePayload;
use crate::profile::side::{
    AvailabilitySchedule, DiscoveryCallSettings, DocumentType, SideData, VerificationCheck,
};

/// Backend-agnostic store for trainer profiles, their side records and
/// client engagement history.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Profiles ────────────────────────────────────────────────────

    /// Get a trainer's profile record.
    async fn get_profile(&self, trainer_id: Uuid) -> Result<Option<ProfileRecord>, DatabaseError>;

    /// Create an empty profile record. Existing records are left untouched.
    async fn create_profile(&self, trainer_id: Uuid) -> Result<ProfileRecord, DatabaseError>;

    /// Merge `payload` into the stored profile and return the updated record.
    ///
    /// Fields not named in the payload keep their stored values.
    async fn update_profile_fields(
        &self,
        trainer_id: Uuid,
        payload: &UpdatePayload,
    ) -> Result<ProfileRecord, DatabaseError>;

    // ── Side records ────────────────────────────────────────────────

    async fn get_discovery_settings(
        &self,
        trainer_id: Uuid,
    ) -> Result<Option<DiscoveryCallSettings>, DatabaseError>;

    async fn save_discovery_settings(
        &self,
        trainer_id: Uuid,
        settings: &DiscoveryCallSettings,
    ) -> Result<(), DatabaseError>;

    async fn get_availability(
        &self,
        trainer_id: Uuid,
    ) -> Result<Option<AvailabilitySchedule>, DatabaseError>;

    async fn save_availability(
        &self,
        trainer_id: Uuid,
        schedule: &AvailabilitySchedule,
    ) -> Result<(), DatabaseError>;

    /// All checks recorded for a trainer, oldest first.
    async fn list_verification_checks(
        &self,
        trainer_id: Uuid,
    ) -> Result<Vec<VerificationCheck>, DatabaseError>;

    async fn record_verification_check(
        &self,
        trainer_id: Uuid,
        check: &VerificationCheck,
    ) -> Result<(), DatabaseError>;

    async fn get_not_applicable_documents(
        &self,
        trainer_id: Uuid,
    ) -> Result<BTreeSet<DocumentType>, DatabaseError>;

    async fn set_document_not_applicable(
        &self,
        trainer_id: Uuid,
        document_type: DocumentType,
        not_applicable: bool,
    ) -> Result<(), DatabaseError>;

    /// Fetch every side record for a trainer.
    async fn load_side_data(&self, trainer_id: Uuid) -> Result<SideData, DatabaseError> {
        Ok(SideData {
            discovery: self.get_discovery_settings(trainer_id).await?,
            availability: self.get_availability(trainer_id).await?,
            verification_checks: Some(self.list_verification_checks(trainer_id).await?),
            not_applicable_documents: Some(self.get_not_applicable_documents(trainer_id).await?),
        })
    }

    // ── Engagement ──────────────────────────────────────────────────

    async fn record_engagement_event(&self, event: &EngagementEvent) -> Result<(), DatabaseError>;

    /// Events between one client and one trainer, oldest first.
    async fn list_engagement_events(
        &self,
        client_id: Uuid,
        trainer_id: Uuid,
    ) -> Result<Vec<EngagementEvent>, DatabaseError>;

    /// The explicit intake-survey flag for a client.
    async fn get_survey_completed(&self, client_id: Uuid) -> Result<bool, DatabaseError>;

    async fn set_survey_completed(
        &self,
        client_id: Uuid,
        completed: bool,
    ) -> Result<(), DatabaseError>;
}
