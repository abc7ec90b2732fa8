//! ProfileSetupSession: one trainer's pass through the setup wizard.
//!
//! Holds the draft, the last persisted record and the side data, and drives
//! the load → edit → save → recompute cycle. Writes run on spawned tasks so
//! a caller that goes away mid-save does not cancel the request; the task
//! still commits its result when it lands.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::completion::CompletionReport;
use super::dirty::DirtyFieldTracker;
use super::model::{ProfileDraft, ProfileField, ProfileRecord};
use super::payload::{build_payload, check_data_loss, draft_from_record};
use super::side::{AvailabilitySchedule, DiscoveryCallSettings, DocumentType, SideData};
use super::steps::SetupStep;
use super::validation::validate_step;
use crate::error::{DatabaseError, SaveError};
use crate::store::ProfileStore;

/// Result of a profile save.
#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    /// Fields written by this save. Empty when there was nothing to save.
    pub saved_fields: Vec<ProfileField>,
    /// Fields that were edited again while the write was in flight.
    pub still_dirty: Vec<ProfileField>,
    pub availability_saved: bool,
    pub completion: CompletionReport,
}

/// Coordinates a trainer's setup wizard: draft state, incremental saves and
/// step navigation.
pub struct ProfileSetupSession {
    store: Arc<dyn ProfileStore>,
    trainer_id: Uuid,
    draft: RwLock<Option<ProfileDraft>>,
    persisted: RwLock<Option<ProfileRecord>>,
    side: RwLock<SideData>,
    tracker: DirtyFieldTracker,
    current_step: RwLock<SetupStep>,
    availability_revision: AtomicU64,
    availability_saved_revision: AtomicU64,
}

impl ProfileSetupSession {
    /// Create a session with nothing loaded. Saves are refused until `load`.
    pub fn new(store: Arc<dyn ProfileStore>, trainer_id: Uuid) -> Arc<Self> {
        Arc::new(Self {
            store,
            trainer_id,
            draft: RwLock::new(None),
            persisted: RwLock::new(None),
            side: RwLock::new(SideData::default()),
            tracker: DirtyFieldTracker::new(),
            current_step: RwLock::new(SetupStep::BasicInfo),
            availability_revision: AtomicU64::new(0),
            availability_saved_revision: AtomicU64::new(0),
        })
    }

    /// Create a session and load it from the store.
    pub async fn open(
        store: Arc<dyn ProfileStore>,
        trainer_id: Uuid,
    ) -> Result<Arc<Self>, DatabaseError> {
        let session = Self::new(store, trainer_id);
        session.load().await?;
        Ok(session)
    }

    pub fn trainer_id(&self) -> Uuid {
        self.trainer_id
    }

    /// Fetch the persisted profile (creating an empty one if needed) and the
    /// side records, replacing any local state. Unsaved edits are discarded.
    pub async fn load(&self) -> Result<(), DatabaseError> {
        let record = match self.store.get_profile(self.trainer_id).await? {
            Some(record) => record,
            None => {
                info!(trainer_id = %self.trainer_id, "No profile yet; creating one");
                self.store.create_profile(self.trainer_id).await?
            }
        };
        let side = self.store.load_side_data(self.trainer_id).await?;

        *self.draft.write().await = Some(draft_from_record(&record));
        *self.persisted.write().await = Some(record);
        *self.side.write().await = side;
        self.tracker.clear();
        let revision = self.availability_revision.load(Ordering::SeqCst);
        self.availability_saved_revision.fetch_max(revision, Ordering::SeqCst);

        debug!(trainer_id = %self.trainer_id, "Setup session loaded");
        Ok(())
    }

    pub async fn is_loaded(&self) -> bool {
        self.draft.read().await.is_some()
    }

    /// Copy of the current draft, if loaded.
    pub async fn draft(&self) -> Option<ProfileDraft> {
        self.draft.read().await.clone()
    }

    pub async fn side_data(&self) -> SideData {
        self.side.read().await.clone()
    }

    pub async fn current_step(&self) -> SetupStep {
        *self.current_step.read().await
    }

    /// Fields changed since the last confirmed save.
    pub fn dirty_fields(&self) -> Vec<ProfileField> {
        self.tracker.snapshot().into_iter().collect()
    }

    /// Apply an edit to the draft and mark `fields` dirty.
    pub async fn edit<F>(&self, fields: &[ProfileField], apply: F) -> Result<(), SaveError>
    where
        F: FnOnce(&mut ProfileDraft),
    {
        let mut guard = self.draft.write().await;
        let draft = guard.as_mut().ok_or(SaveError::NotInitialized)?;
        apply(draft);
        self.tracker.mark_dirty(fields.iter().copied());
        Ok(())
    }

    /// Replace the working-hours schedule. Persisted on the next navigation.
    pub async fn update_availability(&self, schedule: AvailabilitySchedule) {
        self.side.write().await.availability = Some(schedule);
        self.availability_revision.fetch_add(1, Ordering::SeqCst);
    }

    pub fn availability_dirty(&self) -> bool {
        self.availability_revision.load(Ordering::SeqCst)
            > self.availability_saved_revision.load(Ordering::SeqCst)
    }

    /// Save discovery-call settings straight through to the store.
    pub async fn update_discovery_settings(
        &self,
        settings: DiscoveryCallSettings,
    ) -> Result<(), SaveError> {
        self.store
            .save_discovery_settings(self.trainer_id, &settings)
            .await?;
        self.side.write().await.discovery = Some(settings);
        Ok(())
    }

    /// Mark a document type as not applicable (or applicable again).
    pub async fn set_document_not_applicable(
        &self,
        document_type: DocumentType,
        not_applicable: bool,
    ) -> Result<(), SaveError> {
        self.store
            .set_document_not_applicable(self.trainer_id, document_type, not_applicable)
            .await?;
        let mut side = self.side.write().await;
        let set = side.not_applicable_documents.get_or_insert_with(Default::default);
        if not_applicable {
            set.insert(document_type);
        } else {
            set.remove(&document_type);
        }
        Ok(())
    }

    /// Per-step tags and overall percentage for the current draft.
    pub async fn completion(&self) -> CompletionReport {
        let draft = self.draft.read().await;
        let side = self.side.read().await;
        match draft.as_ref() {
            Some(draft) => CompletionReport::compute(draft, &side),
            None => CompletionReport::compute(&ProfileDraft::default(), &side),
        }
    }

    /// Persist the dirty profile fields.
    ///
    /// An empty dirty set is a successful no-op. On failure nothing is
    /// cleared, so a retry sends the same fields.
    pub async fn save(self: &Arc<Self>) -> Result<SaveOutcome, SaveError> {
        let saved_fields = self.save_profile().await?;
        Ok(SaveOutcome {
            still_dirty: self.dirty_fields(),
            saved_fields,
            availability_saved: false,
            completion: self.completion().await,
        })
    }

    /// Save and move to `target`.
    ///
    /// Moving forward requires the current step to validate; moving back
    /// never does. The profile save completes before the availability save
    /// starts, and a failure in either leaves the session on its step.
    pub async fn save_and_navigate(
        self: &Arc<Self>,
        target: SetupStep,
    ) -> Result<SaveOutcome, SaveError> {
        let from = self.current_step().await;

        if target > from {
            let draft = self.draft.read().await;
            let draft = draft.as_ref().ok_or(SaveError::NotInitialized)?;
            let side = self.side.read().await;
            validate_step(from, draft, &side)?;
        }

        let saved_fields = self.save_profile().await?;
        let availability_saved = self.save_availability().await?;

        *self.current_step.write().await = target;
        info!(
            trainer_id = %self.trainer_id,
            from = %from,
            to = %target,
            saved = saved_fields.len(),
            "Setup step changed"
        );

        Ok(SaveOutcome {
            still_dirty: self.dirty_fields(),
            saved_fields,
            availability_saved,
            completion: self.completion().await,
        })
    }

    async fn save_profile(self: &Arc<Self>) -> Result<Vec<ProfileField>, SaveError> {
        let snapshot = self.tracker.begin_save();

        let payload = {
            let draft = self.draft.read().await;
            let draft = draft.as_ref().ok_or(SaveError::NotInitialized)?;
            if snapshot.is_empty() {
                debug!(trainer_id = %self.trainer_id, "Nothing to save");
                return Ok(Vec::new());
            }
            build_payload(draft, &snapshot)?
        };

        {
            let persisted = self.persisted.read().await;
            let persisted = persisted.as_ref().ok_or(SaveError::NotInitialized)?;
            if let Err(e) = check_data_loss(&payload, persisted) {
                warn!(trainer_id = %self.trainer_id, error = %e, "Save refused");
                return Err(e);
            }
        }

        let session = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let result = session
                .store
                .update_profile_fields(session.trainer_id, &payload)
                .await;
            match result {
                Ok(record) => {
                    let cleared = session.tracker.commit(&snapshot);
                    if !keep_newest(&mut *session.persisted.write().await, record) {
                        debug!(
                            trainer_id = %session.trainer_id,
                            "Late save result; keeping newer record"
                        );
                    }
                    info!(
                        trainer_id = %session.trainer_id,
                        fields = cleared.len(),
                        "Profile saved"
                    );
                    Ok(snapshot.fields().collect::<Vec<_>>())
                }
                Err(e) => {
                    warn!(
                        trainer_id = %session.trainer_id,
                        error = %e,
                        "Profile save failed; keeping dirty fields"
                    );
                    Err(SaveError::Persistence(e))
                }
            }
        });

        handle
            .await
            .map_err(|e| SaveError::Aborted(e.to_string()))?
    }

    async fn save_availability(self: &Arc<Self>) -> Result<bool, SaveError> {
        let revision = self.availability_revision.load(Ordering::SeqCst);
        if revision <= self.availability_saved_revision.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let Some(schedule) = self.side.read().await.availability.clone() else {
            return Ok(false);
        };

        let session = Arc::clone(self);
        let handle = tokio::spawn(async move {
            match session
                .store
                .save_availability(session.trainer_id, &schedule)
                .await
            {
                Ok(()) => {
                    session
                        .availability_saved_revision
                        .fetch_max(revision, Ordering::SeqCst);
                    debug!(trainer_id = %session.trainer_id, "Availability saved");
                    Ok(true)
                }
                Err(e) => {
                    warn!(
                        trainer_id = %session.trainer_id,
                        error = %e,
                        "Availability save failed"
                    );
                    Err(SaveError::Persistence(e))
                }
            }
        });

        handle
            .await
            .map_err(|e| SaveError::Aborted(e.to_string()))?
    }
}

/// Replace `slot` with `record` unless it already holds a newer one.
/// Saves can land out of order; the data-loss guard must see the latest.
fn keep_newest(slot: &mut Option<ProfileRecord>, record: ProfileRecord) -> bool {
    match slot {
        Some(current) if current.updated_at > record.updated_at => false,
        _ => {
            *slot = Some(record);
            true
        }
    }
}
