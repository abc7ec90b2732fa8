//! libSQL implementation of `ProfileStore`.
//!
//! Supports local file and in-memory databases. Profiles are stored as one
//! JSON document per trainer; side records get a table each.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engagement::{EngagementEvent, EngagementEventKind};
use crate::error::DatabaseError;
use crate::profile::model::ProfileRecord;
use crate::profile::payload::UpdatePayload;
use crate::profile::side::{
    AvailabilitySchedule, AvailabilityStatus, CheckStatus, DiscoveryCallSettings, DocumentType,
    VerificationCheck,
};
use crate::store::migrations;
use crate::store::traits::ProfileStore;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_uuid(s: &str, context: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::Query(format!("{context}: bad uuid {s}: {e}")))
}

fn to_json<T: serde::Serialize>(value: &T, context: &str) -> Result<String, DatabaseError> {
    serde_json::to_string(value)
        .map_err(|e| DatabaseError::Serialization(format!("{context}: {e}")))
}

fn status_to_str(status: AvailabilityStatus) -> &'static str {
    match status {
        AvailabilityStatus::Accepting => "accepting",
        AvailabilityStatus::Waitlist => "waitlist",
        AvailabilityStatus::Unavailable => "unavailable",
    }
}

fn str_to_status(s: &str) -> AvailabilityStatus {
    match s {
        "waitlist" => AvailabilityStatus::Waitlist,
        "unavailable" => AvailabilityStatus::Unavailable,
        _ => AvailabilityStatus::Accepting,
    }
}

fn row_to_profile(row: &libsql::Row) -> Result<ProfileRecord, DatabaseError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("profile row: {e}")))?;
    let fields_str: String = row.get(1).unwrap_or_else(|_| "{}".to_string());
    let updated_str: String = row.get(2).unwrap_or_default();

    let fields = serde_json::from_str(&fields_str).map_err(|e| {
        DatabaseError::Serialization(format!("profile {id_str} fields: {e}"))
    })?;

    Ok(ProfileRecord {
        trainer_id: parse_uuid(&id_str, "profile row")?,
        fields,
        updated_at: parse_datetime(&updated_str),
    })
}

fn row_to_event(row: &libsql::Row) -> Result<Option<EngagementEvent>, DatabaseError> {
    let get = |i: i32| -> Result<String, DatabaseError> {
        row.get::<String>(i)
            .map_err(|e| DatabaseError::Query(format!("engagement row: {e}")))
    };
    let id = get(0)?;
    let kind_str = get(3)?;
    let stage_str: Option<String> = row.get(4).ok();

    let Some(kind) = EngagementEventKind::from_db(&kind_str, stage_str.as_deref()) else {
        warn!(event_id = %id, kind = %kind_str, "Skipping unrecognised engagement event");
        return Ok(None);
    };

    Ok(Some(EngagementEvent {
        id: parse_uuid(&id, "engagement row")?,
        client_id: parse_uuid(&get(1)?, "engagement row")?,
        trainer_id: parse_uuid(&get(2)?, "engagement row")?,
        kind,
        occurred_at: parse_datetime(&get(5)?),
    }))
}

// ── Trait implementation ────────────────────────────────────────────

const EVENT_COLUMNS: &str = "id, client_id, trainer_id, kind, stage, occurred_at";

#[async_trait]
impl ProfileStore for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Profiles ────────────────────────────────────────────────────

    async fn get_profile(&self, trainer_id: Uuid) -> Result<Option<ProfileRecord>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT trainer_id, fields, updated_at FROM trainer_profiles WHERE trainer_id = ?1",
                params![trainer_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_profile: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_profile(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_profile: {e}"))),
        }
    }

    async fn create_profile(&self, trainer_id: Uuid) -> Result<ProfileRecord, DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR IGNORE INTO trainer_profiles (trainer_id, fields, created_at, updated_at)
             VALUES (?1, '{}', ?2, ?2)",
            params![trainer_id.to_string(), now],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("create_profile: {e}")))?;

        debug!(trainer_id = %trainer_id, "Profile created");
        self.get_profile(trainer_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "trainer_profile".into(),
                id: trainer_id.to_string(),
            })
    }

    async fn update_profile_fields(
        &self,
        trainer_id: Uuid,
        payload: &UpdatePayload,
    ) -> Result<ProfileRecord, DatabaseError> {
        // Merged in a single statement so overlapping saves cannot drop each
        // other's fields. ?1 and ?2 are fixed, path/value pairs follow.
        let mut args = vec![
            libsql::Value::Text(Utc::now().to_rfc3339()),
            libsql::Value::Text(trainer_id.to_string()),
        ];
        let mut setters = String::new();
        for (key, value) in payload {
            if key.contains('"') {
                return Err(DatabaseError::Serialization(format!(
                    "update_profile_fields: invalid field name {key}"
                )));
            }
            let n = args.len();
            setters.push_str(&format!(", ?{}, json(?{})", n + 1, n + 2));
            args.push(libsql::Value::Text(format!("$.\"{key}\"")));
            args.push(libsql::Value::Text(to_json(value, "update_profile_fields")?));
        }
        let fields_expr = if setters.is_empty() {
            "fields".to_string()
        } else {
            format!("json_set(fields{setters})")
        };

        let sql = format!(
            "UPDATE trainer_profiles SET fields = {fields_expr}, updated_at = ?1
             WHERE trainer_id = ?2
             RETURNING trainer_id, fields, updated_at"
        );
        let mut rows = self
            .conn()
            .query(&sql, args)
            .await
            .map_err(|e| DatabaseError::Query(format!("update_profile_fields: {e}")))?;

        let record = match rows.next().await {
            Ok(Some(row)) => row_to_profile(&row)?,
            Ok(None) => {
                return Err(DatabaseError::NotFound {
                    entity: "trainer_profile".into(),
                    id: trainer_id.to_string(),
                });
            }
            Err(e) => return Err(DatabaseError::Query(format!("update_profile_fields: {e}"))),
        };

        debug!(trainer_id = %trainer_id, fields = payload.len(), "Profile fields updated");
        Ok(record)
    }

    // ── Discovery calls ─────────────────────────────────────────────

    async fn get_discovery_settings(
        &self,
        trainer_id: Uuid,
    ) -> Result<Option<DiscoveryCallSettings>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT offers_discovery_calls, calendar_link, availability_slots
                 FROM discovery_call_settings WHERE trainer_id = ?1",
                params![trainer_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_discovery_settings: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let offers: Option<i64> = row.get(0).ok();
                let calendar_link: Option<String> = row.get(1).ok();
                let slots_str: String = row.get(2).unwrap_or_else(|_| "[]".to_string());
                let availability_slots = serde_json::from_str(&slots_str).unwrap_or_else(|e| {
                    warn!(trainer_id = %trainer_id, error = %e, "Unreadable discovery slots");
                    Vec::new()
                });
                Ok(Some(DiscoveryCallSettings {
                    offers_discovery_calls: offers.map(|v| v != 0),
                    calendar_link,
                    availability_slots,
                }))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_discovery_settings: {e}"))),
        }
    }

    async fn save_discovery_settings(
        &self,
        trainer_id: Uuid,
        settings: &DiscoveryCallSettings,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let slots = to_json(&settings.availability_slots, "save_discovery_settings")?;
        let offers = match settings.offers_discovery_calls {
            Some(v) => libsql::Value::Integer(i64::from(v)),
            None => libsql::Value::Null,
        };
        let link = match settings.calendar_link.as_deref() {
            Some(l) => libsql::Value::Text(l.to_string()),
            None => libsql::Value::Null,
        };

        self.conn()
            .execute(
                "INSERT INTO discovery_call_settings
                    (trainer_id, offers_discovery_calls, calendar_link, availability_slots, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (trainer_id) DO UPDATE SET
                    offers_discovery_calls = ?2, calendar_link = ?3,
                    availability_slots = ?4, updated_at = ?5",
                params![trainer_id.to_string(), offers, link, slots, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_discovery_settings: {e}")))?;

        debug!(trainer_id = %trainer_id, "Discovery settings saved");
        Ok(())
    }

    // ── Availability ────────────────────────────────────────────────

    async fn get_availability(
        &self,
        trainer_id: Uuid,
    ) -> Result<Option<AvailabilitySchedule>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT status, status_confirmed, days FROM coach_availability WHERE trainer_id = ?1",
                params![trainer_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_availability: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let status: String = row.get(0).unwrap_or_default();
                let confirmed: i64 = row.get(1).unwrap_or(0);
                let days_str: String = row.get(2).unwrap_or_else(|_| "{}".to_string());
                let days = serde_json::from_str(&days_str).unwrap_or_else(|e| {
                    warn!(trainer_id = %trainer_id, error = %e, "Unreadable availability days");
                    Default::default()
                });
                Ok(Some(AvailabilitySchedule {
                    status: str_to_status(&status),
                    status_confirmed: confirmed != 0,
                    days,
                }))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_availability: {e}"))),
        }
    }

    async fn save_availability(
        &self,
        trainer_id: Uuid,
        schedule: &AvailabilitySchedule,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let days = to_json(&schedule.days, "save_availability")?;

        self.conn()
            .execute(
                "INSERT INTO coach_availability (trainer_id, status, status_confirmed, days, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (trainer_id) DO UPDATE SET
                    status = ?2, status_confirmed = ?3, days = ?4, updated_at = ?5",
                params![
                    trainer_id.to_string(),
                    status_to_str(schedule.status),
                    i64::from(schedule.status_confirmed),
                    days,
                    now
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_availability: {e}")))?;

        debug!(trainer_id = %trainer_id, "Availability saved");
        Ok(())
    }

    // ── Verification ────────────────────────────────────────────────

    async fn list_verification_checks(
        &self,
        trainer_id: Uuid,
    ) -> Result<Vec<VerificationCheck>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT check_type, status, updated_at FROM verification_checks
                 WHERE trainer_id = ?1 ORDER BY updated_at ASC",
                params![trainer_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_verification_checks: {e}")))?;

        let mut checks = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_verification_checks: {e}")))?
        {
            let type_str: String = row.get(0).unwrap_or_default();
            let status_str: String = row.get(1).unwrap_or_default();
            let updated_str: String = row.get(2).unwrap_or_default();

            let (Some(check_type), Some(status)) = (
                DocumentType::from_str_db(&type_str),
                CheckStatus::from_str_db(&status_str),
            ) else {
                warn!(
                    trainer_id = %trainer_id,
                    check_type = %type_str,
                    status = %status_str,
                    "Skipping unrecognised verification check"
                );
                continue;
            };

            checks.push(VerificationCheck {
                check_type,
                status,
                updated_at: parse_datetime(&updated_str),
            });
        }
        Ok(checks)
    }

    async fn record_verification_check(
        &self,
        trainer_id: Uuid,
        check: &VerificationCheck,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO verification_checks (id, trainer_id, check_type, status, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    Uuid::new_v4().to_string(),
                    trainer_id.to_string(),
                    check.check_type.as_str(),
                    check.status.as_str(),
                    check.updated_at.to_rfc3339()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("record_verification_check: {e}")))?;

        debug!(
            trainer_id = %trainer_id,
            check_type = check.check_type.as_str(),
            status = check.status.as_str(),
            "Verification check recorded"
        );
        Ok(())
    }

    async fn get_not_applicable_documents(
        &self,
        trainer_id: Uuid,
    ) -> Result<BTreeSet<DocumentType>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT document_type FROM document_preferences
                 WHERE trainer_id = ?1 AND not_applicable = 1",
                params![trainer_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_not_applicable_documents: {e}")))?;

        let mut types = BTreeSet::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("get_not_applicable_documents: {e}")))?
        {
            let type_str: String = row.get(0).unwrap_or_default();
            if let Some(ty) = DocumentType::from_str_db(&type_str) {
                types.insert(ty);
            }
        }
        Ok(types)
    }

    async fn set_document_not_applicable(
        &self,
        trainer_id: Uuid,
        document_type: DocumentType,
        not_applicable: bool,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO document_preferences (trainer_id, document_type, not_applicable)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (trainer_id, document_type) DO UPDATE SET not_applicable = ?3",
                params![
                    trainer_id.to_string(),
                    document_type.as_str(),
                    i64::from(not_applicable)
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_document_not_applicable: {e}")))?;
        Ok(())
    }

    // ── Engagement ──────────────────────────────────────────────────

    async fn record_engagement_event(&self, event: &EngagementEvent) -> Result<(), DatabaseError> {
        let stage = match event.kind {
            EngagementEventKind::StageRecorded { stage } => {
                libsql::Value::Text(stage.as_str().into())
            }
            _ => libsql::Value::Null,
        };

        self.conn()
            .execute(
                &format!("INSERT INTO engagement_events ({EVENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                params![
                    event.id.to_string(),
                    event.client_id.to_string(),
                    event.trainer_id.to_string(),
                    event.kind.as_str(),
                    stage,
                    event.occurred_at.to_rfc3339()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("record_engagement_event: {e}")))?;

        debug!(
            client_id = %event.client_id,
            trainer_id = %event.trainer_id,
            kind = event.kind.as_str(),
            "Engagement event recorded"
        );
        Ok(())
    }

    async fn list_engagement_events(
        &self,
        client_id: Uuid,
        trainer_id: Uuid,
    ) -> Result<Vec<EngagementEvent>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM engagement_events
                     WHERE client_id = ?1 AND trainer_id = ?2 ORDER BY occurred_at ASC"
                ),
                params![client_id.to_string(), trainer_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_engagement_events: {e}")))?;

        let mut events = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_engagement_events: {e}")))?
        {
            if let Some(event) = row_to_event(&row)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    async fn get_survey_completed(&self, client_id: Uuid) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT survey_completed FROM client_survey WHERE client_id = ?1",
                params![client_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_survey_completed: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).unwrap_or(0) != 0),
            Ok(None) => Ok(false),
            Err(e) => Err(DatabaseError::Query(format!("get_survey_completed: {e}"))),
        }
    }

    async fn set_survey_completed(
        &self,
        client_id: Uuid,
        completed: bool,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO client_survey (client_id, survey_completed, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (client_id) DO UPDATE SET survey_completed = ?2, updated_at = ?3",
                params![client_id.to_string(), i64::from(completed), now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_survey_completed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveTime};
    use serde_json::json;

    use super::*;
    use crate::engagement::EngagementStage;
    use crate::profile::side::{DaySchedule, DiscoverySlot, TimeSlot, Weekday};

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    fn payload(pairs: &[(&str, serde_json::Value)]) -> UpdatePayload {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    // ── Profile tests ───────────────────────────────────────────────

    #[tokio::test]
    async fn missing_profile_is_none() {
        let db = test_db().await;
        assert!(db.get_profile(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_profile_is_idempotent() {
        let db = test_db().await;
        let id = Uuid::new_v4();
        db.create_profile(id).await.unwrap();
        db.update_profile_fields(id, &payload(&[("first_name", json!("Jane"))]))
            .await
            .unwrap();

        let again = db.create_profile(id).await.unwrap();
        assert_eq!(again.fields["first_name"], "Jane");
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let db = test_db().await;
        let id = Uuid::new_v4();
        db.create_profile(id).await.unwrap();
        db.update_profile_fields(
            id,
            &payload(&[("first_name", json!("Jane")), ("bio", json!("Coach"))]),
        )
        .await
        .unwrap();
        db.update_profile_fields(id, &payload(&[("bio", json!("Strength coach"))]))
            .await
            .unwrap();

        let record = db.get_profile(id).await.unwrap().unwrap();
        assert_eq!(record.fields["first_name"], "Jane");
        assert_eq!(record.fields["bio"], "Strength coach");
    }

    #[tokio::test]
    async fn update_replaces_nested_values_and_keeps_nulls() {
        let db = test_db().await;
        let id = Uuid::new_v4();
        db.create_profile(id).await.unwrap();
        db.update_profile_fields(
            id,
            &payload(&[("verification_preference", json!({"method": "upload", "note": "x"}))]),
        )
        .await
        .unwrap();
        let record = db
            .update_profile_fields(
                id,
                &payload(&[
                    ("verification_preference", json!({"method": "manual"})),
                    ("tagline", serde_json::Value::Null),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(record.fields["verification_preference"], json!({"method": "manual"}));
        assert!(record.fields.contains_key("tagline"));
        assert!(record.fields["tagline"].is_null());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_updates_keep_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(
            LibSqlBackend::new_local(&dir.path().join("profiles.db"))
                .await
                .unwrap(),
        );
        let id = Uuid::new_v4();
        db.create_profile(id).await.unwrap();

        let writers: Vec<_> = (0..40)
            .map(|i| {
                let db = Arc::clone(&db);
                tokio::spawn(async move {
                    let key = format!("field_{i}");
                    db.update_profile_fields(id, &payload(&[(key.as_str(), json!(i))]))
                        .await
                })
            })
            .collect();

        let mut acknowledged = 0;
        for writer in writers {
            if writer.await.unwrap().is_ok() {
                acknowledged += 1;
            }
        }

        let record = db.get_profile(id).await.unwrap().unwrap();
        let stored = (0..40)
            .filter(|i| record.fields.get(&format!("field_{i}")) == Some(&json!(i)))
            .count();
        assert_eq!(acknowledged, 40);
        assert_eq!(stored, 40);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn last_write_to_a_field_wins_under_overlap() {
        let db = Arc::new(test_db().await);
        let id = Uuid::new_v4();
        db.create_profile(id).await.unwrap();
        db.update_profile_fields(id, &payload(&[("first_name", json!("Jane"))]))
            .await
            .unwrap();

        let writers: Vec<_> = (0..20)
            .map(|i| {
                let db = Arc::clone(&db);
                tokio::spawn(async move {
                    db.update_profile_fields(id, &payload(&[("bio", json!(format!("bio {i}")))]))
                        .await
                        .unwrap()
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        let record = db.get_profile(id).await.unwrap().unwrap();
        assert_eq!(record.fields["first_name"], "Jane");
        assert!(record.fields["bio"].as_str().unwrap().starts_with("bio "));
    }

    #[tokio::test]
    async fn update_missing_profile_is_not_found() {
        let db = test_db().await;
        let err = db
            .update_profile_fields(Uuid::new_v4(), &payload(&[("bio", json!("x"))]))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    // ── Side record tests ───────────────────────────────────────────

    #[tokio::test]
    async fn discovery_settings_roundtrip() {
        let db = test_db().await;
        let id = Uuid::new_v4();
        assert!(db.get_discovery_settings(id).await.unwrap().is_none());

        let settings = DiscoveryCallSettings {
            offers_discovery_calls: Some(true),
            calendar_link: None,
            availability_slots: vec![DiscoverySlot {
                day: Weekday::Tuesday,
                slot: TimeSlot {
                    start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    end: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                },
                enabled: true,
            }],
        };
        db.save_discovery_settings(id, &settings).await.unwrap();
        assert_eq!(db.get_discovery_settings(id).await.unwrap(), Some(settings));
    }

    #[tokio::test]
    async fn unanswered_discovery_question_stays_unset() {
        let db = test_db().await;
        let id = Uuid::new_v4();
        db.save_discovery_settings(id, &DiscoveryCallSettings::default())
            .await
            .unwrap();
        let loaded = db.get_discovery_settings(id).await.unwrap().unwrap();
        assert_eq!(loaded.offers_discovery_calls, None);
    }

    #[tokio::test]
    async fn availability_upsert() {
        let db = test_db().await;
        let id = Uuid::new_v4();
        let mut schedule = AvailabilitySchedule {
            status: AvailabilityStatus::Waitlist,
            status_confirmed: true,
            ..Default::default()
        };
        db.save_availability(id, &schedule).await.unwrap();

        schedule.days.insert(
            Weekday::Friday,
            DaySchedule {
                enabled: true,
                slots: vec![TimeSlot {
                    start: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
                    end: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                }],
            },
        );
        db.save_availability(id, &schedule).await.unwrap();

        let loaded = db.get_availability(id).await.unwrap().unwrap();
        assert_eq!(loaded, schedule);
    }

    #[tokio::test]
    async fn verification_checks_in_order() {
        let db = test_db().await;
        let id = Uuid::new_v4();
        let earlier = Utc::now() - Duration::days(2);
        db.record_verification_check(
            id,
            &VerificationCheck {
                check_type: DocumentType::Insurance,
                status: CheckStatus::Verified,
                updated_at: Utc::now(),
            },
        )
        .await
        .unwrap();
        db.record_verification_check(
            id,
            &VerificationCheck {
                check_type: DocumentType::Insurance,
                status: CheckStatus::Submitted,
                updated_at: earlier,
            },
        )
        .await
        .unwrap();

        let checks = db.list_verification_checks(id).await.unwrap();
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].status, CheckStatus::Submitted);
        assert_eq!(checks[1].status, CheckStatus::Verified);
    }

    #[tokio::test]
    async fn not_applicable_documents_toggle() {
        let db = test_db().await;
        let id = Uuid::new_v4();
        db.set_document_not_applicable(id, DocumentType::FirstAid, true)
            .await
            .unwrap();
        db.set_document_not_applicable(id, DocumentType::Insurance, true)
            .await
            .unwrap();
        db.set_document_not_applicable(id, DocumentType::Insurance, false)
            .await
            .unwrap();

        let na = db.get_not_applicable_documents(id).await.unwrap();
        assert_eq!(na, BTreeSet::from([DocumentType::FirstAid]));
    }

    #[tokio::test]
    async fn load_side_data_marks_lists_loaded() {
        let db = test_db().await;
        let side = db.load_side_data(Uuid::new_v4()).await.unwrap();
        assert!(side.discovery.is_none());
        assert!(side.availability.is_none());
        assert_eq!(side.verification_checks, Some(vec![]));
        assert_eq!(side.not_applicable_documents, Some(BTreeSet::new()));
    }

    // ── Engagement tests ────────────────────────────────────────────

    #[tokio::test]
    async fn engagement_events_scoped_to_pair() {
        let db = test_db().await;
        let client = Uuid::new_v4();
        let trainer = Uuid::new_v4();
        let other_trainer = Uuid::new_v4();

        db.record_engagement_event(&EngagementEvent::new(
            client,
            trainer,
            EngagementEventKind::Liked,
        ))
        .await
        .unwrap();
        db.record_engagement_event(&EngagementEvent::new(
            client,
            trainer,
            EngagementEventKind::StageRecorded {
                stage: EngagementStage::Waitlist,
            },
        ))
        .await
        .unwrap();
        db.record_engagement_event(&EngagementEvent::new(
            client,
            other_trainer,
            EngagementEventKind::Matched,
        ))
        .await
        .unwrap();

        let events = db.list_engagement_events(client, trainer).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| e.kind
            == EngagementEventKind::StageRecorded {
                stage: EngagementStage::Waitlist
            }));
    }

    #[tokio::test]
    async fn survey_flag_defaults_false() {
        let db = test_db().await;
        let client = Uuid::new_v4();
        assert!(!db.get_survey_completed(client).await.unwrap());
        db.set_survey_completed(client, true).await.unwrap();
        assert!(db.get_survey_completed(client).await.unwrap());
    }
}
