//! Integration tests for the setup-completion and engagement REST API.
//!
//! Each test spins up an Axum server on a random port backed by a libSQL
//! database, writes through the library API, and reads back over HTTP.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveTime, Utc};
use serde_json::Value;
use tokio::net::TcpListener;
use uuid::Uuid;

use fitmatch::engagement::{EngagementEvent, EngagementEventKind};
use fitmatch::profile::model::Qualification;
use fitmatch::profile::side::{AvailabilitySchedule, DaySchedule, TimeSlot, Weekday};
use fitmatch::profile::{ProfileField, ProfileSetupSession, SetupStep};
use fitmatch::routes::{RouteState, api_routes};
use fitmatch::store::{LibSqlBackend, ProfileStore};

/// Start an Axum server on a random port, return (base url, store).
async fn start_server(store: Arc<dyn ProfileStore>) -> String {
    let app = api_routes(RouteState {
        store: Arc::clone(&store),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}

async fn memory_store() -> Arc<dyn ProfileStore> {
    Arc::new(LibSqlBackend::new_memory().await.unwrap())
}

async fn get_json(url: &str) -> (u16, Value) {
    let resp = reqwest::get(url).await.unwrap();
    let status = resp.status().as_u16();
    let body = resp.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_reports_ok() {
    let base = start_server(memory_store().await).await;
    let (status, body) = get_json(&format!("{base}/health")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn completion_for_unknown_trainer_is_404() {
    let base = start_server(memory_store().await).await;
    let (status, body) = get_json(&format!(
        "{base}/api/trainers/{}/setup/completion",
        Uuid::new_v4()
    ))
    .await;
    assert_eq!(status, 404);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_trainer_id_is_rejected() {
    let base = start_server(memory_store().await).await;
    let resp = reqwest::get(format!("{base}/api/trainers/not-a-uuid/setup/completion"))
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn completion_reflects_saved_session() {
    let store = memory_store().await;
    let base = start_server(Arc::clone(&store)).await;
    let trainer_id = Uuid::new_v4();

    let session = ProfileSetupSession::open(Arc::clone(&store), trainer_id)
        .await
        .unwrap();
    session
        .edit(
            &[
                ProfileField::FirstName,
                ProfileField::LastName,
                ProfileField::Tagline,
                ProfileField::Bio,
                ProfileField::Qualifications,
            ],
            |d| {
                d.first_name = "Jane".into();
                d.last_name = "Doe".into();
                d.tagline = "Strength coach".into();
                d.bio = "I help busy professionals build strength that lasts forever.".into();
                d.qualifications = vec![Qualification {
                    title: "Level 3 PT".into(),
                    issuer: None,
                    year: Some(2019),
                }];
            },
        )
        .await
        .unwrap();

    let mut schedule = AvailabilitySchedule::default();
    schedule.days.insert(
        Weekday::Wednesday,
        DaySchedule {
            enabled: true,
            slots: vec![TimeSlot {
                start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            }],
        },
    );
    session.update_availability(schedule).await;
    session
        .save_and_navigate(SetupStep::Qualifications)
        .await
        .unwrap();

    let url = format!("{base}/api/trainers/{trainer_id}/setup/completion");
    let (status, body) = get_json(&url).await;
    assert_eq!(status, 200);
    // Basic info 13 + half of qualifications 5 + working hours 8.
    assert_eq!(body["percentage"], 26);
    assert_eq!(body["is_fully_complete"], false);
    assert_eq!(body["steps"][0]["completion"], "completed");
    assert_eq!(body["steps"][1]["completion"], "partial");
    assert_eq!(body["steps"][9]["step"], "working_hours");
    assert_eq!(body["steps"][9]["completion"], "completed");
    assert_eq!(body["steps"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn step_endpoint_validates_number() {
    let store = memory_store().await;
    let base = start_server(Arc::clone(&store)).await;
    let trainer_id = Uuid::new_v4();
    store.create_profile(trainer_id).await.unwrap();

    let (status, body) = get_json(&format!("{base}/api/trainers/{trainer_id}/setup/steps/5")).await;
    assert_eq!(status, 200);
    assert_eq!(body["step"], "packages");
    assert_eq!(body["weight"], 12);
    assert_eq!(body["completion"], "not_started");

    for bad in [0, 13] {
        let (status, _) =
            get_json(&format!("{base}/api/trainers/{trainer_id}/setup/steps/{bad}")).await;
        assert_eq!(status, 400, "step {bad}");
    }
}

#[tokio::test]
async fn engagement_projection_over_http() {
    let store = memory_store().await;
    let base = start_server(Arc::clone(&store)).await;
    let client_id = Uuid::new_v4();
    let trainer_id = Uuid::new_v4();
    let start = Utc::now() - chrono::Duration::days(3);

    for (i, kind) in [
        EngagementEventKind::Liked,
        EngagementEventKind::Shortlisted,
        EngagementEventKind::DiscoveryBooked,
        EngagementEventKind::DiscoveryCompleted,
    ]
    .into_iter()
    .enumerate()
    {
        let event = EngagementEvent::new(client_id, trainer_id, kind)
            .at(start + chrono::Duration::hours(i as i64));
        store.record_engagement_event(&event).await.unwrap();
    }

    let (status, body) = get_json(&format!(
        "{base}/api/clients/{client_id}/trainers/{trainer_id}/engagement"
    ))
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["engagement"]["stage"], "discovery_completed");
    // Explicit flag is unset but a completed discovery call implies it.
    assert_eq!(body["engagement"]["survey_completed"], true);
    assert!(body["engagement"]["stage_entered_at"]["shortlisted"].is_string());
    assert_eq!(body["visibility"]["contact_details"], true);
    assert_eq!(body["visibility"]["client_resources"], false);
}

#[tokio::test]
async fn engagement_without_history_is_browsing() {
    let base = start_server(memory_store().await).await;
    let (status, body) = get_json(&format!(
        "{base}/api/clients/{}/trainers/{}/engagement",
        Uuid::new_v4(),
        Uuid::new_v4()
    ))
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["engagement"]["stage"], "browsing");
    assert_eq!(body["engagement"]["survey_completed"], false);
    assert_eq!(body["visibility"]["full_packages"], false);
}

#[tokio::test]
async fn file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("fitmatch.db");
    let trainer_id = Uuid::new_v4();

    {
        let store: Arc<dyn ProfileStore> = Arc::new(LibSqlBackend::new_local(&path).await.unwrap());
        let session = ProfileSetupSession::open(store, trainer_id).await.unwrap();
        session
            .edit(&[ProfileField::TermsAgreed], |d| d.terms_agreed = true)
            .await
            .unwrap();
        session.save().await.unwrap();
    }

    let store: Arc<dyn ProfileStore> = Arc::new(LibSqlBackend::new_local(&path).await.unwrap());
    let base = start_server(store).await;
    let url = format!("{base}/api/trainers/{trainer_id}/setup/steps/11");
    let (status, body) = get_json(&url).await;
    assert_eq!(status, 200);
    assert_eq!(body["step"], "terms");
    assert_eq!(body["completion"], "partial");
}
