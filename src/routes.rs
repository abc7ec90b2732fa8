//! Read-only REST endpoints for setup completion and client engagement.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::engagement::{ContentVisibility, build_record};
use crate::error::DatabaseError;
use crate::profile::completion::{CompletionReport, StepStatus};
use crate::profile::payload::draft_from_record;
use crate::profile::steps::SetupStep;
use crate::store::ProfileStore;

/// Shared state for the API routes.
#[derive(Clone)]
pub struct RouteState {
    pub store: Arc<dyn ProfileStore>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn database_failure(context: &str, e: DatabaseError) -> Response {
    error!(error = %e, "{context} failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Storage unavailable")
}

async fn completion_report(
    store: &dyn ProfileStore,
    trainer_id: Uuid,
) -> Result<Option<CompletionReport>, DatabaseError> {
    let Some(record) = store.get_profile(trainer_id).await? else {
        return Ok(None);
    };
    let side = store.load_side_data(trainer_id).await?;
    let draft = draft_from_record(&record);
    Ok(Some(CompletionReport::compute(&draft, &side)))
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// GET /api/trainers/{trainer_id}/setup/completion
///
/// Per-step tags plus `percentage` and `is_fully_complete`, or 404 if the
/// trainer has no profile.
async fn get_completion(
    State(state): State<RouteState>,
    Path(trainer_id): Path<Uuid>,
) -> Response {
    match completion_report(state.store.as_ref(), trainer_id).await {
        Ok(Some(report)) => Json(report).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "No profile exists for this trainer"),
        Err(e) => database_failure("get_completion", e),
    }
}

/// GET /api/trainers/{trainer_id}/setup/steps/{step}
///
/// `step` is the 1-based step number.
async fn get_step(
    State(state): State<RouteState>,
    Path((trainer_id, step)): Path<(Uuid, u8)>,
) -> Response {
    let step = match SetupStep::from_number(step) {
        Ok(step) => step,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match completion_report(state.store.as_ref(), trainer_id).await {
        Ok(Some(report)) => {
            let status: Option<StepStatus> =
                report.steps.into_iter().find(|s| s.step == step);
            match status {
                Some(status) => Json(status).into_response(),
                None => error_response(StatusCode::NOT_FOUND, "Unknown step"),
            }
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, "No profile exists for this trainer"),
        Err(e) => database_failure("get_step", e),
    }
}

/// GET /api/clients/{client_id}/trainers/{trainer_id}/engagement
///
/// The client's current stage with this trainer, when each stage was first
/// entered, whether the intake survey counts as done, and what profile
/// content the stage unlocks.
async fn get_engagement(
    State(state): State<RouteState>,
    Path((client_id, trainer_id)): Path<(Uuid, Uuid)>,
) -> Response {
    let events = match state.store.list_engagement_events(client_id, trainer_id).await {
        Ok(events) => events,
        Err(e) => return database_failure("get_engagement", e),
    };
    let survey = match state.store.get_survey_completed(client_id).await {
        Ok(flag) => flag,
        Err(e) => return database_failure("get_engagement", e),
    };

    let record = build_record(client_id, trainer_id, &events, survey);
    let visibility = ContentVisibility::for_stage(record.stage);
    Json(json!({
        "engagement": record,
        "visibility": visibility,
    }))
    .into_response()
}

/// Build the API routes.
pub fn api_routes(state: RouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/trainers/{trainer_id}/setup/completion",
            get(get_completion),
        )
        .route(
            "/api/trainers/{trainer_id}/setup/steps/{step}",
            get(get_step),
        )
        .route(
            "/api/clients/{client_id}/trainers/{trainer_id}/engagement",
            get(get_engagement),
        )
        .with_state(state)
}
