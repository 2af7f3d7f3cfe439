use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::cleanup::CleanupError;
use super::domain::{DraftError, DraftId, DraftStage, OwnerId};
use super::repository::{DraftEventPublisher, DraftRepository};
use super::service::DraftService;

#[derive(Debug, Deserialize)]
pub struct CreateDraftRequest {
    pub owner_id: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
pub struct SetStageRequest {
    pub stage: DraftStage,
}

/// Router builder exposing HTTP endpoints for the draft lifecycle.
///
/// Owner-facing routes live under `/api/v1/drafts` and
/// `/api/v1/owners/:owner_id/drafts`; the stage override and manual cleanup
/// trigger sit under `/api/v1/admin` and are expected to be fenced off by
/// the deployment's gateway.
pub fn draft_router<R, P>(service: Arc<DraftService<R, P>>) -> Router
where
    R: DraftRepository + 'static,
    P: DraftEventPublisher + 'static,
{
    Router::new()
        .route("/api/v1/drafts", post(create_handler::<R, P>))
        .route(
            "/api/v1/drafts/:draft_id",
            get(fetch_handler::<R, P>).delete(delete_handler::<R, P>),
        )
        .route(
            "/api/v1/drafts/:draft_id/advance",
            post(advance_handler::<R, P>),
        )
        .route(
            "/api/v1/drafts/:draft_id/payload",
            put(payload_handler::<R, P>),
        )
        .route(
            "/api/v1/drafts/:draft_id/restore",
            post(restore_handler::<R, P>),
        )
        .route(
            "/api/v1/owners/:owner_id/drafts",
            get(list_active_handler::<R, P>),
        )
        .route(
            "/api/v1/owners/:owner_id/drafts/recoverable",
            get(list_recoverable_handler::<R, P>),
        )
        .route(
            "/api/v1/admin/drafts/:draft_id/stage",
            post(set_stage_handler::<R, P>),
        )
        .route("/api/v1/admin/cleanup", post(cleanup_handler::<R, P>))
        .with_state(service)
}

fn error_response(error: DraftError) -> Response {
    let status = match &error {
        DraftError::NotFound => StatusCode::NOT_FOUND,
        DraftError::RecoveryWindowExpired { .. } => StatusCode::GONE,
        DraftError::InvalidTransition { .. }
        | DraftError::ConcurrentModification
        | DraftError::AlreadyDeleted
        | DraftError::NotDeleted => StatusCode::CONFLICT,
        DraftError::Repository(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn create_handler<R, P>(
    State(service): State<Arc<DraftService<R, P>>>,
    axum::Json(request): axum::Json<CreateDraftRequest>,
) -> Response
where
    R: DraftRepository + 'static,
    P: DraftEventPublisher + 'static,
{
    match service.create(OwnerId(request.owner_id), request.payload) {
        Ok(created) => (StatusCode::CREATED, axum::Json(created)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn fetch_handler<R, P>(
    State(service): State<Arc<DraftService<R, P>>>,
    Path(draft_id): Path<String>,
) -> Response
where
    R: DraftRepository + 'static,
    P: DraftEventPublisher + 'static,
{
    match service.fetch(&DraftId(draft_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn advance_handler<R, P>(
    State(service): State<Arc<DraftService<R, P>>>,
    Path(draft_id): Path<String>,
) -> Response
where
    R: DraftRepository + 'static,
    P: DraftEventPublisher + 'static,
{
    match service.advance(&DraftId(draft_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn payload_handler<R, P>(
    State(service): State<Arc<DraftService<R, P>>>,
    Path(draft_id): Path<String>,
    axum::Json(payload): axum::Json<Value>,
) -> Response
where
    R: DraftRepository + 'static,
    P: DraftEventPublisher + 'static,
{
    match service.edit_payload(&DraftId(draft_id), payload) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_handler<R, P>(
    State(service): State<Arc<DraftService<R, P>>>,
    Path(draft_id): Path<String>,
) -> Response
where
    R: DraftRepository + 'static,
    P: DraftEventPublisher + 'static,
{
    match service.soft_delete(&DraftId(draft_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn restore_handler<R, P>(
    State(service): State<Arc<DraftService<R, P>>>,
    Path(draft_id): Path<String>,
) -> Response
where
    R: DraftRepository + 'static,
    P: DraftEventPublisher + 'static,
{
    match service.restore(&DraftId(draft_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_active_handler<R, P>(
    State(service): State<Arc<DraftService<R, P>>>,
    Path(owner_id): Path<String>,
) -> Response
where
    R: DraftRepository + 'static,
    P: DraftEventPublisher + 'static,
{
    match service.list_active(&OwnerId(owner_id)) {
        Ok(listing) => (StatusCode::OK, axum::Json(listing)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_recoverable_handler<R, P>(
    State(service): State<Arc<DraftService<R, P>>>,
    Path(owner_id): Path<String>,
) -> Response
where
    R: DraftRepository + 'static,
    P: DraftEventPublisher + 'static,
{
    match service.list_recoverable(&OwnerId(owner_id)) {
        Ok(listing) => (StatusCode::OK, axum::Json(listing)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn set_stage_handler<R, P>(
    State(service): State<Arc<DraftService<R, P>>>,
    Path(draft_id): Path<String>,
    axum::Json(request): axum::Json<SetStageRequest>,
) -> Response
where
    R: DraftRepository + 'static,
    P: DraftEventPublisher + 'static,
{
    match service.set_stage(&DraftId(draft_id), request.stage) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cleanup_handler<R, P>(
    State(service): State<Arc<DraftService<R, P>>>,
) -> Response
where
    R: DraftRepository + 'static,
    P: DraftEventPublisher + 'static,
{
    match service.run_cleanup() {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(CleanupError::AlreadyRunning) => {
            let payload = json!({
                "error": CleanupError::AlreadyRunning.to_string(),
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::SERVICE_UNAVAILABLE, axum::Json(payload)).into_response()
        }
    }
}
