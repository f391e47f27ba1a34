use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{RequestId, ReviewKind};
use super::engine::{ReviewWorkflowEngine, TransitionOutcome};
use super::repository::{PermissionService, RequestStore, StoreError};
use super::transitions::{
    ActorPayload, Assignment, CloseoutSubmission, NotesPayload, ProgressUpdate, ReasonPayload,
    ReviewSubmission, TransitionError,
};

type SharedEngine<S, P> = Arc<ReviewWorkflowEngine<S, P>>;

/// Router exposing every workflow action over HTTP.
pub fn review_router<S, P>(engine: SharedEngine<S, P>) -> Router
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    Router::new()
        .route("/api/v1/requests/:request_id", get(get_handler::<S, P>))
        .route(
            "/api/v1/requests/:request_id/submit",
            post(submit_handler::<S, P>),
        )
        .route(
            "/api/v1/requests/:request_id/assign-attorney",
            post(assign_attorney_handler::<S, P>),
        )
        .route(
            "/api/v1/requests/:request_id/send-to-compliance",
            post(send_to_compliance_handler::<S, P>),
        )
        .route(
            "/api/v1/requests/:request_id/send-to-committee",
            post(send_to_committee_handler::<S, P>),
        )
        .route(
            "/api/v1/requests/:request_id/assign-from-committee",
            post(assign_from_committee_handler::<S, P>),
        )
        .route(
            "/api/v1/requests/:request_id/reviews/:kind/progress",
            post(save_progress_handler::<S, P>),
        )
        .route(
            "/api/v1/requests/:request_id/reviews/:kind/submit",
            post(submit_review_handler::<S, P>),
        )
        .route(
            "/api/v1/requests/:request_id/reviews/:kind/request-changes",
            post(request_changes_handler::<S, P>),
        )
        .route(
            "/api/v1/requests/:request_id/reviews/:kind/resubmit",
            post(resubmit_handler::<S, P>),
        )
        .route(
            "/api/v1/requests/:request_id/closeout",
            post(closeout_handler::<S, P>),
        )
        .route(
            "/api/v1/requests/:request_id/regulatory-documents/complete",
            post(complete_regulatory_documents_handler::<S, P>),
        )
        .route(
            "/api/v1/requests/:request_id/hold",
            post(hold_handler::<S, P>),
        )
        .route(
            "/api/v1/requests/:request_id/resume",
            post(resume_handler::<S, P>),
        )
        .route(
            "/api/v1/requests/:request_id/cancel",
            post(cancel_handler::<S, P>),
        )
        .with_state(engine)
}

/// Closeout body as received over HTTP; the tracking id is mandatory here.
#[derive(Debug, Deserialize)]
pub(crate) struct CloseoutBody {
    pub(crate) actor: String,
    #[serde(default)]
    pub(crate) tracking_id: Option<String>,
}

pub(crate) async fn get_handler<S, P>(
    State(engine): State<SharedEngine<S, P>>,
    Path(request_id): Path<String>,
) -> Response
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    match engine.get(&RequestId(request_id)).await {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<S, P>(
    State(engine): State<SharedEngine<S, P>>,
    Path(request_id): Path<String>,
    Json(payload): Json<ActorPayload>,
) -> Response
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    respond(engine.submit(&RequestId(request_id), payload).await)
}

pub(crate) async fn assign_attorney_handler<S, P>(
    State(engine): State<SharedEngine<S, P>>,
    Path(request_id): Path<String>,
    Json(assignment): Json<Assignment>,
) -> Response
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    respond(
        engine
            .assign_attorney(&RequestId(request_id), assignment)
            .await,
    )
}

pub(crate) async fn send_to_compliance_handler<S, P>(
    State(engine): State<SharedEngine<S, P>>,
    Path(request_id): Path<String>,
    Json(payload): Json<ActorPayload>,
) -> Response
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    respond(
        engine
            .send_to_compliance(&RequestId(request_id), payload)
            .await,
    )
}

pub(crate) async fn send_to_committee_handler<S, P>(
    State(engine): State<SharedEngine<S, P>>,
    Path(request_id): Path<String>,
    Json(payload): Json<ActorPayload>,
) -> Response
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    respond(
        engine
            .send_to_committee(&RequestId(request_id), payload)
            .await,
    )
}

pub(crate) async fn assign_from_committee_handler<S, P>(
    State(engine): State<SharedEngine<S, P>>,
    Path(request_id): Path<String>,
    Json(assignment): Json<Assignment>,
) -> Response
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    respond(
        engine
            .assign_from_committee(&RequestId(request_id), assignment)
            .await,
    )
}

pub(crate) async fn save_progress_handler<S, P>(
    State(engine): State<SharedEngine<S, P>>,
    Path((request_id, kind)): Path<(String, ReviewKind)>,
    Json(progress): Json<ProgressUpdate>,
) -> Response
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    respond(
        engine
            .save_progress(&RequestId(request_id), kind, progress)
            .await,
    )
}

pub(crate) async fn submit_review_handler<S, P>(
    State(engine): State<SharedEngine<S, P>>,
    Path((request_id, kind)): Path<(String, ReviewKind)>,
    Json(submission): Json<ReviewSubmission>,
) -> Response
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    respond(
        engine
            .submit_review(&RequestId(request_id), kind, submission)
            .await,
    )
}

pub(crate) async fn request_changes_handler<S, P>(
    State(engine): State<SharedEngine<S, P>>,
    Path((request_id, kind)): Path<(String, ReviewKind)>,
    Json(payload): Json<NotesPayload>,
) -> Response
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    respond(
        engine
            .request_changes(&RequestId(request_id), kind, payload)
            .await,
    )
}

pub(crate) async fn resubmit_handler<S, P>(
    State(engine): State<SharedEngine<S, P>>,
    Path((request_id, kind)): Path<(String, ReviewKind)>,
    Json(payload): Json<NotesPayload>,
) -> Response
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    respond(
        engine
            .resubmit(&RequestId(request_id), kind, payload)
            .await,
    )
}

pub(crate) async fn closeout_handler<S, P>(
    State(engine): State<SharedEngine<S, P>>,
    Path(request_id): Path<String>,
    Json(body): Json<CloseoutBody>,
) -> Response
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    let tracking_id = match body.tracking_id.map(|id| id.trim().to_string()) {
        Some(id) if !id.is_empty() => id,
        _ => {
            let payload = json!({ "error": "tracking_id is required to close out a request" });
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
        }
    };

    let closeout = CloseoutSubmission {
        actor: body.actor,
        tracking_id: Some(tracking_id),
    };
    respond(engine.closeout(&RequestId(request_id), closeout).await)
}

pub(crate) async fn complete_regulatory_documents_handler<S, P>(
    State(engine): State<SharedEngine<S, P>>,
    Path(request_id): Path<String>,
    Json(payload): Json<ActorPayload>,
) -> Response
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    respond(
        engine
            .complete_regulatory_documents(&RequestId(request_id), payload)
            .await,
    )
}

pub(crate) async fn hold_handler<S, P>(
    State(engine): State<SharedEngine<S, P>>,
    Path(request_id): Path<String>,
    Json(payload): Json<ReasonPayload>,
) -> Response
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    respond(engine.hold(&RequestId(request_id), payload).await)
}

pub(crate) async fn resume_handler<S, P>(
    State(engine): State<SharedEngine<S, P>>,
    Path(request_id): Path<String>,
    Json(payload): Json<ActorPayload>,
) -> Response
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    respond(engine.resume(&RequestId(request_id), payload).await)
}

pub(crate) async fn cancel_handler<S, P>(
    State(engine): State<SharedEngine<S, P>>,
    Path(request_id): Path<String>,
    Json(payload): Json<ReasonPayload>,
) -> Response
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    respond(engine.cancel(&RequestId(request_id), payload).await)
}

fn respond(result: Result<TransitionOutcome, TransitionError>) -> Response {
    match result {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn error_status(error: &TransitionError) -> StatusCode {
    match error {
        TransitionError::Store {
            source: StoreError::NotFound(_),
            ..
        } => StatusCode::NOT_FOUND,
        TransitionError::Store { .. } => StatusCode::SERVICE_UNAVAILABLE,
        TransitionError::MissingAttorney => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::CONFLICT,
    }
}

fn error_response(error: TransitionError) -> Response {
    let status = error_status(&error);
    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}
