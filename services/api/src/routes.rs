use crate::infra::{AppState, InMemoryRequestStore};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use legal_review::error::AppError;
use legal_review::workflows::review::{
    review_router, PermissionService, RequestId, RequestStore, ReviewAudience,
    ReviewWorkflowEngine, StoreError, TransitionError,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub(crate) struct CreateRequestBody {
    #[serde(default)]
    pub(crate) id: Option<String>,
    pub(crate) title: String,
    pub(crate) review_audience: ReviewAudience,
}

pub(crate) fn with_review_routes<S, P>(engine: Arc<ReviewWorkflowEngine<S, P>>) -> axum::Router
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    review_router(engine)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/requests",
            axum::routing::post(create_request_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Creates a draft request; the id is generated when the caller omits it.
pub(crate) async fn create_request_endpoint(
    Extension(store): Extension<InMemoryRequestStore>,
    Json(body): Json<CreateRequestBody>,
) -> Result<Response, AppError> {
    let title = body.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::Input("title must not be blank".to_string()));
    }

    let id = match body.id.map(|id| id.trim().to_string()) {
        Some(id) if !id.is_empty() => RequestId(id),
        _ => RequestId(Uuid::new_v4().to_string()),
    };

    let created = store
        .create_draft(id.clone(), title, body.review_audience)
        .map_err(draft_store_error)?;

    match created {
        Some(request) => {
            info!(request_id = %id, audience = ?request.review_audience, "draft request created");
            Ok((StatusCode::CREATED, Json(request)).into_response())
        }
        None => {
            let payload = json!({ "error": format!("request {id} already exists") });
            Ok((StatusCode::CONFLICT, Json(payload)).into_response())
        }
    }
}

pub(crate) fn draft_store_error(source: StoreError) -> AppError {
    AppError::Workflow(TransitionError::Store {
        context: "failed to create draft request".to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use legal_review::workflows::review::{StaticWorkingHours, WorkingHoursConfig};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    use crate::infra::LoggingPermissionService;

    fn app(ready: bool) -> (axum::Router, InMemoryRequestStore) {
        let store = InMemoryRequestStore::default();
        let engine = Arc::new(ReviewWorkflowEngine::new(
            Arc::new(store.clone()),
            Arc::new(LoggingPermissionService),
            Arc::new(StaticWorkingHours::new(WorkingHoursConfig::default())),
        ));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let router = with_review_routes(engine)
            .layer(Extension(state))
            .layer(Extension(store.clone()));
        (router, store)
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json payload")
    }

    fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    #[tokio::test]
    async fn readiness_reflects_flag() {
        let (router, _) = app(false);
        let response = router
            .oneshot(
                Request::get("/ready")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn created_drafts_can_be_submitted() {
        let (router, store) = app(true);

        let response = router
            .clone()
            .oneshot(post(
                "/api/v1/requests",
                json!({ "id": "brochure-9", "title": "Retail brochure", "review_audience": "legal" }),
            ))
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["status"], "draft");

        let response = router
            .clone()
            .oneshot(post(
                "/api/v1/requests",
                json!({ "id": "brochure-9", "title": "Again", "review_audience": "legal" }),
            ))
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = router
            .oneshot(post(
                "/api/v1/requests/brochure-9/submit",
                json!({ "actor": "submitter@firm.test" }),
            ))
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::OK);

        let stored = store
            .load_request(&RequestId("brochure-9".to_string()))
            .await
            .expect("request stored");
        assert_eq!(
            stored.status,
            legal_review::workflows::review::RequestStatus::LegalIntake
        );
    }

    #[tokio::test]
    async fn blank_titles_are_rejected() {
        let (router, _) = app(true);
        let response = router
            .oneshot(post(
                "/api/v1/requests",
                json!({ "title": "  ", "review_audience": "both" }),
            ))
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn draft_store_outages_are_unavailable() {
        let error = draft_store_error(StoreError::Unavailable("lock poisoned".to_string()));
        assert_eq!(
            error.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let (router, _) = app(false);
        let response = router
            .oneshot(
                Request::get("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }
}
