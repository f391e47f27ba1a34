use super::common::*;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::workflows::review::domain::{ReviewAudience, ReviewStatus};
use crate::workflows::review::router::{self, review_router};
use crate::workflows::review::transitions::ReasonPayload;

fn router_with(requests: Vec<crate::workflows::review::domain::ReviewRequest>) -> (Router, Harness) {
    let harness = harness(monday(12));
    for request in requests {
        harness.store.insert(request);
    }
    let engine = harness_engine(&harness);
    (review_router(engine), harness)
}

fn harness_engine(harness: &Harness) -> Arc<TestEngine> {
    Arc::new(
        crate::workflows::review::engine::ReviewWorkflowEngine::new(
            harness.store.clone(),
            harness.permissions.clone(),
            Arc::new(crate::workflows::review::accrual::StaticWorkingHours::default()),
        )
        .with_clock(harness.clock.clone()),
    )
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn submit_route_returns_transition_outcome() {
    let (router, harness) = router_with(vec![draft("route-submit", ReviewAudience::Legal)]);

    let response = router
        .oneshot(post(
            "/api/v1/requests/req-route-submit/submit",
            json!({ "actor": "submitter@firm.test" }),
        ))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["success"], Value::Bool(true));
    assert_eq!(body["item_id"], "req-route-submit");
    assert_eq!(body["new_status"], "legal_intake");
    assert!(body["correlation_id"].is_string());
    assert!(body.get("degraded").is_none());
    assert_eq!(harness.permissions.calls().len(), 1);
}

#[tokio::test]
async fn get_route_returns_snapshot_or_not_found() {
    let (router, _harness) = router_with(vec![draft("route-get", ReviewAudience::Both)]);

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/v1/requests/req-route-get")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "draft");
    assert_eq!(body["review_audience"], "both");

    let response = router
        .oneshot(
            Request::get("/api/v1/requests/req-unknown")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn review_kind_is_read_from_the_path() {
    let (router, harness) = router_with(vec![in_review("route-progress", ReviewAudience::Both)]);

    let response = router
        .oneshot(post(
            "/api/v1/requests/req-route-progress/reviews/compliance/progress",
            json!({ "actor": "compliance@firm.test", "notes": "checking performance data" }),
        ))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::OK);
    let snapshot = harness.store.snapshot(&request_id("route-progress"));
    assert_eq!(snapshot.compliance.status, ReviewStatus::InProgress);
    assert_eq!(snapshot.legal.status, ReviewStatus::NotStarted);
}

#[tokio::test]
async fn invalid_resubmit_is_a_conflict() {
    let (router, harness) = router_with(vec![in_review("route-resubmit", ReviewAudience::Legal)]);

    let response = router
        .oneshot(post(
            "/api/v1/requests/req-route-resubmit/reviews/legal/resubmit",
            json!({ "actor": "submitter@firm.test" }),
        ))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("resubmitted"));
    assert!(harness.store.writes().is_empty());
}

#[tokio::test]
async fn missing_attorney_is_unprocessable() {
    let mut request = draft("route-attorney", ReviewAudience::Legal);
    request.status = crate::workflows::review::domain::RequestStatus::LegalIntake;
    let (router, _harness) = router_with(vec![request]);

    let response = router
        .oneshot(post(
            "/api/v1/requests/req-route-attorney/assign-attorney",
            json!({ "actor": "intake@firm.test", "attorneys": [] }),
        ))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn closeout_requires_a_tracking_id() {
    let mut request = in_review("route-closeout", ReviewAudience::Legal);
    request.status = crate::workflows::review::domain::RequestStatus::Closeout;
    request.legal.status = ReviewStatus::Completed;
    request.legal.completed_on = Some(monday(10));
    let (router, harness) = router_with(vec![request]);

    let response = router
        .clone()
        .oneshot(post(
            "/api/v1/requests/req-route-closeout/closeout",
            json!({ "actor": "paralegal@firm.test", "tracking_id": "   " }),
        ))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(harness.store.writes().is_empty());

    let response = router
        .oneshot(post(
            "/api/v1/requests/req-route-closeout/closeout",
            json!({ "actor": "paralegal@firm.test", "tracking_id": " TRK-77 " }),
        ))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["new_status"], "completed");
    assert_eq!(body["updated_request"]["tracking_id"], "TRK-77");
    assert_eq!(
        body["updated_request"]["time_tracking"]["closeout"]["reviewer"],
        json!(2.0)
    );
}

#[tokio::test]
async fn hold_handler_reports_store_outage_as_unavailable() {
    let store = Arc::new(ReadOnlyStore::default());
    store.inner.insert(in_review("route-outage", ReviewAudience::Legal));
    let engine = Arc::new(
        crate::workflows::review::engine::ReviewWorkflowEngine::new(
            store,
            Arc::new(RecordingPermissions::default()),
            Arc::new(crate::workflows::review::accrual::StaticWorkingHours::default()),
        )
        .with_clock(Arc::new(FixedClock::new(monday(12)))),
    );

    let response = router::hold_handler::<ReadOnlyStore, RecordingPermissions>(
        State(engine),
        Path("req-route-outage".to_string()),
        axum::Json(ReasonPayload {
            actor: "intake@firm.test".to_string(),
            reason: "waiting on prospectus".to_string(),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
