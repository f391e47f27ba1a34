use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::review::accrual::{
    StaticWorkingHours, TimeTrackingError, TimeTrackingService, WorkingHoursProvider,
};
use crate::workflows::review::calendar::WorkingHoursConfig;
use crate::workflows::review::clock::Clock;
use crate::workflows::review::domain::{
    RequestId, RequestStatus, ReviewAudience, ReviewRequest, ReviewState, ReviewStatus,
};
use crate::workflows::review::engine::ReviewWorkflowEngine;
use crate::workflows::review::repository::{
    PermissionError, PermissionService, RequestStore, StoreError,
};
use crate::workflows::review::update::RequestUpdate;

/// 2025-09-01 is a Monday.
pub(super) fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, day, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn monday(hour: u32) -> DateTime<Utc> {
    at(1, hour, 0)
}

pub(super) fn tuesday(hour: u32) -> DateTime<Utc> {
    at(2, hour, 0)
}

pub(super) fn wednesday(hour: u32) -> DateTime<Utc> {
    at(3, hour, 0)
}

pub(super) fn friday(hour: u32) -> DateTime<Utc> {
    at(5, hour, 0)
}

pub(super) fn next_monday(hour: u32) -> DateTime<Utc> {
    at(8, hour, 0)
}

pub(super) fn request_id(suffix: &str) -> RequestId {
    RequestId(format!("req-{suffix}"))
}

pub(super) fn draft(suffix: &str, audience: ReviewAudience) -> ReviewRequest {
    ReviewRequest::draft(request_id(suffix), format!("Fund brochure {suffix}"), audience)
}

pub(super) fn started_review(since: DateTime<Utc>) -> ReviewState {
    ReviewState {
        status: ReviewStatus::NotStarted,
        status_updated_on: Some(since),
        status_updated_by: Some("intake@firm.test".to_string()),
        ..ReviewState::not_required()
    }
}

/// Request already routed into review with every audience track `NotStarted`.
pub(super) fn in_review(suffix: &str, audience: ReviewAudience) -> ReviewRequest {
    let mut request = draft(suffix, audience);
    request.status = RequestStatus::InReview;
    request.submitted_by = Some("submitter@firm.test".to_string());
    request.submitted_on = Some(monday(8));
    request.submitted_for_review_by = Some("intake@firm.test".to_string());
    request.submitted_for_review_on = Some(monday(9));
    if audience != ReviewAudience::Compliance {
        request.attorneys = vec!["attorney@firm.test".to_string()];
        request.legal = started_review(monday(9));
    }
    if audience != ReviewAudience::Legal {
        request.compliance = started_review(monday(9));
    }
    request
}

pub(super) fn time_tracking_service() -> TimeTrackingService {
    TimeTrackingService::new(Arc::new(StaticWorkingHours::new(
        WorkingHoursConfig::default(),
    )))
}

pub(super) type TestEngine = ReviewWorkflowEngine<MemoryStore, RecordingPermissions>;

pub(super) struct Harness {
    pub(super) engine: TestEngine,
    pub(super) store: Arc<MemoryStore>,
    pub(super) permissions: Arc<RecordingPermissions>,
    pub(super) clock: Arc<FixedClock>,
}

pub(super) fn harness(start: DateTime<Utc>) -> Harness {
    harness_with_hours(start, Arc::new(StaticWorkingHours::default()))
}

pub(super) fn harness_with_hours(
    start: DateTime<Utc>,
    hours: Arc<dyn WorkingHoursProvider>,
) -> Harness {
    let store = Arc::new(MemoryStore::default());
    let permissions = Arc::new(RecordingPermissions::default());
    let clock = Arc::new(FixedClock::new(start));
    let engine = ReviewWorkflowEngine::new(store.clone(), permissions.clone(), hours)
        .with_clock(clock.clone());
    Harness {
        engine,
        store,
        permissions,
        clock,
    }
}

#[derive(Debug)]
pub(super) struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub(super) fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(super) fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("clock mutex poisoned") = now;
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    records: Arc<Mutex<HashMap<RequestId, ReviewRequest>>>,
    writes: Arc<Mutex<Vec<RequestUpdate>>>,
}

impl MemoryStore {
    pub(super) fn insert(&self, request: ReviewRequest) {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .insert(request.id.clone(), request);
    }

    pub(super) fn snapshot(&self, id: &RequestId) -> ReviewRequest {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .get(id)
            .cloned()
            .expect("request present")
    }

    pub(super) fn writes(&self) -> Vec<RequestUpdate> {
        self.writes.lock().expect("store mutex poisoned").clone()
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn load_request(&self, id: &RequestId) -> Result<ReviewRequest, StoreError> {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn update_request(
        &self,
        id: &RequestId,
        update: &RequestUpdate,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().expect("store mutex poisoned");
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        update.apply_to(record);
        self.writes
            .lock()
            .expect("store mutex poisoned")
            .push(update.clone());
        Ok(())
    }
}

/// Serves reads from a seeded store but refuses every write.
#[derive(Default, Clone)]
pub(super) struct ReadOnlyStore {
    pub(super) inner: MemoryStore,
}

#[async_trait]
impl RequestStore for ReadOnlyStore {
    async fn load_request(&self, id: &RequestId) -> Result<ReviewRequest, StoreError> {
        self.inner.load_request(id).await
    }

    async fn update_request(
        &self,
        _id: &RequestId,
        _update: &RequestUpdate,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("list is read only".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum PermissionCall {
    Initialize(RequestId, String),
    Manage(RequestId, RequestStatus),
}

#[derive(Default, Clone)]
pub(super) struct RecordingPermissions {
    calls: Arc<Mutex<Vec<PermissionCall>>>,
}

impl RecordingPermissions {
    pub(super) fn calls(&self) -> Vec<PermissionCall> {
        self.calls.lock().expect("permission mutex poisoned").clone()
    }
}

#[async_trait]
impl PermissionService for RecordingPermissions {
    async fn initialize_permissions(
        &self,
        id: &RequestId,
        title: &str,
    ) -> Result<(), PermissionError> {
        self.calls
            .lock()
            .expect("permission mutex poisoned")
            .push(PermissionCall::Initialize(id.clone(), title.to_string()));
        Ok(())
    }

    async fn manage_permissions(
        &self,
        id: &RequestId,
        new_status: RequestStatus,
    ) -> Result<(), PermissionError> {
        self.calls
            .lock()
            .expect("permission mutex poisoned")
            .push(PermissionCall::Manage(id.clone(), new_status));
        Ok(())
    }
}

pub(super) struct FailingPermissions;

#[async_trait]
impl PermissionService for FailingPermissions {
    async fn initialize_permissions(
        &self,
        _id: &RequestId,
        _title: &str,
    ) -> Result<(), PermissionError> {
        Err(PermissionError::Unavailable("group service offline".to_string()))
    }

    async fn manage_permissions(
        &self,
        _id: &RequestId,
        _new_status: RequestStatus,
    ) -> Result<(), PermissionError> {
        Err(PermissionError::Unavailable("group service offline".to_string()))
    }
}

pub(super) struct FailingWorkingHours;

#[async_trait]
impl WorkingHoursProvider for FailingWorkingHours {
    async fn working_hours(&self) -> Result<WorkingHoursConfig, TimeTrackingError> {
        Err(TimeTrackingError::ConfigUnavailable(
            "configuration list missing".to_string(),
        ))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
