use async_trait::async_trait;
use chrono::{DateTime, Utc};
use legal_review::workflows::review::{
    PermissionError, PermissionService, RequestId, RequestStatus, RequestStore, RequestUpdate,
    ReviewAudience, ReviewRequest, StoreError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local request list standing in for the document store.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRequestStore {
    records: Arc<Mutex<HashMap<RequestId, ReviewRequest>>>,
}

impl InMemoryRequestStore {
    /// Registers a new draft. Returns `Ok(None)` when the id is already taken.
    pub(crate) fn create_draft(
        &self,
        id: RequestId,
        title: String,
        audience: ReviewAudience,
    ) -> Result<Option<ReviewRequest>, StoreError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("request store lock poisoned".to_string()))?;
        if guard.contains_key(&id) {
            return Ok(None);
        }
        let request = ReviewRequest::draft(id.clone(), title, audience);
        guard.insert(id, request.clone());
        Ok(Some(request))
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn load_request(&self, id: &RequestId) -> Result<ReviewRequest, StoreError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("request store lock poisoned".to_string()))?;
        guard
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn update_request(
        &self,
        id: &RequestId,
        update: &RequestUpdate,
    ) -> Result<(), StoreError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("request store lock poisoned".to_string()))?;
        let record = guard
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        update.apply_to(record);
        Ok(())
    }
}

/// Logs permission changes instead of calling a directory service.
#[derive(Default, Clone)]
pub(crate) struct LoggingPermissionService;

#[async_trait]
impl PermissionService for LoggingPermissionService {
    async fn initialize_permissions(
        &self,
        id: &RequestId,
        title: &str,
    ) -> Result<(), PermissionError> {
        info!(request_id = %id, title, "initialized request permissions");
        Ok(())
    }

    async fn manage_permissions(
        &self,
        id: &RequestId,
        new_status: RequestStatus,
    ) -> Result<(), PermissionError> {
        info!(request_id = %id, status = %new_status, "synchronized request permissions");
        Ok(())
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 timestamp ({err})"))
}
