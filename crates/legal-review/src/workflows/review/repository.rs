use async_trait::async_trait;

use super::domain::{RequestId, RequestStatus, ReviewRequest};
use super::update::RequestUpdate;

/// Authoritative request storage. Every transition re-reads after writing.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn load_request(&self, id: &RequestId) -> Result<ReviewRequest, StoreError>;
    async fn update_request(&self, id: &RequestId, update: &RequestUpdate)
        -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("request {0} not found")]
    NotFound(RequestId),
    #[error("request store unavailable: {0}")]
    Unavailable(String),
}

/// Access-control hooks called after status changes. Failures never block a transition.
#[async_trait]
pub trait PermissionService: Send + Sync {
    async fn initialize_permissions(
        &self,
        id: &RequestId,
        title: &str,
    ) -> Result<(), PermissionError>;
    async fn manage_permissions(
        &self,
        id: &RequestId,
        new_status: RequestStatus,
    ) -> Result<(), PermissionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    #[error("permission service unavailable: {0}")]
    Unavailable(String),
    #[error("permission update rejected: {0}")]
    Rejected(String),
}
