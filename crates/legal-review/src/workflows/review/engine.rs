use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::accrual::{TimeTrackingError, TimeTrackingService, WorkingHoursProvider};
use super::clock::{Clock, SystemClock};
use super::domain::{RequestId, RequestStatus, ReviewKind, ReviewRequest};
use super::repository::{PermissionError, PermissionService, RequestStore};
use super::transitions::{
    self, Accrual, ActorPayload, Assignment, CloseoutSubmission, NotesPayload, PermissionSync,
    ProgressUpdate, ReasonPayload, ReviewSubmission, TransitionError, TransitionPlan,
};
use super::update::HoursUpdate;

/// Secondary system whose failure degraded, but did not block, a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryKind {
    TimeTracking,
    Permissions,
}

impl fmt::Display for SecondaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecondaryKind::TimeTracking => f.write_str("time tracking"),
            SecondaryKind::Permissions => f.write_str("permissions"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind} failure: {message}")]
pub struct SecondaryFailure {
    pub kind: SecondaryKind,
    pub message: String,
}

impl From<TimeTrackingError> for SecondaryFailure {
    fn from(value: TimeTrackingError) -> Self {
        Self {
            kind: SecondaryKind::TimeTracking,
            message: value.to_string(),
        }
    }
}

impl From<PermissionError> for SecondaryFailure {
    fn from(value: PermissionError) -> Self {
        Self {
            kind: SecondaryKind::Permissions,
            message: value.to_string(),
        }
    }
}

/// Result handed back to the caller of every transition.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub success: bool,
    pub item_id: RequestId,
    pub new_status: RequestStatus,
    pub updated_request: ReviewRequest,
    pub fields_updated: Vec<String>,
    pub correlation_id: Uuid,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<SecondaryFailure>,
}

impl TransitionOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// Runs workflow actions: load, plan, accrue, persist, sync permissions, reload.
pub struct ReviewWorkflowEngine<S, P> {
    store: Arc<S>,
    permissions: Arc<P>,
    time_tracking: TimeTrackingService,
    clock: Arc<dyn Clock>,
}

impl<S, P> ReviewWorkflowEngine<S, P>
where
    S: RequestStore + 'static,
    P: PermissionService + 'static,
{
    pub fn new(
        store: Arc<S>,
        permissions: Arc<P>,
        working_hours: Arc<dyn WorkingHoursProvider>,
    ) -> Self {
        Self {
            store,
            permissions,
            time_tracking: TimeTrackingService::new(working_hours),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current snapshot, straight from the store.
    pub async fn get(&self, id: &RequestId) -> Result<ReviewRequest, TransitionError> {
        self.store
            .load_request(id)
            .await
            .map_err(|source| TransitionError::Store {
                context: format!("failed to load request {id}"),
                source,
            })
    }

    pub async fn submit(
        &self,
        id: &RequestId,
        payload: ActorPayload,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.run(id, |request, now| {
            transitions::plan_submit(request, &payload, now)
        })
        .await
    }

    pub async fn assign_attorney(
        &self,
        id: &RequestId,
        assignment: Assignment,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.run(id, |request, now| {
            transitions::plan_assign_attorney(request, &assignment, now)
        })
        .await
    }

    /// Compliance-only routing into review; no attorney is recorded.
    pub async fn send_to_compliance(
        &self,
        id: &RequestId,
        payload: ActorPayload,
    ) -> Result<TransitionOutcome, TransitionError> {
        let assignment = Assignment {
            actor: payload.actor,
            attorneys: Vec::new(),
        };
        self.assign_attorney(id, assignment).await
    }

    pub async fn send_to_committee(
        &self,
        id: &RequestId,
        payload: ActorPayload,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.run(id, |request, now| {
            transitions::plan_send_to_committee(request, &payload, now)
        })
        .await
    }

    pub async fn assign_from_committee(
        &self,
        id: &RequestId,
        assignment: Assignment,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.run(id, |request, now| {
            transitions::plan_assign_from_committee(request, &assignment, now)
        })
        .await
    }

    pub async fn save_progress(
        &self,
        id: &RequestId,
        kind: ReviewKind,
        progress: ProgressUpdate,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.run(id, |request, now| {
            transitions::plan_save_progress(request, kind, &progress, now)
        })
        .await
    }

    pub async fn submit_review(
        &self,
        id: &RequestId,
        kind: ReviewKind,
        submission: ReviewSubmission,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.run(id, |request, now| {
            transitions::plan_submit_review(request, kind, &submission, now)
        })
        .await
    }

    pub async fn request_changes(
        &self,
        id: &RequestId,
        kind: ReviewKind,
        payload: NotesPayload,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.run(id, |request, now| {
            transitions::plan_request_changes(request, kind, &payload, now)
        })
        .await
    }

    pub async fn resubmit(
        &self,
        id: &RequestId,
        kind: ReviewKind,
        payload: NotesPayload,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.run(id, |request, now| {
            transitions::plan_resubmit(request, kind, &payload, now)
        })
        .await
    }

    pub async fn closeout(
        &self,
        id: &RequestId,
        closeout: CloseoutSubmission,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.run(id, |request, now| {
            transitions::plan_closeout(request, &closeout, now)
        })
        .await
    }

    pub async fn complete_regulatory_documents(
        &self,
        id: &RequestId,
        payload: ActorPayload,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.run(id, |request, now| {
            transitions::plan_complete_regulatory_documents(request, &payload, now)
        })
        .await
    }

    pub async fn hold(
        &self,
        id: &RequestId,
        hold: ReasonPayload,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.run(id, |request, now| transitions::plan_hold(request, &hold, now))
            .await
    }

    pub async fn resume(
        &self,
        id: &RequestId,
        payload: ActorPayload,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.run(id, |request, now| {
            transitions::plan_resume(request, &payload, now)
        })
        .await
    }

    pub async fn cancel(
        &self,
        id: &RequestId,
        cancellation: ReasonPayload,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.run(id, |request, now| {
            transitions::plan_cancel(request, &cancellation, now)
        })
        .await
    }

    async fn run<F>(&self, id: &RequestId, plan: F) -> Result<TransitionOutcome, TransitionError>
    where
        F: FnOnce(&ReviewRequest, DateTime<Utc>) -> Result<TransitionPlan, TransitionError>
            + Send,
    {
        let correlation_id = Uuid::new_v4();
        let request = self.get(id).await?;
        let now = self.clock.now();

        let TransitionPlan {
            action,
            mut update,
            accrual,
            permissions,
        } = plan(&request, now).map_err(|error| {
            warn!(request_id = %id, %correlation_id, %error, "transition rejected");
            error
        })?;

        let mut degraded = Vec::new();
        match self.accrue(&request, accrual, now).await {
            Ok(hours) => update.hours.merge(hours),
            Err(failure) => {
                warn!(request_id = %id, %correlation_id, %action, %failure, "time tracking skipped");
                degraded.push(failure);
            }
        }

        let fields_updated = update.fields_updated();
        self.store
            .update_request(id, &update)
            .await
            .map_err(|source| TransitionError::Store {
                context: format!("failed to persist {action} for request {id}"),
                source,
            })?;

        if let Err(failure) = self.sync_permissions(&request, permissions).await {
            warn!(request_id = %id, %correlation_id, %action, %failure, "permission sync failed");
            degraded.push(failure);
        }

        let updated_request = self.get(id).await?;
        info!(
            request_id = %id,
            %correlation_id,
            %action,
            from = %request.status,
            to = %updated_request.status,
            fields = fields_updated.len(),
            degraded = degraded.len(),
            "transition applied"
        );

        Ok(TransitionOutcome {
            success: true,
            item_id: id.clone(),
            new_status: updated_request.status,
            updated_request,
            fields_updated,
            correlation_id,
            degraded,
        })
    }

    async fn accrue(
        &self,
        request: &ReviewRequest,
        accrual: Accrual,
        now: DateTime<Utc>,
    ) -> Result<HoursUpdate, SecondaryFailure> {
        let hours = match accrual {
            Accrual::Skip => HoursUpdate::default(),
            Accrual::Handoff { stage, new_owner } => {
                self.time_tracking
                    .accrue(request, stage, new_owner, now)
                    .await?
            }
            Accrual::Pause => self.time_tracking.pause(request, now).await?,
            Accrual::Resume(status) => self.time_tracking.resume(request, status),
        };
        Ok(hours)
    }

    async fn sync_permissions(
        &self,
        request: &ReviewRequest,
        sync: PermissionSync,
    ) -> Result<(), SecondaryFailure> {
        match sync {
            PermissionSync::Skip => Ok(()),
            PermissionSync::Initialize => Ok(self
                .permissions
                .initialize_permissions(&request.id, &request.title)
                .await?),
            PermissionSync::Manage(status) => Ok(self
                .permissions
                .manage_permissions(&request.id, status)
                .await?),
        }
    }
}
