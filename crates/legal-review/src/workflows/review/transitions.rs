//! Pure planning half of the status transition engine.
//!
//! Each `plan_*` function validates an action against the current snapshot and
//! returns the field diff plus the time-tracking and permission work the engine
//! must perform around the write. Nothing here touches a collaborator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::domain::{
    RequestId, RequestStatus, ReviewKind, ReviewOutcome, ReviewRequest, ReviewState,
    ReviewStatus, Stage, StageOwner,
};
use super::repository::StoreError;
use super::update::{RequestUpdate, ReviewStateUpdate};

/// Named workflow actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowAction {
    Submit,
    AssignAttorney,
    SendToCommittee,
    AssignFromCommittee,
    SaveProgress(ReviewKind),
    SubmitReview(ReviewKind),
    RequestChanges(ReviewKind),
    Resubmit(ReviewKind),
    Closeout,
    CompleteRegulatoryDocuments,
    Hold,
    Resume,
    Cancel,
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submit => f.write_str("submit"),
            Self::AssignAttorney => f.write_str("assign attorney"),
            Self::SendToCommittee => f.write_str("send to committee"),
            Self::AssignFromCommittee => f.write_str("assign from committee"),
            Self::SaveProgress(kind) => write!(f, "save {kind} review progress"),
            Self::SubmitReview(kind) => write!(f, "submit {kind} review"),
            Self::RequestChanges(kind) => write!(f, "request {kind} changes"),
            Self::Resubmit(kind) => write!(f, "resubmit for {kind} review"),
            Self::Closeout => f.write_str("closeout"),
            Self::CompleteRegulatoryDocuments => f.write_str("complete regulatory documents"),
            Self::Hold => f.write_str("hold"),
            Self::Resume => f.write_str("resume"),
            Self::Cancel => f.write_str("cancel"),
        }
    }
}

/// Time bookkeeping the engine runs before persisting a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accrual {
    Skip,
    Handoff { stage: Stage, new_owner: StageOwner },
    Pause,
    Resume(RequestStatus),
}

/// Best-effort permission call made after the write succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionSync {
    Skip,
    Initialize,
    Manage(RequestStatus),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan {
    pub action: WorkflowAction,
    pub update: RequestUpdate,
    pub accrual: Accrual,
    pub permissions: PermissionSync,
}

impl TransitionPlan {
    fn new(action: WorkflowAction) -> Self {
        Self {
            action,
            update: RequestUpdate::default(),
            accrual: Accrual::Skip,
            permissions: PermissionSync::Skip,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("{action} is not allowed while the request is {from}")]
    InvalidTransition {
        action: WorkflowAction,
        from: RequestStatus,
    },
    #[error("{action} is not allowed while the {kind} review is {status}")]
    ReviewNotActive {
        action: WorkflowAction,
        kind: ReviewKind,
        status: ReviewStatus,
    },
    #[error(
        "{kind} review can only be resubmitted while waiting on the submitter with a resubmit outcome (status is {status}, outcome is {outcome:?})"
    )]
    ResubmitNotAllowed {
        kind: ReviewKind,
        status: ReviewStatus,
        outcome: Option<ReviewOutcome>,
    },
    #[error("at least one attorney must be assigned")]
    MissingAttorney,
    #[error("regulatory documents can only be completed while awaiting them (status is {0})")]
    NotAwaitingRegulatoryDocuments(RequestStatus),
    #[error("request {0} is on hold without a status to resume to")]
    MissingPreviousStatus(RequestId),
    #[error("{context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },
}

impl TransitionError {
    /// Caller-side violations that must not be retried.
    pub fn is_precondition(&self) -> bool {
        !matches!(self, Self::Store { .. })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActorPayload {
    pub actor: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Assignment {
    pub actor: String,
    #[serde(default)]
    pub attorneys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressUpdate {
    pub actor: String,
    #[serde(default)]
    pub outcome: Option<ReviewOutcome>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewSubmission {
    pub actor: String,
    pub outcome: ReviewOutcome,
    #[serde(default)]
    pub notes: Option<String>,
    /// Compliance reviews only.
    #[serde(default)]
    pub foreside_review_required: Option<bool>,
    /// Compliance reviews only.
    #[serde(default)]
    pub retail_use: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotesPayload {
    pub actor: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloseoutSubmission {
    pub actor: String,
    #[serde(default)]
    pub tracking_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReasonPayload {
    pub actor: String,
    pub reason: String,
}

pub fn plan_submit(
    request: &ReviewRequest,
    payload: &ActorPayload,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    let action = WorkflowAction::Submit;
    require_status(request, action, &[RequestStatus::Draft])?;
    let mut plan = TransitionPlan::new(action);
    plan.update.status = Some(RequestStatus::LegalIntake);
    plan.update.submitted_by = Some(payload.actor.clone());
    plan.update.submitted_on = Some(now);
    plan.permissions = PermissionSync::Initialize;
    Ok(plan)
}

pub fn plan_assign_attorney(
    request: &ReviewRequest,
    assignment: &Assignment,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    let action = WorkflowAction::AssignAttorney;
    require_status(request, action, &[RequestStatus::LegalIntake])?;
    start_reviews(request, action, assignment, now)
}

pub fn plan_send_to_committee(
    request: &ReviewRequest,
    _payload: &ActorPayload,
    _now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    let action = WorkflowAction::SendToCommittee;
    require_status(request, action, &[RequestStatus::LegalIntake])?;

    let mut plan = TransitionPlan::new(action);
    plan.update.status = Some(RequestStatus::AssignAttorney);
    plan.permissions = PermissionSync::Manage(RequestStatus::AssignAttorney);
    Ok(plan)
}

pub fn plan_assign_from_committee(
    request: &ReviewRequest,
    assignment: &Assignment,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    let action = WorkflowAction::AssignFromCommittee;
    require_status(request, action, &[RequestStatus::AssignAttorney])?;
    if assignment.attorneys.is_empty() {
        return Err(TransitionError::MissingAttorney);
    }
    start_reviews(request, action, assignment, now)
}

fn start_reviews(
    request: &ReviewRequest,
    action: WorkflowAction,
    assignment: &Assignment,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    let audience = request.review_audience;
    let mut plan = TransitionPlan::new(action);

    if audience.includes(ReviewKind::Legal) {
        if assignment.attorneys.is_empty() {
            return Err(TransitionError::MissingAttorney);
        }
        plan.update.attorneys = Some(assignment.attorneys.clone());
    }

    for kind in [ReviewKind::Legal, ReviewKind::Compliance] {
        let review = plan.update.review_mut(kind);
        if audience.includes(kind) {
            *review = ReviewStateUpdate {
                status: Some(ReviewStatus::NotStarted),
                outcome: Some(None),
                status_updated_on: Some(now),
                status_updated_by: Some(assignment.actor.clone()),
                ..ReviewStateUpdate::default()
            };
        } else if request.review(kind).status != ReviewStatus::NotRequired {
            review.status = Some(ReviewStatus::NotRequired);
        }
    }

    plan.update.status = Some(RequestStatus::InReview);
    plan.update.submitted_for_review_by = Some(assignment.actor.clone());
    plan.update.submitted_for_review_on = Some(now);
    plan.accrual = Accrual::Handoff {
        stage: Stage::LegalIntake,
        new_owner: StageOwner::Reviewer,
    };
    plan.permissions = PermissionSync::Manage(RequestStatus::InReview);
    Ok(plan)
}

pub fn plan_save_progress(
    request: &ReviewRequest,
    kind: ReviewKind,
    progress: &ProgressUpdate,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    let action = WorkflowAction::SaveProgress(kind);
    require_status(request, action, &[RequestStatus::InReview])?;
    let current = require_open_review(request, action, kind)?;

    let mut plan = TransitionPlan::new(action);
    let review = plan.update.review_mut(kind);
    review.status = Some(ReviewStatus::InProgress);
    if let Some(outcome) = progress.outcome {
        if current.outcome != Some(outcome) {
            review.outcome = Some(Some(outcome));
        }
    }
    if let Some(notes) = &progress.notes {
        if current.notes.as_deref() != Some(notes.as_str()) {
            review.notes = Some(notes.clone());
        }
    }

    // Re-saving work already in progress leaves the handoff clock alone.
    if current.status != ReviewStatus::InProgress {
        review.status_updated_on = Some(now);
        review.status_updated_by = Some(progress.actor.clone());
        plan.accrual = Accrual::Handoff {
            stage: Stage::for_review(kind),
            new_owner: StageOwner::Reviewer,
        };
    }
    Ok(plan)
}

pub fn plan_submit_review(
    request: &ReviewRequest,
    kind: ReviewKind,
    submission: &ReviewSubmission,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    let action = WorkflowAction::SubmitReview(kind);
    require_status(request, action, &[RequestStatus::InReview])?;
    require_open_review(request, action, kind)?;

    let mut plan = TransitionPlan::new(action);
    let review = plan.update.review_mut(kind);
    review.outcome = Some(Some(submission.outcome));
    review.notes = submission.notes.clone();
    review.status_updated_on = Some(now);
    review.status_updated_by = Some(submission.actor.clone());

    let stage = Stage::for_review(kind);
    if submission.outcome.requires_resubmission() {
        review.status = Some(ReviewStatus::WaitingOnSubmitter);
        plan.accrual = Accrual::Handoff {
            stage,
            new_owner: StageOwner::Submitter,
        };
    } else {
        review.status = Some(ReviewStatus::Completed);
        review.completed_on = Some(now);
        review.completed_by = Some(submission.actor.clone());
        plan.accrual = Accrual::Handoff {
            stage,
            new_owner: StageOwner::Reviewer,
        };
    }

    if kind == ReviewKind::Compliance {
        plan.update.is_foreside_review_required = submission.foreside_review_required;
        plan.update.is_retail_use = submission.retail_use;
    }

    if !submission.outcome.requires_resubmission() {
        let mut projected = request.clone();
        plan.update.apply_to(&mut projected);
        if projected.all_reviews_complete() {
            plan.update.status = Some(RequestStatus::Closeout);
            plan.permissions = PermissionSync::Manage(RequestStatus::Closeout);
        }
    }
    Ok(plan)
}

pub fn plan_request_changes(
    request: &ReviewRequest,
    kind: ReviewKind,
    payload: &NotesPayload,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    let action = WorkflowAction::RequestChanges(kind);
    require_status(request, action, &[RequestStatus::InReview])?;
    let current = require_open_review(request, action, kind)?;
    if current.status == ReviewStatus::WaitingOnSubmitter {
        return Err(TransitionError::ReviewNotActive {
            action,
            kind,
            status: current.status,
        });
    }

    let mut plan = TransitionPlan::new(action);
    let review = plan.update.review_mut(kind);
    review.status = Some(ReviewStatus::WaitingOnSubmitter);
    review.outcome = Some(Some(ReviewOutcome::RespondToCommentsAndResubmit));
    review.notes = payload.notes.clone();
    review.status_updated_on = Some(now);
    review.status_updated_by = Some(payload.actor.clone());
    plan.accrual = Accrual::Handoff {
        stage: Stage::for_review(kind),
        new_owner: StageOwner::Submitter,
    };
    Ok(plan)
}

pub fn plan_resubmit(
    request: &ReviewRequest,
    kind: ReviewKind,
    payload: &NotesPayload,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    let action = WorkflowAction::Resubmit(kind);
    let current = request.review(kind);
    if current.status != ReviewStatus::WaitingOnSubmitter
        || current.outcome != Some(ReviewOutcome::RespondToCommentsAndResubmit)
    {
        return Err(TransitionError::ResubmitNotAllowed {
            kind,
            status: current.status,
            outcome: current.outcome,
        });
    }
    require_status(request, action, &[RequestStatus::InReview])?;

    let mut plan = TransitionPlan::new(action);
    let review = plan.update.review_mut(kind);
    review.status = Some(kind.waiting_on_reviewer());
    review.notes = payload.notes.clone();
    review.status_updated_on = Some(now);
    review.status_updated_by = Some(payload.actor.clone());
    plan.accrual = Accrual::Handoff {
        stage: Stage::for_review(kind),
        new_owner: StageOwner::Reviewer,
    };
    Ok(plan)
}

pub fn plan_closeout(
    request: &ReviewRequest,
    closeout: &CloseoutSubmission,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    let action = WorkflowAction::Closeout;
    require_status(
        request,
        action,
        &[RequestStatus::InReview, RequestStatus::Closeout],
    )?;

    let mut plan = TransitionPlan::new(action);
    plan.update.closeout_by = Some(closeout.actor.clone());
    plan.update.closeout_on = Some(now);
    plan.update.tracking_id = closeout.tracking_id.clone();

    let next = if request.requires_regulatory_documents() {
        plan.update.awaiting_regulatory_since = Some(now);
        RequestStatus::AwaitingRegulatoryDocuments
    } else {
        plan.update.completed_on = Some(now);
        RequestStatus::Completed
    };
    plan.update.status = Some(next);
    plan.accrual = Accrual::Handoff {
        stage: Stage::Closeout,
        new_owner: StageOwner::Reviewer,
    };
    plan.permissions = PermissionSync::Manage(next);
    Ok(plan)
}

pub fn plan_complete_regulatory_documents(
    request: &ReviewRequest,
    payload: &ActorPayload,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    if request.status != RequestStatus::AwaitingRegulatoryDocuments {
        return Err(TransitionError::NotAwaitingRegulatoryDocuments(
            request.status,
        ));
    }

    let mut plan = TransitionPlan::new(WorkflowAction::CompleteRegulatoryDocuments);
    plan.update.status = Some(RequestStatus::Completed);
    plan.update.regulatory_documents_completed_by = Some(payload.actor.clone());
    plan.update.regulatory_documents_completed_on = Some(now);
    plan.update.completed_on = Some(now);
    plan.permissions = PermissionSync::Manage(RequestStatus::Completed);
    Ok(plan)
}

pub fn plan_hold(
    request: &ReviewRequest,
    hold: &ReasonPayload,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    let action = WorkflowAction::Hold;
    if !request.status.is_active() {
        return Err(TransitionError::InvalidTransition {
            action,
            from: request.status,
        });
    }

    let mut plan = TransitionPlan::new(action);
    plan.update.status = Some(RequestStatus::OnHold);
    plan.update.previous_status = Some(Some(request.status));
    plan.update.on_hold_reason = Some(Some(hold.reason.clone()));
    plan.update.on_hold_by = Some(Some(hold.actor.clone()));
    plan.update.on_hold_since = Some(Some(now));
    plan.accrual = Accrual::Pause;
    plan.permissions = PermissionSync::Manage(RequestStatus::OnHold);
    Ok(plan)
}

/// Restores the pre-hold status and restarts every stage clock in the same write.
pub fn plan_resume(
    request: &ReviewRequest,
    _payload: &ActorPayload,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    let action = WorkflowAction::Resume;
    require_status(request, action, &[RequestStatus::OnHold])?;
    let resumed = request
        .previous_status
        .ok_or_else(|| TransitionError::MissingPreviousStatus(request.id.clone()))?;

    let mut plan = TransitionPlan::new(action);
    plan.update.status = Some(resumed);
    plan.update.previous_status = Some(None);
    plan.update.on_hold_reason = Some(None);
    plan.update.on_hold_by = Some(None);
    plan.update.on_hold_since = Some(None);
    plan.update.last_resumed_on = Some(now);
    plan.accrual = Accrual::Resume(resumed);
    plan.permissions = PermissionSync::Manage(resumed);
    Ok(plan)
}

pub fn plan_cancel(
    request: &ReviewRequest,
    cancellation: &ReasonPayload,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    let action = WorkflowAction::Cancel;
    if request.status.is_terminal() {
        return Err(TransitionError::InvalidTransition {
            action,
            from: request.status,
        });
    }

    let mut plan = TransitionPlan::new(action);
    plan.update.status = Some(RequestStatus::Cancelled);
    plan.update.previous_status = Some(Some(request.status));
    plan.update.cancel_reason = Some(cancellation.reason.clone());
    plan.update.cancelled_by = Some(cancellation.actor.clone());
    plan.update.cancelled_on = Some(now);
    plan.permissions = PermissionSync::Manage(RequestStatus::Cancelled);
    Ok(plan)
}

fn require_status(
    request: &ReviewRequest,
    action: WorkflowAction,
    allowed: &[RequestStatus],
) -> Result<(), TransitionError> {
    if allowed.contains(&request.status) {
        Ok(())
    } else {
        Err(TransitionError::InvalidTransition {
            action,
            from: request.status,
        })
    }
}

fn require_open_review(
    request: &ReviewRequest,
    action: WorkflowAction,
    kind: ReviewKind,
) -> Result<&ReviewState, TransitionError> {
    let review = request.review(kind);
    if review.status.is_open() {
        Ok(review)
    } else {
        Err(TransitionError::ReviewNotActive {
            action,
            kind,
            status: review.status,
        })
    }
}
