//! Derives who holds each time-tracking stage, and since when, from status fields alone.

use chrono::{DateTime, Utc};

use super::domain::{RequestStatus, ReviewRequest, ReviewState, ReviewStatus, Stage, StageOwner};

/// Owner of a stage together with the instant the current owner took it over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageClock {
    pub owner: StageOwner,
    pub handoff: DateTime<Utc>,
}

/// Party currently holding `stage`, if anyone does.
pub fn stage_owner(request: &ReviewRequest, stage: Stage) -> Option<StageOwner> {
    if !clock_running(request.status) {
        return None;
    }

    match stage {
        Stage::LegalIntake => matches!(
            request.status,
            RequestStatus::LegalIntake | RequestStatus::AssignAttorney
        )
        .then_some(StageOwner::Reviewer),
        Stage::LegalReview => review_owner(&request.legal, ReviewStatus::WaitingOnAttorney),
        Stage::ComplianceReview => {
            review_owner(&request.compliance, ReviewStatus::WaitingOnCompliance)
        }
        Stage::Closeout => {
            (request.status == RequestStatus::Closeout).then_some(StageOwner::Reviewer)
        }
    }
}

/// Instant of the last handoff for `stage`.
///
/// A resume after a hold restarts every clock, so the later of the stage's own
/// marker and `last_resumed_on` wins.
pub fn handoff_timestamp(request: &ReviewRequest, stage: Stage) -> Option<DateTime<Utc>> {
    let marker = match stage {
        Stage::LegalIntake => request.submitted_on,
        Stage::LegalReview => request.legal.status_updated_on,
        Stage::ComplianceReview => request.compliance.status_updated_on,
        Stage::Closeout => request
            .closeout_on
            .or(request.compliance.completed_on)
            .or(request.legal.completed_on),
    }?;

    Some(match request.last_resumed_on {
        Some(resumed) if resumed > marker => resumed,
        _ => marker,
    })
}

/// Owner and handoff together; `None` means the stage contributes no hours.
pub fn resolve(request: &ReviewRequest, stage: Stage) -> Option<StageClock> {
    let owner = stage_owner(request, stage)?;
    let handoff = handoff_timestamp(request, stage)?;
    Some(StageClock { owner, handoff })
}

fn clock_running(status: RequestStatus) -> bool {
    !matches!(
        status,
        RequestStatus::Draft
            | RequestStatus::OnHold
            | RequestStatus::Completed
            | RequestStatus::Cancelled
    )
}

fn review_owner(review: &ReviewState, waiting_on_reviewer: ReviewStatus) -> Option<StageOwner> {
    match review.status {
        ReviewStatus::InProgress => Some(StageOwner::Reviewer),
        status if status == waiting_on_reviewer => Some(StageOwner::Reviewer),
        ReviewStatus::WaitingOnSubmitter => Some(StageOwner::Submitter),
        _ => None,
    }
}
