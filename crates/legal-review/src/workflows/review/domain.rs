use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for review requests held by the external store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Top-level lifecycle state of a review request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Draft,
    LegalIntake,
    AssignAttorney,
    InReview,
    Closeout,
    AwaitingRegulatoryDocuments,
    Completed,
    Cancelled,
    OnHold,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::LegalIntake => "Legal Intake",
            Self::AssignAttorney => "Assign Attorney",
            Self::InReview => "In Review",
            Self::Closeout => "Closeout",
            Self::AwaitingRegulatoryDocuments => "Awaiting Regulatory Documents",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::OnHold => "On Hold",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Statuses a request can be placed on hold from.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::LegalIntake
                | Self::AssignAttorney
                | Self::InReview
                | Self::Closeout
                | Self::AwaitingRegulatoryDocuments
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which review tracks a request must pass through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAudience {
    Legal,
    Compliance,
    Both,
}

impl ReviewAudience {
    pub const fn includes(self, kind: ReviewKind) -> bool {
        match (self, kind) {
            (Self::Both, _) => true,
            (Self::Legal, ReviewKind::Legal) => true,
            (Self::Compliance, ReviewKind::Compliance) => true,
            _ => false,
        }
    }
}

/// One of the two independent review tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewKind {
    Legal,
    Compliance,
}

impl ReviewKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Legal => "legal",
            Self::Compliance => "compliance",
        }
    }

    /// Sub-status a track returns to once the submitter resubmits.
    pub const fn waiting_on_reviewer(self) -> ReviewStatus {
        match self {
            Self::Legal => ReviewStatus::WaitingOnAttorney,
            Self::Compliance => ReviewStatus::WaitingOnCompliance,
        }
    }
}

impl fmt::Display for ReviewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sub-status of a single review track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    NotRequired,
    NotStarted,
    InProgress,
    WaitingOnSubmitter,
    WaitingOnAttorney,
    WaitingOnCompliance,
    Completed,
}

impl ReviewStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotRequired => "Not Required",
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::WaitingOnSubmitter => "Waiting On Submitter",
            Self::WaitingOnAttorney => "Waiting On Attorney",
            Self::WaitingOnCompliance => "Waiting On Compliance",
            Self::Completed => "Completed",
        }
    }

    /// Whether the track still expects reviewer or submitter work.
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::NotRequired | Self::Completed)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reviewer decision recorded against a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    Approved,
    ApprovedWithComments,
    RespondToCommentsAndResubmit,
    NotApproved,
}

impl ReviewOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::ApprovedWithComments => "Approved With Comments",
            Self::RespondToCommentsAndResubmit => "Respond To Comments And Resubmit",
            Self::NotApproved => "Not Approved",
        }
    }

    pub const fn requires_resubmission(self) -> bool {
        matches!(self, Self::RespondToCommentsAndResubmit)
    }
}

/// State of one review track, including the timestamps that double as handoff markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    pub status: ReviewStatus,
    pub outcome: Option<ReviewOutcome>,
    pub notes: Option<String>,
    pub status_updated_on: Option<DateTime<Utc>>,
    pub status_updated_by: Option<String>,
    pub completed_on: Option<DateTime<Utc>>,
    pub completed_by: Option<String>,
}

impl ReviewState {
    pub fn not_required() -> Self {
        Self {
            status: ReviewStatus::NotRequired,
            outcome: None,
            notes: None,
            status_updated_on: None,
            status_updated_by: None,
            completed_on: None,
            completed_by: None,
        }
    }
}

impl Default for ReviewState {
    fn default() -> Self {
        Self::not_required()
    }
}

/// Time-tracking stages. Each stage keeps a reviewer and a submitter bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    LegalIntake,
    LegalReview,
    ComplianceReview,
    Closeout,
}

impl Stage {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::LegalIntake,
            Self::LegalReview,
            Self::ComplianceReview,
            Self::Closeout,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::LegalIntake => "Legal Intake",
            Self::LegalReview => "Legal Review",
            Self::ComplianceReview => "Compliance Review",
            Self::Closeout => "Closeout",
        }
    }

    pub const fn for_review(kind: ReviewKind) -> Self {
        match kind {
            ReviewKind::Legal => Self::LegalReview,
            ReviewKind::Compliance => Self::ComplianceReview,
        }
    }

    pub(crate) const fn field_prefix(self) -> &'static str {
        match self {
            Self::LegalIntake => "legal_intake",
            Self::LegalReview => "legal_review",
            Self::ComplianceReview => "compliance_review",
            Self::Closeout => "closeout",
        }
    }
}

/// Party currently holding a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOwner {
    Reviewer,
    Submitter,
}

impl StageOwner {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Reviewer => "Attorney/Reviewer",
            Self::Submitter => "Submitter",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageHours {
    pub reviewer: f64,
    pub submitter: f64,
}

impl StageHours {
    pub fn get(&self, owner: StageOwner) -> f64 {
        match owner {
            StageOwner::Reviewer => self.reviewer,
            StageOwner::Submitter => self.submitter,
        }
    }

    pub(crate) fn set(&mut self, owner: StageOwner, hours: f64) {
        match owner {
            StageOwner::Reviewer => self.reviewer = hours,
            StageOwner::Submitter => self.submitter = hours,
        }
    }
}

/// Per-stage hour buckets and the request-level totals derived from them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeTracking {
    pub legal_intake: StageHours,
    pub legal_review: StageHours,
    pub compliance_review: StageHours,
    pub closeout: StageHours,
    pub total_reviewer_hours: f64,
    pub total_submitter_hours: f64,
}

impl TimeTracking {
    pub fn stage(&self, stage: Stage) -> &StageHours {
        match stage {
            Stage::LegalIntake => &self.legal_intake,
            Stage::LegalReview => &self.legal_review,
            Stage::ComplianceReview => &self.compliance_review,
            Stage::Closeout => &self.closeout,
        }
    }

    pub(crate) fn stage_mut(&mut self, stage: Stage) -> &mut StageHours {
        match stage {
            Stage::LegalIntake => &mut self.legal_intake,
            Stage::LegalReview => &mut self.legal_review,
            Stage::ComplianceReview => &mut self.compliance_review,
            Stage::Closeout => &mut self.closeout,
        }
    }

    /// Sum of one side across all four stages, rounded to one decimal place.
    pub fn side_total(&self, owner: StageOwner) -> f64 {
        let sum: f64 = Stage::ordered()
            .iter()
            .map(|stage| self.stage(*stage).get(owner))
            .sum();
        round_to(sum, 1)
    }

    pub fn total(&self, owner: StageOwner) -> f64 {
        match owner {
            StageOwner::Reviewer => self.total_reviewer_hours,
            StageOwner::Submitter => self.total_submitter_hours,
        }
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Aggregate root tracked by the external store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub id: RequestId,
    pub title: String,
    pub status: RequestStatus,
    pub previous_status: Option<RequestStatus>,
    pub review_audience: ReviewAudience,
    pub submitted_by: Option<String>,
    pub submitted_on: Option<DateTime<Utc>>,
    pub submitted_for_review_by: Option<String>,
    pub submitted_for_review_on: Option<DateTime<Utc>>,
    pub attorneys: Vec<String>,
    pub legal: ReviewState,
    pub compliance: ReviewState,
    pub is_foreside_review_required: bool,
    pub is_retail_use: bool,
    pub tracking_id: Option<String>,
    pub closeout_by: Option<String>,
    pub closeout_on: Option<DateTime<Utc>>,
    pub awaiting_regulatory_since: Option<DateTime<Utc>>,
    pub regulatory_documents_completed_by: Option<String>,
    pub regulatory_documents_completed_on: Option<DateTime<Utc>>,
    pub completed_on: Option<DateTime<Utc>>,
    pub on_hold_reason: Option<String>,
    pub on_hold_by: Option<String>,
    pub on_hold_since: Option<DateTime<Utc>>,
    pub last_resumed_on: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub cancelled_by: Option<String>,
    pub cancelled_on: Option<DateTime<Utc>>,
    pub time_tracking: TimeTracking,
}

impl ReviewRequest {
    /// New draft with zeroed hour buckets and no review tracks started.
    pub fn draft(id: RequestId, title: impl Into<String>, audience: ReviewAudience) -> Self {
        Self {
            id,
            title: title.into(),
            status: RequestStatus::Draft,
            previous_status: None,
            review_audience: audience,
            submitted_by: None,
            submitted_on: None,
            submitted_for_review_by: None,
            submitted_for_review_on: None,
            attorneys: Vec::new(),
            legal: ReviewState::not_required(),
            compliance: ReviewState::not_required(),
            is_foreside_review_required: false,
            is_retail_use: false,
            tracking_id: None,
            closeout_by: None,
            closeout_on: None,
            awaiting_regulatory_since: None,
            regulatory_documents_completed_by: None,
            regulatory_documents_completed_on: None,
            completed_on: None,
            on_hold_reason: None,
            on_hold_by: None,
            on_hold_since: None,
            last_resumed_on: None,
            cancel_reason: None,
            cancelled_by: None,
            cancelled_on: None,
            time_tracking: TimeTracking::default(),
        }
    }

    pub fn review(&self, kind: ReviewKind) -> &ReviewState {
        match kind {
            ReviewKind::Legal => &self.legal,
            ReviewKind::Compliance => &self.compliance,
        }
    }

    /// Whether every review required by the audience has completed.
    pub fn all_reviews_complete(&self) -> bool {
        let legal_done = self.legal.status == ReviewStatus::Completed;
        let compliance_done = self.compliance.status == ReviewStatus::Completed;
        match self.review_audience {
            ReviewAudience::Legal => legal_done,
            ReviewAudience::Compliance => compliance_done,
            ReviewAudience::Both => legal_done && compliance_done,
        }
    }

    /// Closeout must route through the regulatory-document phase.
    pub fn requires_regulatory_documents(&self) -> bool {
        self.is_foreside_review_required && self.is_retail_use
    }
}
