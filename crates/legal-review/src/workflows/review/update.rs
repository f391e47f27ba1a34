use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::domain::{
    RequestStatus, ReviewKind, ReviewOutcome, ReviewRequest, ReviewState, ReviewStatus, Stage,
    StageOwner, TimeTracking,
};

/// Addressable hour bucket on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HoursField {
    Stage { stage: Stage, owner: StageOwner },
    TotalReviewer,
    TotalSubmitter,
}

impl HoursField {
    pub fn field_name(self) -> String {
        match self {
            HoursField::Stage { stage, owner } => {
                let side = match owner {
                    StageOwner::Reviewer => "reviewer",
                    StageOwner::Submitter => "submitter",
                };
                format!("{}_{}_hours", stage.field_prefix(), side)
            }
            HoursField::TotalReviewer => "total_reviewer_hours".to_string(),
            HoursField::TotalSubmitter => "total_submitter_hours".to_string(),
        }
    }
}

/// New absolute values for the hour buckets touched by an accrual.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoursUpdate {
    values: BTreeMap<HoursField, f64>,
}

impl HoursUpdate {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, field: HoursField) -> Option<f64> {
        self.values.get(&field).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (HoursField, f64)> + '_ {
        self.values.iter().map(|(field, value)| (*field, *value))
    }

    pub(crate) fn set(&mut self, field: HoursField, value: f64) {
        self.values.insert(field, value);
    }

    /// Later values win.
    pub fn merge(&mut self, other: HoursUpdate) {
        self.values.extend(other.values);
    }

    pub fn apply_to(&self, tracking: &mut TimeTracking) {
        for (field, value) in self.iter() {
            match field {
                HoursField::Stage { stage, owner } => tracking.stage_mut(stage).set(owner, value),
                HoursField::TotalReviewer => tracking.total_reviewer_hours = value,
                HoursField::TotalSubmitter => tracking.total_submitter_hours = value,
            }
        }
    }
}

/// Field diff for one review track. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewStateUpdate {
    pub status: Option<ReviewStatus>,
    pub outcome: Option<Option<ReviewOutcome>>,
    pub notes: Option<String>,
    pub status_updated_on: Option<DateTime<Utc>>,
    pub status_updated_by: Option<String>,
    pub completed_on: Option<DateTime<Utc>>,
    pub completed_by: Option<String>,
}

impl ReviewStateUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn apply_to(&self, state: &mut ReviewState) {
        if let Some(status) = self.status {
            state.status = status;
        }
        if let Some(outcome) = self.outcome {
            state.outcome = outcome;
        }
        if let Some(notes) = &self.notes {
            state.notes = Some(notes.clone());
        }
        if let Some(on) = self.status_updated_on {
            state.status_updated_on = Some(on);
        }
        if let Some(by) = &self.status_updated_by {
            state.status_updated_by = Some(by.clone());
        }
        if let Some(on) = self.completed_on {
            state.completed_on = Some(on);
        }
        if let Some(by) = &self.completed_by {
            state.completed_by = Some(by.clone());
        }
    }

    fn field_names(&self, kind: ReviewKind, names: &mut Vec<String>) {
        let prefix = kind.label();
        let mut push = |present: bool, suffix: &str| {
            if present {
                names.push(format!("{prefix}_{suffix}"));
            }
        };
        push(self.status.is_some(), "review_status");
        push(self.outcome.is_some(), "review_outcome");
        push(self.notes.is_some(), "review_notes");
        push(self.status_updated_on.is_some(), "status_updated_on");
        push(self.status_updated_by.is_some(), "status_updated_by");
        push(self.completed_on.is_some(), "review_completed_on");
        push(self.completed_by.is_some(), "review_completed_by");
    }
}

/// Partial update written to the store by a single transition.
///
/// Nested `Option<Option<_>>` fields distinguish "leave alone" (`None`) from
/// "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestUpdate {
    pub status: Option<RequestStatus>,
    pub previous_status: Option<Option<RequestStatus>>,
    pub submitted_by: Option<String>,
    pub submitted_on: Option<DateTime<Utc>>,
    pub submitted_for_review_by: Option<String>,
    pub submitted_for_review_on: Option<DateTime<Utc>>,
    pub attorneys: Option<Vec<String>>,
    pub legal: ReviewStateUpdate,
    pub compliance: ReviewStateUpdate,
    pub is_foreside_review_required: Option<bool>,
    pub is_retail_use: Option<bool>,
    pub tracking_id: Option<String>,
    pub closeout_by: Option<String>,
    pub closeout_on: Option<DateTime<Utc>>,
    pub awaiting_regulatory_since: Option<DateTime<Utc>>,
    pub regulatory_documents_completed_by: Option<String>,
    pub regulatory_documents_completed_on: Option<DateTime<Utc>>,
    pub completed_on: Option<DateTime<Utc>>,
    pub on_hold_reason: Option<Option<String>>,
    pub on_hold_by: Option<Option<String>>,
    pub on_hold_since: Option<Option<DateTime<Utc>>>,
    pub last_resumed_on: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub cancelled_by: Option<String>,
    pub cancelled_on: Option<DateTime<Utc>>,
    pub hours: HoursUpdate,
}

impl RequestUpdate {
    pub fn review(&self, kind: ReviewKind) -> &ReviewStateUpdate {
        match kind {
            ReviewKind::Legal => &self.legal,
            ReviewKind::Compliance => &self.compliance,
        }
    }

    pub fn review_mut(&mut self, kind: ReviewKind) -> &mut ReviewStateUpdate {
        match kind {
            ReviewKind::Legal => &mut self.legal,
            ReviewKind::Compliance => &mut self.compliance,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields_updated().is_empty()
    }

    /// Names of every field this update writes, in a stable order.
    pub fn fields_updated(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut push = |present: bool, name: &str| {
            if present {
                names.push(name.to_string());
            }
        };

        push(self.status.is_some(), "status");
        push(self.previous_status.is_some(), "previous_status");
        push(self.submitted_by.is_some(), "submitted_by");
        push(self.submitted_on.is_some(), "submitted_on");
        push(
            self.submitted_for_review_by.is_some(),
            "submitted_for_review_by",
        );
        push(
            self.submitted_for_review_on.is_some(),
            "submitted_for_review_on",
        );
        push(self.attorneys.is_some(), "attorneys");
        push(
            self.is_foreside_review_required.is_some(),
            "is_foreside_review_required",
        );
        push(self.is_retail_use.is_some(), "is_retail_use");
        push(self.tracking_id.is_some(), "tracking_id");
        push(self.closeout_by.is_some(), "closeout_by");
        push(self.closeout_on.is_some(), "closeout_on");
        push(
            self.awaiting_regulatory_since.is_some(),
            "awaiting_regulatory_since",
        );
        push(
            self.regulatory_documents_completed_by.is_some(),
            "regulatory_documents_completed_by",
        );
        push(
            self.regulatory_documents_completed_on.is_some(),
            "regulatory_documents_completed_on",
        );
        push(self.completed_on.is_some(), "completed_on");
        push(self.on_hold_reason.is_some(), "on_hold_reason");
        push(self.on_hold_by.is_some(), "on_hold_by");
        push(self.on_hold_since.is_some(), "on_hold_since");
        push(self.last_resumed_on.is_some(), "last_resumed_on");
        push(self.cancel_reason.is_some(), "cancel_reason");
        push(self.cancelled_by.is_some(), "cancelled_by");
        push(self.cancelled_on.is_some(), "cancelled_on");

        self.legal.field_names(ReviewKind::Legal, &mut names);
        self.compliance
            .field_names(ReviewKind::Compliance, &mut names);
        names.extend(self.hours.iter().map(|(field, _)| field.field_name()));
        names
    }

    /// Applies the diff to a snapshot. Stores that keep whole records use this.
    pub fn apply_to(&self, request: &mut ReviewRequest) {
        if let Some(status) = self.status {
            request.status = status;
        }
        if let Some(previous) = self.previous_status {
            request.previous_status = previous;
        }
        if let Some(by) = &self.submitted_by {
            request.submitted_by = Some(by.clone());
        }
        if let Some(on) = self.submitted_on {
            request.submitted_on = Some(on);
        }
        if let Some(by) = &self.submitted_for_review_by {
            request.submitted_for_review_by = Some(by.clone());
        }
        if let Some(on) = self.submitted_for_review_on {
            request.submitted_for_review_on = Some(on);
        }
        if let Some(attorneys) = &self.attorneys {
            request.attorneys = attorneys.clone();
        }
        self.legal.apply_to(&mut request.legal);
        self.compliance.apply_to(&mut request.compliance);
        if let Some(flag) = self.is_foreside_review_required {
            request.is_foreside_review_required = flag;
        }
        if let Some(flag) = self.is_retail_use {
            request.is_retail_use = flag;
        }
        if let Some(tracking_id) = &self.tracking_id {
            request.tracking_id = Some(tracking_id.clone());
        }
        if let Some(by) = &self.closeout_by {
            request.closeout_by = Some(by.clone());
        }
        if let Some(on) = self.closeout_on {
            request.closeout_on = Some(on);
        }
        if let Some(since) = self.awaiting_regulatory_since {
            request.awaiting_regulatory_since = Some(since);
        }
        if let Some(by) = &self.regulatory_documents_completed_by {
            request.regulatory_documents_completed_by = Some(by.clone());
        }
        if let Some(on) = self.regulatory_documents_completed_on {
            request.regulatory_documents_completed_on = Some(on);
        }
        if let Some(on) = self.completed_on {
            request.completed_on = Some(on);
        }
        if let Some(reason) = &self.on_hold_reason {
            request.on_hold_reason = reason.clone();
        }
        if let Some(by) = &self.on_hold_by {
            request.on_hold_by = by.clone();
        }
        if let Some(since) = self.on_hold_since {
            request.on_hold_since = since;
        }
        if let Some(on) = self.last_resumed_on {
            request.last_resumed_on = Some(on);
        }
        if let Some(reason) = &self.cancel_reason {
            request.cancel_reason = Some(reason.clone());
        }
        if let Some(by) = &self.cancelled_by {
            request.cancelled_by = Some(by.clone());
        }
        if let Some(on) = self.cancelled_on {
            request.cancelled_on = Some(on);
        }
        self.hours.apply_to(&mut request.time_tracking);
    }
}
