//! Legal review request lifecycle: status transitions and business-hours time tracking.
//!
//! Planning is pure ([`transitions`]); the [`ReviewWorkflowEngine`] wraps each plan
//! with store reads/writes, hour accrual, and best-effort permission sync.

pub mod accrual;
pub mod calendar;
pub mod clock;
pub mod domain;
pub mod engine;
pub mod ownership;
pub mod repository;
pub mod router;
pub mod transitions;
pub mod update;

#[cfg(test)]
mod tests;

pub use accrual::{StaticWorkingHours, TimeTrackingError, TimeTrackingService, WorkingHoursProvider};
pub use calendar::{business_hours, CalendarError, WorkingCalendar, WorkingHoursConfig};
pub use clock::{Clock, SystemClock};
pub use domain::{
    RequestId, RequestStatus, ReviewAudience, ReviewKind, ReviewOutcome, ReviewRequest,
    ReviewState, ReviewStatus, Stage, StageHours, StageOwner, TimeTracking,
};
pub use engine::{ReviewWorkflowEngine, SecondaryFailure, SecondaryKind, TransitionOutcome};
pub use ownership::StageClock;
pub use repository::{PermissionError, PermissionService, RequestStore, StoreError};
pub use router::review_router;
pub use transitions::{
    ActorPayload, Assignment, CloseoutSubmission, NotesPayload, ProgressUpdate, ReasonPayload,
    ReviewSubmission, TransitionError, WorkflowAction,
};
pub use update::{HoursField, HoursUpdate, RequestUpdate, ReviewStateUpdate};
