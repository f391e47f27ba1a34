//! Handoff-based accrual of business hours into per-stage buckets.
//!
//! The service never writes to the store. It returns an [`HoursUpdate`] that the
//! engine folds into the transition's own diff.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::calendar::{CalendarError, WorkingCalendar, WorkingHoursConfig};
use super::domain::{round_to, RequestStatus, ReviewRequest, Stage, StageOwner, TimeTracking};
use super::ownership::{self, StageClock};
use super::update::{HoursField, HoursUpdate};

/// Supplies the working calendar; consulted once per accrual call.
#[async_trait]
pub trait WorkingHoursProvider: Send + Sync {
    async fn working_hours(&self) -> Result<WorkingHoursConfig, TimeTrackingError>;
}

/// Provider backed by a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticWorkingHours {
    config: WorkingHoursConfig,
}

impl StaticWorkingHours {
    pub fn new(config: WorkingHoursConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl WorkingHoursProvider for StaticWorkingHours {
    async fn working_hours(&self) -> Result<WorkingHoursConfig, TimeTrackingError> {
        Ok(self.config.clone())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimeTrackingError {
    #[error("working hours configuration unavailable: {0}")]
    ConfigUnavailable(String),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

/// Computes hour bucket updates at handoffs and holds.
#[derive(Clone)]
pub struct TimeTrackingService {
    provider: Arc<dyn WorkingHoursProvider>,
}

impl TimeTrackingService {
    pub fn new(provider: Arc<dyn WorkingHoursProvider>) -> Self {
        Self { provider }
    }

    /// Closes out the current segment of `stage` as ownership passes to `new_owner`.
    ///
    /// Hours are credited to the outgoing owner, who did the work being closed.
    pub async fn accrue(
        &self,
        request: &ReviewRequest,
        stage: Stage,
        new_owner: StageOwner,
        now: DateTime<Utc>,
    ) -> Result<HoursUpdate, TimeTrackingError> {
        let Some(clock) = ownership::resolve(request, stage) else {
            debug!(request_id = %request.id, stage = stage.label(), "no stage owner; skipping accrual");
            return Ok(HoursUpdate::default());
        };

        let calendar = self.calendar().await?;
        let mut tracking = request.time_tracking;
        let mut update = HoursUpdate::default();
        if credit(&calendar, &mut tracking, &mut update, stage, clock, now) {
            record_totals(&mut tracking, &mut update);
        }

        debug!(
            request_id = %request.id,
            stage = stage.label(),
            from = clock.owner.label(),
            to = new_owner.label(),
            "accrued handoff"
        );
        Ok(update)
    }

    /// Finalizes hours up to `now` for every stage that currently has an owner.
    pub async fn pause(
        &self,
        request: &ReviewRequest,
        now: DateTime<Utc>,
    ) -> Result<HoursUpdate, TimeTrackingError> {
        let running: Vec<(Stage, StageClock)> = Stage::ordered()
            .into_iter()
            .filter_map(|stage| ownership::resolve(request, stage).map(|clock| (stage, clock)))
            .collect();
        if running.is_empty() {
            return Ok(HoursUpdate::default());
        }

        let calendar = self.calendar().await?;
        let mut tracking = request.time_tracking;
        let mut update = HoursUpdate::default();
        let mut credited = false;
        for (stage, clock) in running {
            credited |= credit(&calendar, &mut tracking, &mut update, stage, clock, now);
        }
        if credited {
            record_totals(&mut tracking, &mut update);
        }
        Ok(update)
    }

    /// Nothing to write: the resume timestamp becomes the next handoff reference.
    pub fn resume(&self, request: &ReviewRequest, resumed_status: RequestStatus) -> HoursUpdate {
        debug!(request_id = %request.id, status = %resumed_status, "time tracking resumes");
        HoursUpdate::default()
    }

    async fn calendar(&self) -> Result<WorkingCalendar, TimeTrackingError> {
        let config = self.provider.working_hours().await?;
        Ok(WorkingCalendar::new(&config)?)
    }
}

fn credit(
    calendar: &WorkingCalendar,
    tracking: &mut TimeTracking,
    update: &mut HoursUpdate,
    stage: Stage,
    clock: StageClock,
    now: DateTime<Utc>,
) -> bool {
    let hours = calendar.hours_between(clock.handoff, now);
    if hours <= 0.0 {
        return false;
    }

    let bucket = tracking.stage(stage).get(clock.owner);
    let value = round_to(bucket + hours, 2).max(bucket);
    tracking.stage_mut(stage).set(clock.owner, value);
    update.set(
        HoursField::Stage {
            stage,
            owner: clock.owner,
        },
        value,
    );
    true
}

fn record_totals(tracking: &mut TimeTracking, update: &mut HoursUpdate) {
    tracking.total_reviewer_hours = tracking.side_total(StageOwner::Reviewer);
    tracking.total_submitter_hours = tracking.side_total(StageOwner::Submitter);
    update.set(HoursField::TotalReviewer, tracking.total_reviewer_hours);
    update.set(HoursField::TotalSubmitter, tracking.total_submitter_hours);
}
