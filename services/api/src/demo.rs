use crate::infra::{parse_timestamp, InMemoryRequestStore, LoggingPermissionService};
use crate::routes::draft_store_error;
use chrono::{DateTime, Duration, TimeZone, Utc};
use clap::Args;
use legal_review::config::AppConfig;
use legal_review::error::AppError;
use legal_review::workflows::review::{
    business_hours, ActorPayload, Assignment, Clock, CloseoutSubmission, NotesPayload,
    ProgressUpdate, ReasonPayload, RequestId, ReviewAudience, ReviewKind, ReviewOutcome,
    ReviewRequest, ReviewSubmission, ReviewWorkflowEngine, Stage, StageOwner,
    StaticWorkingHours, TransitionOutcome, WorkingHoursConfig,
};
use std::sync::{Arc, Mutex};

#[derive(Args, Debug)]
pub(crate) struct HoursArgs {
    /// Interval start (RFC 3339, e.g. 2025-09-05T16:00:00Z)
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) start: DateTime<Utc>,
    /// Interval end (RFC 3339)
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) end: DateTime<Utc>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Simulated submission instant (RFC 3339). Defaults to Monday 2025-09-01 09:00 UTC.
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) start: Option<DateTime<Utc>>,
    /// Print the final request as JSON after the walkthrough.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_hours(args: HoursArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let hours = hours_between(args.start, args.end, &config.working_hours)?;
    println!(
        "{:.2} business hours between {} and {}",
        hours,
        args.start.to_rfc3339(),
        args.end.to_rfc3339()
    );
    Ok(())
}

fn hours_between(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    config: &WorkingHoursConfig,
) -> Result<f64, AppError> {
    business_hours(Some(start), Some(end), config)
        .map_err(|err| AppError::Input(format!("invalid working calendar: {err}")))
}

/// Simulated time source the walkthrough advances between steps.
struct DemoClock {
    origin: DateTime<Utc>,
    now: Mutex<DateTime<Utc>>,
}

impl DemoClock {
    fn new(origin: DateTime<Utc>) -> Self {
        Self {
            origin,
            now: Mutex::new(origin),
        }
    }

    fn jump(&self, offset: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now = self.origin + offset;
        }
    }
}

impl Clock for DemoClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or(self.origin)
    }
}

fn default_demo_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn actor(name: &str) -> ActorPayload {
    ActorPayload {
        actor: name.to_string(),
    }
}

fn approval(actor: &str, flags: Option<(bool, bool)>) -> ReviewSubmission {
    ReviewSubmission {
        actor: actor.to_string(),
        outcome: ReviewOutcome::Approved,
        notes: Some("approved for distribution".to_string()),
        foreside_review_required: flags.map(|(foreside, _)| foreside),
        retail_use: flags.map(|(_, retail)| retail),
    }
}

fn print_step(label: &str, clock: &DemoClock, outcome: &TransitionOutcome) {
    let degraded = if outcome.is_degraded() {
        format!(" ({} degraded)", outcome.degraded.len())
    } else {
        String::new()
    };
    println!(
        "- {} {:<34} -> {}{}",
        clock.now().format("%a %H:%M"),
        label,
        outcome.new_status,
        degraded
    );
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let start = args.start.unwrap_or_else(default_demo_start);
    let store = InMemoryRequestStore::default();
    let clock = Arc::new(DemoClock::new(start));
    let engine = ReviewWorkflowEngine::new(
        Arc::new(store.clone()),
        Arc::new(LoggingPermissionService),
        Arc::new(StaticWorkingHours::new(WorkingHoursConfig::default())),
    )
    .with_clock(clock.clone());

    let id = RequestId("demo-0001".to_string());
    store
        .create_draft(
            id.clone(),
            "Retail fund factsheet Q3".to_string(),
            ReviewAudience::Both,
        )
        .map_err(draft_store_error)?;

    println!("Legal review workflow demo (Mon-Fri 08:00-17:00 UTC)");

    let outcome = engine.submit(&id, actor("submitter")).await?;
    print_step("submit", &clock, &outcome);

    clock.jump(Duration::hours(2));
    let outcome = engine
        .assign_attorney(
            &id,
            Assignment {
                actor: "intake".to_string(),
                attorneys: vec!["attorney".to_string()],
            },
        )
        .await?;
    print_step("assign attorney", &clock, &outcome);

    clock.jump(Duration::hours(4));
    let outcome = engine
        .save_progress(
            &id,
            ReviewKind::Legal,
            ProgressUpdate {
                actor: "attorney".to_string(),
                outcome: None,
                notes: Some("reviewing disclosures".to_string()),
            },
        )
        .await?;
    print_step("legal review started", &clock, &outcome);

    clock.jump(Duration::hours(6));
    let outcome = engine
        .request_changes(
            &id,
            ReviewKind::Legal,
            NotesPayload {
                actor: "attorney".to_string(),
                notes: Some("performance table needs a footnote".to_string()),
            },
        )
        .await?;
    print_step("legal requests changes", &clock, &outcome);

    clock.jump(Duration::hours(24));
    let outcome = engine
        .save_progress(
            &id,
            ReviewKind::Compliance,
            ProgressUpdate {
                actor: "compliance".to_string(),
                outcome: None,
                notes: None,
            },
        )
        .await?;
    print_step("compliance review started", &clock, &outcome);

    clock.jump(Duration::hours(25));
    let outcome = engine
        .resubmit(
            &id,
            ReviewKind::Legal,
            NotesPayload {
                actor: "submitter".to_string(),
                notes: Some("footnote added".to_string()),
            },
        )
        .await?;
    print_step("submitter resubmits", &clock, &outcome);

    clock.jump(Duration::hours(26));
    let outcome = engine
        .hold(
            &id,
            ReasonPayload {
                actor: "intake".to_string(),
                reason: "awaiting updated prospectus".to_string(),
            },
        )
        .await?;
    print_step("hold", &clock, &outcome);

    clock.jump(Duration::hours(29));
    let outcome = engine.resume(&id, actor("intake")).await?;
    print_step("resume", &clock, &outcome);

    clock.jump(Duration::hours(30));
    let outcome = engine
        .submit_review(&id, ReviewKind::Legal, approval("attorney", None))
        .await?;
    print_step("legal approves", &clock, &outcome);

    clock.jump(Duration::hours(48));
    let outcome = engine
        .submit_review(
            &id,
            ReviewKind::Compliance,
            approval("compliance", Some((true, true))),
        )
        .await?;
    print_step("compliance approves", &clock, &outcome);

    clock.jump(Duration::hours(50));
    let outcome = engine
        .closeout(
            &id,
            CloseoutSubmission {
                actor: "paralegal".to_string(),
                tracking_id: Some("TRK-DEMO-0001".to_string()),
            },
        )
        .await?;
    print_step("closeout", &clock, &outcome);

    clock.jump(Duration::hours(51));
    let outcome = engine
        .complete_regulatory_documents(&id, actor("operations"))
        .await?;
    print_step("regulatory documents filed", &clock, &outcome);

    render_hours(&outcome.updated_request);

    if args.json {
        match serde_json::to_string_pretty(&outcome.updated_request) {
            Ok(json) => println!("\n{}", json),
            Err(err) => println!("\nRequest payload unavailable: {}", err),
        }
    }

    Ok(())
}

fn render_hours(request: &ReviewRequest) {
    let tracking = &request.time_tracking;
    println!("\nBusiness hours by stage");
    println!("  {:<20} {:>10} {:>10}", "stage", "reviewer", "submitter");
    for stage in Stage::ordered() {
        let hours = tracking.stage(stage);
        println!(
            "  {:<20} {:>10.2} {:>10.2}",
            stage.label(),
            hours.get(StageOwner::Reviewer),
            hours.get(StageOwner::Submitter)
        );
    }
    println!(
        "  {:<20} {:>10.1} {:>10.1}",
        "total",
        tracking.total(StageOwner::Reviewer),
        tracking.total(StageOwner::Submitter)
    );
}
