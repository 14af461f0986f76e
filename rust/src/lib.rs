//! Round-robin fixture generation and match scheduling for group tournaments.
//!
//! The engine turns a roster of teams into a dated schedule: every pair of
//! teams in a group plays once, no team plays twice on one day or on two
//! consecutive days, and each day holds its slot-policy capacity of matches.
//! Schedules can be validated and repaired after manual edits.

pub mod calendar;
pub mod config;
pub mod fixtures;
pub mod interner;
pub mod logging;
pub mod models;
pub mod scheduler;

#[cfg(feature = "python")]
mod python;

use chrono::NaiveDate;

pub use calendar::{DatePool, DayNumber, SlotPolicy};
pub use config::{RetryPolicy, SchedulingConfig, ScoringWeights};
pub use fixtures::{check_fixtures, generate_fixtures, FixtureError};
pub use models::{
    Fixture, MatchRecord, MatchResult, Placement, RecordError, Schedule, ScheduledMatch, Team,
};
pub use scheduler::{
    GreedyAssigner, RepairOutcome, ScheduleRepairer, SchedulerError, ValidationReport, Violation,
    ViolationKind,
};

/// Assign every fixture a day and slot, starting on `start_date`.
///
/// Fixtures that could not be placed under the hard constraints are still
/// returned, flagged [`Placement::Relaxed`].
pub fn schedule_matches(
    fixtures: &[Fixture],
    start_date: NaiveDate,
    config: &SchedulingConfig,
) -> Schedule {
    GreedyAssigner::new(config.clone()).assign(fixtures, start_date)
}

/// Check a schedule against every hard constraint.
pub fn validate_schedule(schedule: &Schedule, config: &SchedulingConfig) -> ValidationReport {
    scheduler::validate(schedule, &config.slot_policy)
}

/// Repair a schedule by relocating matches; a valid schedule comes back as is.
pub fn optimize_schedule(schedule: Schedule, config: &SchedulingConfig) -> RepairOutcome {
    ScheduleRepairer::new(config.clone()).repair(schedule)
}

/// Generate, schedule and repair a full tournament for a roster.
///
/// # Errors
/// Returns [`SchedulerError::Fixture`] if the roster is malformed.
pub fn plan_tournament(
    teams: &[Team],
    start_date: NaiveDate,
    config: &SchedulingConfig,
) -> Result<RepairOutcome, SchedulerError> {
    let fixtures = generate_fixtures(teams)?;
    let schedule = schedule_matches(&fixtures, start_date, config);
    log_debug!(
        config.verbosity,
        "Scheduled {} fixtures across {} days",
        schedule.len(),
        schedule.day_counts().len()
    );
    Ok(optimize_schedule(schedule, config))
}
