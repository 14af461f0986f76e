//! Match scheduling: greedy assignment, validation and repair.
//!
//! The assigner places every fixture on a calendar day, the validator checks
//! a schedule against the hard constraints, and the repairer relocates single
//! matches to clear whatever the validator reports.

mod assigner;
mod context;
mod rebalance;
mod repair;
mod scoring;
mod validator;

use thiserror::Error;

use crate::fixtures::FixtureError;
use crate::models::RecordError;

pub use assigner::GreedyAssigner;
pub use context::{Entry, EntryId, Reject, SchedulingContext};
pub use repair::{RepairOutcome, ScheduleRepairer};
pub use scoring::{
    rest_bonus, rest_distribution_penalty, score_placement, score_relocation, PlacementCandidate,
    RelocationCandidate,
};
pub use validator::{validate, ValidationReport, Violation, ViolationKind};

/// Errors that can occur while planning a tournament.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error(transparent)]
    Fixture(#[from] FixtureError),
    #[error(transparent)]
    Record(#[from] RecordError),
}
