//! Configuration types for the scheduling engine.

use crate::calendar::SlotPolicy;

/// Weights of the placement and relocation scoring functions.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoringWeights {
    /// Cap on the per-team "days since last match" bonus
    pub rest_bonus_cap: i64,
    /// Bonus per team that has not played yet
    pub first_match_bonus: f64,
    /// Bonus for a day that already holds at least one match
    pub day_fill_bonus: f64,
    /// Bonus per remaining pool position (favors earlier days)
    pub earliness_weight: f64,
    /// Ideal rest days between consecutive matches of a team
    pub ideal_rest_days: i64,
    /// Penalty per day of deviation from the ideal rest
    pub rest_penalty_multiplier: f64,
    /// Penalty per day of distance from the original day (relocation only)
    pub closeness_weight: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            rest_bonus_cap: 10,
            first_match_bonus: 10.0,
            day_fill_bonus: 100.0,
            earliness_weight: 0.5,
            ideal_rest_days: 5,
            rest_penalty_multiplier: 2.0,
            closeness_weight: 1.0,
        }
    }
}

/// Bounds on pool growth and relocation work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Days appended per pool extension
    pub pool_extension_days: usize,
    /// Extensions allowed before a placement is declared infeasible
    pub max_pool_extensions: usize,
    /// Relocations allowed per rebalancing or repair run
    pub max_relocation_attempts: usize,
    /// Search steps allowed when repacking every match into full days
    pub max_repack_steps: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            pool_extension_days: 10,
            max_pool_extensions: 36,
            max_relocation_attempts: 10_000,
            max_repack_steps: 200_000,
        }
    }
}

/// Configuration for assignment, validation and repair.
#[derive(Clone, Debug, PartialEq)]
pub struct SchedulingConfig {
    pub slot_policy: SlotPolicy,
    /// Minimum rest days the assigner enforces between a team's matches
    pub min_rest_days: i64,
    /// Initial size of the candidate date pool
    pub initial_pool_days: usize,
    pub weights: ScoringWeights,
    pub retry: RetryPolicy,
    /// Whether relocations must also respect `min_rest_days`
    pub repair_enforces_min_rest: bool,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug
    pub verbosity: u8,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            slot_policy: SlotPolicy::default(),
            min_rest_days: 3,
            initial_pool_days: 60,
            weights: ScoringWeights::default(),
            retry: RetryPolicy::default(),
            repair_enforces_min_rest: false,
            verbosity: 0,
        }
    }
}

impl SchedulingConfig {
    pub fn with_min_rest_days(mut self, days: i64) -> Self {
        self.min_rest_days = days;
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Minimum rest applied when relocating an already-placed match.
    pub fn relocation_min_rest(&self) -> Option<i64> {
        self.repair_enforces_min_rest.then_some(self.min_rest_days)
    }
}
