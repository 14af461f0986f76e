//! Greedy assignment of fixtures to days and time slots.

use chrono::NaiveDate;
use rustc_hash::FxHashSet;
use std::cmp::Ordering;

use crate::calendar::DayNumber;
use crate::config::SchedulingConfig;
use crate::interner::{TeamInterner, TeamKey};
use crate::models::{Fixture, MatchResult, Placement, Schedule, ScheduledMatch};
use crate::{log_changes, log_checks, log_debug};

use super::context::SchedulingContext;
use super::rebalance::balance_day_counts;
use super::scoring::{score_placement, PlacementCandidate};

/// Match data carried alongside a context entry until the schedule is built.
struct Draft {
    id: String,
    fixture: Fixture,
    placement: Placement,
    result: Option<MatchResult>,
}

/// Greedy fixture assigner with a day-count rebalancing pass.
///
/// Fixtures are placed one at a time on the best-scoring day that passes
/// every hard constraint. When the pool has no such day it is extended and
/// the first feasible new day is taken; once the extension budget is spent
/// the fixture lands on the last pool day and is flagged
/// [`Placement::Relaxed`].
pub struct GreedyAssigner {
    config: SchedulingConfig,
    fixed: Vec<ScheduledMatch>,
}

impl GreedyAssigner {
    pub fn new(config: SchedulingConfig) -> Self {
        Self {
            config,
            fixed: Vec::new(),
        }
    }

    /// Seed the run with matches that keep their day and slot.
    ///
    /// Fixtures already covered by a fixed match are not scheduled again.
    pub fn with_fixed(mut self, matches: Vec<ScheduledMatch>) -> Self {
        self.fixed = matches;
        self
    }

    /// Assign every fixture a day and slot.
    pub fn assign(&self, fixtures: &[Fixture], start_date: NaiveDate) -> Schedule {
        let opening = DayNumber::from_date(start_date);
        let verbosity = self.config.verbosity;
        let mut teams = TeamInterner::with_capacity(fixtures.len());
        let mut ctx = SchedulingContext::new(
            opening,
            self.config.slot_policy.clone(),
            self.config.initial_pool_days,
        );
        let mut drafts: Vec<Draft> = Vec::with_capacity(self.fixed.len() + fixtures.len());

        // Phase 0: fixed matches
        let mut covered = FxHashSet::default();
        let mut used_ids: FxHashSet<&str> = FxHashSet::default();
        for fixed in &self.fixed {
            let pair = teams.intern_fixture(&fixed.fixture);
            ctx.place_at_slot(pair, fixed.day, fixed.slot, true);
            drafts.push(Draft {
                id: fixed.id.clone(),
                fixture: fixed.fixture.clone(),
                placement: fixed.placement,
                result: fixed.result,
            });
            covered.insert(fixed.fixture.pair_key());
            used_ids.insert(fixed.id.as_str());
        }

        let pending: Vec<&Fixture> = fixtures
            .iter()
            .filter(|f| !covered.contains(&f.pair_key()))
            .collect();
        let mut counter = 0;
        let ids: Vec<String> = pending
            .iter()
            .map(|_| loop {
                counter += 1;
                let id = format!("M{:03}", counter);
                if !used_ids.contains(id.as_str()) {
                    break id;
                }
            })
            .collect();
        let keys: Vec<[TeamKey; 2]> = pending
            .iter()
            .map(|f| teams.intern_fixture(f))
            .collect();

        // Phase 1: greedy placement
        for idx in balance_order(&keys, &ctx) {
            let pair = keys[idx];
            let fixture = pending[idx];
            log_checks!(
                verbosity,
                "Considering {} vs {} ({})",
                fixture.team_a,
                fixture.team_b,
                fixture.group
            );

            let (day, placement) = self.choose_day(&mut ctx, pair, &teams);
            let entry = ctx.place(pair, day, false);
            log_changes!(
                verbosity,
                "  Placed {} vs {} on {} slot {}{}",
                fixture.team_a,
                fixture.team_b,
                day,
                ctx.entry(entry).slot,
                if placement == Placement::Relaxed {
                    " (relaxed)"
                } else {
                    ""
                }
            );

            drafts.push(Draft {
                id: ids[idx].clone(),
                fixture: fixture.clone(),
                placement,
                result: None,
            });
        }

        // Phase 2: day-count rebalancing
        let mut attempts = self.config.retry.max_relocation_attempts;
        let moved = balance_day_counts(
            &mut ctx,
            &teams,
            self.config.relocation_min_rest(),
            &mut attempts,
            self.config.retry.max_repack_steps,
            verbosity,
        );
        log_debug!(verbosity, "Rebalancing moved {} matches", moved);

        let matches = drafts
            .into_iter()
            .zip(ctx.entries())
            .map(|(draft, entry)| ScheduledMatch {
                id: draft.id,
                fixture: draft.fixture,
                day: entry.day,
                slot: entry.slot,
                placement: draft.placement,
                result: draft.result,
            })
            .collect();

        let mut schedule = Schedule {
            start: opening,
            matches,
        };
        schedule.sort_chronologically();
        schedule
    }

    /// Pick the day for one fixture.
    fn choose_day(
        &self,
        ctx: &mut SchedulingContext,
        pair: [TeamKey; 2],
        teams: &TeamInterner,
    ) -> (DayNumber, Placement) {
        let verbosity = self.config.verbosity;
        let min_rest = Some(self.config.min_rest_days);
        let weights = &self.config.weights;

        let pool_len = ctx.pool().len();
        let mut best: Option<(DayNumber, f64)> = None;
        for (pool_position, day) in ctx.pool().days().enumerate() {
            // Fixed matches may have grown the pool backwards
            if day < ctx.opening_day() {
                continue;
            }
            if let Err(reason) = ctx.check(pair, day, min_rest) {
                log_debug!(verbosity, "    {} rejected: {:?}", day, reason);
                continue;
            }
            let score = score_placement(
                &PlacementCandidate {
                    day,
                    pool_position,
                    pool_len,
                    day_count: ctx.count(day),
                    calendars: [ctx.calendar(pair[0]), ctx.calendar(pair[1])],
                },
                weights,
            );
            log_debug!(verbosity, "    {} score {:.1}", day, score);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((day, score));
            }
        }
        if let Some((day, _)) = best {
            return (day, Placement::Regular);
        }

        // No feasible day: grow the pool and take the first feasible new day
        for extension in 1..=self.config.retry.max_pool_extensions {
            let scanned = ctx.pool().len();
            ctx.extend_pool(self.config.retry.pool_extension_days);
            log_debug!(
                verbosity,
                "    Pool extended to {} days (extension {})",
                ctx.pool().len(),
                extension
            );
            let found = ctx
                .pool()
                .days()
                .skip(scanned)
                .find(|day| ctx.check(pair, *day, min_rest).is_ok());
            if let Some(day) = found {
                return (day, Placement::Regular);
            }
        }

        let day = ctx.pool().last_day();
        log_changes!(
            verbosity,
            "  Infeasible: no day fits {}; placing on {} under relaxed constraints",
            teams.pairing(pair),
            day
        );
        (day, Placement::Relaxed)
    }
}

/// Fixture order: ascending average matches already played by the two
/// teams, ties kept in input order. Computed once, before any placement.
fn balance_order(keys: &[[TeamKey; 2]], ctx: &SchedulingContext) -> Vec<usize> {
    let averages: Vec<f64> = keys
        .iter()
        .map(|[a, b]| (ctx.matches_played(*a) + ctx.matches_played(*b)) as f64 / 2.0)
        .collect();
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&x, &y| {
        averages[x]
            .partial_cmp(&averages[y])
            .unwrap_or(Ordering::Equal)
    });
    order
}
