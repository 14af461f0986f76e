//! Best-effort repair of an invalid schedule by relocating matches.

use crate::calendar::{DatePool, DayNumber};
use crate::config::SchedulingConfig;
use crate::interner::TeamInterner;
use crate::logging::{enabled, VERBOSITY_CHANGES};
use crate::models::Schedule;
use crate::{log_changes, log_checks, log_debug};

use super::context::{EntryId, SchedulingContext};
use super::rebalance::balance_day_counts;
use super::scoring::{score_relocation, RelocationCandidate};
use super::validator::{validate, ValidationReport, ViolationKind};

/// Result of a repair run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOutcome {
    pub schedule: Schedule,
    /// Re-validation of the returned schedule
    pub report: ValidationReport,
    /// True when at least one match was relocated
    pub optimized: bool,
    pub relocation_count: usize,
    /// Relocations made to clear double bookings and adjacency
    pub conflict_relocations: usize,
    /// Relocations made to even out day counts
    pub capacity_relocations: usize,
}

impl RepairOutcome {
    pub fn is_valid(&self) -> bool {
        self.report.is_valid()
    }

    pub fn messages(&self) -> Vec<String> {
        self.report.messages()
    }
}

/// Applies conflict repair and day-capacity repair according to what the
/// validator reports. Matches with a recorded result are never moved.
pub struct ScheduleRepairer {
    config: SchedulingConfig,
}

impl ScheduleRepairer {
    pub fn new(config: SchedulingConfig) -> Self {
        Self { config }
    }

    pub fn repair(&self, mut schedule: Schedule) -> RepairOutcome {
        let policy = &self.config.slot_policy;
        let verbosity = self.config.verbosity;
        let report = validate(&schedule, policy);
        if report.is_valid() {
            return RepairOutcome {
                schedule,
                report,
                optimized: false,
                relocation_count: 0,
                conflict_relocations: 0,
                capacity_relocations: 0,
            };
        }

        let mut teams = TeamInterner::with_capacity(schedule.len());
        let mut ctx = self.load(&schedule, &mut teams);
        let mut attempts = self.config.retry.max_relocation_attempts;

        let mut conflict_relocations = 0;
        let mut interim = report;
        if interim.has_team_conflicts() {
            conflict_relocations = self.repair_conflicts(&mut ctx, &teams, &mut attempts);
            if conflict_relocations > 0 {
                write_back(&mut schedule, &ctx);
                interim = validate(&schedule, policy);
            }
        }

        let mut capacity_relocations = 0;
        if interim.has(ViolationKind::DayCapacity) {
            capacity_relocations = balance_day_counts(
                &mut ctx,
                &teams,
                self.config.relocation_min_rest(),
                &mut attempts,
                self.config.retry.max_repack_steps,
                verbosity,
            );
            if capacity_relocations > 0 {
                write_back(&mut schedule, &ctx);
            }
        }

        let relocation_count = conflict_relocations + capacity_relocations;
        log_debug!(
            verbosity,
            "Repair relocated {} matches ({} conflicts, {} capacity)",
            relocation_count,
            conflict_relocations,
            capacity_relocations
        );

        let report = validate(&schedule, policy);
        RepairOutcome {
            schedule,
            report,
            optimized: relocation_count > 0,
            relocation_count,
            conflict_relocations,
            capacity_relocations,
        }
    }

    /// Build a context whose entries mirror `schedule.matches` index for index.
    fn load(&self, schedule: &Schedule, teams: &mut TeamInterner) -> SchedulingContext {
        let first = schedule
            .first_day()
            .map_or(schedule.start, |d| d.min(schedule.start));
        let last = schedule
            .last_day()
            .map_or(schedule.start, |d| d.max(schedule.start));
        let span = first.days_until(last) as usize + 1;
        let pool = DatePool::new(first, span + self.config.retry.pool_extension_days);

        let mut ctx =
            SchedulingContext::with_pool(schedule.start, self.config.slot_policy.clone(), pool);
        for m in &schedule.matches {
            let pair = teams.intern_fixture(&m.fixture);
            ctx.place_at_slot(pair, m.day, m.slot, m.is_frozen());
        }
        ctx
    }

    /// Move every match caught in a double booking or adjacency to the
    /// best-scoring day that clears the hard constraints.
    fn repair_conflicts(
        &self,
        ctx: &mut SchedulingContext,
        teams: &TeamInterner,
        attempts: &mut usize,
    ) -> usize {
        let verbosity = self.config.verbosity;
        let offenders: Vec<EntryId> = (0..ctx.entries().len())
            .filter(|&id| ctx.in_conflict(id))
            .collect();

        let mut moves = 0;
        for id in offenders {
            let pairing = if enabled(verbosity, VERBOSITY_CHANGES) {
                teams.pairing(ctx.entry(id).teams)
            } else {
                String::new()
            };
            if ctx.entry(id).frozen {
                log_checks!(
                    verbosity,
                    "  {} has a result; not moving it",
                    pairing
                );
                continue;
            }
            // An earlier move may already have cleared this one
            if !ctx.in_conflict(id) {
                continue;
            }
            if *attempts == 0 {
                log_debug!(verbosity, "  Relocation budget exhausted");
                break;
            }
            *attempts -= 1;

            let origin = ctx.entry(id).day;
            match self.relocate_best(ctx, id) {
                Some(day) => {
                    moves += 1;
                    log_changes!(
                        verbosity,
                        "  Relocated {} from {} to {}",
                        pairing,
                        origin,
                        day
                    );
                }
                None => log_checks!(
                    verbosity,
                    "  No alternative day for {}; left on {}",
                    pairing,
                    origin
                ),
            }
        }
        moves
    }

    /// Relocate one entry to its best alternative day, extending the pool if
    /// nothing in it qualifies.
    fn relocate_best(&self, ctx: &mut SchedulingContext, id: EntryId) -> Option<DayNumber> {
        let min_rest = self.config.relocation_min_rest();
        let weights = &self.config.weights;
        let origin = ctx.entry(id).day;
        let pair = ctx.entry(id).teams;

        ctx.lift(id);
        let mut best: Option<(DayNumber, f64)> = None;
        let mut scanned = 0;
        for round in 0..=self.config.retry.max_pool_extensions {
            if round > 0 {
                ctx.extend_pool(self.config.retry.pool_extension_days);
            }
            for day in ctx.pool().days().skip(scanned) {
                if day == origin || day < ctx.opening_day() {
                    continue;
                }
                if ctx.check(pair, day, min_rest).is_err() {
                    continue;
                }
                let score = score_relocation(
                    &RelocationCandidate {
                        day,
                        original: origin,
                        day_count: ctx.count(day),
                        calendars: [ctx.calendar(pair[0]), ctx.calendar(pair[1])],
                    },
                    weights,
                );
                if best.map_or(true, |(_, top)| score > top) {
                    best = Some((day, score));
                }
            }
            scanned = ctx.pool().len();
            if best.is_some() {
                break;
            }
        }

        let target = best.map(|(day, _)| day);
        ctx.settle(id, target.unwrap_or(origin));
        target
    }
}

fn write_back(schedule: &mut Schedule, ctx: &SchedulingContext) {
    for (m, entry) in schedule.matches.iter_mut().zip(ctx.entries()) {
        m.day = entry.day;
        m.slot = entry.slot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Fixture, MatchResult, ScheduledMatch};
    use chrono::NaiveDate;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn m(id: &str, a: &str, b: &str, offset: u64, slot: usize) -> ScheduledMatch {
        let date = start().checked_add_days(chrono::Days::new(offset)).unwrap();
        ScheduledMatch::new(id, Fixture::new(a, b, "G"), date, slot)
    }

    fn repairer() -> ScheduleRepairer {
        ScheduleRepairer::new(SchedulingConfig::default())
    }

    #[test]
    fn test_valid_schedule_is_untouched() {
        let schedule = Schedule::new(
            start(),
            vec![
                m("M1", "A", "B", 0, 0),
                m("M2", "C", "D", 0, 1),
                m("M3", "A", "C", 4, 0),
                m("M4", "E", "F", 4, 1),
                m("M5", "B", "D", 4, 2),
            ],
        );
        let outcome = repairer().repair(schedule.clone());

        assert!(outcome.is_valid());
        assert!(!outcome.optimized);
        assert_eq!(outcome.relocation_count, 0);
        assert_eq!(outcome.schedule, schedule);
    }

    #[test]
    fn test_surplus_day_gives_one_match_to_short_day() {
        let schedule = Schedule::new(
            start(),
            vec![
                m("M1", "A", "B", 10, 0),
                m("M2", "C", "D", 10, 1),
                m("M3", "E", "F", 10, 2),
                m("M4", "G", "H", 10, 3),
                m("M5", "I", "J", 20, 0),
                m("M6", "K", "L", 20, 1),
            ],
        );
        let outcome = repairer().repair(schedule);

        assert!(outcome.optimized);
        assert_eq!(outcome.relocation_count, 1);
        assert_eq!(outcome.capacity_relocations, 1);
        assert!(outcome.is_valid(), "{:?}", outcome.messages());
        let moved = outcome.schedule.find("M4").unwrap();
        assert_eq!(moved.date(), NaiveDate::from_ymd_opt(2025, 6, 21).unwrap());
        assert_eq!(moved.slot, 2);
    }

    #[test]
    fn test_adjacent_match_is_moved_away() {
        let schedule = Schedule::new(
            start(),
            vec![m("M1", "X", "Y", 10, 0), m("M2", "X", "Z", 11, 0)],
        );
        let outcome = repairer().repair(schedule);

        assert_eq!(outcome.report.count(ViolationKind::Adjacency), 0);
        assert_eq!(outcome.conflict_relocations, 1);
        assert!(outcome.optimized);
        let calendar = outcome.schedule.team_calendar("X");
        assert!(!calendar[0].is_adjacent_to(calendar[1]));
        assert_eq!(outcome.schedule.find("M2").unwrap().day, calendar[1]);
    }

    #[test]
    fn test_double_booking_is_cleared() {
        let schedule = Schedule::new(
            start(),
            vec![
                m("M1", "A", "B", 5, 0),
                m("M2", "A", "C", 5, 1),
                m("M3", "D", "E", 5, 2),
            ],
        );
        let outcome = repairer().repair(schedule);

        assert_eq!(outcome.report.count(ViolationKind::DoubleBooking), 0);
        assert_eq!(outcome.report.count(ViolationKind::Adjacency), 0);
        assert!(outcome.relocation_count >= 1);
    }

    #[test]
    fn test_matches_with_results_stay_put() {
        let result = MatchResult {
            score_a: 3,
            score_b: 1,
        };
        let schedule = Schedule::new(
            start(),
            vec![
                m("M1", "X", "Y", 10, 0).with_result(result),
                m("M2", "X", "Z", 11, 0).with_result(result),
            ],
        );
        let outcome = repairer().repair(schedule.clone());

        assert!(!outcome.optimized);
        assert_eq!(outcome.relocation_count, 0);
        assert_eq!(outcome.report.count(ViolationKind::Adjacency), 1);
        assert_eq!(outcome.schedule, schedule);
    }
}
