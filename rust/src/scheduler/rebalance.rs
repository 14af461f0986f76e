//! Day-count rebalancing: bring every used day up to its capacity.
//!
//! Three strategies, cheapest first: pull a single match onto a short day,
//! swap two matches so that a blocked match can then be pulled, and finally
//! repack every match into full days with a bounded exact search.

use std::cmp::Reverse;

use rustc_hash::FxHashMap;

use crate::calendar::DayNumber;
use crate::interner::{TeamInterner, TeamKey};
use crate::{log_changes, log_debug};

use super::context::{EntryId, SchedulingContext};
use super::validator::capacity_mismatches;

/// Whether every used day holds its capacity (a short final day allowed).
pub(crate) fn is_balanced(ctx: &SchedulingContext) -> bool {
    capacity_mismatches(&ctx.day_counts(), ctx.opening_day(), ctx.policy()).is_empty()
}

/// Run single moves and swaps, then repack if days are still uneven.
///
/// Returns the number of matches whose day changed.
pub(crate) fn balance_day_counts(
    ctx: &mut SchedulingContext,
    teams: &TeamInterner,
    min_rest: Option<i64>,
    attempts: &mut usize,
    repack_steps: usize,
    verbosity: u8,
) -> usize {
    let mut moves = fill_deficits(ctx, teams, min_rest, attempts, verbosity);
    if is_balanced(ctx) {
        return moves;
    }
    match repack(ctx, min_rest, repack_steps) {
        Some(moved) => {
            log_changes!(
                verbosity,
                "  Repacked {} matches into {} full days",
                moved,
                ctx.used_days().len()
            );
            moves += moved;
        }
        None => log_debug!(verbosity, "  No full-day packing within the step budget"),
    }
    moves
}

/// Fill under-capacity match days by relocating matches onto them.
///
/// Donors are tried in order: matches on over-capacity days first, then
/// matches on later days (latest first). When no donor fits directly, a
/// match already on the short day is exchanged with one elsewhere so that a
/// blocked donor can follow. Only days that already hold a match are filled.
/// Returns the number of relocations made (three per swap); stops when
/// nothing moves or `attempts` is spent.
pub(crate) fn fill_deficits(
    ctx: &mut SchedulingContext,
    teams: &TeamInterner,
    min_rest: Option<i64>,
    attempts: &mut usize,
    verbosity: u8,
) -> usize {
    let mut moves = 0;

    loop {
        let mut moved_any = false;

        for target in ctx.used_days() {
            while ctx.count(target) > 0 && ctx.count(target) < ctx.capacity(target) {
                if let Some(id) = pull_donor(ctx, target, min_rest, attempts) {
                    moves += 1;
                    moved_any = true;
                    log_changes!(
                        verbosity,
                        "  Rebalanced {} onto {} ({} / {})",
                        teams.pairing(ctx.entry(id).teams),
                        target,
                        ctx.count(target),
                        ctx.capacity(target)
                    );
                } else if let Some([resident, other, donor]) =
                    swap_in_donor(ctx, target, min_rest, attempts)
                {
                    moves += 3;
                    moved_any = true;
                    log_changes!(
                        verbosity,
                        "  Swapped {} with {} so {} fits on {}",
                        teams.pairing(ctx.entry(resident).teams),
                        teams.pairing(ctx.entry(other).teams),
                        teams.pairing(ctx.entry(donor).teams),
                        target
                    );
                } else {
                    break;
                }
            }
            if *attempts == 0 {
                log_debug!(verbosity, "  Relocation budget exhausted");
                return moves;
            }
        }

        if !moved_any {
            break;
        }
    }

    moves
}

/// Movable matches that may give up their day to `target`, best first.
fn donor_order(ctx: &SchedulingContext, target: DayNumber) -> Vec<EntryId> {
    let mut donors: Vec<EntryId> = (0..ctx.entries().len())
        .filter(|&id| {
            let entry = ctx.entry(id);
            !entry.frozen
                && entry.day != target
                && (entry.day > target || ctx.is_over_capacity(entry.day))
        })
        .collect();
    donors.sort_by_key(|&id| {
        let entry = ctx.entry(id);
        (
            !ctx.is_over_capacity(entry.day),
            Reverse(entry.day),
            Reverse(entry.slot),
        )
    });
    donors
}

/// Relocate the first feasible donor onto `target`.
fn pull_donor(
    ctx: &mut SchedulingContext,
    target: DayNumber,
    min_rest: Option<i64>,
    attempts: &mut usize,
) -> Option<EntryId> {
    for id in donor_order(ctx, target) {
        if *attempts == 0 {
            return None;
        }
        *attempts -= 1;
        if ctx.try_relocate(id, target, min_rest).is_ok() {
            return Some(id);
        }
    }
    None
}

/// Exchange a match on `target` that blocks a donor with a match on another
/// day, then move the donor onto `target`. Returns `[resident, other, donor]`.
///
/// The exchange is undone when the donor still does not fit.
fn swap_in_donor(
    ctx: &mut SchedulingContext,
    target: DayNumber,
    min_rest: Option<i64>,
    attempts: &mut usize,
) -> Option<[EntryId; 3]> {
    let residents: Vec<EntryId> = (0..ctx.entries().len())
        .filter(|&id| !ctx.entry(id).frozen && ctx.entry(id).day == target)
        .collect();

    for donor in donor_order(ctx, target) {
        let donor_teams = ctx.entry(donor).teams;
        for &resident in &residents {
            let blocking = ctx
                .entry(resident)
                .teams
                .iter()
                .any(|team| donor_teams.contains(team));
            if !blocking {
                continue;
            }
            for other in 0..ctx.entries().len() {
                let entry = ctx.entry(other);
                if other == donor || entry.frozen || entry.day == target {
                    continue;
                }
                if *attempts == 0 {
                    return None;
                }
                *attempts -= 1;
                if ctx.try_exchange(resident, other, min_rest).is_err() {
                    continue;
                }
                if ctx.try_relocate(donor, target, min_rest).is_ok() {
                    return Some([resident, other, donor]);
                }
                ctx.exchange(resident, other);
            }
        }
    }
    None
}

/// Reassign every match so each day is full except possibly the last.
///
/// Matches go onto the used days, or onto new days past the last one,
/// keeping consecutive days at least `min_rest + 1` apart (2 without a
/// minimum) so no team can play on adjacent days. Within a day no team plays
/// twice. Returns the number of matches moved, or `None` when a match is
/// frozen or no packing is found within `max_steps`; the context is left
/// untouched in that case.
pub(crate) fn repack(
    ctx: &mut SchedulingContext,
    min_rest: Option<i64>,
    max_steps: usize,
) -> Option<usize> {
    if ctx.entries().is_empty()
        || ctx.entries().iter().any(|e| e.frozen)
        || ctx.policy().regular_capacity() == 0
    {
        return None;
    }

    let gap = min_rest.map_or(2, |rest| rest.max(1) + 1);
    let targets = target_days(ctx, gap);

    // Smallest days first: the short day constrains the search the most
    let mut order: Vec<usize> = (0..targets.len()).collect();
    order.sort_by_key(|&i| targets[i].1);
    let sizes = order.iter().map(|&i| targets[i].1).collect();

    let pairs = ctx.entries().iter().map(|e| e.teams).collect();
    let mut packer = Packer::new(pairs, sizes, max_steps);
    if !packer.solve(0) {
        return None;
    }

    let days: Vec<DayNumber> = packer
        .assignment
        .iter()
        .map(|&day| targets[order[day]].0)
        .collect();
    let moved = days
        .iter()
        .zip(ctx.entries())
        .filter(|(day, entry)| **day != entry.day)
        .count();
    ctx.reassign(&days);
    Some(moved)
}

/// Days to fill, in calendar order, with the number of matches each takes.
fn target_days(ctx: &SchedulingContext, gap: i64) -> Vec<(DayNumber, usize)> {
    let mut remaining = ctx.entries().len();
    let mut used = ctx.used_days().into_iter();
    let mut previous: Option<DayNumber> = None;
    let mut targets = Vec::new();

    while remaining > 0 {
        let next = used
            .by_ref()
            .find(|day| previous.map_or(true, |p| p.days_until(*day) >= gap));
        let day = match (next, previous) {
            (Some(day), _) => day,
            (None, Some(p)) => p.offset(gap),
            (None, None) => ctx.opening_day(),
        };
        let take = ctx.capacity(day).min(remaining);
        if take > 0 {
            targets.push((day, take));
            remaining -= take;
        }
        previous = Some(day);
    }
    targets
}

const UNPLACED: usize = usize::MAX;

/// Depth-first search that splits matches into team-disjoint days of fixed
/// sizes.
///
/// Days are filled one at a time. A team with as many matches left as days
/// left must play on every remaining day, so such teams are placed first.
struct Packer {
    pairs: Vec<[TeamKey; 2]>,
    sizes: Vec<usize>,
    /// Search day of each match
    assignment: Vec<usize>,
    remaining: FxHashMap<TeamKey, usize>,
    steps: usize,
    max_steps: usize,
}

impl Packer {
    fn new(pairs: Vec<[TeamKey; 2]>, sizes: Vec<usize>, max_steps: usize) -> Self {
        let mut remaining = FxHashMap::default();
        for team in pairs.iter().flatten() {
            *remaining.entry(*team).or_insert(0) += 1;
        }
        Self {
            assignment: vec![UNPLACED; pairs.len()],
            pairs,
            sizes,
            remaining,
            steps: 0,
            max_steps,
        }
    }

    fn solve(&mut self, day: usize) -> bool {
        if day == self.sizes.len() {
            return true;
        }
        let days_left = self.sizes.len() - day;
        if self.remaining.values().any(|&left| left > days_left) {
            return false;
        }
        let mut forced: Vec<TeamKey> = self
            .remaining
            .iter()
            .filter(|(_, &left)| left == days_left)
            .map(|(&team, _)| team)
            .collect();
        forced.sort_unstable();
        if forced.len() > 2 * self.sizes[day] {
            return false;
        }
        let mut busy = Vec::with_capacity(2 * self.sizes[day]);
        self.fill(day, &forced, &mut busy, 0)
    }

    fn fill(
        &mut self,
        day: usize,
        forced: &[TeamKey],
        busy: &mut Vec<TeamKey>,
        from: usize,
    ) -> bool {
        let slots = self.sizes[day] - busy.len() / 2;
        if slots == 0 {
            return self.solve(day + 1);
        }
        let uncovered: Vec<TeamKey> = forced
            .iter()
            .filter(|team| !busy.contains(*team))
            .copied()
            .collect();
        if uncovered.len() > 2 * slots {
            return false;
        }

        let taken: &[TeamKey] = busy;
        let candidates: Vec<usize> = match uncovered.first() {
            Some(team) => (0..self.pairs.len())
                .filter(|&m| self.is_open(m, taken) && self.pairs[m].contains(team))
                .collect(),
            None => (from..self.pairs.len())
                .filter(|&m| self.is_open(m, taken))
                .collect(),
        };

        for m in candidates {
            if self.steps >= self.max_steps {
                return false;
            }
            self.steps += 1;

            let pair = self.pairs[m];
            self.assignment[m] = day;
            busy.extend(pair);
            self.adjust(pair, false);

            let next = if uncovered.is_empty() { m + 1 } else { from };
            if self.fill(day, forced, busy, next) {
                return true;
            }

            self.adjust(pair, true);
            busy.truncate(busy.len() - 2);
            self.assignment[m] = UNPLACED;
        }
        false
    }

    fn is_open(&self, m: usize, busy: &[TeamKey]) -> bool {
        self.assignment[m] == UNPLACED && !self.pairs[m].iter().any(|team| busy.contains(team))
    }

    fn adjust(&mut self, pair: [TeamKey; 2], restore: bool) {
        for team in pair {
            if let Some(left) = self.remaining.get_mut(&team) {
                if restore {
                    *left += 1;
                } else {
                    *left = left.saturating_sub(1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::SlotPolicy;
    use chrono::NaiveDate;

    fn opening() -> DayNumber {
        DayNumber::from_date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
    }

    fn ctx() -> SchedulingContext {
        SchedulingContext::new(opening(), SlotPolicy::default(), 40)
    }

    /// Every pairing of `n` teams, in roster order.
    fn round_robin(n: u32) -> Vec<[TeamKey; 2]> {
        (0..n)
            .flat_map(|a| (a + 1..n).map(move |b| [a, b]))
            .collect()
    }

    /// No team plays twice on a day or on adjacent days.
    fn assert_conflict_free(ctx: &SchedulingContext) {
        for id in 0..ctx.entries().len() {
            assert!(!ctx.in_conflict(id), "{:?}", ctx.entry(id));
        }
    }

    #[test]
    fn test_surplus_day_feeds_deficit_day() {
        let mut ctx = ctx();
        let busy = opening().offset(10);
        let thin = opening().offset(20);
        for pair in [[0, 1], [2, 3], [4, 5], [6, 7]] {
            ctx.place(pair, busy, false);
        }
        ctx.place([8, 9], thin, false);
        ctx.place([10, 11], thin, false);

        let mut attempts = 100;
        let moves = fill_deficits(&mut ctx, &TeamInterner::default(), None, &mut attempts, 0);

        assert_eq!(moves, 1);
        assert_eq!(ctx.count(busy), 3);
        assert_eq!(ctx.count(thin), 3);
        // The highest slot on the surplus day moves first
        assert_eq!(ctx.entry(3).day, thin);
        assert_eq!(ctx.entry(3).slot, 2);
        assert!(is_balanced(&ctx));
    }

    #[test]
    fn test_later_days_are_pulled_forward() {
        let mut ctx = ctx();
        let early = opening().offset(5);
        ctx.place([0, 1], early, false);
        ctx.place([2, 3], opening().offset(12), false);
        ctx.place([4, 5], opening().offset(19), false);

        let mut attempts = 100;
        let moves = fill_deficits(&mut ctx, &TeamInterner::default(), None, &mut attempts, 0);

        assert_eq!(moves, 2);
        assert_eq!(ctx.count(early), 3);
        assert_eq!(ctx.used_days(), vec![early]);
    }

    #[test]
    fn test_blocked_and_frozen_donors_stay() {
        let mut ctx = ctx();
        let early = opening().offset(5);
        ctx.place([0, 1], early, false);
        // Team 0 cannot play twice on the same day
        ctx.place([0, 2], opening().offset(12), false);
        ctx.place([3, 4], opening().offset(19), true);

        let mut attempts = 100;
        let moves = fill_deficits(&mut ctx, &TeamInterner::default(), None, &mut attempts, 0);

        assert_eq!(moves, 0);
        assert_eq!(ctx.used_days().len(), 3);
    }

    #[test]
    fn test_swap_unblocks_donor() {
        let mut ctx = ctx();
        let short = opening().offset(10);
        let middle = opening().offset(20);
        let late = opening().offset(30);
        let resident = ctx.place([0, 1], short, false);
        let other = ctx.place([1, 5], middle, false);
        let donor = ctx.place([0, 2], late, false);

        let mut attempts = 100;
        let moves = fill_deficits(&mut ctx, &TeamInterner::default(), None, &mut attempts, 0);

        assert_eq!(moves, 3);
        assert_eq!(ctx.entry(resident).day, middle);
        assert_eq!(ctx.entry(other).day, short);
        assert_eq!(ctx.entry(donor).day, short);
        assert_eq!(ctx.count(short), 2);
        assert_eq!(ctx.used_days(), vec![short, middle]);
        assert_conflict_free(&ctx);
    }

    #[test]
    fn test_attempt_budget_bounds_work() {
        let mut ctx = ctx();
        ctx.place([0, 1], opening().offset(5), false);
        ctx.place([2, 3], opening().offset(12), false);

        let mut attempts = 0;
        let moves = fill_deficits(&mut ctx, &TeamInterner::default(), None, &mut attempts, 0);
        assert_eq!(moves, 0);
        assert_eq!(ctx.count(opening().offset(12)), 1);
    }

    #[test]
    fn test_repack_finds_full_days_for_six_team_group() {
        let mut ctx = ctx();
        for (i, pair) in round_robin(6).into_iter().enumerate() {
            ctx.place(pair, opening().offset(3 * i as i64), false);
        }

        let moved = repack(&mut ctx, None, 10_000).unwrap();

        assert!(moved > 0);
        assert!(is_balanced(&ctx));
        assert_conflict_free(&ctx);
        let counts: Vec<usize> = ctx.day_counts().into_values().collect();
        assert_eq!(counts, vec![2, 3, 3, 3, 3, 1]);
        assert_eq!(ctx.count(opening()), 2);
        // The first pairing takes the short final day
        assert_eq!(ctx.entry(0).day, opening().offset(15));
    }

    #[test]
    fn test_repack_fails_when_a_team_has_too_many_matches() {
        let mut ctx = ctx();
        for pair in round_robin(4) {
            ctx.place(pair, opening().offset(1), false);
        }

        // Four teams cannot fill a three-match day
        assert_eq!(repack(&mut ctx, Some(3), 10_000), None);
        assert_eq!(ctx.count(opening().offset(1)), 6);
    }

    #[test]
    fn test_repack_spaces_days_for_min_rest() {
        let mut ctx = ctx();
        for (i, pair) in [[0, 1], [2, 3], [4, 5], [0, 2], [1, 4], [3, 5]]
            .into_iter()
            .enumerate()
        {
            ctx.place(pair, opening().offset(i as i64), false);
        }

        assert_eq!(repack(&mut ctx, Some(3), 10_000), Some(5));
        assert!(is_balanced(&ctx));
        assert_conflict_free(&ctx);
        let days = ctx.used_days();
        assert_eq!(days, vec![opening(), opening().offset(4), opening().offset(8)]);
        assert!(days.windows(2).all(|w| w[0].rest_days_to(w[1]) >= 3));
    }

    #[test]
    fn test_repack_leaves_frozen_schedules_alone() {
        let mut ctx = ctx();
        ctx.place([0, 1], opening().offset(4), true);
        ctx.place([2, 3], opening().offset(9), false);

        assert_eq!(repack(&mut ctx, None, 10_000), None);
        assert_eq!(ctx.entry(1).day, opening().offset(9));
    }

    #[test]
    fn test_balance_repacks_when_moves_stall() {
        let mut ctx = ctx();
        let pairs = round_robin(4)
            .into_iter()
            .chain(round_robin(4).into_iter().map(|[a, b]| [a + 4, b + 4]));
        for (i, pair) in pairs.enumerate() {
            ctx.place(pair, opening().offset(3 * i as i64), false);
        }

        let mut attempts = 1_000;
        let moves = balance_day_counts(
            &mut ctx,
            &TeamInterner::default(),
            None,
            &mut attempts,
            10_000,
            0,
        );

        assert!(moves > 0);
        assert!(is_balanced(&ctx));
        assert_conflict_free(&ctx);
        assert_eq!(ctx.count(opening()), 2);
        assert_eq!(ctx.used_days().len(), 5);
    }
}
