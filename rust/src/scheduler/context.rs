//! Scheduling context: the date pool, per-team calendars and every placed
//! match, threaded explicitly through assignment, rebalancing and repair.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::calendar::{DatePool, DayNumber, SlotPolicy};
use crate::interner::TeamKey;

/// Index of a match inside the context.
pub type EntryId = usize;

/// A placed match as seen by the scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub teams: [TeamKey; 2],
    pub day: DayNumber,
    pub slot: usize,
    /// Frozen entries are never relocated.
    pub frozen: bool,
}

/// Why a day cannot take a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reject {
    DayFull,
    DoubleBooked(TeamKey),
    Adjacent(TeamKey),
    ShortRest(TeamKey),
    Frozen,
}

#[inline]
fn contains(calendar: &[DayNumber], day: DayNumber) -> bool {
    calendar.binary_search(&day).is_ok()
}

/// Latest match day strictly before `day`.
pub(crate) fn nearest_before(calendar: &[DayNumber], day: DayNumber) -> Option<DayNumber> {
    let idx = calendar.partition_point(|d| *d < day);
    idx.checked_sub(1).map(|i| calendar[i])
}

/// Earliest match day strictly after `day`.
pub(crate) fn nearest_after(calendar: &[DayNumber], day: DayNumber) -> Option<DayNumber> {
    let idx = calendar.partition_point(|d| *d <= day);
    calendar.get(idx).copied()
}

#[derive(Clone, Debug)]
pub struct SchedulingContext {
    opening: DayNumber,
    policy: SlotPolicy,
    pool: DatePool,
    calendars: FxHashMap<TeamKey, Vec<DayNumber>>,
    entries: Vec<Entry>,
}

impl SchedulingContext {
    /// Empty context whose pool starts on the opening day.
    pub fn new(opening: DayNumber, policy: SlotPolicy, pool_days: usize) -> Self {
        Self::with_pool(opening, policy, DatePool::new(opening, pool_days))
    }

    pub fn with_pool(opening: DayNumber, policy: SlotPolicy, pool: DatePool) -> Self {
        Self {
            opening,
            policy,
            pool,
            calendars: FxHashMap::default(),
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn opening_day(&self) -> DayNumber {
        self.opening
    }

    #[inline]
    pub fn policy(&self) -> &SlotPolicy {
        &self.policy
    }

    #[inline]
    pub fn pool(&self) -> &DatePool {
        &self.pool
    }

    pub fn extend_pool(&mut self, days: usize) {
        self.pool.extend(days);
    }

    #[inline]
    pub fn capacity(&self, day: DayNumber) -> usize {
        self.policy.capacity(day, self.opening)
    }

    #[inline]
    pub fn count(&self, day: DayNumber) -> usize {
        self.pool.count(day)
    }

    #[inline]
    pub fn is_over_capacity(&self, day: DayNumber) -> bool {
        self.count(day) > self.capacity(day)
    }

    /// Sorted match days of a team.
    pub fn calendar(&self, team: TeamKey) -> &[DayNumber] {
        self.calendars
            .get(&team)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn matches_played(&self, team: TeamKey) -> usize {
        self.calendar(team).len()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, id: EntryId) -> &Entry {
        &self.entries[id]
    }

    /// Distinct days holding at least one match, ascending.
    pub fn used_days(&self) -> Vec<DayNumber> {
        let mut days: Vec<DayNumber> = self.entries.iter().map(|e| e.day).collect();
        days.sort_unstable();
        days.dedup();
        days
    }

    /// Number of matches per used day.
    pub fn day_counts(&self) -> BTreeMap<DayNumber, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.day).or_insert(0) += 1;
        }
        counts
    }

    /// Team-level hard constraints for putting `teams` on `day`.
    pub fn check_teams(
        &self,
        teams: [TeamKey; 2],
        day: DayNumber,
        min_rest: Option<i64>,
    ) -> Result<(), Reject> {
        for team in teams {
            let calendar = self.calendar(team);
            if contains(calendar, day) {
                return Err(Reject::DoubleBooked(team));
            }
            if contains(calendar, day.offset(-1)) || contains(calendar, day.offset(1)) {
                return Err(Reject::Adjacent(team));
            }
            if let Some(min_rest) = min_rest {
                let neighbours = [nearest_before(calendar, day), nearest_after(calendar, day)];
                if neighbours
                    .into_iter()
                    .flatten()
                    .any(|other| other.rest_days_to(day) < min_rest)
                {
                    return Err(Reject::ShortRest(team));
                }
            }
        }
        Ok(())
    }

    /// All hard constraints, including the day's capacity.
    pub fn check(
        &self,
        teams: [TeamKey; 2],
        day: DayNumber,
        min_rest: Option<i64>,
    ) -> Result<(), Reject> {
        if self.count(day) >= self.capacity(day) {
            return Err(Reject::DayFull);
        }
        self.check_teams(teams, day, min_rest)
    }

    /// Whether the entry is double-booked or adjacent for either team.
    pub fn in_conflict(&self, id: EntryId) -> bool {
        let entry = &self.entries[id];
        entry.teams.iter().any(|&team| {
            let calendar = self.calendar(team);
            let same_day = calendar.iter().filter(|d| **d == entry.day).count();
            same_day > 1
                || contains(calendar, entry.day.offset(-1))
                || contains(calendar, entry.day.offset(1))
        })
    }

    /// Place a match in the lowest free slot of `day`.
    pub fn place(&mut self, teams: [TeamKey; 2], day: DayNumber, frozen: bool) -> EntryId {
        let slot = self.free_slot(day, None);
        self.place_at_slot(teams, day, slot, frozen)
    }

    /// Place a match keeping a caller-supplied slot.
    pub fn place_at_slot(
        &mut self,
        teams: [TeamKey; 2],
        day: DayNumber,
        slot: usize,
        frozen: bool,
    ) -> EntryId {
        self.entries.push(Entry {
            teams,
            day,
            slot,
            frozen,
        });
        self.occupy(teams, day);
        self.entries.len() - 1
    }

    /// Move an entry to `to` if every hard constraint holds there.
    pub fn try_relocate(
        &mut self,
        id: EntryId,
        to: DayNumber,
        min_rest: Option<i64>,
    ) -> Result<(), Reject> {
        if self.entries[id].frozen {
            return Err(Reject::Frozen);
        }
        let origin = self.entries[id].day;
        self.lift(id);
        let verdict = self.check(self.entries[id].teams, to, min_rest);
        self.settle(id, if verdict.is_ok() { to } else { origin });
        verdict
    }

    /// Swap the days of two entries if every hard constraint holds for both.
    ///
    /// On rejection both entries stay on their days.
    pub fn try_exchange(
        &mut self,
        a: EntryId,
        b: EntryId,
        min_rest: Option<i64>,
    ) -> Result<(), Reject> {
        if self.entries[a].frozen || self.entries[b].frozen {
            return Err(Reject::Frozen);
        }
        let (day_a, day_b) = (self.entries[a].day, self.entries[b].day);
        self.lift(a);
        self.lift(b);

        if let Err(reject) = self.check(self.entries[a].teams, day_b, min_rest) {
            self.settle(a, day_a);
            self.settle(b, day_b);
            return Err(reject);
        }
        self.settle(a, day_b);

        if let Err(reject) = self.check(self.entries[b].teams, day_a, min_rest) {
            self.lift(a);
            self.settle(a, day_a);
            self.settle(b, day_b);
            return Err(reject);
        }
        self.settle(b, day_a);
        Ok(())
    }

    /// Swap the days of two entries without checking any constraint.
    pub(crate) fn exchange(&mut self, a: EntryId, b: EntryId) {
        let (day_a, day_b) = (self.entries[a].day, self.entries[b].day);
        self.lift(a);
        self.lift(b);
        self.settle(a, day_b);
        self.settle(b, day_a);
    }

    /// Put every entry on the given day (indexed by entry id), numbering
    /// slots per day in entry order.
    pub(crate) fn reassign(&mut self, days: &[DayNumber]) {
        for id in 0..self.entries.len() {
            self.lift(id);
        }
        let mut next_slot: FxHashMap<DayNumber, usize> = FxHashMap::default();
        for (id, &day) in days.iter().enumerate().take(self.entries.len()) {
            let slot = next_slot.entry(day).or_insert(0);
            self.entries[id].day = day;
            self.entries[id].slot = *slot;
            *slot += 1;
            self.occupy(self.entries[id].teams, day);
        }
    }

    /// Take an entry off its teams' calendars and its day's count.
    ///
    /// The entry keeps its day and slot until [`settle`](Self::settle).
    pub(crate) fn lift(&mut self, id: EntryId) {
        let Entry { teams, day, .. } = self.entries[id];
        for team in teams {
            if let Some(calendar) = self.calendars.get_mut(&team) {
                if let Some(pos) = calendar.iter().position(|d| *d == day) {
                    calendar.remove(pos);
                }
            }
        }
        self.pool.decrement(day);
    }

    /// Put a lifted entry back, on its original day or a new one.
    ///
    /// Moving to a new day takes the lowest free slot there and compacts the
    /// slots left behind.
    pub(crate) fn settle(&mut self, id: EntryId, day: DayNumber) {
        let origin = self.entries[id].day;
        if day != origin {
            let slot = self.free_slot(day, Some(id));
            self.entries[id].day = day;
            self.entries[id].slot = slot;
            self.compact_slots(origin);
        }
        self.occupy(self.entries[id].teams, day);
    }

    fn occupy(&mut self, teams: [TeamKey; 2], day: DayNumber) {
        for team in teams {
            let calendar = self.calendars.entry(team).or_default();
            let pos = calendar.partition_point(|d| *d <= day);
            calendar.insert(pos, day);
        }
        self.pool.increment(day);
    }

    fn free_slot(&self, day: DayNumber, exclude: Option<EntryId>) -> usize {
        let mut taken: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(id, e)| e.day == day && Some(*id) != exclude)
            .map(|(_, e)| e.slot)
            .collect();
        taken.sort_unstable();
        taken.dedup();
        taken
            .iter()
            .enumerate()
            .find(|(expected, slot)| *expected != **slot)
            .map(|(expected, _)| expected)
            .unwrap_or(taken.len())
    }

    fn compact_slots(&mut self, day: DayNumber) {
        let mut on_day: Vec<EntryId> = (0..self.entries.len())
            .filter(|&id| self.entries[id].day == day)
            .collect();
        on_day.sort_by_key(|&id| self.entries[id].slot);
        for (slot, id) in on_day.into_iter().enumerate() {
            self.entries[id].slot = slot;
        }
    }
}
