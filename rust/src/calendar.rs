//! Calendar primitives: whole-day ordinals, the day-capacity policy and the
//! pool of candidate match dates.
//!
//! All date arithmetic inside the engine works on [`DayNumber`]; conversion to
//! and from `NaiveDate` only happens at the exchange boundary.

use chrono::{Datelike, NaiveDate, NaiveTime};
use std::fmt;

/// A calendar day expressed as an ordinal (days since 0001-01-01 CE).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayNumber(i64);

impl DayNumber {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.num_days_from_ce() as i64)
    }

    /// Convert back to a calendar date. Saturates at the chrono range limits.
    pub fn to_date(self) -> NaiveDate {
        i32::try_from(self.0)
            .ok()
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .unwrap_or(if self.0 < 0 {
                NaiveDate::MIN
            } else {
                NaiveDate::MAX
            })
    }

    #[inline]
    pub fn ordinal(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn offset(self, days: i64) -> Self {
        Self(self.0 + days)
    }

    /// Signed number of days from `self` to `other`.
    #[inline]
    pub fn days_until(self, other: Self) -> i64 {
        other.0 - self.0
    }

    /// Rest days between two match days (0 for adjacent days).
    #[inline]
    pub fn rest_days_to(self, other: Self) -> i64 {
        (other.0 - self.0).abs() - 1
    }

    #[inline]
    pub fn is_adjacent_to(self, other: Self) -> bool {
        (other.0 - self.0).abs() == 1
    }
}

impl From<NaiveDate> for DayNumber {
    fn from(date: NaiveDate) -> Self {
        Self::from_date(date)
    }
}

impl fmt::Display for DayNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_date().format("%Y-%m-%d"))
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Time slots available on a match day.
///
/// The opening day of the tournament uses its own, shorter list. A day's
/// capacity is the length of its applicable list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotPolicy {
    pub regular: Vec<NaiveTime>,
    pub opening_day: Vec<NaiveTime>,
}

impl Default for SlotPolicy {
    fn default() -> Self {
        Self {
            regular: vec![hm(14, 0), hm(17, 0), hm(20, 0)],
            opening_day: vec![hm(17, 0), hm(20, 0)],
        }
    }
}

impl SlotPolicy {
    pub fn slots(&self, day: DayNumber, opening: DayNumber) -> &[NaiveTime] {
        if day == opening {
            &self.opening_day
        } else {
            &self.regular
        }
    }

    #[inline]
    pub fn capacity(&self, day: DayNumber, opening: DayNumber) -> usize {
        self.slots(day, opening).len()
    }

    #[inline]
    pub fn regular_capacity(&self) -> usize {
        self.regular.len()
    }

    pub fn time_of(&self, day: DayNumber, opening: DayNumber, slot: usize) -> Option<NaiveTime> {
        self.slots(day, opening).get(slot).copied()
    }

    pub fn slot_of(&self, day: DayNumber, opening: DayNumber, time: NaiveTime) -> Option<usize> {
        self.slots(day, opening).iter().position(|t| *t == time)
    }
}

/// Ordered run of consecutive candidate days with their assigned-match counts.
///
/// Extends on demand; counts for newly added days start at zero.
#[derive(Clone, Debug)]
pub struct DatePool {
    first: DayNumber,
    counts: Vec<usize>,
}

impl DatePool {
    pub fn new(first: DayNumber, days: usize) -> Self {
        Self {
            first,
            counts: vec![0; days.max(1)],
        }
    }

    #[inline]
    pub fn first_day(&self) -> DayNumber {
        self.first
    }

    #[inline]
    pub fn last_day(&self) -> DayNumber {
        self.first.offset(self.counts.len() as i64 - 1)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn days(&self) -> impl Iterator<Item = DayNumber> + '_ {
        (0..self.counts.len()).map(move |i| self.first.offset(i as i64))
    }

    pub fn index_of(&self, day: DayNumber) -> Option<usize> {
        let idx = self.first.days_until(day);
        if idx >= 0 && (idx as usize) < self.counts.len() {
            Some(idx as usize)
        } else {
            None
        }
    }

    pub fn contains(&self, day: DayNumber) -> bool {
        self.index_of(day).is_some()
    }

    /// Matches currently assigned to `day` (0 outside the pool).
    pub fn count(&self, day: DayNumber) -> usize {
        self.index_of(day).map(|i| self.counts[i]).unwrap_or(0)
    }

    /// Append `days` further consecutive days.
    pub fn extend(&mut self, days: usize) {
        self.counts.resize(self.counts.len() + days, 0);
    }

    /// Grow the pool in either direction until it covers `day`.
    pub fn ensure_contains(&mut self, day: DayNumber) {
        if day < self.first {
            let missing = day.days_until(self.first) as usize;
            let mut counts = vec![0; missing];
            counts.append(&mut self.counts);
            self.counts = counts;
            self.first = day;
        } else if day > self.last_day() {
            let missing = self.last_day().days_until(day) as usize;
            self.extend(missing);
        }
    }

    pub(crate) fn increment(&mut self, day: DayNumber) {
        self.ensure_contains(day);
        if let Some(i) = self.index_of(day) {
            self.counts[i] += 1;
        }
    }

    pub(crate) fn decrement(&mut self, day: DayNumber) {
        if let Some(i) = self.index_of(day) {
            self.counts[i] = self.counts[i].saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_day_number_round_trips_across_month_end() {
        let day = DayNumber::from_date(d(2024, 2, 28));
        assert_eq!(day.offset(1).to_date(), d(2024, 2, 29));
        assert_eq!(day.offset(2).to_date(), d(2024, 3, 1));
        assert_eq!(day.offset(2).to_string(), "2024-03-01");
    }

    #[test]
    fn test_rest_and_adjacency() {
        let a = DayNumber::from_date(d(2025, 6, 1));
        let b = DayNumber::from_date(d(2025, 6, 2));
        let c = DayNumber::from_date(d(2025, 6, 5));
        assert!(a.is_adjacent_to(b));
        assert!(b.is_adjacent_to(a));
        assert_eq!(a.rest_days_to(b), 0);
        assert_eq!(a.rest_days_to(c), 3);
        assert_eq!(c.rest_days_to(a), 3);
    }

    #[test]
    fn test_opening_day_capacity() {
        let policy = SlotPolicy::default();
        let opening = DayNumber::from_date(d(2025, 6, 1));
        assert_eq!(policy.capacity(opening, opening), 2);
        assert_eq!(policy.capacity(opening.offset(1), opening), 3);
        assert_eq!(policy.time_of(opening, opening, 0), Some(hm(17, 0)));
        assert_eq!(policy.time_of(opening, opening, 2), None);
        assert_eq!(policy.slot_of(opening.offset(3), opening, hm(14, 0)), Some(0));
        assert_eq!(policy.slot_of(opening, opening, hm(14, 0)), None);
    }

    #[test]
    fn test_pool_extension_keeps_counts() {
        let start = DayNumber::from_date(d(2025, 6, 1));
        let mut pool = DatePool::new(start, 3);
        pool.increment(start.offset(1));
        pool.extend(10);
        assert_eq!(pool.len(), 13);
        assert_eq!(pool.count(start.offset(1)), 1);
        assert_eq!(pool.count(start.offset(12)), 0);
        assert_eq!(pool.last_day(), start.offset(12));
        assert_eq!(pool.days().count(), 13);
    }

    #[test]
    fn test_pool_grows_backwards_on_demand() {
        let start = DayNumber::from_date(d(2025, 6, 10));
        let mut pool = DatePool::new(start, 2);
        pool.increment(start);
        pool.increment(start.offset(-3));
        assert_eq!(pool.first_day(), start.offset(-3));
        assert_eq!(pool.count(start), 1);
        assert_eq!(pool.count(start.offset(-3)), 1);
        pool.decrement(start);
        assert_eq!(pool.count(start), 0);
    }
}
