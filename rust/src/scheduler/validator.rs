//! Schedule validation.
//!
//! Every check runs independently and all violations are collected; nothing
//! short-circuits and nothing is raised as an error.

use std::collections::BTreeMap;

use crate::calendar::{DayNumber, SlotPolicy};
use crate::models::{Schedule, ScheduledMatch};

/// Categories of schedule violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// A team has more than one match on a day.
    DoubleBooking,
    /// A team plays on two consecutive days.
    Adjacency,
    /// A day's match count differs from its capacity.
    DayCapacity,
    /// A match uses a slot its day does not offer.
    SlotLegality,
}

/// A single violation with a human-readable description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Verdict of a validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.message.clone()).collect()
    }

    pub fn count(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }

    pub fn has(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    /// Whether any team-level conflict (double booking or adjacency) exists.
    pub fn has_team_conflicts(&self) -> bool {
        self.has(ViolationKind::DoubleBooking) || self.has(ViolationKind::Adjacency)
    }
}

/// Check a schedule against every hard constraint.
pub fn validate(schedule: &Schedule, policy: &SlotPolicy) -> ValidationReport {
    let mut violations = Vec::new();
    check_team_days(schedule, &mut violations);
    check_day_capacity(schedule, policy, &mut violations);
    check_slots(schedule, policy, &mut violations);
    ValidationReport { violations }
}

fn check_team_days(schedule: &Schedule, violations: &mut Vec<Violation>) {
    let mut by_team: BTreeMap<&str, BTreeMap<DayNumber, Vec<&ScheduledMatch>>> = BTreeMap::new();
    for m in &schedule.matches {
        for team in [m.fixture.team_a.as_str(), m.fixture.team_b.as_str()] {
            by_team
                .entry(team)
                .or_default()
                .entry(m.day)
                .or_default()
                .push(m);
        }
    }

    for (team, days) in &by_team {
        for (day, matches) in days {
            if matches.len() > 1 {
                let pairings: Vec<String> = matches
                    .iter()
                    .map(|m| format!("{} vs {}", m.fixture.team_a, m.fixture.team_b))
                    .collect();
                violations.push(Violation::new(
                    ViolationKind::DoubleBooking,
                    format!(
                        "Team {} is double-booked on {}: {}",
                        team,
                        day,
                        pairings.join(", ")
                    ),
                ));
            }
        }

        let ordered: Vec<DayNumber> = days.keys().copied().collect();
        for w in ordered.windows(2) {
            if w[0].is_adjacent_to(w[1]) {
                violations.push(Violation::new(
                    ViolationKind::Adjacency,
                    format!(
                        "Team {} plays on consecutive days {} and {}",
                        team, w[0], w[1]
                    ),
                ));
            }
        }
    }
}

fn check_day_capacity(schedule: &Schedule, policy: &SlotPolicy, violations: &mut Vec<Violation>) {
    let counts = schedule.day_counts();
    for (day, count, expected) in capacity_mismatches(&counts, schedule.start, policy) {
        let label = if day == schedule.start {
            " (opening day)"
        } else {
            ""
        };
        violations.push(Violation::new(
            ViolationKind::DayCapacity,
            format!(
                "{}{} has {} matches, expected {}",
                day, label, count, expected
            ),
        ));
    }
}

/// Used days whose match count differs from their capacity, as
/// `(day, count, expected)`.
///
/// A short final day is legitimate when the matches cannot pack evenly.
pub(crate) fn capacity_mismatches(
    counts: &BTreeMap<DayNumber, usize>,
    opening: DayNumber,
    policy: &SlotPolicy,
) -> Vec<(DayNumber, usize, usize)> {
    let Some(&last) = counts.keys().next_back() else {
        return Vec::new();
    };

    let total: usize = counts.values().sum();
    let packed = if counts.contains_key(&opening) {
        total.saturating_sub(policy.capacity(opening, opening))
    } else {
        total
    };
    let short_last_day = packed
        .checked_rem(policy.regular_capacity())
        .is_some_and(|rem| rem != 0);

    counts
        .iter()
        .filter_map(|(&day, &count)| {
            let expected = policy.capacity(day, opening);
            let excused = short_last_day && day == last && count < expected;
            (!excused && count != expected).then_some((day, count, expected))
        })
        .collect()
}

fn check_slots(schedule: &Schedule, policy: &SlotPolicy, violations: &mut Vec<Violation>) {
    for m in &schedule.matches {
        let slots = policy.slots(m.day, schedule.start);
        if m.slot < slots.len() {
            continue;
        }
        let message = if m.day == schedule.start {
            let offered: Vec<String> = slots
                .iter()
                .map(|t| t.format("%H:%M").to_string())
                .collect();
            format!(
                "Match {} on opening day {} uses slot {}, outside the opening-day slots ({})",
                m.id,
                m.day,
                m.slot + 1,
                offered.join(", ")
            )
        } else {
            format!(
                "Match {} on {} uses slot {}, but the day has only {} slots",
                m.id,
                m.day,
                m.slot + 1,
                slots.len()
            )
        };
        violations.push(Violation::new(ViolationKind::SlotLegality, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Fixture;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn m(id: &str, a: &str, b: &str, day: u32, slot: usize) -> ScheduledMatch {
        ScheduledMatch::new(id, Fixture::new(a, b, "G"), d(day), slot)
    }

    /// Opening day full (2), then a full regular day (3).
    fn valid() -> Schedule {
        Schedule::new(
            d(1),
            vec![
                m("M1", "A", "B", 1, 0),
                m("M2", "C", "D", 1, 1),
                m("M3", "A", "C", 5, 0),
                m("M4", "E", "F", 5, 1),
                m("M5", "B", "D", 5, 2),
            ],
        )
    }

    #[test]
    fn test_valid_schedule_has_no_messages() {
        let report = validate(&valid(), &SlotPolicy::default());
        assert!(report.is_valid(), "{:?}", report.messages());
        assert!(report.messages().is_empty());
    }

    #[test]
    fn test_double_booking_names_teams() {
        let mut schedule = valid();
        schedule.matches[3] = m("M4", "E", "A", 5, 1);
        let report = validate(&schedule, &SlotPolicy::default());

        assert!(!report.is_valid());
        assert_eq!(report.count(ViolationKind::DoubleBooking), 1);
        let message = &report.messages()[0];
        assert!(message.contains("Team A"));
        assert!(message.contains("A vs C"));
        assert!(message.contains("E vs A"));
        assert!(message.contains("2025-06-05"));
    }

    #[test]
    fn test_single_adjacency_is_reported_once() {
        let mut schedule = valid();
        schedule.matches.push(m("M6", "E", "X", 6, 0));
        let report = validate(&schedule, &SlotPolicy::default());

        assert_eq!(report.count(ViolationKind::Adjacency), 1);
        let adjacency = report
            .violations
            .iter()
            .find(|v| v.kind == ViolationKind::Adjacency)
            .unwrap();
        assert!(adjacency.message.contains("Team E"));
        assert!(adjacency.message.contains("2025-06-05 and 2025-06-06"));
    }

    #[test]
    fn test_short_last_day_is_allowed_only_when_uneven() {
        // 2 + 3 + 1: the last day cannot be full
        let mut schedule = valid();
        schedule.matches.push(m("M6", "A", "F", 10, 0));
        let report = validate(&schedule, &SlotPolicy::default());
        assert!(report.is_valid(), "{:?}", report.messages());

        // 2 + 2 + 1 = 5 packs evenly, so both short days are flagged
        schedule.matches.remove(4);
        let report = validate(&schedule, &SlotPolicy::default());
        assert_eq!(report.count(ViolationKind::DayCapacity), 2);
    }

    #[test]
    fn test_opening_day_capacity_and_slots() {
        let schedule = Schedule::new(
            d(1),
            vec![
                m("M1", "A", "B", 1, 0),
                m("M2", "C", "D", 1, 1),
                m("M3", "E", "F", 1, 2),
            ],
        );
        let report = validate(&schedule, &SlotPolicy::default());

        assert_eq!(report.count(ViolationKind::SlotLegality), 1);
        let slot = report
            .violations
            .iter()
            .find(|v| v.kind == ViolationKind::SlotLegality)
            .unwrap();
        assert!(slot.message.contains("opening day"));
        assert!(slot.message.contains("17:00, 20:00"));
        // Uneven total, but only a short last day is excused
        assert_eq!(report.count(ViolationKind::DayCapacity), 1);
    }

    #[test]
    fn test_all_checks_run_together() {
        let schedule = Schedule::new(
            d(1),
            vec![
                m("M1", "A", "B", 3, 0),
                m("M2", "A", "C", 3, 5),
                m("M3", "B", "D", 4, 0),
                m("M4", "E", "F", 9, 0),
            ],
        );
        let report = validate(&schedule, &SlotPolicy::default());
        assert!(report.has(ViolationKind::DoubleBooking));
        assert!(report.has(ViolationKind::Adjacency));
        assert!(report.has(ViolationKind::DayCapacity));
        assert!(report.has(ViolationKind::SlotLegality));
        assert!(report.has_team_conflicts());
    }
}
