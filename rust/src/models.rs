//! Core data types for fixture scheduling.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::calendar::{DayNumber, SlotPolicy};

/// A team entered in the tournament.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Team {
    pub id: String,
    pub group: String,
}

impl Team {
    pub fn new(id: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group: group.into(),
        }
    }
}

/// An unscheduled pairing of two teams within one group.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fixture {
    pub team_a: String,
    pub team_b: String,
    pub group: String,
}

impl Fixture {
    pub fn new(
        team_a: impl Into<String>,
        team_b: impl Into<String>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            team_a: team_a.into(),
            team_b: team_b.into(),
            group: group.into(),
        }
    }

    pub fn involves(&self, team: &str) -> bool {
        self.team_a == team || self.team_b == team
    }

    /// Order-independent identity of the pairing.
    pub fn pair_key(&self) -> (String, String, String) {
        let (lo, hi) = if self.team_a <= self.team_b {
            (&self.team_a, &self.team_b)
        } else {
            (&self.team_b, &self.team_a)
        };
        (self.group.clone(), lo.clone(), hi.clone())
    }
}

/// Final score recorded by the results subsystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub score_a: u32,
    pub score_b: u32,
}

/// How a match obtained its date.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Placement {
    /// All hard constraints held when the match was placed.
    #[default]
    Regular,
    /// No date satisfied the hard constraints; the match was appended to the
    /// last pool date regardless of capacity.
    Relaxed,
}

/// A fixture bound to a calendar day and a time slot index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledMatch {
    pub id: String,
    pub fixture: Fixture,
    pub day: DayNumber,
    /// Index into the slot list that applies to `day`.
    pub slot: usize,
    pub placement: Placement,
    pub result: Option<MatchResult>,
}

impl ScheduledMatch {
    pub fn new(id: impl Into<String>, fixture: Fixture, date: NaiveDate, slot: usize) -> Self {
        Self {
            id: id.into(),
            fixture,
            day: DayNumber::from_date(date),
            slot,
            placement: Placement::Regular,
            result: None,
        }
    }

    pub fn with_result(mut self, result: MatchResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.day.to_date()
    }

    /// Matches with a recorded result are never relocated.
    pub fn is_frozen(&self) -> bool {
        self.result.is_some()
    }

    pub fn is_relaxed(&self) -> bool {
        self.placement == Placement::Relaxed
    }

    pub fn involves(&self, team: &str) -> bool {
        self.fixture.involves(team)
    }
}

/// Errors converting exchange records into a schedule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Invalid time {0:?}, expected HH:MM")]
    InvalidTime(String),
    #[error("Match {id}: time {time} is not a slot on {date}")]
    UnknownTimeSlot {
        id: String,
        date: String,
        time: String,
    },
}

/// Persisted/exchanged shape of a scheduled match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: String,
    pub team_a_id: String,
    pub team_b_id: String,
    pub group_id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchResult>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub relaxed: bool,
}

/// An ordered collection of scheduled matches for one tournament.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    /// Opening day of the tournament (uses the opening-day slot list).
    pub start: DayNumber,
    pub matches: Vec<ScheduledMatch>,
}

impl Schedule {
    pub fn new(start_date: NaiveDate, matches: Vec<ScheduledMatch>) -> Self {
        Self {
            start: DayNumber::from_date(start_date),
            matches,
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.to_date()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Sorted match days of one team.
    pub fn team_calendar(&self, team: &str) -> Vec<DayNumber> {
        let mut days: Vec<DayNumber> = self
            .matches
            .iter()
            .filter(|m| m.involves(team))
            .map(|m| m.day)
            .collect();
        days.sort_unstable();
        days
    }

    /// Number of matches per day, for days holding at least one match.
    pub fn day_counts(&self) -> BTreeMap<DayNumber, usize> {
        let mut counts = BTreeMap::new();
        for m in &self.matches {
            *counts.entry(m.day).or_insert(0) += 1;
        }
        counts
    }

    pub fn first_day(&self) -> Option<DayNumber> {
        self.matches.iter().map(|m| m.day).min()
    }

    pub fn last_day(&self) -> Option<DayNumber> {
        self.matches.iter().map(|m| m.day).max()
    }

    /// Matches placed under relaxed constraints.
    pub fn relaxed_matches(&self) -> impl Iterator<Item = &ScheduledMatch> {
        self.matches.iter().filter(|m| m.is_relaxed())
    }

    pub fn find(&self, id: &str) -> Option<&ScheduledMatch> {
        self.matches.iter().find(|m| m.id == id)
    }

    /// Sort matches by day, then slot.
    pub fn sort_chronologically(&mut self) {
        self.matches.sort_by(|a, b| a.day.cmp(&b.day).then(a.slot.cmp(&b.slot)));
    }

    /// Export to exchange records.
    ///
    /// A slot outside the day's list (only possible for relaxed placements)
    /// is reported at the day's final time.
    pub fn to_records(&self, policy: &SlotPolicy) -> Vec<MatchRecord> {
        self.matches
            .iter()
            .map(|m| {
                let slots = policy.slots(m.day, self.start);
                let time = slots
                    .get(m.slot)
                    .or_else(|| slots.last())
                    .map(|t| t.format("%H:%M").to_string())
                    .unwrap_or_default();
                MatchRecord {
                    id: m.id.clone(),
                    team_a_id: m.fixture.team_a.clone(),
                    team_b_id: m.fixture.team_b.clone(),
                    group_id: m.fixture.group.clone(),
                    date: m.day.to_string(),
                    time,
                    result: m.result,
                    relaxed: m.is_relaxed(),
                }
            })
            .collect()
    }

    /// Import exchange records, resolving each time against the slot list of
    /// its date.
    pub fn from_records(
        start_date: NaiveDate,
        records: &[MatchRecord],
        policy: &SlotPolicy,
    ) -> Result<Self, RecordError> {
        let start = DayNumber::from_date(start_date);
        let mut matches = Vec::with_capacity(records.len());

        for record in records {
            let date = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d")
                .map_err(|_| RecordError::InvalidDate(record.date.clone()))?;
            let time = NaiveTime::parse_from_str(&record.time, "%H:%M")
                .map_err(|_| RecordError::InvalidTime(record.time.clone()))?;
            let day = DayNumber::from_date(date);
            let slot =
                policy
                    .slot_of(day, start, time)
                    .ok_or_else(|| RecordError::UnknownTimeSlot {
                        id: record.id.clone(),
                        date: record.date.clone(),
                        time: record.time.clone(),
                    })?;

            matches.push(ScheduledMatch {
                id: record.id.clone(),
                fixture: Fixture::new(
                    record.team_a_id.clone(),
                    record.team_b_id.clone(),
                    record.group_id.clone(),
                ),
                day,
                slot,
                placement: if record.relaxed {
                    Placement::Relaxed
                } else {
                    Placement::Regular
                },
                result: record.result,
            });
        }

        Ok(Self { start, matches })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn sample() -> Schedule {
        Schedule::new(
            d(2025, 6, 1),
            vec![
                ScheduledMatch::new("M001", Fixture::new("A", "B", "G1"), d(2025, 6, 1), 0),
                ScheduledMatch::new("M002", Fixture::new("C", "A", "G1"), d(2025, 6, 5), 2),
                ScheduledMatch::new("M003", Fixture::new("B", "C", "G1"), d(2025, 6, 5), 1)
                    .with_result(MatchResult {
                        score_a: 2,
                        score_b: 1,
                    }),
            ],
        )
    }

    #[test]
    fn test_pair_key_is_order_independent() {
        let ab = Fixture::new("A", "B", "G1");
        let ba = Fixture::new("B", "A", "G1");
        assert_eq!(ab.pair_key(), ba.pair_key());
        assert_ne!(ab.pair_key(), Fixture::new("A", "B", "G2").pair_key());
    }

    #[test]
    fn test_derived_views() {
        let schedule = sample();
        assert_eq!(
            schedule.team_calendar("A"),
            vec![
                DayNumber::from_date(d(2025, 6, 1)),
                DayNumber::from_date(d(2025, 6, 5))
            ]
        );
        let counts = schedule.day_counts();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&DayNumber::from_date(d(2025, 6, 5))], 2);
        assert!(schedule.find("M003").unwrap().is_frozen());
        assert_eq!(schedule.relaxed_matches().count(), 0);
    }

    #[test]
    fn test_records_resolve_times_per_day() {
        let policy = SlotPolicy::default();
        let records = sample().to_records(&policy);
        assert_eq!(records[0].date, "2025-06-01");
        // Opening day slot 0 is the first opening-day time
        assert_eq!(records[0].time, "17:00");
        assert_eq!(records[1].time, "20:00");
        assert_eq!(records[2].time, "17:00");

        let restored = Schedule::from_records(d(2025, 6, 1), &records, &policy).unwrap();
        assert_eq!(restored, sample());
    }

    #[test]
    fn test_record_json_shape() {
        let records = sample().to_records(&SlotPolicy::default());
        let json = serde_json::to_value(&records[2]).unwrap();
        assert_eq!(json["teamAId"], "B");
        assert_eq!(json["groupId"], "G1");
        assert_eq!(json["date"], "2025-06-05");
        assert_eq!(json["result"]["score_a"], 2);
        assert!(json.get("relaxed").is_none());

        let plain = serde_json::to_value(&records[0]).unwrap();
        assert!(plain.get("result").is_none());
    }

    #[test]
    fn test_from_records_rejects_bad_input() {
        let policy = SlotPolicy::default();
        let mut record = sample().to_records(&policy).remove(0);

        record.date = "2025/06/01".to_string();
        let err = Schedule::from_records(d(2025, 6, 1), &[record.clone()], &policy).unwrap_err();
        assert!(matches!(err, RecordError::InvalidDate(_)));

        record.date = "2025-06-01".to_string();
        record.time = "5pm".to_string();
        let err = Schedule::from_records(d(2025, 6, 1), &[record.clone()], &policy).unwrap_err();
        assert!(matches!(err, RecordError::InvalidTime(_)));

        // 14:00 is a regular slot but not an opening-day slot
        record.time = "14:00".to_string();
        let err = Schedule::from_records(d(2025, 6, 1), &[record], &policy).unwrap_err();
        assert!(matches!(err, RecordError::UnknownTimeSlot { .. }));
    }
}
