//! Scoring functions for candidate days. Higher score = better day.
//!
//! Kept free of any search state so the heuristic can be tested on its own.

use crate::calendar::DayNumber;
use crate::config::ScoringWeights;

use super::context::nearest_before;

/// Facts about one candidate day for a fresh placement.
#[derive(Clone, Copy, Debug)]
pub struct PlacementCandidate<'a> {
    pub day: DayNumber,
    /// Position of `day` in the date pool (0 = first pool day)
    pub pool_position: usize,
    pub pool_len: usize,
    /// Matches already on `day`
    pub day_count: usize,
    /// Sorted match days of both teams
    pub calendars: [&'a [DayNumber]; 2],
}

/// Facts about one candidate day for moving an already-placed match.
#[derive(Clone, Copy, Debug)]
pub struct RelocationCandidate<'a> {
    pub day: DayNumber,
    pub original: DayNumber,
    pub day_count: usize,
    /// Sorted match days of both teams, without the match being moved
    pub calendars: [&'a [DayNumber]; 2],
}

/// Days since the team's previous match, capped; a fixed bonus if none.
pub fn rest_bonus(calendar: &[DayNumber], day: DayNumber, weights: &ScoringWeights) -> f64 {
    match nearest_before(calendar, day) {
        Some(prev) => prev.days_until(day).min(weights.rest_bonus_cap) as f64,
        None => weights.first_match_bonus,
    }
}

/// Penalty for how far the team's rest gaps stray from the ideal once `day`
/// is inserted into its calendar.
pub fn rest_distribution_penalty(
    calendar: &[DayNumber],
    day: DayNumber,
    weights: &ScoringWeights,
) -> f64 {
    let mut days = Vec::with_capacity(calendar.len() + 1);
    days.extend_from_slice(calendar);
    let pos = days.partition_point(|d| *d <= day);
    days.insert(pos, day);

    let deviation: i64 = days
        .windows(2)
        .map(|w| (w[0].rest_days_to(w[1]) - weights.ideal_rest_days).abs())
        .sum();
    deviation as f64 * weights.rest_penalty_multiplier
}

fn day_fill_bonus(day_count: usize, weights: &ScoringWeights) -> f64 {
    if day_count > 0 {
        weights.day_fill_bonus
    } else {
        0.0
    }
}

/// Score a candidate day for a new placement.
///
/// Sum of per-team rest bonus, day-fill bonus and earliness bias, minus the
/// per-team rest-distribution penalty.
pub fn score_placement(candidate: &PlacementCandidate<'_>, weights: &ScoringWeights) -> f64 {
    let remaining = candidate.pool_len.saturating_sub(candidate.pool_position);
    let mut score = day_fill_bonus(candidate.day_count, weights)
        + weights.earliness_weight * remaining as f64;
    for calendar in candidate.calendars {
        score += rest_bonus(calendar, candidate.day, weights);
        score -= rest_distribution_penalty(calendar, candidate.day, weights);
    }
    score
}

/// Score a candidate day for a relocation: stay close to the original day,
/// prefer days already in use, keep rest gaps near the ideal.
pub fn score_relocation(candidate: &RelocationCandidate<'_>, weights: &ScoringWeights) -> f64 {
    let distance = candidate.original.days_until(candidate.day).abs() as f64;
    let mut score =
        day_fill_bonus(candidate.day_count, weights) - weights.closeness_weight * distance;
    for calendar in candidate.calendars {
        score -= rest_distribution_penalty(calendar, candidate.day, weights);
    }
    score
}
