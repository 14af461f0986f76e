//! Round-robin fixture generation and roster checks.

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::models::{Fixture, Team};

/// Roster or fixture contract violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FixtureError {
    #[error("Team id must not be empty")]
    EmptyTeamId,
    #[error("Team {0} is listed more than once")]
    DuplicateTeam(String),
    #[error("Fixture references unknown team {0}")]
    UnknownTeam(String),
    #[error("Team {0} cannot be paired with itself")]
    SelfPairing(String),
    #[error("Teams {team_a} and {team_b} are not both in group {group}")]
    CrossGroup {
        team_a: String,
        team_b: String,
        group: String,
    },
}

/// Expand every group into its full round-robin set of pairings.
///
/// Groups are processed in order of first appearance and teams in roster
/// order, so the output is deterministic. Empty and single-team groups
/// produce no fixtures.
pub fn generate_fixtures(teams: &[Team]) -> Result<Vec<Fixture>, FixtureError> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut group_order: Vec<&str> = Vec::new();
    let mut members: FxHashMap<&str, Vec<&str>> = FxHashMap::default();

    for team in teams {
        if team.id.is_empty() {
            return Err(FixtureError::EmptyTeamId);
        }
        if !seen.insert(team.id.as_str()) {
            return Err(FixtureError::DuplicateTeam(team.id.clone()));
        }
        members
            .entry(team.group.as_str())
            .or_insert_with(|| {
                group_order.push(team.group.as_str());
                Vec::new()
            })
            .push(team.id.as_str());
    }

    let mut fixtures = Vec::new();
    for group in group_order {
        let roster = &members[group];
        for (i, team_a) in roster.iter().enumerate() {
            for team_b in &roster[i + 1..] {
                fixtures.push(Fixture::new(*team_a, *team_b, group));
            }
        }
    }

    Ok(fixtures)
}

/// Reject fixtures that do not fit the roster.
pub fn check_fixtures(fixtures: &[Fixture], teams: &[Team]) -> Result<(), FixtureError> {
    let groups: FxHashMap<&str, &str> = teams
        .iter()
        .map(|t| (t.id.as_str(), t.group.as_str()))
        .collect();

    for fixture in fixtures {
        if fixture.team_a == fixture.team_b {
            return Err(FixtureError::SelfPairing(fixture.team_a.clone()));
        }
        for team in [&fixture.team_a, &fixture.team_b] {
            match groups.get(team.as_str()) {
                None => return Err(FixtureError::UnknownTeam(team.clone())),
                Some(group) if *group != fixture.group => {
                    return Err(FixtureError::CrossGroup {
                        team_a: fixture.team_a.clone(),
                        team_b: fixture.team_b.clone(),
                        group: fixture.group.clone(),
                    })
                }
                Some(_) => {}
            }
        }
    }

    Ok(())
}
