//! Team id interning.
//!
//! The scheduling context keys every per-team calendar by a compact integer
//! instead of the caller's string id. Keys are handed out in order of first
//! appearance, so interning fixtures in roster order gives roster-ordered keys.

use rustc_hash::FxHashMap;

use crate::models::Fixture;

/// Interned team id.
pub type TeamKey = u32;

#[derive(Debug, Clone, Default)]
pub struct TeamInterner {
    keys: FxHashMap<String, TeamKey>,
    names: Vec<String>,
}

impl TeamInterner {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            names: Vec::with_capacity(capacity),
        }
    }

    pub fn intern(&mut self, team: &str) -> TeamKey {
        match self.keys.get(team) {
            Some(&key) => key,
            None => {
                let key = self.names.len() as TeamKey;
                self.keys.insert(team.to_owned(), key);
                self.names.push(team.to_owned());
                key
            }
        }
    }

    /// Keys for both sides of a fixture, `team_a` first.
    pub fn intern_fixture(&mut self, fixture: &Fixture) -> [TeamKey; 2] {
        [self.intern(&fixture.team_a), self.intern(&fixture.team_b)]
    }

    #[inline]
    pub fn get(&self, team: &str) -> Option<TeamKey> {
        self.keys.get(team).copied()
    }

    /// Team id for a key; unknown keys render as `?`.
    #[inline]
    pub fn name(&self, key: TeamKey) -> &str {
        self.names.get(key as usize).map_or("?", String::as_str)
    }

    /// `"A vs B"` label for an interned pairing.
    pub fn pairing(&self, pair: [TeamKey; 2]) -> String {
        format!("{} vs {}", self.name(pair[0]), self.name(pair[1]))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
