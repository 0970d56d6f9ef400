use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

/// Keys accepted by [`GameState::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    InMyTeam,
    InDomination,
    SearchCount,
}

impl StateKey {
    pub fn name(&self) -> &'static str {
        match self {
            StateKey::InMyTeam => "in_myteam",
            StateKey::InDomination => "in_domination",
            StateKey::SearchCount => "search_count",
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StateKey {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_myteam" => Ok(StateKey::InMyTeam),
            "in_domination" => Ok(StateKey::InDomination),
            "search_count" => Ok(StateKey::SearchCount),
            other => Err(StateError::UnknownStateKey(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateValue {
    Flag(bool),
    Count(u32),
}

/// Diagnostics produced by rejected state writes. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("unknown state key: {0}")]
    UnknownStateKey(String),
    #[error("state key {key} expects a {expected} value")]
    TypeMismatch { key: StateKey, expected: &'static str },
}

/// Coarse navigation flags for one control-loop session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameState {
    in_myteam: bool,
    in_domination: bool,
    search_count: u32,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_myteam(&self) -> bool {
        self.in_myteam
    }

    pub fn in_domination(&self) -> bool {
        self.in_domination
    }

    pub fn search_count(&self) -> u32 {
        self.search_count
    }

    pub fn get(&self, key: StateKey) -> StateValue {
        match key {
            StateKey::InMyTeam => StateValue::Flag(self.in_myteam),
            StateKey::InDomination => StateValue::Flag(self.in_domination),
            StateKey::SearchCount => StateValue::Count(self.search_count),
        }
    }

    /// The single write path. A rejected write leaves every field untouched.
    pub fn set(&mut self, key: StateKey, value: StateValue) -> Result<(), StateError> {
        match (key, value) {
            (StateKey::InMyTeam, StateValue::Flag(v)) => self.in_myteam = v,
            (StateKey::InDomination, StateValue::Flag(v)) => self.in_domination = v,
            (StateKey::SearchCount, StateValue::Count(v)) => self.search_count = v,
            (StateKey::SearchCount, _) => {
                return Err(self.reject(StateError::TypeMismatch { key, expected: "count" }));
            }
            (_, _) => {
                return Err(self.reject(StateError::TypeMismatch { key, expected: "flag" }));
            }
        }
        Ok(())
    }

    /// Write by key name, as it would arrive from a config or a script.
    pub fn set_named(&mut self, name: &str, value: StateValue) -> Result<(), StateError> {
        match name.parse::<StateKey>() {
            Ok(key) => self.set(key, value),
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Bumps the search counter and returns the new value.
    pub fn increment_search(&mut self) -> u32 {
        let next = self.search_count.saturating_add(1);
        // Count into SearchCount is always accepted.
        let _ = self.set(StateKey::SearchCount, StateValue::Count(next));
        next
    }

    pub fn reset_search(&mut self) {
        let _ = self.set(StateKey::SearchCount, StateValue::Count(0));
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn reject(&self, err: StateError) -> StateError {
        warn!("ignored state write: {}", err);
        err
    }
}
