//! Detection results
//!
//! A [`MatchResult`] is produced fresh by every scoring call and never
//! mutated afterwards. [`Detection`] wraps it with the capture outcome so
//! "nothing on screen" and "could not look" stay distinguishable.

use crate::template::MatchingMethod;
use serde::Serialize;
use std::fmt;

/// Top-left corner of a match, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub x: u32,
    pub y: u32,
}

impl Location {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl From<(u32, u32)> for Location {
    fn from((x, y): (u32, u32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Fused outcome of scoring one reference against one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub found: bool,
    /// Winning similarity, higher is better
    pub score: f64,
    /// Set only when `found`
    pub location: Option<Location>,
    /// Method that produced `score`
    pub method: Option<MatchingMethod>,
    /// Size of the reference as it was matched (after scale correction)
    pub template_size: (u32, u32),
}

impl MatchResult {
    /// Result for a frame that could not be scored at all.
    pub fn not_found() -> Self {
        Self {
            found: false,
            score: 0.0,
            location: None,
            method: None,
            template_size: (0, 0),
        }
    }
}

/// What a detection call observed
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Hit(MatchResult),
    Miss(MatchResult),
    /// Capture failed or the label is unknown; treated as a miss by callers
    Unavailable(String),
}

impl Detection {
    pub fn from_result(result: MatchResult) -> Self {
        if result.found {
            Detection::Hit(result)
        } else {
            Detection::Miss(result)
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Detection::Hit(_))
    }

    pub fn result(&self) -> Option<&MatchResult> {
        match self {
            Detection::Hit(r) | Detection::Miss(r) => Some(r),
            Detection::Unavailable(_) => None,
        }
    }

    pub fn score(&self) -> Option<f64> {
        self.result().map(|r| r.score)
    }
}
