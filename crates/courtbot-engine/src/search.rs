//! Bounded three-star carousel search and the match sequence it launches

use crate::session::Session;
use courtbot_core::{Key, StateKey};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Labels and policy for the carousel search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Marker variants; any one of them counts as found
    pub markers: Vec<String>,
    pub marker_threshold: f64,
    /// Confirmation screen checked before the search starts
    pub select_label: String,
    pub select_threshold: f64,
    /// Failed attempts allowed on one item before escalating
    pub retry_budget: u32,
    /// Steps per vertical probe direction
    pub probe_steps: u32,
    pub advance_label: String,
    pub pause_label: String,
    pub resume_label: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            markers: vec!["stars".to_string(), "stars2".to_string()],
            marker_threshold: 0.99,
            select_label: "select".to_string(),
            select_threshold: 1.0,
            retry_budget: 2,
            probe_steps: 5,
            advance_label: "forward".to_string(),
            pause_label: "pause".to_string(),
            resume_label: "continue".to_string(),
        }
    }
}

impl SearchConfig {
    /// Every label the search may ask the detector about
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.markers.iter().map(String::as_str).collect();
        labels.extend([
            self.select_label.as_str(),
            self.advance_label.as_str(),
            self.pause_label.as_str(),
            self.resume_label.as_str(),
        ]);
        labels
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// Carousel scan at the current item
    Scanning,
    /// Retry budget spent; move on to the next item
    Escalating,
    /// Marker found; a match is being played
    PostMatch { prologue_done: bool },
    Stopped,
}

/// Counters for one `run`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchReport {
    pub iterations: u32,
    pub escalations: u32,
    pub marker_hits: u32,
    pub games_started: u32,
    pub cues_handled: u32,
}

pub struct ThreeStarSearch {
    config: SearchConfig,
}

impl ThreeStarSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Scan the carousel until the session stops.
    ///
    /// Finding a marker plays the match sequence, and a marker seen while
    /// playing goes back to scanning. Both are phases of one loop, so the
    /// search never nests.
    pub fn run(&self, session: &mut Session) -> SearchReport {
        let mut report = SearchReport::default();
        let mut phase = SearchPhase::Scanning;
        session.state_mut().reset_search();
        info!("=== Three-star search started ===");

        loop {
            if !session.is_running() {
                phase = SearchPhase::Stopped;
            }

            phase = match phase {
                SearchPhase::Scanning => {
                    report.iterations += 1;
                    let attempt = session.state_mut().increment_search();
                    debug!("Search attempt {}", attempt);

                    if attempt > self.config.retry_budget {
                        SearchPhase::Escalating
                    } else {
                        self.probe_or_idle(session, &mut report)
                    }
                }
                SearchPhase::Escalating => {
                    info!(
                        "Retry budget of {} spent, advancing carousel",
                        self.config.retry_budget
                    );
                    report.escalations += 1;
                    self.escalate(session);
                    self.probe_or_idle(session, &mut report)
                }
                SearchPhase::PostMatch { prologue_done: false } => {
                    info!("=== Starting match ===");
                    self.prologue(session);
                    report.games_started += 1;
                    SearchPhase::PostMatch { prologue_done: true }
                }
                SearchPhase::PostMatch { prologue_done: true } => {
                    self.poll_cues(session, &mut report)
                }
                SearchPhase::Stopped => break,
            };
        }

        info!(
            "Search stopped after {} iterations ({} escalations, {} matches)",
            report.iterations, report.escalations, report.games_started
        );
        report
    }

    fn probe_or_idle(&self, session: &mut Session, report: &mut SearchReport) -> SearchPhase {
        match self.probe(session) {
            Some(key) => {
                info!("Three stars found after '{}', preparing match", key);
                report.marker_hits += 1;
                session.state_mut().reset_search();
                if key == Key::Down {
                    session.wait(session.timings().descend_found_settle());
                }
                SearchPhase::PostMatch {
                    prologue_done: false,
                }
            }
            None => {
                debug!("Attempt failed, idling");
                session.wait(session.timings().search_idle());
                SearchPhase::Scanning
            }
        }
    }

    /// Back out, move one item right, confirm, and start the budget over.
    fn escalate(&self, session: &mut Session) {
        let settle = session.timings().escalation_settle();
        for key in [Key::Back, Key::Right, Key::Confirm] {
            if !session.press(key, settle) {
                return;
            }
        }
        session.state_mut().reset_search();
    }

    /// Look around the current item: left, up, down, then right. Returns
    /// the key whose step brought the marker into view.
    fn probe(&self, session: &mut Session) -> Option<Key> {
        let timings = session.timings().clone();
        let steps = self.config.probe_steps as usize;
        let sequence = std::iter::once((Key::Left, timings.probe_settle()))
            .chain(std::iter::repeat_n((Key::Up, timings.probe_settle()), steps))
            .chain(std::iter::repeat_n((Key::Down, timings.descend_settle()), steps))
            .chain(std::iter::once((Key::Right, timings.probe_settle())));

        for (key, settle) in sequence {
            if !session.press(key, settle) {
                return None;
            }
            if self.sees_marker(session) {
                return Some(key);
            }
        }
        None
    }

    fn sees_marker(&self, session: &mut Session) -> bool {
        let threshold = Some(self.config.marker_threshold);
        self.config
            .markers
            .iter()
            .any(|marker| session.sees(marker, threshold))
    }

    /// Confirm, pick the difficulty two rows down, confirm, start.
    fn prologue(&self, session: &mut Session) {
        let settle = session.timings().key_settle();
        let _ = session.press(Key::Confirm, settle)
            && session.press_repeated(Key::Down, 2, settle)
            && session.press(Key::Confirm, settle)
            && session.press(Key::Confirm, settle);
    }

    fn poll_cues(&self, session: &mut Session, report: &mut SearchReport) -> SearchPhase {
        let settle = session.timings().key_settle();
        let playing = SearchPhase::PostMatch {
            prologue_done: true,
        };

        if session.sees(&self.config.advance_label, None) {
            info!("Advance cue, confirming");
        } else if session.sees(&self.config.pause_label, None) {
            info!("Pause cue, confirming");
        } else if session.sees(&self.config.resume_label, None) {
            info!("Resume cue, confirming and leaving domination");
            session.set_flag(StateKey::InDomination, false);
        } else if self.sees_marker(session) {
            info!("Three stars visible again, rescanning");
            report.cues_handled += 1;
            session.state_mut().reset_search();
            return SearchPhase::Scanning;
        } else {
            debug!("No match cue visible");
            session.wait(session.timings().post_match_idle());
            return playing;
        }

        report.cues_handled += 1;
        session.press(Key::Confirm, settle);
        playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Timings;
    use crate::testing::{count, harness, harness_with};
    use courtbot_core::Key::*;
    use std::time::{Duration, Instant};

    fn is_marker(label: &str) -> bool {
        label == "stars" || label == "stars2"
    }

    #[test]
    fn test_escalates_until_marker_appears() {
        let mut h = harness(|label, keys, token| {
            let backs = keys.iter().filter(|&&k| k == Back).count();
            if backs >= 3 && is_marker(label) {
                token.stop();
                return true;
            }
            false
        });
        let search = ThreeStarSearch::new(SearchConfig::default());

        let report = search.run(&mut h.session);

        assert_eq!(report.escalations, 3);
        assert_eq!(report.marker_hits, 1);
        assert_eq!(count(&h.keys, Back), 3);

        let keys = h.keys.borrow();
        let backs: Vec<usize> = keys
            .iter()
            .enumerate()
            .filter(|(_, k)| **k == Back)
            .map(|(i, _)| i)
            .collect();
        let lefts_between = |from: usize, to: usize| keys[from..to].iter().filter(|&&k| k == Left).count();

        // two attempts on the first item before the budget runs out
        assert_eq!(lefts_between(0, backs[0]), 2);
        // one probe right after escalating, then two more attempts
        assert_eq!(lefts_between(backs[0], backs[1]), 3);
        assert_eq!(lefts_between(backs[1], backs[2]), 3);
        assert_eq!(&keys[backs[0]..backs[0] + 3], &[Back, Right, Confirm]);
    }

    #[test]
    fn test_carousel_order_and_short_circuit() {
        // marker appears after the third Up
        let mut h = harness(|label, keys, token| {
            let ups = keys.iter().filter(|&&k| k == Up).count();
            if ups == 3 && is_marker(label) {
                token.stop();
                return true;
            }
            false
        });
        let search = ThreeStarSearch::new(SearchConfig::default());
        search.run(&mut h.session);

        assert_eq!(*h.keys.borrow(), vec![Left, Up, Up, Up]);
    }

    #[test]
    fn test_downward_hit_settles_before_prologue() {
        let timings = Timings {
            descend_settle_ms: 40,
            descend_found_settle_ms: 150,
            ..Timings::instant()
        };
        // marker comes into view on the second Down; stop once the match is polled
        let mut h = harness_with(timings, |label, keys, token| {
            if keys.len() > 5 {
                token.stop();
                return false;
            }
            keys.len() == 5 && is_marker(label)
        });
        let search = ThreeStarSearch::new(SearchConfig {
            probe_steps: 2,
            ..SearchConfig::default()
        });

        let start = Instant::now();
        let report = search.run(&mut h.session);

        assert!(start.elapsed() >= Duration::from_millis(2 * 40 + 150));
        assert_eq!(report.games_started, 1);
        assert_eq!(
            *h.keys.borrow(),
            vec![Left, Up, Up, Down, Down, Confirm, Down, Down, Confirm, Confirm]
        );
    }

    #[test]
    fn test_upward_hit_starts_prologue_directly() {
        let timings = Timings {
            descend_settle_ms: 10_000,
            descend_found_settle_ms: 10_000,
            ..Timings::instant()
        };
        let mut h = harness_with(timings, |label, keys, token| {
            if keys.len() > 2 {
                token.stop();
                return false;
            }
            keys.len() == 2 && is_marker(label)
        });
        let search = ThreeStarSearch::new(SearchConfig::default());

        let start = Instant::now();
        let report = search.run(&mut h.session);

        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(report.games_started, 1);
        assert_eq!(h.keys.borrow()[..3], [Left, Up, Confirm]);
    }

    #[test]
    fn test_failed_iteration_presses_full_scan() {
        let mut h = harness(|_label, keys, token| {
            if keys.len() >= 12 {
                token.stop();
            }
            false
        });
        let search = ThreeStarSearch::new(SearchConfig::default());
        let report = search.run(&mut h.session);

        let expected = [vec![Left], vec![Up; 5], vec![Down; 5], vec![Right]].concat();
        assert_eq!(*h.keys.borrow(), expected);
        assert_eq!(report.escalations, 0);
        assert_eq!(h.session.state().search_count(), 1);
    }

    #[test]
    fn test_match_prologue_follows_marker() {
        let mut h = harness(|label, keys, token| {
            if keys.len() >= 6 {
                token.stop();
            }
            keys.len() == 1 && is_marker(label)
        });
        let search = ThreeStarSearch::new(SearchConfig::default());
        let report = search.run(&mut h.session);

        assert_eq!(report.games_started, 1);
        assert_eq!(
            *h.keys.borrow(),
            vec![Left, Confirm, Down, Down, Confirm, Confirm]
        );
        assert_eq!(h.session.state().search_count(), 0);
    }

    #[test]
    fn test_resume_cue_clears_domination() {
        let mut h = harness(|label, keys, token| {
            if keys.len() == 1 {
                return is_marker(label);
            }
            if keys.len() == 6 && label == "continue" {
                token.stop();
                return true;
            }
            false
        });
        h.session.set_flag(StateKey::InDomination, true);
        let search = ThreeStarSearch::new(SearchConfig::default());
        let report = search.run(&mut h.session);

        assert!(!h.session.state().in_domination());
        assert_eq!(report.cues_handled, 1);
    }

    #[test]
    fn test_advance_cue_is_confirmed() {
        let mut h = harness(|label, keys, token| {
            if keys.len() == 1 {
                return is_marker(label);
            }
            if keys.len() == 7 {
                token.stop();
            }
            keys.len() == 6 && label == "forward"
        });
        let search = ThreeStarSearch::new(SearchConfig::default());
        let report = search.run(&mut h.session);

        assert_eq!(h.keys.borrow().last(), Some(&Confirm));
        assert_eq!(h.keys.borrow().len(), 7);
        assert_eq!(report.cues_handled, 1);
    }

    #[test]
    fn test_marker_during_match_rescans() {
        let mut h = harness(|label, keys, token| {
            if keys.len() == 1 || keys.len() == 6 {
                return is_marker(label);
            }
            if keys.len() >= 7 {
                token.stop();
            }
            false
        });
        let search = ThreeStarSearch::new(SearchConfig::default());
        let report = search.run(&mut h.session);

        assert_eq!(report.marker_hits, 1);
        assert_eq!(report.cues_handled, 1);
        // rescanning starts with a fresh left step
        assert_eq!(h.keys.borrow().get(6), Some(&Left));
    }

    #[test]
    fn test_stopped_session_returns_immediately() {
        let mut h = harness(|_, _, _| true);
        h.cancel.stop();
        let report = ThreeStarSearch::new(SearchConfig::default()).run(&mut h.session);

        assert_eq!(report, SearchReport::default());
        assert!(h.keys.borrow().is_empty());
    }
}
