//! Scripted fakes for engine unit tests

use crate::session::{Session, Timings};
use courtbot_core::{CancelToken, InjectionError, InputInjector, Key};
use courtbot_cv::{Detect, Detection, Location, MatchResult, MatchingMethod};
use std::cell::RefCell;
use std::rc::Rc;

pub type KeyLog = Rc<RefCell<Vec<Key>>>;
pub type LabelLog = Rc<RefCell<Vec<String>>>;

/// Answers detections with `rule(label, keys pressed so far)`
pub struct ScriptedDetector<F> {
    keys: KeyLog,
    labels: LabelLog,
    rule: F,
}

impl<F: FnMut(&str, &[Key]) -> bool> Detect for ScriptedDetector<F> {
    fn detect(&mut self, label: &str, _threshold: Option<f64>) -> Detection {
        self.labels.borrow_mut().push(label.to_string());
        let keys = self.keys.borrow();
        let found = (self.rule)(label, keys.as_slice());
        Detection::from_result(MatchResult {
            found,
            score: if found { 0.95 } else { 0.10 },
            location: found.then_some(Location::new(0, 0)),
            method: Some(MatchingMethod::CCoeffNormed),
            template_size: (1, 1),
        })
    }
}

pub struct RecordingInjector {
    keys: KeyLog,
}

impl InputInjector for RecordingInjector {
    fn press(&mut self, key: Key) -> Result<(), InjectionError> {
        self.keys.borrow_mut().push(key);
        Ok(())
    }
}

pub struct Harness {
    pub session: Session,
    pub keys: KeyLog,
    pub labels: LabelLog,
    pub cancel: CancelToken,
}

/// Session with instant timings whose detector follows `rule`. The rule
/// also receives a clone of the session's cancel token.
pub fn harness<F>(rule: F) -> Harness
where
    F: FnMut(&str, &[Key], &CancelToken) -> bool + 'static,
{
    harness_with(Timings::instant(), rule)
}

pub fn harness_with<F>(timings: Timings, mut rule: F) -> Harness
where
    F: FnMut(&str, &[Key], &CancelToken) -> bool + 'static,
{
    let keys: KeyLog = Rc::default();
    let labels: LabelLog = Rc::default();
    let cancel = CancelToken::new();
    let token = cancel.clone();

    let detector = ScriptedDetector {
        keys: keys.clone(),
        labels: labels.clone(),
        rule: move |label: &str, pressed: &[Key]| rule(label, pressed, &token),
    };
    let injector = RecordingInjector { keys: keys.clone() };
    let session = Session::new(detector, injector, timings, cancel.clone());

    Harness {
        session,
        keys,
        labels,
        cancel,
    }
}

pub fn count(keys: &KeyLog, key: Key) -> usize {
    keys.borrow().iter().filter(|&&k| k == key).count()
}
