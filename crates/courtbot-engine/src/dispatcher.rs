//! Priority-ordered menu dispatcher

use crate::session::Session;
use courtbot_core::ActionKind;
use tracing::{debug, info};

/// One row of the action table
#[derive(Debug, Clone, PartialEq)]
pub struct ActionEntry {
    pub label: String,
    pub kind: ActionKind,
}

impl ActionEntry {
    pub fn new(label: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            label: label.into(),
            kind,
        }
    }
}

/// Action entries in detection priority order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionTable {
    entries: Vec<ActionEntry>,
}

impl ActionTable {
    pub fn new(entries: Vec<ActionEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ActionEntry> {
        self.entries.iter()
    }
}

impl FromIterator<ActionEntry> for ActionTable {
    fn from_iter<T: IntoIterator<Item = ActionEntry>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Reacts to a detected screen. Returns whether it did anything.
pub trait ActionHandler {
    fn handle(&mut self, kind: ActionKind, session: &mut Session) -> bool;
}

pub struct Dispatcher<H> {
    table: ActionTable,
    handler: H,
}

impl<H: ActionHandler> Dispatcher<H> {
    pub fn new(table: ActionTable, handler: H) -> Self {
        Self { table, handler }
    }

    pub fn table(&self) -> &ActionTable {
        &self.table
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Evaluate the table once. Returns whether any handler fired.
    ///
    /// An exclusive-terminal entry that fires ends the tick; every other
    /// entry lets lower priorities be evaluated on the same tick.
    pub fn tick(&mut self, session: &mut Session) -> bool {
        let mut handled = false;

        for entry in self.table.iter() {
            if !session.is_running() {
                break;
            }
            if !session.detect(&entry.label, None).is_hit() {
                continue;
            }

            if self.handler.handle(entry.kind, session) {
                handled = true;
                if entry.kind.is_exclusive_terminal() {
                    info!("'{}' is exclusive, ending tick", entry.label);
                    return true;
                }
            } else {
                debug!("Handler for '{}' did nothing", entry.label);
            }
        }

        handled
    }
}
