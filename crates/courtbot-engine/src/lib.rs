//! Detection-and-control engine for the menu bot
//!
//! One cooperative thread per session: the [`ControlLoop`] polls the
//! [`Dispatcher`], whose handlers press keys and may block in the
//! [`ThreeStarSearch`] until the session's [`CancelToken`] is stopped.
//!
//! [`CancelToken`]: courtbot_core::CancelToken

pub mod actions;
pub mod config;
pub mod control;
pub mod dispatcher;
pub mod search;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use actions::MenuActions;
pub use config::{BotConfig, ConfigError};
pub use control::{ControlLoop, LoopReport, SessionHost};
pub use dispatcher::{ActionEntry, ActionHandler, ActionTable, Dispatcher};
pub use search::{SearchConfig, SearchPhase, SearchReport, ThreeStarSearch};
pub use session::{Session, Timings};

pub type Result<T> = anyhow::Result<T>;
