//! Domain types shared by the vision and engine crates.
//!
//! Nothing in here knows about pixels: navigation flags, the menu action
//! kinds, logical keys, and the input capability the engine drives.

pub mod actions;
pub mod cancel;
pub mod input;
pub mod state;

pub use actions::{ActionKind, Key};
pub use cancel::CancelToken;
pub use input::{DryRunInjector, InjectionError, InputInjector};
pub use state::{GameState, StateError, StateKey, StateValue};
