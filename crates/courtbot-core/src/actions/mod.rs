//! Menu actions and the logical keys they press

pub mod key;
pub mod kind;

pub use key::Key;
pub use kind::{ActionKind, UnknownAction};
