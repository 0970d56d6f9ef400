//! Key injection capability

use crate::actions::Key;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectionError {
    #[error("target window is not focusable")]
    NotFocusable,
    #[error("failed to inject '{key}': {reason}")]
    Failed { key: Key, reason: String },
}

/// Sends one logical key to the game: press, hold briefly, release.
///
/// Implementations are best effort. The engine logs a failure and carries on.
pub trait InputInjector {
    fn press(&mut self, key: Key) -> Result<(), InjectionError>;
}

impl<T: InputInjector + ?Sized> InputInjector for Box<T> {
    fn press(&mut self, key: Key) -> Result<(), InjectionError> {
        (**self).press(key)
    }
}

/// Injector that only logs; used for replay runs.
#[derive(Debug, Default)]
pub struct DryRunInjector {
    pressed: usize,
}

impl DryRunInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pressed(&self) -> usize {
        self.pressed
    }
}

impl InputInjector for DryRunInjector {
    fn press(&mut self, key: Key) -> Result<(), InjectionError> {
        self.pressed += 1;
        info!(key = key.symbol(), "dry-run key press");
        Ok(())
    }
}
