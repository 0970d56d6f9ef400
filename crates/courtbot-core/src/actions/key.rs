use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical key symbols. The injector decides how each one reaches the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Confirm,
    Alternate,
    Back,
}

impl Key {
    /// Physical key bound to this symbol in the game's default layout.
    pub fn symbol(&self) -> &'static str {
        match self {
            Key::Left => "a",
            Key::Right => "d",
            Key::Up => "w",
            Key::Down => "s",
            Key::Confirm => "space",
            Key::Alternate => "e",
            Key::Back => "esc",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
