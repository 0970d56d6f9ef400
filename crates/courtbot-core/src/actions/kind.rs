use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Every screen the menu dispatcher knows how to react to.
///
/// The mapping from kind to behavior lives in the engine; this enum only
/// carries identity and the static properties of each entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// "New content" splash
    NewContent,
    /// Daily reward popup
    DailyReward,
    /// Domination mode tile
    #[serde(rename = "domination_btn")]
    DominationButton,
    /// Domination home screen
    DominationHome,
    /// MyCAREER tile on the main menu
    #[serde(rename = "mycareer")]
    MyCareer,
    /// MyTEAM tile on the main menu
    #[serde(rename = "myteam")]
    MyTeam,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no menu action is bound to label '{0}'")]
pub struct UnknownAction(pub String);

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        ActionKind::NewContent,
        ActionKind::DailyReward,
        ActionKind::DominationButton,
        ActionKind::DominationHome,
        ActionKind::MyCareer,
        ActionKind::MyTeam,
    ];

    /// Canonical config label for this kind.
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::NewContent => "new_content",
            ActionKind::DailyReward => "daily_reward",
            ActionKind::DominationButton => "domination_btn",
            ActionKind::DominationHome => "domination_home",
            ActionKind::MyCareer => "mycareer",
            ActionKind::MyTeam => "myteam",
        }
    }

    /// Whether a firing handler ends the dispatcher tick.
    ///
    /// These screens replace whatever was visible before, so any lower
    /// priority match in the same tick is stale.
    pub fn is_exclusive_terminal(&self) -> bool {
        matches!(self, ActionKind::NewContent | ActionKind::DailyReward)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ActionKind {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.label() == wanted)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}
