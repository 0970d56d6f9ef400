//! Key sequences performed for each recognised menu screen

use crate::dispatcher::ActionHandler;
use crate::search::ThreeStarSearch;
use crate::session::Session;
use courtbot_core::{ActionKind, Key, StateKey};
use std::time::Duration;
use tracing::info;

/// Handlers for the menu graph of the target game
pub struct MenuActions {
    search: ThreeStarSearch,
}

impl MenuActions {
    pub fn new(search: ThreeStarSearch) -> Self {
        Self { search }
    }

    pub fn search(&self) -> &ThreeStarSearch {
        &self.search
    }

    fn dismiss_new_content(&self, session: &mut Session) {
        let settle = session.timings().key_settle();
        session.press_repeated(Key::Alternate, 2, settle);
    }

    fn claim_daily_reward(&self, session: &mut Session) {
        let timings = session.timings().clone();
        let _ = session.press(Key::Confirm, timings.screen_change())
            && session.press(Key::Confirm, Duration::ZERO);
    }

    fn enter_domination(&self, session: &mut Session) {
        let timings = session.timings().clone();
        session.press(Key::Confirm, Duration::ZERO);
        session.set_flag(StateKey::InDomination, true);
        if !session.wait(timings.screen_change()) {
            return;
        }

        let config = self.search.config();
        if session.sees(&config.select_label, Some(config.select_threshold)) {
            info!("Selection screen confirmed, starting search");
            if session.press(Key::Confirm, timings.key_settle()) {
                self.search.run(session);
            }
        }
    }

    fn scroll_domination_home(&self, session: &mut Session) {
        let settle = session.timings().scroll_settle();
        session.press_repeated(Key::Down, 5, settle);
    }

    fn open_mycareer(&self, session: &mut Session) {
        let settle = session.timings().key_settle();
        session.press(Key::Right, settle);
    }

    fn enter_myteam(&self, session: &mut Session) {
        session.press(Key::Confirm, Duration::ZERO);
        session.set_flag(StateKey::InMyTeam, true);
        session.wait(session.timings().key_settle());
    }
}

impl ActionHandler for MenuActions {
    fn handle(&mut self, kind: ActionKind, session: &mut Session) -> bool {
        info!("Handling '{}'", kind);
        match kind {
            ActionKind::NewContent => self.dismiss_new_content(session),
            ActionKind::DailyReward => self.claim_daily_reward(session),
            ActionKind::DominationButton => self.enter_domination(session),
            ActionKind::DominationHome => self.scroll_domination_home(session),
            ActionKind::MyCareer => self.open_mycareer(session),
            ActionKind::MyTeam => self.enter_myteam(session),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchConfig;
    use crate::session::Timings;
    use crate::testing::{harness, harness_with};
    use courtbot_core::Key::*;
    use std::time::Instant;

    fn actions() -> MenuActions {
        MenuActions::new(ThreeStarSearch::new(SearchConfig::default()))
    }

    #[test]
    fn test_simple_handlers_press_expected_keys() {
        let cases = [
            (ActionKind::NewContent, vec![Alternate, Alternate]),
            (ActionKind::DailyReward, vec![Confirm, Confirm]),
            (ActionKind::DominationHome, vec![Down; 5]),
            (ActionKind::MyCareer, vec![Right]),
        ];

        for (kind, expected) in cases {
            let mut h = harness(|_, _, _| false);
            assert!(actions().handle(kind, &mut h.session));
            assert_eq!(*h.keys.borrow(), expected, "{kind}");
        }
    }

    #[test]
    fn test_daily_reward_returns_right_after_second_confirm() {
        let timings = Timings {
            screen_change_ms: 30,
            key_settle_ms: 10_000,
            ..Timings::instant()
        };
        let mut h = harness_with(timings, |_, _, _| false);

        let start = Instant::now();
        actions().handle(ActionKind::DailyReward, &mut h.session);

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(30));
        assert!(elapsed < Duration::from_secs(5));
        assert_eq!(*h.keys.borrow(), vec![Confirm, Confirm]);
    }

    #[test]
    fn test_myteam_sets_flag() {
        let mut h = harness(|_, _, _| false);
        actions().handle(ActionKind::MyTeam, &mut h.session);

        assert!(h.session.state().in_myteam());
        assert_eq!(*h.keys.borrow(), vec![Confirm]);
    }

    #[test]
    fn test_domination_without_select_screen_skips_search() {
        let mut h = harness(|_, _, _| false);
        actions().handle(ActionKind::DominationButton, &mut h.session);

        assert!(h.session.state().in_domination());
        assert_eq!(*h.keys.borrow(), vec![Confirm]);
        assert_eq!(*h.labels.borrow(), vec!["select".to_string()]);
    }

    #[test]
    fn test_domination_with_select_screen_runs_search() {
        let mut h = harness(|label, keys, token| {
            if keys.len() >= 3 {
                token.stop();
            }
            label == "select"
        });
        actions().handle(ActionKind::DominationButton, &mut h.session);

        let keys = h.keys.borrow();
        assert_eq!(&keys[..3], &[Confirm, Confirm, Left]);
        assert!(h.labels.borrow().iter().any(|l| l == "stars"));
    }
}
