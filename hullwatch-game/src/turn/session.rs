use crate::catalog::SystemTemplate;
use crate::config::GameConfig;
use crate::dice::{DiceBag, RngBundle};
use crate::events::EventDeck;
use crate::notify::TurnObserver;
use crate::state::GameState;

use super::{PlayerAction, TurnKernel, TurnOutcome, TurnReport};

/// One run of the game: state, tunables, event deck, dice and observers.
///
/// Every transition takes `&mut self`, so a turn can never start while another
/// is still being resolved.
pub struct ShipSession<D: DiceBag = RngBundle> {
    templates: Vec<SystemTemplate>,
    config: GameConfig,
    deck: EventDeck,
    dice: D,
    state: GameState,
    observers: Vec<Box<dyn TurnObserver>>,
}

impl ShipSession<RngBundle> {
    /// Start a run with unseeded randomness.
    #[must_use]
    pub fn new(templates: Vec<SystemTemplate>, config: GameConfig, deck: EventDeck) -> Self {
        Self::with_dice(templates, config, deck, RngBundle::from_entropy())
    }

    /// Start a run whose dice derive from `seed`.
    #[must_use]
    pub fn seeded(
        templates: Vec<SystemTemplate>,
        config: GameConfig,
        deck: EventDeck,
        seed: u64,
    ) -> Self {
        Self::with_dice(templates, config, deck, RngBundle::from_seed(seed))
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.dice.seed()
    }
}

impl<D: DiceBag> ShipSession<D> {
    /// Start a run using caller-provided dice. The config is sanitized first.
    #[must_use]
    pub fn with_dice(
        templates: Vec<SystemTemplate>,
        config: GameConfig,
        deck: EventDeck,
        mut dice: D,
    ) -> Self {
        let config = config.sanitized();
        let state = GameState::create(&templates, &config, dice.systems());
        log::debug!(
            "session created with {} systems, {} turns to rescue",
            state.systems.len(),
            state.max_turns
        );
        Self {
            templates,
            config,
            deck,
            dice,
            state,
            observers: Vec::new(),
        }
    }

    /// Resume from an existing state, e.g. one assembled by a test.
    #[must_use]
    pub fn from_state(state: GameState, config: GameConfig, deck: EventDeck, dice: D) -> Self {
        Self {
            templates: Vec::new(),
            config: config.sanitized(),
            deck,
            dice,
            state,
            observers: Vec::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub fn into_state(self) -> GameState {
        self.state
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub const fn deck(&self) -> &EventDeck {
        &self.deck
    }

    pub fn dice_mut(&mut self) -> &mut D {
        &mut self.dice
    }

    pub fn subscribe(&mut self, observer: Box<dyn TurnObserver>) {
        self.observers.push(observer);
    }

    /// Play one turn with the given action.
    pub fn act(&mut self, action: &PlayerAction) -> TurnOutcome {
        let state = std::mem::take(&mut self.state);
        let report = TurnKernel::new(&self.config, &self.deck).advance(state, action, &mut self.dice);
        self.apply(report)
    }

    pub fn repair(&mut self, system: &str) -> TurnOutcome {
        self.act(&PlayerAction::repair(system))
    }

    pub fn force_recover(&mut self, system: &str) -> TurnOutcome {
        self.act(&PlayerAction::force_recover(system))
    }

    pub fn activate(&mut self, system: &str, target: &str) -> TurnOutcome {
        self.act(&PlayerAction::activate(system, target))
    }

    /// Resolve the pending interactive event.
    pub fn confirm_interactive(&mut self, choice: &[String]) -> TurnOutcome {
        let state = std::mem::take(&mut self.state);
        let report = TurnKernel::new(&self.config, &self.deck).confirm(state, choice);
        self.apply(report)
    }

    /// Decline the pending interactive event.
    pub fn cancel_interactive(&mut self) -> TurnOutcome {
        let state = std::mem::take(&mut self.state);
        let report = TurnKernel::new(&self.config, &self.deck).cancel(state);
        self.apply(report)
    }

    /// Discard the current run and start over with the same systems.
    pub fn retry(&mut self) {
        if self.templates.is_empty() {
            log::warn!("retry requested on a session without templates; keeping current state");
            return;
        }
        self.state = GameState::create(&self.templates, &self.config, self.dice.systems());
        for observer in &mut self.observers {
            observer.state_changed(&self.state);
        }
    }

    fn apply(&mut self, report: TurnReport) -> TurnOutcome {
        let TurnReport { state, outcome } = report;
        self.state = state;
        for observer in &mut self.observers {
            for notice in &outcome.notices {
                observer.notice(notice);
            }
            observer.state_changed(&self.state);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedDice;
    use crate::notify::{Notice, NoticeLog};
    use crate::systems::{NormalBehavior, SystemBehavior};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Shared(Rc<RefCell<NoticeLog>>);

    impl TurnObserver for Shared {
        fn state_changed(&mut self, state: &GameState) {
            self.0.borrow_mut().state_changed(state);
        }

        fn notice(&mut self, notice: &crate::notify::Notice) {
            self.0.borrow_mut().notice(notice);
        }
    }

    fn templates() -> Vec<SystemTemplate> {
        vec![
            SystemTemplate::new("Engines", SystemBehavior::Normal(NormalBehavior::Standard)),
            SystemTemplate::new("Hull", SystemBehavior::Normal(NormalBehavior::Standard)),
        ]
    }

    #[test]
    fn observers_see_every_transition() {
        let mut session = ShipSession::with_dice(
            templates(),
            GameConfig::default().with_event_chance(0.0),
            EventDeck::default(),
            ScriptedDice::default(),
        );
        let log = Rc::new(RefCell::new(NoticeLog::default()));
        session.subscribe(Box::new(Shared(Rc::clone(&log))));

        assert!(session.repair("Engines").accepted);
        assert!(!session.repair("Warp Core").accepted);
        assert_eq!(session.state().turn, 2);

        let log = log.borrow();
        assert_eq!(log.state_changes, 2);
        assert_eq!(
            log.count(|notice| matches!(notice, Notice::ActionRejected { .. })),
            1
        );
    }

    #[test]
    fn seeded_sessions_start_identically() {
        let a = ShipSession::seeded(templates(), GameConfig::default(), EventDeck::builtin(), 42);
        let b = ShipSession::seeded(templates(), GameConfig::default(), EventDeck::builtin(), 42);
        assert_eq!(a.state(), b.state());
        assert_eq!(a.seed(), 42);
        assert_eq!(a.state().max_turns, 10);
    }

    #[test]
    fn retry_resets_the_run() {
        let mut session = ShipSession::with_dice(
            templates(),
            GameConfig::default().with_event_chance(0.0),
            EventDeck::default(),
            ScriptedDice::default(),
        );
        session.repair("Engines");
        session.retry();
        assert_eq!(session.state().turn, 1);
        assert_eq!(session.state().deterioration_count, 0);
    }
}
