//! Turn sequencing.
//!
//! A turn is: player action, `turn += 1`, deterioration pass, verdict, event,
//! verdict, notifications. [`TurnKernel`] takes the state by value and hands
//! back the next one, so a rejected action simply returns the input.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GameConfig;
use crate::constants::{FORCE_RECOVERY_HEALTH, MSG_ACTIONS_LOCKED, MSG_GAME_FINISHED};
use crate::deterioration::{self, PassReport};
use crate::dice::{Dice, DiceBag};
use crate::events::{self, EventDeck, EventDraw};
use crate::modifiers::ModifierLedger;
use crate::notify::{Notice, Notices};
use crate::state::GameState;
use crate::systems::{self, Interaction, SystemKind};
use crate::verdict::{self, Verdict};

pub mod session;

pub use session::ShipSession;

/// One player decision per turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlayerAction {
    /// Restore a living system to full health.
    Repair { system: String },
    /// Gamble on bringing a failed system back online.
    ForceRecover { system: String },
    /// Trigger an active system's ability.
    Activate { system: String, target: String },
}

impl PlayerAction {
    #[must_use]
    pub fn repair(system: impl Into<String>) -> Self {
        Self::Repair {
            system: system.into(),
        }
    }

    #[must_use]
    pub fn force_recover(system: impl Into<String>) -> Self {
        Self::ForceRecover {
            system: system.into(),
        }
    }

    #[must_use]
    pub fn activate(system: impl Into<String>, target: impl Into<String>) -> Self {
        Self::Activate {
            system: system.into(),
            target: target.into(),
        }
    }

    #[must_use]
    pub fn system(&self) -> &str {
        match self {
            Self::Repair { system }
            | Self::ForceRecover { system }
            | Self::Activate { system, .. } => system,
        }
    }
}

/// Why an action was refused. The message is shown to the player verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("There is no system called {0}.")]
    UnknownSystem(String),
    #[error("{0} is offline and needs a force recovery.")]
    SystemOffline(String),
    #[error("{0} is still running; only failed systems can be force recovered.")]
    StillRunning(String),
    #[error("{0} has no ability to activate.")]
    NotInteractive(String),
    #[error("{system} cannot protect {target}.")]
    IneligibleTarget { system: String, target: String },
    #[error("{system} is recharging for {passes} more turns.")]
    OnCooldown { system: String, passes: u32 },
}

/// Everything a transition produced besides the state itself.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// False when the call was refused and the state did not advance.
    pub accepted: bool,
    pub notices: Notices,
    pub pass: Option<PassReport>,
    pub draw: Option<EventDraw>,
    pub verdict: Verdict,
}

impl TurnOutcome {
    fn rejected(state: &GameState, reason: String) -> Self {
        let mut notices = Notices::new();
        notices.push(Notice::ActionRejected { reason });
        Self {
            accepted: false,
            notices,
            pass: None,
            draw: None,
            verdict: verdict::recorded(state),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TurnReport {
    pub state: GameState,
    pub outcome: TurnOutcome,
}

/// Stateless turn pipeline bound to a config and an event deck.
#[derive(Debug, Clone, Copy)]
pub struct TurnKernel<'a> {
    config: &'a GameConfig,
    deck: &'a EventDeck,
}

impl<'a> TurnKernel<'a> {
    #[must_use]
    pub const fn new(config: &'a GameConfig, deck: &'a EventDeck) -> Self {
        Self { config, deck }
    }

    /// Play one turn.
    ///
    /// Rejected and invalid actions leave the turn counter untouched.
    #[must_use]
    pub fn advance(
        &self,
        state: GameState,
        action: &PlayerAction,
        dice: &mut dyn DiceBag,
    ) -> TurnReport {
        if let Some(reason) = lock_reason(&state) {
            log::debug!("action {action:?} rejected: {reason}");
            let outcome = TurnOutcome::rejected(&state, reason.to_string());
            return TurnReport { state, outcome };
        }

        let before = state.modifiers.clone();
        let mut next = state.clone();
        match self.resolve_action(&mut next, action, dice.recovery()) {
            Ok(message) => next.message = message,
            Err(err) => {
                let mut reverted = state;
                reverted.message = err.to_string();
                let outcome = TurnOutcome::rejected(&reverted, err.to_string());
                return TurnReport {
                    state: reverted,
                    outcome,
                };
            }
        }

        next.turn = next.turn.saturating_add(1);
        next.deterioration_count = next.deterioration_count.saturating_add(1);
        let pass = deterioration::run_pass(&mut next, dice.systems());
        let mut verdict = verdict::settle(&mut next);

        let mut notices = Notices::new();
        let draw = if verdict.is_over() {
            None
        } else {
            let draw = events::trigger_event(
                &mut next,
                self.deck,
                self.config,
                dice.events(),
                &mut notices,
            );
            verdict = verdict::settle(&mut next);
            Some(draw)
        };
        log::debug!(
            "turn {} resolved (pass {}, verdict {verdict:?})",
            next.turn,
            next.deterioration_count
        );

        finish(&next, &before, &verdict, &mut notices);
        TurnReport {
            state: next,
            outcome: TurnOutcome {
                accepted: true,
                notices,
                pass: Some(pass),
                draw,
                verdict,
            },
        }
    }

    /// Resolve the pending interactive event with the player's selection.
    #[must_use]
    pub fn confirm(&self, state: GameState, choice: &[String]) -> TurnReport {
        if state.game_over {
            let outcome = TurnOutcome::rejected(&state, MSG_GAME_FINISHED.to_string());
            return TurnReport { state, outcome };
        }
        let before = state.modifiers.clone();
        let mut next = state;
        let mut notices = Notices::new();
        if let Err(err) = events::confirm_interactive(&mut next, self.deck, choice, &mut notices) {
            next.message = err.to_string();
            let outcome = TurnOutcome::rejected(&next, err.to_string());
            return TurnReport {
                state: next,
                outcome,
            };
        }
        let verdict = verdict::settle(&mut next);
        finish(&next, &before, &verdict, &mut notices);
        TurnReport {
            state: next,
            outcome: TurnOutcome {
                accepted: true,
                notices,
                pass: None,
                draw: None,
                verdict,
            },
        }
    }

    /// Decline the pending interactive event, if the rules allow it.
    #[must_use]
    pub fn cancel(&self, state: GameState) -> TurnReport {
        let mut next = state;
        let mut notices = Notices::new();
        if let Err(err) = events::cancel_interactive(&mut next, self.config, &mut notices) {
            next.message = err.to_string();
            let outcome = TurnOutcome::rejected(&next, err.to_string());
            return TurnReport {
                state: next,
                outcome,
            };
        }
        let verdict = verdict::recorded(&next);
        TurnReport {
            state: next,
            outcome: TurnOutcome {
                accepted: true,
                notices,
                pass: None,
                draw: None,
                verdict,
            },
        }
    }

    fn resolve_action(
        &self,
        state: &mut GameState,
        action: &PlayerAction,
        recovery: &mut dyn Dice,
    ) -> Result<String, ActionError> {
        let name = action.system();
        let Some(idx) = state.system_index(name) else {
            return Err(ActionError::UnknownSystem(name.to_string()));
        };
        match action {
            PlayerAction::Repair { .. } => {
                if state.systems[idx].is_dead() {
                    return Err(ActionError::SystemOffline(name.to_string()));
                }
                systems::fix(state, idx);
                Ok(format!("{name} repaired to full health."))
            }
            PlayerAction::ForceRecover { .. } => {
                if state.systems[idx].is_alive() {
                    return Err(ActionError::StillRunning(name.to_string()));
                }
                if recovery.chance(self.config.force_recovery_chance) {
                    let turn = state.turn;
                    let system = &mut state.systems[idx];
                    system.set_health(FORCE_RECOVERY_HEALTH);
                    system.last_fixed_turn = turn;
                    log::info!("force recovery of {name} succeeded");
                    Ok(format!("{name} is back online at {FORCE_RECOVERY_HEALTH}% health!"))
                } else {
                    log::info!("force recovery of {name} failed");
                    Ok(format!("Force recovery of {name} failed. It remains offline."))
                }
            }
            PlayerAction::Activate { target, .. } => {
                if state.systems[idx].kind() != SystemKind::Active {
                    return Err(ActionError::NotInteractive(name.to_string()));
                }
                systems::handle_interaction(
                    state,
                    idx,
                    &Interaction::Activate {
                        target: target.clone(),
                    },
                )
            }
        }
    }
}

fn lock_reason(state: &GameState) -> Option<&'static str> {
    if state.game_over {
        Some(MSG_GAME_FINISHED)
    } else if state.interactive_mode {
        Some(MSG_ACTIONS_LOCKED)
    } else {
        None
    }
}

fn finish(state: &GameState, before: &ModifierLedger, verdict: &Verdict, notices: &mut Notices) {
    if state.modifiers != *before {
        notices.push(Notice::ModifiersChanged {
            modifiers: state.modifiers.as_slice().to_vec(),
        });
    }
    if verdict.is_over() {
        notices.push(Notice::GameEnded { win: state.win });
    }
}
