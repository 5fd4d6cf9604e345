//! Win/lose evaluation.
use serde::{Deserialize, Serialize};

use crate::constants::{MSG_ALL_SYSTEMS_DOWN, MSG_RESCUED};
use crate::state::GameState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum LossCause {
    CriticalFailure { system: String },
    AllSystemsDown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Ongoing,
    Won,
    Lost(LossCause),
}

impl Verdict {
    #[must_use]
    pub const fn is_over(&self) -> bool {
        !matches!(self, Self::Ongoing)
    }
}

/// First critical system that has failed, in selection order.
#[must_use]
pub fn failed_critical(state: &GameState) -> Option<&str> {
    state
        .systems
        .iter()
        .find(|system| system.critical && system.is_dead())
        .map(|system| system.name.as_str())
}

/// Judge the state without changing it. Losses take precedence over the win.
#[must_use]
pub fn evaluate(state: &GameState) -> Verdict {
    if let Some(system) = failed_critical(state) {
        return Verdict::Lost(LossCause::CriticalFailure {
            system: system.to_string(),
        });
    }
    if !state.systems.is_empty() && state.systems.iter().all(|system| system.is_dead()) {
        return Verdict::Lost(LossCause::AllSystemsDown);
    }
    if state.turn >= state.max_turns {
        return Verdict::Won;
    }
    Verdict::Ongoing
}

/// Verdict already recorded on the state; `Ongoing` until the game has ended.
#[must_use]
pub fn recorded(state: &GameState) -> Verdict {
    if !state.game_over {
        return Verdict::Ongoing;
    }
    if state.win {
        return Verdict::Won;
    }
    Verdict::Lost(
        failed_critical(state).map_or(LossCause::AllSystemsDown, |system| {
            LossCause::CriticalFailure {
                system: system.to_string(),
            }
        }),
    )
}

/// Apply the verdict to the state. An ended game never changes its outcome.
pub fn settle(state: &mut GameState) -> Verdict {
    if state.game_over {
        return recorded(state);
    }
    let verdict = evaluate(state);
    match &verdict {
        Verdict::Ongoing => {}
        Verdict::Won => {
            state.game_over = true;
            state.win = true;
            MSG_RESCUED.clone_into(&mut state.message);
            log::info!("rescue reached on turn {}", state.turn);
        }
        Verdict::Lost(cause) => {
            state.game_over = true;
            state.win = false;
            state.message = match cause {
                LossCause::CriticalFailure { system } => {
                    format!("{system} has failed. The ship cannot survive without it.")
                }
                LossCause::AllSystemsDown => MSG_ALL_SYSTEMS_DOWN.to_string(),
            };
            log::info!("run lost on turn {}: {cause:?}", state.turn);
        }
    }
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SystemTemplate;
    use crate::state::ShipSystem;
    use crate::systems::{NormalBehavior, SystemBehavior};

    fn ship(healths: &[(&str, i32, bool)]) -> GameState {
        GameState::from_systems(
            healths
                .iter()
                .map(|(name, health, critical)| {
                    ShipSystem::from_template(
                        &SystemTemplate::new(
                            *name,
                            SystemBehavior::Normal(NormalBehavior::Standard),
                        )
                        .with_critical(*critical),
                        *health,
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn critical_failure_beats_reaching_rescue() {
        let mut state = ship(&[("Life Support", 0, true), ("Engines", 50, false)]);
        state.turn = state.max_turns;
        assert_eq!(
            evaluate(&state),
            Verdict::Lost(LossCause::CriticalFailure {
                system: "Life Support".into()
            })
        );
    }

    #[test]
    fn all_dead_is_a_loss_even_without_critical_systems() {
        let state = ship(&[("Engines", 0, false), ("Hull", 0, false)]);
        assert_eq!(evaluate(&state), Verdict::Lost(LossCause::AllSystemsDown));
    }

    #[test]
    fn non_critical_failure_keeps_playing() {
        let state = ship(&[("Engines", 0, false), ("Hull", 10, false)]);
        assert_eq!(evaluate(&state), Verdict::Ongoing);
    }

    #[test]
    fn settle_is_sticky() {
        let mut state = ship(&[("Engines", 40, false)]);
        state.turn = state.max_turns;
        assert_eq!(settle(&mut state), Verdict::Won);
        assert!(state.game_over && state.win);

        state.systems[0].health = 0;
        assert_eq!(settle(&mut state), Verdict::Won);
        assert!(state.win);
    }
}
