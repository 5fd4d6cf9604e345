//! The per-turn deterioration pass.
//!
//! The ledger ages exactly once, at the start of the pass. Each system then
//! runs its `update` followed by its deterioration, in selection order, so
//! protection raised during `update` already applies to the same pass.
use serde::{Deserialize, Serialize};

use crate::dice::Dice;
use crate::state::GameState;
use crate::systems::{self, PassEffect};
use crate::verdict;

/// What happened during one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub count: u32,
    pub effects: Vec<PassEffect>,
    /// Set when a critical failure stopped the pass early.
    #[serde(default)]
    pub halted: bool,
}

impl PassReport {
    #[must_use]
    pub fn failed_systems(&self) -> Vec<&str> {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                PassEffect::SystemFailed { system } => Some(system.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Run one pass over every system.
///
/// Stops as soon as the game ends so no later system is processed after a critical failure.
pub fn run_pass(state: &mut GameState, dice: &mut dyn Dice) -> PassReport {
    let mut report = PassReport {
        count: state.deterioration_count,
        ..PassReport::default()
    };
    state.modifiers.tick();

    for idx in 0..state.systems.len() {
        systems::update(state, idx, &mut report.effects);
        systems::deteriorate(state, idx, dice, &mut report.effects);
        if state.game_over || verdict::failed_critical(state).is_some() {
            verdict::settle(state);
            report.halted = true;
            log::debug!("pass {} halted after system #{idx}", report.count);
            break;
        }
    }
    report
}
