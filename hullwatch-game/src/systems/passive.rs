//! Passive systems run in the background every pass.
use crate::constants::DRONE_REPAIR_AMOUNT;
use crate::state::GameState;

use super::{PassEffect, SystemKind};

/// Patch up the most damaged living normal system. Ties go to the earliest in selection order.
pub(crate) fn run_repair_drones(state: &mut GameState, idx: usize, effects: &mut Vec<PassEffect>) {
    if !state.systems.get(idx).is_some_and(|drones| drones.is_alive()) {
        return;
    }
    let target = state
        .systems
        .iter()
        .enumerate()
        .filter(|(_, system)| {
            system.kind() == SystemKind::Normal && system.is_alive() && system.is_damaged()
        })
        .min_by_key(|(position, system)| (system.health, *position))
        .map(|(position, _)| position);
    let Some(target) = target else {
        return;
    };
    let system = &mut state.systems[target];
    let amount = system.heal(DRONE_REPAIR_AMOUNT);
    if amount > 0 {
        log::debug!("repair drones restored {amount} to {}", system.name);
        effects.push(PassEffect::DronesRepaired {
            target: system.name.clone(),
            amount,
        });
    }
}
