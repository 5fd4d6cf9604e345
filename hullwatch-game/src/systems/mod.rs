//! System behavior dispatch.
//!
//! Behaviors form a closed registry: every system carries a [`SystemBehavior`]
//! and the capability functions below route to the matching kind module.
//! Capabilities a behavior does not implement are no-ops.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    HEALTH_MAX, RATE_COMMS, RATE_LIFE_SUPPORT, RATE_NAVIGATION, RATE_POWER, RATE_SHIELDS,
    RATE_STANDARD,
};
use crate::dice::Dice;
use crate::events::Event;
use crate::state::GameState;
use crate::turn::ActionError;

pub mod active;
pub mod normal;
pub mod passive;

pub use active::{ProtectionPhase, ProtectionState};

/// Broad category of a system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemKind {
    /// Deteriorates every turn and is repaired by the player.
    Normal,
    /// Player-triggered ability with its own timers.
    Active,
    /// Runs in the background every turn.
    Passive,
}

impl fmt::Display for SystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Normal => "normal",
            Self::Active => "active",
            Self::Passive => "passive",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalBehavior {
    Standard,
    Power,
    LifeSupport,
    Navigation,
    Comms,
    /// Deflector shields: a global negative-event modifier scaled by health.
    Shields,
    /// Absorber shields: soak part of the event damage dealt to other systems.
    AbsorbingShields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveBehavior {
    Protection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassiveBehavior {
    RepairDrones,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemBehavior {
    Normal(NormalBehavior),
    Active(ActiveBehavior),
    Passive(PassiveBehavior),
}

/// Which capability hooks a behavior implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    pub update: bool,
    pub deteriorate: bool,
    pub fix: bool,
    pub on_event: bool,
    pub interact: bool,
}

impl SystemBehavior {
    /// Every behavior the engine knows, keyed by its manifest identifier.
    pub const REGISTRY: [(&'static str, Self); 9] = [
        ("standard", Self::Normal(NormalBehavior::Standard)),
        ("power", Self::Normal(NormalBehavior::Power)),
        ("life_support", Self::Normal(NormalBehavior::LifeSupport)),
        ("navigation", Self::Normal(NormalBehavior::Navigation)),
        ("comms", Self::Normal(NormalBehavior::Comms)),
        ("shields", Self::Normal(NormalBehavior::Shields)),
        (
            "absorbing_shields",
            Self::Normal(NormalBehavior::AbsorbingShields),
        ),
        ("protection", Self::Active(ActiveBehavior::Protection)),
        ("repair_drones", Self::Passive(PassiveBehavior::RepairDrones)),
    ];

    #[must_use]
    pub const fn kind(self) -> SystemKind {
        match self {
            Self::Normal(_) => SystemKind::Normal,
            Self::Active(_) => SystemKind::Active,
            Self::Passive(_) => SystemKind::Passive,
        }
    }

    /// Manifest identifier for this behavior.
    #[must_use]
    pub fn key(self) -> &'static str {
        Self::REGISTRY
            .iter()
            .find(|(_, behavior)| *behavior == self)
            .map_or("unknown", |(key, _)| key)
    }

    /// Resolve a manifest identifier against the registry.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::REGISTRY
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key.trim()))
            .map(|(_, behavior)| *behavior)
    }

    #[must_use]
    pub const fn default_rate(self) -> i32 {
        match self {
            Self::Normal(NormalBehavior::Standard) => RATE_STANDARD,
            Self::Normal(NormalBehavior::Power) => RATE_POWER,
            Self::Normal(NormalBehavior::LifeSupport) => RATE_LIFE_SUPPORT,
            Self::Normal(NormalBehavior::Navigation) => RATE_NAVIGATION,
            Self::Normal(NormalBehavior::Comms) => RATE_COMMS,
            Self::Normal(NormalBehavior::Shields | NormalBehavior::AbsorbingShields) => {
                RATE_SHIELDS
            }
            Self::Active(_) | Self::Passive(_) => 0,
        }
    }

    #[must_use]
    pub const fn default_critical(self) -> bool {
        matches!(self, Self::Normal(NormalBehavior::LifeSupport))
    }

    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::Normal(NormalBehavior::Shields) => Capabilities {
                update: true,
                deteriorate: true,
                fix: true,
                on_event: false,
                interact: false,
            },
            Self::Normal(NormalBehavior::AbsorbingShields) => Capabilities {
                update: false,
                deteriorate: true,
                fix: true,
                on_event: true,
                interact: false,
            },
            Self::Normal(_) => Capabilities {
                update: false,
                deteriorate: true,
                fix: true,
                on_event: false,
                interact: false,
            },
            Self::Active(_) => Capabilities {
                update: true,
                deteriorate: false,
                fix: true,
                on_event: false,
                interact: true,
            },
            Self::Passive(_) => Capabilities {
                update: true,
                deteriorate: false,
                fix: true,
                on_event: false,
                interact: false,
            },
        }
    }
}

impl fmt::Display for SystemBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Player command routed to an active system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    Activate { target: String },
}

/// Something notable that happened while a system was processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PassEffect {
    SystemFailed { system: String },
    PowerCascade { source: String },
    LifeSupportFailure { system: String },
    NavigationMalfunction { system: String, negated: bool },
    CommsBoost { system: String },
    DronesRepaired { target: String, amount: i32 },
    ProtectionExpired { target: String },
    ProtectionReady { system: String },
}

/// Run the one-time setup hook for the system at `idx`.
pub(crate) fn initialize(state: &mut GameState, idx: usize) {
    let Some(system) = state.systems.get(idx) else {
        return;
    };
    if let SystemBehavior::Active(ActiveBehavior::Protection) = system.behavior {
        let name = system.name.clone();
        state
            .extensions
            .protection
            .entry(name)
            .or_insert_with(ProtectionState::default);
    }
}

/// Per-pass background update, run before the system deteriorates.
pub(crate) fn update(state: &mut GameState, idx: usize, effects: &mut Vec<PassEffect>) {
    let Some(behavior) = state.systems.get(idx).map(|system| system.behavior) else {
        return;
    };
    match behavior {
        SystemBehavior::Normal(NormalBehavior::Shields) => normal::refresh_deflector(state, idx),
        SystemBehavior::Active(ActiveBehavior::Protection) => {
            active::update_protection(state, idx, effects);
        }
        SystemBehavior::Passive(PassiveBehavior::RepairDrones) => {
            passive::run_repair_drones(state, idx, effects);
        }
        SystemBehavior::Normal(_) => {}
    }
}

/// Apply one pass of wear plus behavior side effects.
pub(crate) fn deteriorate(
    state: &mut GameState,
    idx: usize,
    dice: &mut dyn Dice,
    effects: &mut Vec<PassEffect>,
) {
    let Some(behavior) = state.systems.get(idx).map(|system| system.behavior) else {
        return;
    };
    if let SystemBehavior::Normal(normal) = behavior {
        normal::deteriorate(state, idx, normal, dice, effects);
    }
}

/// Restore a living system to full health and stamp the repair turn.
pub(crate) fn fix(state: &mut GameState, idx: usize) {
    let turn = state.turn;
    if let Some(system) = state.systems.get_mut(idx) {
        system.set_health(HEALTH_MAX);
        system.last_fixed_turn = turn;
    }
}

/// React to a resolved event. `snapshot` is the state before the event applied.
pub(crate) fn on_event(state: &mut GameState, idx: usize, event: &Event, snapshot: &GameState) {
    let Some(behavior) = state.systems.get(idx).map(|system| system.behavior) else {
        return;
    };
    if let SystemBehavior::Normal(NormalBehavior::AbsorbingShields) = behavior {
        normal::absorb_event_damage(state, idx, event, snapshot);
    }
}

/// Route a player interaction to the active system at `idx`.
///
/// # Errors
///
/// Returns `ActionError` when the system cannot handle the interaction right now.
pub(crate) fn handle_interaction(
    state: &mut GameState,
    idx: usize,
    interaction: &Interaction,
) -> Result<String, ActionError> {
    let Some(system) = state.systems.get(idx) else {
        return Err(ActionError::UnknownSystem(format!("#{idx}")));
    };
    match (system.behavior, interaction) {
        (SystemBehavior::Active(ActiveBehavior::Protection), Interaction::Activate { target }) => {
            active::activate_protection(state, idx, target)
        }
        _ => Err(ActionError::NotInteractive(system.name.clone())),
    }
}

/// Apply wear to the system at `idx`, recording a failure when it dies.
///
/// Returns the health actually lost.
pub(crate) fn apply_wear(
    state: &mut GameState,
    idx: usize,
    amount: i32,
    effects: &mut Vec<PassEffect>,
) -> i32 {
    let Some(system) = state.systems.get_mut(idx) else {
        return 0;
    };
    let was_alive = system.is_alive();
    let lost = system.apply_damage(amount);
    if was_alive && system.is_dead() {
        let name = system.name.clone();
        state.modifiers.remove_by_target(&name);
        log::info!("{name} has failed");
        effects.push(PassEffect::SystemFailed { system: name });
    }
    lost
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_round_trips_keys() {
        for (key, behavior) in SystemBehavior::REGISTRY {
            assert_eq!(SystemBehavior::from_key(key), Some(behavior));
            assert_eq!(behavior.key(), key);
        }
        assert_eq!(
            SystemBehavior::from_key(" Life_Support "),
            Some(SystemBehavior::Normal(NormalBehavior::LifeSupport))
        );
        assert_eq!(SystemBehavior::from_key("warp_core"), None);
    }

    #[test]
    fn normal_behaviors_can_deteriorate_and_be_fixed() {
        for (_, behavior) in SystemBehavior::REGISTRY {
            let caps = behavior.capabilities();
            assert!(caps.fix);
            assert_eq!(caps.deteriorate, behavior.kind() == SystemKind::Normal);
            assert_eq!(caps.interact, behavior.kind() == SystemKind::Active);
        }
    }

    #[test]
    fn only_life_support_is_critical_by_default() {
        let critical: Vec<_> = SystemBehavior::REGISTRY
            .iter()
            .filter(|(_, behavior)| behavior.default_critical())
            .map(|(key, _)| *key)
            .collect();
        assert_eq!(critical, vec!["life_support"]);
        assert_eq!(
            SystemBehavior::Normal(NormalBehavior::LifeSupport).default_rate(),
            RATE_LIFE_SUPPORT
        );
        assert_eq!(
            SystemBehavior::Active(ActiveBehavior::Protection).default_rate(),
            0
        );
    }
}
