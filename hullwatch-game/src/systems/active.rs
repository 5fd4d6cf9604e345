//! Active systems. Protection shields one normal system for a few passes,
//! then cools down before it can be used again.
//!
//! Timers run on `deterioration_count` rather than `turn` so that Comms and
//! Navigation turn shifts never stretch or shorten a cooldown.
use serde::{Deserialize, Serialize};

use crate::constants::{PROTECTION_COOLDOWN, PROTECTION_DURATION, SOURCE_PROTECTION_PREFIX};
use crate::modifiers::{DamageCategory, ModifierTarget};
use crate::state::GameState;
use crate::turn::ActionError;

use super::{PassEffect, SystemKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionPhase {
    #[default]
    Idle,
    Protecting,
    Cooldown,
}

/// Timed state of one Protection system.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProtectionState {
    pub phase: ProtectionPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub start_count: u32,
    #[serde(default)]
    pub end_count: u32,
}

/// Phase change observed by [`ProtectionState::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionTransition {
    Expired,
    Ready,
}

impl ProtectionState {
    /// Pass count at which the cooldown ends.
    #[must_use]
    pub const fn ready_count(&self) -> u32 {
        self.end_count.saturating_add(PROTECTION_COOLDOWN)
    }

    /// Advance the phase to match `count`.
    pub fn refresh(&mut self, count: u32) -> Option<ProtectionTransition> {
        match self.phase {
            ProtectionPhase::Protecting if count >= self.end_count => {
                if count >= self.ready_count() {
                    self.phase = ProtectionPhase::Idle;
                    self.target = None;
                } else {
                    self.phase = ProtectionPhase::Cooldown;
                }
                Some(ProtectionTransition::Expired)
            }
            ProtectionPhase::Cooldown if count >= self.ready_count() => {
                self.phase = ProtectionPhase::Idle;
                self.target = None;
                Some(ProtectionTransition::Ready)
            }
            _ => None,
        }
    }

    /// Passes left before the system can be activated again; 0 when idle.
    #[must_use]
    pub const fn passes_until_ready(&self, count: u32) -> u32 {
        match self.phase {
            ProtectionPhase::Idle => 0,
            ProtectionPhase::Protecting | ProtectionPhase::Cooldown => {
                self.ready_count().saturating_sub(count)
            }
        }
    }

    #[must_use]
    pub fn can_activate(&self) -> bool {
        self.phase == ProtectionPhase::Idle
    }
}

fn source_for(system: &str) -> String {
    format!("{SOURCE_PROTECTION_PREFIX}{system}")
}

pub(crate) fn update_protection(state: &mut GameState, idx: usize, effects: &mut Vec<PassEffect>) {
    let Some(name) = state.systems.get(idx).map(|system| system.name.clone()) else {
        return;
    };
    let count = state.deterioration_count;
    let Some(protection) = state.extensions.protection.get_mut(&name) else {
        return;
    };
    let target = protection.target.clone();
    match protection.refresh(count) {
        Some(ProtectionTransition::Expired) => {
            state.modifiers.remove_by_source(&source_for(&name));
            log::debug!("{name} protection ended at pass {count}");
            effects.push(PassEffect::ProtectionExpired {
                target: target.unwrap_or_default(),
            });
        }
        Some(ProtectionTransition::Ready) => {
            effects.push(PassEffect::ProtectionReady { system: name });
        }
        None => {}
    }
}

/// Shield `target` from deterioration and negative events.
pub(crate) fn activate_protection(
    state: &mut GameState,
    idx: usize,
    target: &str,
) -> Result<String, ActionError> {
    let Some(system) = state.systems.get(idx) else {
        return Err(ActionError::UnknownSystem(format!("#{idx}")));
    };
    let name = system.name.clone();
    if system.is_dead() {
        return Err(ActionError::SystemOffline(name));
    }
    let count = state.deterioration_count;
    let protection = state.extensions.protection.entry(name.clone()).or_default();
    protection.refresh(count);
    if !protection.can_activate() {
        return Err(ActionError::OnCooldown {
            system: name,
            passes: protection.passes_until_ready(count),
        });
    }

    let eligible = state
        .system(target)
        .is_some_and(|candidate| candidate.kind() == SystemKind::Normal && candidate.is_alive());
    if !eligible {
        return Err(ActionError::IneligibleTarget {
            system: name,
            target: target.to_string(),
        });
    }

    let source = source_for(&name);
    for category in [DamageCategory::Deterioration, DamageCategory::NegativeEvents] {
        state.modifiers.add(
            ModifierTarget::system(target),
            0.0,
            category,
            PROTECTION_DURATION,
            source.clone(),
        );
    }
    if let Some(protection) = state.extensions.protection.get_mut(&name) {
        *protection = ProtectionState {
            phase: ProtectionPhase::Protecting,
            target: Some(target.to_string()),
            start_count: count,
            end_count: count.saturating_add(PROTECTION_DURATION),
        };
    }
    log::info!("{name} is protecting {target} from pass {count}");
    Ok(format!(
        "{name} is shielding {target} for the next {PROTECTION_DURATION} turns."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SystemTemplate;
    use crate::state::ShipSystem;
    use crate::systems::{ActiveBehavior, NormalBehavior, SystemBehavior};

    fn ship() -> GameState {
        GameState::from_systems(vec![
            ShipSystem::from_template(
                &SystemTemplate::new("Engines", SystemBehavior::Normal(NormalBehavior::Standard)),
                70,
            ),
            ShipSystem::from_template(
                &SystemTemplate::new(
                    "Protection",
                    SystemBehavior::Active(ActiveBehavior::Protection),
                ),
                100,
            ),
        ])
    }

    #[test]
    fn activation_installs_immunity_and_timers() {
        let mut state = ship();
        state.deterioration_count = 4;
        activate_protection(&mut state, 1, "Engines").expect("activation succeeds");

        assert!(state.modifiers.is_immune("Engines", DamageCategory::Deterioration));
        assert!(state.modifiers.is_immune("Engines", DamageCategory::NegativeEvents));
        let protection = &state.extensions.protection["Protection"];
        assert_eq!(protection.phase, ProtectionPhase::Protecting);
        assert_eq!(protection.start_count, 4);
        assert_eq!(protection.end_count, 7);
        assert_eq!(protection.ready_count(), 12);
    }

    #[test]
    fn activation_rejects_ineligible_targets() {
        let mut state = ship();
        assert!(matches!(
            activate_protection(&mut state, 1, "Protection"),
            Err(ActionError::IneligibleTarget { .. })
        ));
        assert!(matches!(
            activate_protection(&mut state, 1, "Warp Core"),
            Err(ActionError::IneligibleTarget { .. })
        ));
        state.systems[0].health = 0;
        assert!(matches!(
            activate_protection(&mut state, 1, "Engines"),
            Err(ActionError::IneligibleTarget { .. })
        ));
        assert!(state.modifiers.is_empty());
    }

    #[test]
    fn cooldown_blocks_until_ready_count() {
        let mut state = ship();
        activate_protection(&mut state, 1, "Engines").expect("first activation");

        state.deterioration_count = 3;
        let mut effects = Vec::new();
        update_protection(&mut state, 1, &mut effects);
        assert_eq!(
            state.extensions.protection["Protection"].phase,
            ProtectionPhase::Cooldown
        );
        assert!(!state.modifiers.has_source("protection:Protection"));

        state.deterioration_count = 7;
        assert_eq!(
            activate_protection(&mut state, 1, "Engines"),
            Err(ActionError::OnCooldown {
                system: "Protection".into(),
                passes: 1,
            })
        );

        state.deterioration_count = 8;
        activate_protection(&mut state, 1, "Engines").expect("ready again");
    }
}
