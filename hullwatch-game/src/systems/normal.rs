//! Normal systems: rate-based wear plus per-behavior side effects.
use crate::constants::{
    COMMS_BOOST_CHANCE, MSG_LIFE_SUPPORT_FAILURE, NAV_MALFUNCTION_DEAD_CHANCE,
    NAV_MALFUNCTION_TIERS, POWER_CASCADE_PENALTY, POWER_LOW_THRESHOLD, SHIELD_ABSORB_FRACTION,
    SHIELD_MODIFIER_TURNS, SHIELD_TIERS, SOURCE_SHIELDS_PREFIX,
};
use crate::dice::Dice;
use crate::events::Event;
use crate::modifiers::{DamageCategory, ModifierTarget};
use crate::numbers::scale_i32;
use crate::state::GameState;

use super::{NormalBehavior, PassEffect, SystemBehavior, apply_wear};

/// Chance that Navigation malfunctions at the given health.
#[must_use]
pub fn navigation_malfunction_chance(health: i32) -> f64 {
    if health <= 0 {
        return NAV_MALFUNCTION_DEAD_CHANCE;
    }
    NAV_MALFUNCTION_TIERS
        .iter()
        .find(|(ceiling, _)| health <= *ceiling)
        .map_or(0.0, |(_, chance)| *chance)
}

/// Global negative-event factor granted by deflector shields at the given health.
#[must_use]
pub fn deflector_factor(health: i32) -> Option<f64> {
    SHIELD_TIERS
        .iter()
        .find(|(floor, _)| health >= *floor)
        .map(|(_, factor)| *factor)
}

pub(crate) fn deteriorate(
    state: &mut GameState,
    idx: usize,
    behavior: NormalBehavior,
    dice: &mut dyn Dice,
    effects: &mut Vec<PassEffect>,
) {
    let Some((name, rate)) = state
        .systems
        .get(idx)
        .map(|system| (system.name.clone(), system.rate))
    else {
        return;
    };
    let factor = state
        .modifiers
        .effective_factor(&name, DamageCategory::Deterioration);
    let lost = apply_wear(state, idx, scale_i32(rate, factor), effects);
    log::debug!("{name} deteriorated by {lost} (factor {factor:.2})");

    match behavior {
        NormalBehavior::Power => power_cascade(state, idx, effects),
        NormalBehavior::LifeSupport => life_support_check(state, idx, effects),
        NormalBehavior::Navigation => navigation_malfunction(state, idx, dice, effects),
        NormalBehavior::Comms => comms_boost(state, idx, dice, effects),
        NormalBehavior::Standard | NormalBehavior::Shields | NormalBehavior::AbsorbingShields => {}
    }
}

fn power_cascade(state: &mut GameState, idx: usize, effects: &mut Vec<PassEffect>) {
    let Some(source) = state.systems.get(idx) else {
        return;
    };
    if source.health >= POWER_LOW_THRESHOLD {
        return;
    }
    let source = source.name.clone();
    effects.push(PassEffect::PowerCascade {
        source: source.clone(),
    });
    for victim in 0..state.systems.len() {
        if victim == idx {
            continue;
        }
        let factor = state
            .modifiers
            .effective_factor(&state.systems[victim].name, DamageCategory::Deterioration);
        apply_wear(
            state,
            victim,
            scale_i32(POWER_CASCADE_PENALTY, factor),
            effects,
        );
    }
    log::debug!("{source} is running low; other systems take a cascade penalty");
}

fn life_support_check(state: &mut GameState, idx: usize, effects: &mut Vec<PassEffect>) {
    let Some(system) = state.systems.get(idx) else {
        return;
    };
    if system.is_alive() {
        return;
    }
    let name = system.name.clone();
    state.game_over = true;
    state.win = false;
    MSG_LIFE_SUPPORT_FAILURE.clone_into(&mut state.message);
    log::info!("{name} failed; the run is over");
    effects.push(PassEffect::LifeSupportFailure { system: name });
}

fn navigation_malfunction(
    state: &mut GameState,
    idx: usize,
    dice: &mut dyn Dice,
    effects: &mut Vec<PassEffect>,
) {
    let Some(system) = state.systems.get(idx) else {
        return;
    };
    let chance = navigation_malfunction_chance(system.health);
    if chance <= 0.0 || !dice.chance(chance) {
        return;
    }
    let name = system.name.clone();
    let negated = state.behavior_alive(SystemBehavior::Normal(NormalBehavior::Comms));
    if negated {
        state.message = format!("{name} malfunctioned, but Comms kept the ship on course.");
    } else {
        state.turn = state.turn.saturating_sub(1).max(1);
        state.message = format!("{name} malfunctioned! The ship drifted and lost a turn.");
    }
    effects.push(PassEffect::NavigationMalfunction {
        system: name,
        negated,
    });
}

fn comms_boost(
    state: &mut GameState,
    idx: usize,
    dice: &mut dyn Dice,
    effects: &mut Vec<PassEffect>,
) {
    let Some(system) = state.systems.get(idx) else {
        return;
    };
    if system.is_dead() || !dice.chance(COMMS_BOOST_CHANCE) {
        return;
    }
    let name = system.name.clone();
    state.turn = state.turn.saturating_add(1);
    state.message = format!("{name} reached the rescue fleet. Rescue is one turn closer!");
    effects.push(PassEffect::CommsBoost { system: name });
}

/// Replace the deflector's global negative-event modifier for this pass.
pub(crate) fn refresh_deflector(state: &mut GameState, idx: usize) {
    let Some(system) = state.systems.get(idx) else {
        return;
    };
    let source = format!("{SOURCE_SHIELDS_PREFIX}{}", system.name);
    let factor = if system.is_alive() {
        deflector_factor(system.health)
    } else {
        None
    };
    state.modifiers.remove_by_source(&source);
    if let Some(factor) = factor {
        state.modifiers.add(
            ModifierTarget::All,
            factor,
            DamageCategory::NegativeEvents,
            SHIELD_MODIFIER_TURNS,
            source,
        );
    }
}

/// Soak part of the damage a negative event dealt to other systems.
///
/// The total absorbed never exceeds the shield's own health.
pub(crate) fn absorb_event_damage(
    state: &mut GameState,
    idx: usize,
    event: &Event,
    snapshot: &GameState,
) {
    if event.is_positive {
        return;
    }
    let Some(mut budget) = state
        .systems
        .get(idx)
        .filter(|system| system.is_alive())
        .map(|system| system.health)
    else {
        return;
    };
    let mut absorbed_total = 0;
    for (victim, before) in snapshot.systems.iter().enumerate() {
        if victim == idx || budget <= 0 {
            continue;
        }
        let Some(after) = state.systems.get_mut(victim) else {
            continue;
        };
        let dealt = before.health - after.health;
        if dealt <= 0 {
            continue;
        }
        let absorbed = scale_i32(dealt, SHIELD_ABSORB_FRACTION).min(budget);
        let healed = after.heal(absorbed);
        budget -= healed;
        absorbed_total += healed;
    }
    if absorbed_total == 0 {
        return;
    }
    let shield = &mut state.systems[idx];
    shield.apply_damage(absorbed_total);
    log::debug!("{} absorbed {absorbed_total} event damage", shield.name);
    if shield.is_dead() {
        let name = shield.name.clone();
        state.modifiers.remove_by_target(&name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SystemTemplate;
    use crate::dice::ScriptedStream;
    use crate::state::ShipSystem;

    fn system(name: &str, behavior: NormalBehavior, health: i32) -> ShipSystem {
        ShipSystem::from_template(
            &SystemTemplate::new(name, SystemBehavior::Normal(behavior)),
            health,
        )
    }

    fn quiet_dice() -> ScriptedStream {
        ScriptedStream::new(0.999)
    }

    #[test]
    fn navigation_tiers_follow_health() {
        assert!((navigation_malfunction_chance(100) - 0.0).abs() < f64::EPSILON);
        assert!((navigation_malfunction_chance(75) - 0.10).abs() < f64::EPSILON);
        assert!((navigation_malfunction_chance(50) - 0.20).abs() < f64::EPSILON);
        assert!((navigation_malfunction_chance(25) - 0.35).abs() < f64::EPSILON);
        assert!((navigation_malfunction_chance(0) - 0.50).abs() < f64::EPSILON);
    }

    #[test]
    fn deflector_steps_by_health() {
        assert_eq!(deflector_factor(95), Some(0.25));
        assert_eq!(deflector_factor(80), Some(0.5));
        assert_eq!(deflector_factor(50), Some(0.75));
        assert_eq!(deflector_factor(49), None);
    }

    #[test]
    fn low_power_cascades_into_other_systems() {
        let mut state = GameState::from_systems(vec![
            system("Power", NormalBehavior::Power, 52),
            system("Engines", NormalBehavior::Standard, 80),
            system("Hull", NormalBehavior::Standard, 80),
        ]);
        state.modifiers.add(
            ModifierTarget::system("Hull"),
            0.0,
            DamageCategory::Deterioration,
            1,
            "test",
        );
        let mut effects = Vec::new();
        deteriorate(
            &mut state,
            0,
            NormalBehavior::Power,
            &mut quiet_dice(),
            &mut effects,
        );
        assert_eq!(state.health_of("Power"), Some(47));
        assert_eq!(state.health_of("Engines"), Some(77));
        assert_eq!(state.health_of("Hull"), Some(80), "immune victims are spared");
        assert!(effects.contains(&PassEffect::PowerCascade {
            source: "Power".into()
        }));
    }

    #[test]
    fn navigation_malfunction_rolls_back_turn_without_comms() {
        let mut state =
            GameState::from_systems(vec![system("Navigation", NormalBehavior::Navigation, 30)]);
        state.turn = 4;
        let mut dice = ScriptedStream::new(0.999);
        dice.push(0.05);
        let mut effects = Vec::new();
        deteriorate(
            &mut state,
            0,
            NormalBehavior::Navigation,
            &mut dice,
            &mut effects,
        );
        assert_eq!(state.turn, 3);
        assert!(effects.contains(&PassEffect::NavigationMalfunction {
            system: "Navigation".into(),
            negated: false,
        }));
    }

    #[test]
    fn living_comms_negates_navigation_malfunction() {
        let mut state = GameState::from_systems(vec![
            system("Navigation", NormalBehavior::Navigation, 20),
            system("Comms", NormalBehavior::Comms, 60),
        ]);
        state.turn = 4;
        let mut dice = ScriptedStream::new(0.999);
        dice.push(0.05);
        let mut effects = Vec::new();
        deteriorate(
            &mut state,
            0,
            NormalBehavior::Navigation,
            &mut dice,
            &mut effects,
        );
        assert_eq!(state.turn, 4);
    }

    #[test]
    fn turn_floor_is_one() {
        let mut state =
            GameState::from_systems(vec![system("Navigation", NormalBehavior::Navigation, 0)]);
        let mut dice = ScriptedStream::new(0.0);
        let mut effects = Vec::new();
        deteriorate(
            &mut state,
            0,
            NormalBehavior::Navigation,
            &mut dice,
            &mut effects,
        );
        assert_eq!(state.turn, 1);
    }

    #[test]
    fn dead_comms_grants_nothing() {
        let mut state = GameState::from_systems(vec![system("Comms", NormalBehavior::Comms, 0)]);
        state.turn = 3;
        let mut dice = ScriptedStream::new(0.0);
        let mut effects = Vec::new();
        deteriorate(&mut state, 0, NormalBehavior::Comms, &mut dice, &mut effects);
        assert_eq!(state.turn, 3);
        assert_eq!(dice.draws(), 0);
    }

    #[test]
    fn life_support_failure_ends_the_game() {
        let mut state = GameState::from_systems(vec![system(
            "Life Support",
            NormalBehavior::LifeSupport,
            6,
        )]);
        let mut effects = Vec::new();
        deteriorate(
            &mut state,
            0,
            NormalBehavior::LifeSupport,
            &mut quiet_dice(),
            &mut effects,
        );
        assert!(state.game_over);
        assert!(!state.win);
        assert!(effects.contains(&PassEffect::SystemFailed {
            system: "Life Support".into()
        }));
    }

    #[test]
    fn deflector_replaces_its_own_modifier() {
        let mut state =
            GameState::from_systems(vec![system("Shields", NormalBehavior::Shields, 92)]);
        refresh_deflector(&mut state, 0);
        refresh_deflector(&mut state, 0);
        assert_eq!(state.modifiers.len(), 1);
        assert!(
            (state
                .modifiers
                .effective_factor("Engines", DamageCategory::NegativeEvents)
                - 0.25)
                .abs()
                < f64::EPSILON
        );

        state.systems[0].health = 40;
        refresh_deflector(&mut state, 0);
        assert!(state.modifiers.is_empty());
    }

    #[test]
    fn comms_boost_brings_rescue_a_turn_closer() {
        let mut state = GameState::from_systems(vec![system("Comms", NormalBehavior::Comms, 60)]);
        state.turn = 3;
        assert_eq!(state.turns_remaining(), 2);
        let mut dice = ScriptedStream::new(0.999);
        dice.push(0.1);
        let mut effects = Vec::new();
        deteriorate(&mut state, 0, NormalBehavior::Comms, &mut dice, &mut effects);
        assert_eq!(state.health_of("Comms"), Some(56));
        assert_eq!(state.turn, 4);
        assert_eq!(state.turns_remaining(), 1);
        assert_eq!(dice.pending(), 0);
        assert_eq!(
            effects,
            vec![PassEffect::CommsBoost {
                system: "Comms".into()
            }]
        );
    }

    #[test]
    fn comms_boost_misses_above_its_chance() {
        let mut state = GameState::from_systems(vec![system("Comms", NormalBehavior::Comms, 60)]);
        state.turn = 3;
        let mut dice = ScriptedStream::new(0.999);
        dice.push(COMMS_BOOST_CHANCE);
        let mut effects = Vec::new();
        deteriorate(&mut state, 0, NormalBehavior::Comms, &mut dice, &mut effects);
        assert_eq!(state.turn, 3);
        assert!(effects.is_empty());
    }

    #[test]
    fn navigation_and_comms_resolve_in_one_pass() {
        let mut state = GameState::from_systems(vec![
            system("Navigation", NormalBehavior::Navigation, 20),
            system("Comms", NormalBehavior::Comms, 60),
        ]);
        state.turn = 4;
        let mut dice = ScriptedStream::new(0.999);
        dice.push(0.05);
        dice.push(0.1);
        let report = crate::deterioration::run_pass(&mut state, &mut dice);
        assert_eq!(dice.draws(), 2);
        assert_eq!(state.health_of("Navigation"), Some(15));
        assert_eq!(state.health_of("Comms"), Some(56));
        assert_eq!(state.turn, 5, "malfunction negated, boost applied");
        assert_eq!(
            report.effects,
            vec![
                PassEffect::NavigationMalfunction {
                    system: "Navigation".into(),
                    negated: true,
                },
                PassEffect::CommsBoost {
                    system: "Comms".into()
                },
            ]
        );
    }

    fn absorber_ship(absorber_health: i32) -> GameState {
        GameState::from_systems(vec![
            system("Absorber", NormalBehavior::AbsorbingShields, absorber_health),
            system("Engines", NormalBehavior::Standard, 80),
            system("Hull", NormalBehavior::Standard, 60),
        ])
    }

    fn unchanged(state: &GameState, _dice: &mut dyn Dice) -> Result<GameState, crate::events::EventError> {
        Ok(state.clone())
    }

    const STRIKE: Event = Event::immediate("Strike", false, unchanged);
    const BOON: Event = Event::immediate("Boon", true, unchanged);

    fn struck(snapshot: &GameState, engines: i32, hull: i32) -> GameState {
        let mut state = snapshot.clone();
        state.systems[1].apply_damage(engines);
        state.systems[2].apply_damage(hull);
        state
    }

    #[test]
    fn absorber_heals_back_a_share_of_event_damage() {
        let snapshot = absorber_ship(80);
        let mut state = struck(&snapshot, 20, 10);
        absorb_event_damage(&mut state, 0, &STRIKE, &snapshot);
        assert_eq!(state.health_of("Engines"), Some(66));
        assert_eq!(state.health_of("Hull"), Some(53));
        assert_eq!(state.health_of("Absorber"), Some(71));
    }

    #[test]
    fn absorber_budget_is_its_own_health() {
        let snapshot = absorber_ship(5);
        let mut state = struck(&snapshot, 40, 20);
        state.modifiers.add(
            ModifierTarget::system("Absorber"),
            0.5,
            DamageCategory::Deterioration,
            2,
            "test",
        );
        absorb_event_damage(&mut state, 0, &STRIKE, &snapshot);
        assert_eq!(state.health_of("Engines"), Some(45));
        assert_eq!(state.health_of("Hull"), Some(40));
        assert_eq!(state.health_of("Absorber"), Some(0));
        assert!(state.modifiers.is_empty(), "a spent absorber drops its modifiers");
    }

    #[test]
    fn absorber_ignores_positive_events_and_dead_shields() {
        let snapshot = absorber_ship(80);
        let mut state = struck(&snapshot, 20, 10);
        let before = state.clone();
        absorb_event_damage(&mut state, 0, &BOON, &snapshot);
        assert_eq!(state.systems, before.systems);

        let snapshot = absorber_ship(0);
        let mut state = struck(&snapshot, 20, 10);
        let before = state.clone();
        absorb_event_damage(&mut state, 0, &STRIKE, &snapshot);
        assert_eq!(state.systems, before.systems);
    }
}
