//! Built-in event catalog.
use crate::constants::HEALTH_MAX;
use crate::dice::Dice;
use crate::modifiers::{DamageCategory, ModifierTarget};
use crate::state::GameState;
use crate::systems::{NormalBehavior, SystemBehavior};

use super::{Eligibility, Event, EventError, InteractivePrompt};

const MICROMETEOROID_MIN: i32 = 10;
const MICROMETEOROID_MAX: i32 = 20;
const MICROMETEOROID_MAX_HITS: i32 = 3;
const POWER_SURGE_DAMAGE: i32 = 20;
const POWER_SURGE_STRAY_DAMAGE: i32 = 15;
const SOLAR_FLARE_DAMAGE: i32 = 8;
const COOLANT_LEAK_DAMAGE: i32 = 25;
const REACTOR_VENTING_DAMAGE: i32 = 30;
const SUPPLY_DROP_REPAIR: i32 = 25;
const BREAKTHROUGH_REPAIR: i32 = 10;
const SALVAGE_REVIVE_HEALTH: i32 = 25;
const SALVAGE_PATCH_REPAIR: i32 = 15;
const REINFORCEMENT_FACTOR: f64 = 0.5;
const REINFORCEMENT_TURNS: u32 = 3;
const CREW_OVERTIME_REPAIR: i32 = 30;

pub const REACTOR_VENTING: InteractivePrompt = InteractivePrompt {
    text: "The reactor must vent! Choose the system that takes the blast.",
    eligibility: Eligibility::Alive,
    min_selections: 1,
    max_selections: 1,
};

pub const CREW_OVERTIME: InteractivePrompt = InteractivePrompt {
    text: "The crew volunteers for a double shift. Choose up to two damaged systems to repair.",
    eligibility: Eligibility::Damaged,
    min_selections: 1,
    max_selections: 2,
};

pub static BUILTIN_EVENTS: [Event; 10] = [
    Event::immediate("Micrometeoroid Shower", false, micrometeoroid_shower),
    Event::immediate("Power Surge", false, power_surge),
    Event::immediate("Solar Flare", false, solar_flare),
    Event::immediate("Coolant Leak", false, coolant_leak),
    Event::interactive("Reactor Venting", false, REACTOR_VENTING, reactor_venting),
    Event::immediate("Supply Drop", true, supply_drop),
    Event::immediate("Engineering Breakthrough", true, engineering_breakthrough),
    Event::immediate("Salvage Cache", true, salvage_cache),
    Event::immediate("Hull Reinforcement", true, hull_reinforcement),
    Event::interactive("Crew Overtime", true, CREW_OVERTIME, crew_overtime),
];

fn alive_indices(state: &GameState) -> Vec<usize> {
    state
        .systems
        .iter()
        .enumerate()
        .filter(|(_, system)| system.is_alive())
        .map(|(idx, _)| idx)
        .collect()
}

fn index_of(state: &GameState, name: &str) -> Result<usize, EventError> {
    state
        .system_index(name)
        .ok_or_else(|| EventError::UnknownSystem(name.to_string()))
}

fn micrometeoroid_shower(state: &GameState, dice: &mut dyn Dice) -> Result<GameState, EventError> {
    let mut next = state.clone();
    let mut candidates = alive_indices(state);
    let hits = usize::try_from(dice.between(1, MICROMETEOROID_MAX_HITS)).unwrap_or(1);
    let mut struck = Vec::new();
    for _ in 0..hits {
        if candidates.is_empty() {
            break;
        }
        let idx = candidates.remove(dice.pick(candidates.len()));
        let damage = dice.between(MICROMETEOROID_MIN, MICROMETEOROID_MAX);
        let system = &mut next.systems[idx];
        system.apply_damage(damage);
        struck.push(system.name.clone());
    }
    next.message = if struck.is_empty() {
        "A micrometeoroid shower passed harmlessly by.".to_string()
    } else {
        format!("Micrometeoroids pelted the hull, damaging {}.", struck.join(", "))
    };
    Ok(next)
}

fn power_surge(state: &GameState, dice: &mut dyn Dice) -> Result<GameState, EventError> {
    let mut next = state.clone();
    let power = SystemBehavior::Normal(NormalBehavior::Power);
    let mut hit_power = false;
    for system in next.systems.iter_mut().filter(|system| system.behavior == power) {
        system.apply_damage(POWER_SURGE_DAMAGE);
        hit_power = true;
    }
    if hit_power {
        next.message = "A power surge overloaded the power grid!".to_string();
        return Ok(next);
    }
    let candidates = alive_indices(state);
    if candidates.is_empty() {
        next.message = "A power surge flickered through dead circuits.".to_string();
        return Ok(next);
    }
    let idx = candidates[dice.pick(candidates.len())];
    let system = &mut next.systems[idx];
    system.apply_damage(POWER_SURGE_STRAY_DAMAGE);
    next.message = format!("A power surge arced into {}!", system.name);
    Ok(next)
}

fn solar_flare(state: &GameState, _dice: &mut dyn Dice) -> Result<GameState, EventError> {
    let mut next = state.clone();
    for system in &mut next.systems {
        system.apply_damage(SOLAR_FLARE_DAMAGE);
    }
    next.message = "A solar flare washed over the ship, scorching every system.".to_string();
    Ok(next)
}

fn coolant_leak(state: &GameState, dice: &mut dyn Dice) -> Result<GameState, EventError> {
    let mut next = state.clone();
    let candidates = alive_indices(state);
    if candidates.is_empty() {
        next.message = "Coolant leaked into an empty compartment.".to_string();
        return Ok(next);
    }
    let idx = candidates[dice.pick(candidates.len())];
    let system = &mut next.systems[idx];
    system.apply_damage(COOLANT_LEAK_DAMAGE);
    next.message = format!("A coolant leak flooded {}!", system.name);
    Ok(next)
}

fn reactor_venting(state: &GameState, choice: &[String]) -> Result<GameState, EventError> {
    let mut next = state.clone();
    for name in choice {
        let idx = index_of(state, name)?;
        next.systems[idx].apply_damage(REACTOR_VENTING_DAMAGE);
    }
    next.message = format!("The reactor vented through {}.", choice.join(", "));
    Ok(next)
}

fn supply_drop(state: &GameState, _dice: &mut dyn Dice) -> Result<GameState, EventError> {
    let mut next = state.clone();
    let weakest = next
        .systems
        .iter_mut()
        .filter(|system| system.is_alive() && system.is_damaged())
        .min_by_key(|system| system.health);
    next.message = match weakest {
        Some(system) => {
            system.heal(SUPPLY_DROP_REPAIR);
            format!("A supply drop delivered spare parts for {}.", system.name)
        }
        None => "A supply drop arrived, but nothing needed fixing.".to_string(),
    };
    Ok(next)
}

fn engineering_breakthrough(
    state: &GameState,
    _dice: &mut dyn Dice,
) -> Result<GameState, EventError> {
    let mut next = state.clone();
    for system in next.systems.iter_mut().filter(|system| system.is_alive()) {
        system.heal(BREAKTHROUGH_REPAIR);
    }
    next.message = "An engineering breakthrough improved every working system.".to_string();
    Ok(next)
}

fn salvage_cache(state: &GameState, dice: &mut dyn Dice) -> Result<GameState, EventError> {
    let mut next = state.clone();
    let dead: Vec<usize> = state
        .systems
        .iter()
        .enumerate()
        .filter(|(_, system)| system.is_dead())
        .map(|(idx, _)| idx)
        .collect();
    if !dead.is_empty() {
        let system = &mut next.systems[dead[dice.pick(dead.len())]];
        system.set_health(SALVAGE_REVIVE_HEALTH);
        next.message = format!("Salvaged parts brought {} back online!", system.name);
        return Ok(next);
    }
    let damaged: Vec<usize> = alive_indices(state)
        .into_iter()
        .filter(|idx| state.systems[*idx].health < HEALTH_MAX)
        .collect();
    if damaged.is_empty() {
        next.message = "A salvage cache turned up nothing useful.".to_string();
        return Ok(next);
    }
    let system = &mut next.systems[damaged[dice.pick(damaged.len())]];
    system.heal(SALVAGE_PATCH_REPAIR);
    next.message = format!("Salvaged parts patched up {}.", system.name);
    Ok(next)
}

fn hull_reinforcement(state: &GameState, _dice: &mut dyn Dice) -> Result<GameState, EventError> {
    let mut next = state.clone();
    next.modifiers.add(
        ModifierTarget::All,
        REINFORCEMENT_FACTOR,
        DamageCategory::NegativeEvents,
        REINFORCEMENT_TURNS,
        "event:Hull Reinforcement",
    );
    next.message =
        "The crew reinforced the bulkheads. Event damage is halved for a few turns.".to_string();
    Ok(next)
}

fn crew_overtime(state: &GameState, choice: &[String]) -> Result<GameState, EventError> {
    let mut next = state.clone();
    for name in choice {
        let idx = index_of(state, name)?;
        next.systems[idx].heal(CREW_OVERTIME_REPAIR);
    }
    next.message = format!("The overtime crew repaired {}.", choice.join(", "));
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SystemTemplate;
    use crate::dice::ScriptedStream;
    use crate::state::ShipSystem;

    fn ship(systems: &[(&str, NormalBehavior, i32)]) -> GameState {
        GameState::from_systems(
            systems
                .iter()
                .map(|(name, behavior, health)| {
                    ShipSystem::from_template(
                        &SystemTemplate::new(*name, SystemBehavior::Normal(*behavior)),
                        *health,
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn power_surge_prefers_the_power_grid() {
        let state = ship(&[
            ("Power", NormalBehavior::Power, 80),
            ("Engines", NormalBehavior::Standard, 80),
        ]);
        let next = power_surge(&state, &mut ScriptedStream::new(0.0)).expect("surge");
        assert_eq!(next.health_of("Power"), Some(60));
        assert_eq!(next.health_of("Engines"), Some(80));
    }

    #[test]
    fn solar_flare_hits_everything_and_clamps() {
        let state = ship(&[
            ("Engines", NormalBehavior::Standard, 5),
            ("Hull", NormalBehavior::Standard, 50),
        ]);
        let next = solar_flare(&state, &mut ScriptedStream::new(0.0)).expect("flare");
        assert_eq!(next.health_of("Engines"), Some(0));
        assert_eq!(next.health_of("Hull"), Some(42));
    }

    #[test]
    fn supply_drop_targets_the_weakest_system() {
        let state = ship(&[
            ("Engines", NormalBehavior::Standard, 60),
            ("Hull", NormalBehavior::Standard, 30),
        ]);
        let next = supply_drop(&state, &mut ScriptedStream::new(0.0)).expect("drop");
        assert_eq!(next.health_of("Hull"), Some(55));
        assert_eq!(next.health_of("Engines"), Some(60));
    }

    #[test]
    fn salvage_revives_dead_systems_first() {
        let state = ship(&[
            ("Engines", NormalBehavior::Standard, 60),
            ("Hull", NormalBehavior::Standard, 0),
        ]);
        let next = salvage_cache(&state, &mut ScriptedStream::new(0.0)).expect("salvage");
        assert_eq!(next.health_of("Hull"), Some(25));
        assert_eq!(next.health_of("Engines"), Some(60));
    }

    #[test]
    fn interactive_resolvers_reject_unknown_systems() {
        let state = ship(&[("Engines", NormalBehavior::Standard, 60)]);
        assert_eq!(
            crew_overtime(&state, &["Warp Core".to_string()]).expect_err("unknown"),
            EventError::UnknownSystem("Warp Core".into())
        );
        let next = crew_overtime(&state, &["Engines".to_string()]).expect("overtime");
        assert_eq!(next.health_of("Engines"), Some(90));
    }

    #[test]
    fn micrometeoroids_only_strike_living_systems() {
        let state = ship(&[
            ("Engines", NormalBehavior::Standard, 80),
            ("Comms", NormalBehavior::Comms, 0),
            ("Hull", NormalBehavior::Standard, 80),
        ]);
        let mut dice = ScriptedStream::new(0.0);
        for roll in [0.99, 0.0, 0.0, 0.0, 0.5] {
            dice.push(roll);
        }
        let next = micrometeoroid_shower(&state, &mut dice).expect("shower");
        assert_eq!(next.health_of("Engines"), Some(70));
        assert_eq!(next.health_of("Comms"), Some(0));
        assert_eq!(next.health_of("Hull"), Some(65));
        assert_eq!(dice.draws(), 5, "three hits rolled but only two targets");
        assert!(next.message.contains("Engines, Hull"));
    }

    #[test]
    fn coolant_leak_floods_one_living_system() {
        let state = ship(&[
            ("Engines", NormalBehavior::Standard, 80),
            ("Hull", NormalBehavior::Standard, 60),
        ]);
        let next = coolant_leak(&state, &mut ScriptedStream::new(0.99)).expect("leak");
        assert_eq!(next.health_of("Engines"), Some(80));
        assert_eq!(next.health_of("Hull"), Some(35));

        let wreck = ship(&[("Engines", NormalBehavior::Standard, 0)]);
        let next = coolant_leak(&wreck, &mut ScriptedStream::new(0.0)).expect("leak");
        assert_eq!(next.systems, wreck.systems);
        assert_eq!(next.message, "Coolant leaked into an empty compartment.");
    }

    #[test]
    fn reactor_venting_hits_the_chosen_system() {
        let state = ship(&[
            ("Engines", NormalBehavior::Standard, 80),
            ("Hull", NormalBehavior::Standard, 60),
        ]);
        let next = reactor_venting(&state, &["Hull".to_string()]).expect("venting");
        assert_eq!(next.health_of("Hull"), Some(30));
        assert_eq!(next.health_of("Engines"), Some(80));
        assert!(reactor_venting(&state, &["Warp Core".to_string()]).is_err());
    }

    #[test]
    fn breakthrough_heals_only_working_systems() {
        let state = ship(&[
            ("Engines", NormalBehavior::Standard, 95),
            ("Hull", NormalBehavior::Standard, 50),
            ("Comms", NormalBehavior::Comms, 0),
        ]);
        let next = engineering_breakthrough(&state, &mut ScriptedStream::new(0.0))
            .expect("breakthrough");
        assert_eq!(next.health_of("Engines"), Some(100));
        assert_eq!(next.health_of("Hull"), Some(60));
        assert_eq!(next.health_of("Comms"), Some(0));
    }

    #[test]
    fn reinforcement_halves_event_damage_for_everyone() {
        let state = ship(&[("Engines", NormalBehavior::Standard, 70)]);
        let next = hull_reinforcement(&state, &mut ScriptedStream::new(0.0)).expect("reinforce");
        assert_eq!(next.systems, state.systems);
        assert_eq!(next.modifiers.len(), 1);
        let events = next
            .modifiers
            .effective_factor("Anything", DamageCategory::NegativeEvents);
        assert!((events - 0.5).abs() < f64::EPSILON);
        let wear = next
            .modifiers
            .effective_factor("Engines", DamageCategory::Deterioration);
        assert!((wear - 1.0).abs() < f64::EPSILON);
    }
}
