use anyhow::{Result, ensure};
use hullwatch_game::constants::{HEALTH_MAX, HEALTH_MIN};
use hullwatch_game::{GameConfig, SystemKind};

use crate::logic::{GameplayStrategy, SimulationPlan, SimulationSummary};

const FULL_SHIP: [&str; 10] = [
    "Power",
    "Life Support",
    "Navigation",
    "Comms",
    "Engines",
    "Hull Integrity",
    "Deflector Shields",
    "Absorber Shields",
    "Protection",
    "Repair Drones",
];

/// Named simulation run with its expectations attached.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

const SCENARIOS: [(&str, &str); 6] = [
    ("smoke", "Full ship under triage; every run must end cleanly"),
    (
        "rescue-run",
        "Three systems with events disabled; triage must reach rescue",
    ),
    (
        "critical-first",
        "Power, Life Support and Navigation under the critical-first policy",
    ),
    (
        "guardian",
        "Protection-driven play on a quiet ship; shields must be raised",
    ),
    ("random-walk", "Full ship driven by seeded random choices"),
    (
        "interactive-events",
        "Events on every turn; interactive prompts must resolve",
    ),
];

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS.to_vec()
}

pub fn scenario_keys() -> Vec<&'static str> {
    SCENARIOS.iter().map(|(key, _)| *key).collect()
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let key = name.trim().to_ascii_lowercase();
    let scenario = match key.as_str() {
        "smoke" => TestScenario::simulation(
            "Smoke",
            invariant_plan(&FULL_SHIP, GameplayStrategy::Triage),
        ),
        "rescue-run" => TestScenario::simulation(
            "Rescue Run",
            invariant_plan(&["Engines", "Hull Integrity", "Comms"], GameplayStrategy::Triage)
                .with_config(quiet())
                .with_expectation(expect_rescue),
        ),
        "critical-first" => TestScenario::simulation(
            "Critical First",
            invariant_plan(
                &["Power", "Life Support", "Navigation"],
                GameplayStrategy::CriticalFirst,
            ),
        ),
        "guardian" => TestScenario::simulation(
            "Guardian",
            invariant_plan(
                &["Protection", "Engines", "Life Support", "Hull Integrity"],
                GameplayStrategy::Guardian,
            )
            .with_config(quiet())
            .with_expectation(expect_protection_used),
        ),
        "random-walk" => TestScenario::simulation(
            "Random Walk",
            invariant_plan(&FULL_SHIP, GameplayStrategy::Random),
        ),
        "interactive-events" => TestScenario::simulation(
            "Interactive Events",
            invariant_plan(&FULL_SHIP, GameplayStrategy::Triage)
                .with_config(GameConfig::default().with_event_chance(1.0))
                .with_expectation(expect_events_fired),
        ),
        _ => return None,
    };
    Some(scenario)
}

fn quiet() -> GameConfig {
    GameConfig::default().with_event_chance(0.0)
}

fn invariant_plan(systems: &[&str], strategy: GameplayStrategy) -> SimulationPlan {
    SimulationPlan::new(systems, strategy)
        .with_expectation(expect_health_in_bounds)
        .with_expectation(expect_clean_ending)
}

fn expect_health_in_bounds(summary: &SimulationSummary) -> Result<()> {
    for record in &summary.turns {
        ensure!(
            record
                .health
                .iter()
                .all(|health| (HEALTH_MIN..=HEALTH_MAX).contains(health)),
            "health left bounds on turn {}: {:?}",
            record.turn,
            record.health
        );
    }
    Ok(())
}

fn expect_clean_ending(summary: &SimulationSummary) -> Result<()> {
    ensure!(!summary.stuck, "run stuck after repeated refusals");
    ensure!(summary.game_ended, "run did not finish: {}", summary.ending_message);
    ensure!(
        !summary.final_state.interactive_mode,
        "run ended with an interactive event pending"
    );

    let state = &summary.final_state;
    if state.win {
        ensure!(
            state.turn >= state.max_turns,
            "rescued on turn {} before the deadline {}",
            state.turn,
            state.max_turns
        );
    } else {
        let critical_lost = state
            .systems
            .iter()
            .any(|system| system.critical && system.is_dead());
        let all_lost = state.systems.iter().all(|system| system.is_dead());
        ensure!(
            critical_lost || all_lost,
            "run lost without a losing condition: {}",
            state.message
        );
    }
    Ok(())
}

fn expect_rescue(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.won(), "expected rescue, got '{}'", summary.ending_message);
    ensure!(
        summary.metrics.systems_lost.is_empty(),
        "systems lost on a quiet run: {:?}",
        summary.metrics.systems_lost
    );
    Ok(())
}

fn expect_protection_used(summary: &SimulationSummary) -> Result<()> {
    let has_active = summary
        .final_state
        .systems
        .iter()
        .any(|system| system.kind() == SystemKind::Active);
    ensure!(has_active, "guardian scenario needs an active system");
    ensure!(
        summary.metrics.protection_activations >= 1,
        "protection was never activated"
    );
    Ok(())
}

fn expect_events_fired(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.metrics.events_fired >= 1, "no events fired");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        for key in scenario_keys() {
            let scenario = get_scenario(key).unwrap_or_else(|| panic!("missing {key}"));
            assert!(!scenario.plan.expectations.is_empty());
        }
        assert!(get_scenario("warp-drive").is_none());
    }

    #[test]
    fn lookup_ignores_case_and_padding() {
        let scenario = get_scenario("  Rescue-Run ").expect("scenario");
        assert_eq!(scenario.name, "Rescue Run");
        assert_eq!(scenario.plan.systems.len(), 3);
    }
}
