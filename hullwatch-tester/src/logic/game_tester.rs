use std::sync::Arc;

use anyhow::{Context, Result};
use hullwatch_game::{
    GameConfig, GameEngine, GameState, Notice, PlayerAction, ShipCatalog, ShipSession,
    StaticManifestLoader, TurnObserver, TurnOutcome,
};
use serde::Serialize;

use crate::logic::policy::{GameplayStrategy, PlayerPolicy};

/// Hard stop for runaway simulations; a healthy run never needs this many transitions.
const DEFAULT_MAX_TRANSITIONS: u32 = 500;
/// Consecutive refused calls before a run is declared stuck.
const MAX_CONSECUTIVE_REJECTIONS: u32 = 3;

/// Declarative plan for running a simulation session.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub systems: Vec<String>,
    pub config: GameConfig,
    pub strategy: GameplayStrategy,
    pub max_transitions: Option<u32>,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub fn new<S: AsRef<str>>(systems: &[S], strategy: GameplayStrategy) -> Self {
        Self {
            systems: systems.iter().map(|name| name.as_ref().to_string()).collect(),
            config: GameConfig::default(),
            strategy,
            max_transitions: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn with_max_transitions(mut self, max: u32) -> Self {
        self.max_transitions = Some(max);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// One transition as seen by the tester.
#[derive(Debug, Clone, Serialize)]
pub struct TurnRecord {
    pub turn: u32,
    pub decision: String,
    pub policy_name: String,
    pub rationale: Option<String>,
    pub accepted: bool,
    pub event: Option<String>,
    pub message: String,
    pub health: Vec<i32>,
}

/// Aggregate counters for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunMetrics {
    pub actions: u32,
    pub rejected: u32,
    pub events_fired: u32,
    pub interactive_resolved: u32,
    pub protection_activations: u32,
    pub systems_lost: Vec<String>,
}

impl RunMetrics {
    fn record(&mut self, outcome: &TurnOutcome) {
        if !outcome.accepted {
            self.rejected += 1;
            return;
        }
        if outcome.draw.as_ref().is_some_and(|draw| draw.fired()) {
            self.events_fired += 1;
        }
        if let Some(pass) = &outcome.pass {
            self.systems_lost
                .extend(pass.failed_systems().into_iter().map(str::to_string));
        }
    }
}

/// Complete record of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub turns: Vec<TurnRecord>,
    pub metrics: RunMetrics,
    pub final_state: GameState,
    pub ending_message: String,
    pub game_ended: bool,
    pub stuck: bool,
}

impl SimulationSummary {
    #[must_use]
    pub fn won(&self) -> bool {
        self.final_state.game_over && self.final_state.win
    }
}

/// Forwards engine notices to the log when verbose runs want a trace.
struct NoticeTrace;

impl TurnObserver for NoticeTrace {
    fn notice(&mut self, notice: &Notice) {
        log::debug!("notice: {notice:?}");
    }
}

/// Headless deterministic runner for the turn engine.
#[derive(Clone)]
pub struct GameTester {
    verbose: bool,
    catalog: Arc<ShipCatalog>,
}

impl GameTester {
    /// Tester backed by the manifest bundled with the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled manifest fails to load.
    pub fn try_new(verbose: bool) -> Result<Self> {
        let catalog = GameEngine::new(StaticManifestLoader).catalog()?;
        Ok(Self {
            verbose,
            catalog: Arc::new(catalog),
        })
    }

    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    /// Play one seeded run following the plan's policy.
    ///
    /// # Errors
    ///
    /// Returns an error when the plan's selection or config is invalid.
    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
        plan.config.validate().context("plan config is invalid")?;
        let templates = self
            .catalog
            .select(&plan.systems)
            .with_context(|| format!("plan selects unknown systems: {:?}", plan.systems))?;
        let mut session = ShipSession::seeded(
            templates,
            plan.config.clone(),
            self.catalog.deck().clone(),
            seed,
        );
        if self.verbose {
            session.subscribe(Box::new(NoticeTrace));
            log_initial_state(seed, plan, session.state());
        }

        let mut policy = plan.strategy.create_policy(seed);
        let mut metrics = RunMetrics::default();
        let mut turns = Vec::new();
        let mut rejections_in_a_row = 0;
        let mut stuck = false;
        let max = plan.max_transitions.unwrap_or(DEFAULT_MAX_TRANSITIONS);

        for _ in 0..max {
            if session.state().game_over {
                break;
            }
            let turn = session.state().turn;
            let (record, outcome) = step(&mut session, policy.as_mut(), turn, &mut metrics);
            metrics.record(&outcome);
            if self.verbose {
                log_turn(&record);
            }
            turns.push(record);

            if outcome.accepted {
                rejections_in_a_row = 0;
            } else {
                rejections_in_a_row += 1;
                if rejections_in_a_row >= MAX_CONSECUTIVE_REJECTIONS {
                    stuck = true;
                    break;
                }
            }
        }

        let final_state = session.into_state();
        Ok(SimulationSummary {
            seed,
            strategy: plan.strategy,
            turns,
            metrics,
            ending_message: final_state.message.clone(),
            game_ended: final_state.game_over,
            final_state,
            stuck,
        })
    }
}

fn step(
    session: &mut ShipSession,
    policy: &mut (dyn PlayerPolicy + Send),
    turn: u32,
    metrics: &mut RunMetrics,
) -> (TurnRecord, TurnOutcome) {
    let (decision, rationale, outcome) = if let Some(pending) =
        session.state().pending_interactive.clone()
    {
        let picks = policy.choose_targets(session.state(), &pending);
        let mut outcome = session.confirm_interactive(&picks);
        if outcome.accepted {
            metrics.interactive_resolved += 1;
        } else if pending.is_positive {
            outcome = session.cancel_interactive();
        }
        (
            format!("select {}", picks.join(", ")),
            Some(pending.description),
            outcome,
        )
    } else {
        let decision = policy.choose_action(session.state());
        let outcome = session.act(&decision.action);
        if outcome.accepted {
            metrics.actions += 1;
            if matches!(decision.action, PlayerAction::Activate { .. }) {
                metrics.protection_activations += 1;
            }
        }
        (format!("{:?}", decision.action), decision.rationale, outcome)
    };

    let state = session.state();
    let record = TurnRecord {
        turn,
        decision,
        policy_name: policy.name().to_string(),
        rationale,
        accepted: outcome.accepted,
        event: outcome.draw.as_ref().and_then(|draw| draw.chosen.clone()),
        message: state.message.clone(),
        health: state.systems.iter().map(|system| system.health).collect(),
    };
    (record, outcome)
}

fn log_initial_state(seed: u64, plan: &SimulationPlan, state: &GameState) {
    println!(
        "🚀 Starting simulation | seed:{seed} policy:{} rescue in {} turns",
        plan.strategy.label(),
        state.turns_remaining()
    );
    let systems: Vec<String> = state
        .systems
        .iter()
        .map(|system| format!("{}:{}", system.name, system.health))
        .collect();
    println!("📊 Initial systems | {}", systems.join(" "));
}

fn log_turn(record: &TurnRecord) {
    let status = if record.accepted { "ok" } else { "refused" };
    println!(
        "  turn {:>3} [{status}] {} | {}",
        record.turn, record.decision, record.message
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_runs_with_triage_reach_rescue() {
        let tester = GameTester::try_new(false).expect("tester");
        let plan = SimulationPlan::new(&["Engines", "Hull Integrity"], GameplayStrategy::Triage)
            .with_config(GameConfig::default().with_event_chance(0.0));
        let summary = tester.run_plan(&plan, 11).expect("run");
        assert!(summary.won());
        assert!(!summary.stuck);
        assert_eq!(summary.metrics.actions, 9);
        assert_eq!(summary.turns.len(), 9);
        assert!(summary.metrics.systems_lost.is_empty());
    }

    #[test]
    fn unknown_systems_fail_the_plan() {
        let tester = GameTester::try_new(false).expect("tester");
        let plan = SimulationPlan::new(&["Warp Core"], GameplayStrategy::Triage);
        assert!(tester.run_plan(&plan, 1).is_err());
    }

    #[test]
    fn runs_are_deterministic_per_seed() {
        let tester = GameTester::try_new(false).expect("tester");
        let names: Vec<String> = tester
            .catalog
            .names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let plan = SimulationPlan::new(&names, GameplayStrategy::Random);
        let a = tester.run_plan(&plan, 99).expect("run");
        let b = tester.run_plan(&plan, 99).expect("run");
        assert_eq!(a.final_state, b.final_state);
        assert_eq!(a.turns.len(), b.turns.len());
    }

    #[test]
    fn transition_cap_stops_long_runs() {
        let tester = GameTester::try_new(false).expect("tester");
        let plan = SimulationPlan::new(&["Engines"], GameplayStrategy::Triage)
            .with_config(GameConfig::default().with_event_chance(0.0))
            .with_max_transitions(2);
        let summary = tester.run_plan(&plan, 3).expect("run");
        assert_eq!(summary.turns.len(), 2);
        assert!(!summary.game_ended);
    }
}
