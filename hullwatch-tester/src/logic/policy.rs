use std::fmt;

use hullwatch_game::{GameState, PendingInteractive, PlayerAction, ShipSystem, SystemKind};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

/// Triage ignores systems above this health when something critical needs work.
const CRITICAL_ATTENTION: i32 = 60;
/// Guardian only spends a turn on Protection while every normal system is this healthy.
const GUARDIAN_SAFE_HEALTH: i32 = 40;

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub action: PlayerAction,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub fn new(action: PlayerAction, rationale: Option<String>) -> Self {
        Self { action, rationale }
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Pick the action for the current turn.
    fn choose_action(&mut self, state: &GameState) -> PolicyDecision;

    /// Pick systems for a pending interactive event.
    ///
    /// The default spends help on the weakest systems and damage on the
    /// healthiest non-critical ones.
    fn choose_targets(&mut self, state: &GameState, pending: &PendingInteractive) -> Vec<String> {
        let mut eligible: Vec<&ShipSystem> = pending
            .eligible
            .iter()
            .filter_map(|name| state.system(name))
            .collect();
        let wanted = if pending.is_positive {
            eligible.sort_by_key(|system| system.health);
            pending.max_selections
        } else {
            eligible.sort_by_key(|system| (system.critical, std::cmp::Reverse(system.health)));
            pending.min_selections
        };
        eligible
            .into_iter()
            .take(wanted.max(1))
            .map(|system| system.name.clone())
            .collect()
    }
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameplayStrategy {
    Triage,
    CriticalFirst,
    Guardian,
    Random,
}

impl GameplayStrategy {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            GameplayStrategy::Triage => "Triage",
            GameplayStrategy::CriticalFirst => "Critical First",
            GameplayStrategy::Guardian => "Guardian",
            GameplayStrategy::Random => "Random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            GameplayStrategy::Triage => Box::new(TriagePolicy),
            GameplayStrategy::CriticalFirst => Box::new(CriticalFirstPolicy),
            GameplayStrategy::Guardian => Box::new(GuardianPolicy),
            GameplayStrategy::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct TriagePolicy;
struct CriticalFirstPolicy;
struct GuardianPolicy;

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl PlayerPolicy for TriagePolicy {
    fn name(&self) -> &'static str {
        "Triage"
    }

    fn choose_action(&mut self, state: &GameState) -> PolicyDecision {
        triage(state)
    }
}

impl PlayerPolicy for CriticalFirstPolicy {
    fn name(&self) -> &'static str {
        "Critical First"
    }

    fn choose_action(&mut self, state: &GameState) -> PolicyDecision {
        let critical = state
            .systems
            .iter()
            .filter(|system| system.critical && system.is_alive())
            .filter(|system| system.health < CRITICAL_ATTENTION)
            .min_by_key(|system| system.health);
        match critical {
            Some(system) => PolicyDecision::new(
                PlayerAction::repair(&system.name),
                Some(format!("critical at {}", system.health)),
            ),
            None => triage(state),
        }
    }
}

impl PlayerPolicy for GuardianPolicy {
    fn name(&self) -> &'static str {
        "Guardian"
    }

    fn choose_action(&mut self, state: &GameState) -> PolicyDecision {
        let weakest = weakest_normal(state);
        if let (Some(guard), Some(target)) = (ready_protection(state), weakest)
            && target.health >= GUARDIAN_SAFE_HEALTH
        {
            return PolicyDecision::new(
                PlayerAction::activate(guard, &target.name),
                Some(format!("shield {} at {}", target.name, target.health)),
            );
        }
        triage(state)
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn choose_action(&mut self, state: &GameState) -> PolicyDecision {
        let alive: Vec<&ShipSystem> = state.systems.iter().filter(|s| s.is_alive()).collect();
        let dead: Vec<&ShipSystem> = state.systems.iter().filter(|s| s.is_dead()).collect();
        let try_recovery = !dead.is_empty() && (alive.is_empty() || self.rng.gen_bool(0.1));
        if try_recovery {
            let pick = dead[self.rng.gen_range(0..dead.len())];
            return PolicyDecision::new(
                PlayerAction::force_recover(&pick.name),
                Some("gamble".to_string()),
            );
        }
        match alive.len() {
            0 => triage(state),
            len => {
                let pick = alive[self.rng.gen_range(0..len)];
                PolicyDecision::new(
                    PlayerAction::repair(&pick.name),
                    Some(format!("roll {}", pick.health)),
                )
            }
        }
    }

    fn choose_targets(&mut self, _state: &GameState, pending: &PendingInteractive) -> Vec<String> {
        let wanted = pending.min_selections.max(1);
        let mut pool = pending.eligible.clone();
        let mut picks = Vec::with_capacity(wanted);
        while picks.len() < wanted && !pool.is_empty() {
            let idx = self.rng.gen_range(0..pool.len());
            picks.push(pool.swap_remove(idx));
        }
        picks
    }
}

/// Repair the weakest living system; gamble on a recovery only when nothing is alive.
fn triage(state: &GameState) -> PolicyDecision {
    let weakest = state
        .systems
        .iter()
        .filter(|system| system.is_alive())
        .min_by_key(|system| (system.health, !system.critical));
    if let Some(system) = weakest {
        return PolicyDecision::new(
            PlayerAction::repair(&system.name),
            Some(format!("weakest at {}", system.health)),
        );
    }
    let fallback = state
        .systems
        .first()
        .map_or_else(String::new, |system| system.name.clone());
    PolicyDecision::new(
        PlayerAction::force_recover(fallback),
        Some("nothing left running".to_string()),
    )
}

fn weakest_normal(state: &GameState) -> Option<&ShipSystem> {
    state
        .systems
        .iter()
        .filter(|system| system.kind() == SystemKind::Normal && system.is_alive())
        .min_by_key(|system| system.health)
}

fn ready_protection(state: &GameState) -> Option<&str> {
    state
        .systems
        .iter()
        .filter(|system| system.kind() == SystemKind::Active && system.is_alive())
        .find(|system| {
            state
                .extensions
                .protection
                .get(&system.name)
                .is_some_and(|protection| {
                    let mut protection = protection.clone();
                    protection.refresh(state.deterioration_count);
                    protection.can_activate()
                })
        })
        .map(|system| system.name.as_str())
}
