//! Ship and game state owned by the turn engine.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::SystemTemplate;
use crate::config::GameConfig;
use crate::constants::{HEALTH_MAX, HEALTH_MIN, TURNS_PER_SYSTEM};
use crate::dice::Dice;
use crate::events::PendingInteractive;
use crate::modifiers::ModifierLedger;
use crate::systems::{self, ProtectionState, SystemBehavior, SystemKind};

/// A single ship subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipSystem {
    pub name: String,
    pub behavior: SystemBehavior,
    pub health: i32,
    /// Turn of the last repair; 0 when never repaired.
    pub last_fixed_turn: u32,
    /// Failure of a critical system ends the game immediately.
    pub critical: bool,
    /// Health lost per deterioration pass before modifiers.
    pub rate: i32,
}

impl ShipSystem {
    #[must_use]
    pub fn from_template(template: &SystemTemplate, health: i32) -> Self {
        Self {
            name: template.name.clone(),
            behavior: template.behavior,
            health: health.clamp(HEALTH_MIN, HEALTH_MAX),
            last_fixed_turn: 0,
            critical: template.critical,
            rate: template.rate,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> SystemKind {
        self.behavior.kind()
    }

    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.health <= HEALTH_MIN
    }

    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.is_dead()
    }

    #[must_use]
    pub const fn is_damaged(&self) -> bool {
        self.health < HEALTH_MAX
    }

    pub fn set_health(&mut self, health: i32) {
        self.health = health.clamp(HEALTH_MIN, HEALTH_MAX);
    }

    /// Remove up to `amount` health, returning the health actually lost.
    pub fn apply_damage(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.set_health(before.saturating_sub(amount.max(0)));
        before - self.health
    }

    /// Restore up to `amount` health, returning the health actually gained.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.set_health(before.saturating_add(amount.max(0)));
        self.health - before
    }
}

/// Kind-specific extension state, keyed by system name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemExtensions {
    #[serde(default)]
    pub protection: BTreeMap<String, ProtectionState>,
}

/// Complete state of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub turn: u32,
    pub max_turns: u32,
    /// Monotonic pass counter; unaffected by turn manipulation.
    pub deterioration_count: u32,
    pub systems: Vec<ShipSystem>,
    pub modifiers: ModifierLedger,
    pub game_over: bool,
    pub win: bool,
    pub message: String,
    pub interactive_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_interactive: Option<PendingInteractive>,
    #[serde(default)]
    pub extensions: SystemExtensions,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            turn: 1,
            max_turns: 0,
            deterioration_count: 0,
            systems: Vec::new(),
            modifiers: ModifierLedger::new(),
            game_over: false,
            win: false,
            message: String::new(),
            interactive_mode: false,
            pending_interactive: None,
            extensions: SystemExtensions::default(),
        }
    }
}

impl GameState {
    /// Create a fresh run from the selected templates.
    ///
    /// Normal systems start with a random health inside the configured range;
    /// active and passive systems start at full health.
    #[must_use]
    pub fn create(templates: &[SystemTemplate], config: &GameConfig, dice: &mut dyn Dice) -> Self {
        let range = config.sanitized().initial_health_range;
        let systems = templates
            .iter()
            .map(|template| {
                let health = match template.behavior.kind() {
                    SystemKind::Normal => dice.between(range.min, range.max),
                    SystemKind::Active | SystemKind::Passive => HEALTH_MAX,
                };
                ShipSystem::from_template(template, health)
            })
            .collect();
        Self::from_systems(systems)
    }

    /// Build a run from explicit systems, running each system's initializer.
    #[must_use]
    pub fn from_systems(systems: Vec<ShipSystem>) -> Self {
        let count = u32::try_from(systems.len()).unwrap_or(u32::MAX);
        let mut state = Self {
            max_turns: count.saturating_mul(TURNS_PER_SYSTEM),
            systems,
            message: format!(
                "Keep the ship running for {} turns until rescue arrives.",
                count.saturating_mul(TURNS_PER_SYSTEM)
            ),
            ..Self::default()
        };
        for idx in 0..state.systems.len() {
            systems::initialize(&mut state, idx);
        }
        state
    }

    #[must_use]
    pub fn system(&self, name: &str) -> Option<&ShipSystem> {
        self.systems.iter().find(|system| system.name == name)
    }

    pub fn system_mut(&mut self, name: &str) -> Option<&mut ShipSystem> {
        self.systems.iter_mut().find(|system| system.name == name)
    }

    #[must_use]
    pub fn system_index(&self, name: &str) -> Option<usize> {
        self.systems.iter().position(|system| system.name == name)
    }

    #[must_use]
    pub fn health_of(&self, name: &str) -> Option<i32> {
        self.system(name).map(|system| system.health)
    }

    /// True when a system with the given behavior exists and is alive.
    #[must_use]
    pub fn behavior_alive(&self, behavior: SystemBehavior) -> bool {
        self.systems
            .iter()
            .any(|system| system.behavior == behavior && system.is_alive())
    }

    #[must_use]
    pub fn alive_names(&self) -> Vec<String> {
        self.systems
            .iter()
            .filter(|system| system.is_alive())
            .map(|system| system.name.clone())
            .collect()
    }

    #[must_use]
    pub fn damaged_names(&self) -> Vec<String> {
        self.systems
            .iter()
            .filter(|system| system.is_alive() && system.is_damaged())
            .map(|system| system.name.clone())
            .collect()
    }

    #[must_use]
    pub fn turns_remaining(&self) -> u32 {
        self.max_turns.saturating_sub(self.turn)
    }

    /// True when the engine accepts player actions.
    #[must_use]
    pub const fn accepts_actions(&self) -> bool {
        !self.game_over && !self.interactive_mode
    }

    /// Clamp every system back into the legal health range.
    pub fn clamp_health(&mut self) {
        for system in &mut self.systems {
            system.set_health(system.health);
        }
    }
}
