//! Centralized balance and tuning constants for the Hullwatch turn engine.
//!
//! Gameplay math lives here so that balance changes go through code review
//! instead of drifting inside data files.

// Health ------------------------------------------------------------------
pub const HEALTH_MAX: i32 = 100;
pub const HEALTH_MIN: i32 = 0;
pub(crate) const FORCE_RECOVERY_HEALTH: i32 = 50;

// Turn budget --------------------------------------------------------------
pub(crate) const TURNS_PER_SYSTEM: u32 = 5;

// Deterioration rates ------------------------------------------------------
pub(crate) const RATE_STANDARD: i32 = 5;
pub(crate) const RATE_POWER: i32 = 5;
pub(crate) const RATE_LIFE_SUPPORT: i32 = 8;
pub(crate) const RATE_NAVIGATION: i32 = 5;
pub(crate) const RATE_COMMS: i32 = 4;
pub(crate) const RATE_SHIELDS: i32 = 4;

// Power ----------------------------------------------------------------------
pub(crate) const POWER_LOW_THRESHOLD: i32 = 50;
pub(crate) const POWER_CASCADE_PENALTY: i32 = 3;

// Navigation malfunction tiers (health ceiling, chance) -----------------------
pub(crate) const NAV_MALFUNCTION_TIERS: [(i32, f64); 3] = [(25, 0.35), (50, 0.20), (75, 0.10)];
pub(crate) const NAV_MALFUNCTION_DEAD_CHANCE: f64 = 0.50;

// Comms ----------------------------------------------------------------------
pub(crate) const COMMS_BOOST_CHANCE: f64 = 0.15;

// Shields --------------------------------------------------------------------
pub(crate) const SHIELD_TIERS: [(i32, f64); 3] = [(90, 0.25), (75, 0.5), (50, 0.75)];
pub(crate) const SHIELD_MODIFIER_TURNS: u32 = 1;
pub(crate) const SHIELD_ABSORB_FRACTION: f64 = 0.3;

// Protection -----------------------------------------------------------------
pub(crate) const PROTECTION_DURATION: u32 = 3;
pub(crate) const PROTECTION_COOLDOWN: u32 = 5;

// Repair drones --------------------------------------------------------------
pub(crate) const DRONE_REPAIR_AMOUNT: i32 = 5;

// Defaults for tunables ------------------------------------------------------
pub(crate) const DEFAULT_EVENT_CHANCE: f64 = 0.30;
pub(crate) const DEFAULT_POSITIVE_EVENT_PROBABILITY: f64 = 0.50;
pub(crate) const DEFAULT_FORCE_RECOVERY_CHANCE: f64 = 0.10;
pub(crate) const DEFAULT_INITIAL_HEALTH_MIN: i32 = 50;
pub(crate) const DEFAULT_INITIAL_HEALTH_MAX: i32 = 100;

// Modifier sources -----------------------------------------------------------
pub(crate) const SOURCE_PROTECTION_PREFIX: &str = "protection:";
pub(crate) const SOURCE_SHIELDS_PREFIX: &str = "shields:";

// Status messages ------------------------------------------------------------
pub(crate) const MSG_EVENT_FAILED: &str = "Something went wrong while resolving the event. No changes were made.";
pub(crate) const MSG_LIFE_SUPPORT_FAILURE: &str = "Life support has failed. The crew cannot survive.";
pub(crate) const MSG_ALL_SYSTEMS_DOWN: &str = "Every system aboard has failed. The ship is lost.";
pub(crate) const MSG_RESCUED: &str = "Rescue has arrived! The crew survived.";
pub(crate) const MSG_ACTIONS_LOCKED: &str = "Resolve the pending event before taking another action.";
pub(crate) const MSG_GAME_FINISHED: &str = "The game is over. Start a new run to play again.";
