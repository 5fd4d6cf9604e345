//! Random events: definitions, the deck, and draw telemetry.
//!
//! Events are plain data with function-pointer effects. Immediate events
//! return a new state in one step; interactive events pause the game until
//! the player confirms (or, when allowed, cancels) a selection.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dice::Dice;
use crate::state::GameState;

pub mod catalog;
pub mod resolve;

pub use resolve::{cancel_interactive, confirm_interactive, trigger_event};

/// Effect of an immediate event.
pub type ApplyFn = fn(&GameState, &mut dyn Dice) -> Result<GameState, EventError>;
/// Deferred effect of an interactive event, given the player's selection.
pub type ResolveFn = fn(&GameState, &[String]) -> Result<GameState, EventError>;

/// Failure reported by an event effect.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("system `{0}` is not part of this ship")]
    UnknownSystem(String),
    #[error("event `{0}` changed the ship layout")]
    Malformed(String),
    #[error("event `{0}` could not be resolved")]
    Failed(String),
}

/// Invalid use of the interactive confirm/cancel calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InteractiveError {
    #[error("no event is waiting for a decision")]
    NothingPending,
    #[error("this emergency cannot be ignored")]
    CancelNegative,
    #[error("this offer must be accepted")]
    CancelNotAllowed,
    #[error("select between {min} and {max} systems (got {got})")]
    SelectionCount { min: usize, max: usize, got: usize },
    #[error("`{0}` cannot be selected")]
    IneligibleChoice(String),
}

/// Which systems an interactive prompt may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    Alive,
    /// Alive and below full health.
    Damaged,
}

impl Eligibility {
    #[must_use]
    pub fn filter(self, state: &GameState) -> Vec<String> {
        match self {
            Self::Alive => state.alive_names(),
            Self::Damaged => state.damaged_names(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractivePrompt {
    pub text: &'static str,
    pub eligibility: Eligibility,
    pub min_selections: usize,
    pub max_selections: usize,
}

#[derive(Debug, Clone, Copy)]
pub enum EventEffect {
    Immediate(ApplyFn),
    Interactive {
        prompt: InteractivePrompt,
        resolve: ResolveFn,
    },
}

/// A single event template. `description` doubles as its identifier.
#[derive(Debug, Clone, Copy)]
pub struct Event {
    pub description: &'static str,
    pub is_positive: bool,
    pub effect: EventEffect,
}

impl Event {
    #[must_use]
    pub const fn immediate(description: &'static str, is_positive: bool, apply: ApplyFn) -> Self {
        Self {
            description,
            is_positive,
            effect: EventEffect::Immediate(apply),
        }
    }

    #[must_use]
    pub const fn interactive(
        description: &'static str,
        is_positive: bool,
        prompt: InteractivePrompt,
        resolve: ResolveFn,
    ) -> Self {
        Self {
            description,
            is_positive,
            effect: EventEffect::Interactive { prompt, resolve },
        }
    }

    #[must_use]
    pub const fn is_interactive(&self) -> bool {
        matches!(self.effect, EventEffect::Interactive { .. })
    }

    #[must_use]
    pub const fn pool(&self) -> EventPool {
        if self.is_positive {
            EventPool::Positive
        } else {
            EventPool::Negative
        }
    }
}

/// Interactive event waiting on the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInteractive {
    pub description: String,
    pub is_positive: bool,
    pub prompt: String,
    pub eligible: Vec<String>,
    pub min_selections: usize,
    pub max_selections: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPool {
    Positive,
    Negative,
}

/// Explainability telemetry for one event draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraw {
    /// Roll compared against `threshold`; an event fires when it is lower.
    pub chance_roll: f64,
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_roll: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<EventPool>,
    /// Size of the chosen pool.
    #[serde(default)]
    pub candidates: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen: Option<String>,
}

impl EventDraw {
    #[must_use]
    pub const fn fired(&self) -> bool {
        self.chosen.is_some()
    }
}

/// The set of events a run may draw from.
#[derive(Debug, Clone, Default)]
pub struct EventDeck {
    events: Vec<Event>,
}

impl EventDeck {
    #[must_use]
    pub const fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Every built-in event.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(catalog::BUILTIN_EVENTS.to_vec())
    }

    #[must_use]
    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    /// Copy of the deck without the named events.
    #[must_use]
    pub fn without(&self, descriptions: &[&str]) -> Self {
        Self::new(
            self.events
                .iter()
                .filter(|event| !descriptions.contains(&event.description))
                .copied()
                .collect(),
        )
    }

    #[must_use]
    pub fn find(&self, description: &str) -> Option<&Event> {
        self.events
            .iter()
            .find(|event| event.description == description)
    }

    pub fn pool(&self, pool: EventPool) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |event| event.pool() == pool)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    #[must_use]
    pub fn descriptions(&self) -> Vec<&'static str> {
        self.events.iter().map(|event| event.description).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
