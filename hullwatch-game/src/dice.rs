//! Randomness plumbing for the turn engine.
//!
//! Every random decision in the engine is a unit roll in `[0, 1)` drawn from a
//! [`Dice`] stream. Sessions own an [`RngBundle`] with one stream per domain;
//! tests substitute [`ScriptedDice`] to pin outcomes.
use hmac::{Hmac, Mac};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use sha2::Sha256;
use std::collections::VecDeque;

use crate::numbers::{unit_to_index, unit_to_range};

/// A source of unit rolls.
pub trait Dice {
    /// Draw a value in `[0, 1)`.
    fn roll(&mut self) -> f64;

    /// Draw an index in `0..len` (0 for empty ranges).
    fn pick(&mut self, len: usize) -> usize {
        let roll = self.roll();
        unit_to_index(roll, len)
    }

    /// Draw an integer in the inclusive range `min..=max`.
    fn between(&mut self, min: i32, max: i32) -> i32 {
        let roll = self.roll();
        unit_to_range(roll, min, max)
    }

    /// True with probability `chance`.
    fn chance(&mut self, chance: f64) -> bool {
        self.roll() < chance
    }
}

/// Domain-separated dice streams consumed by one turn.
pub trait DiceBag {
    /// Stream used for system side effects and initial health.
    fn systems(&mut self) -> &mut dyn Dice;
    /// Stream used for event triggering and event effects.
    fn events(&mut self) -> &mut dyn Dice;
    /// Stream used for force-recovery attempts.
    fn recovery(&mut self) -> &mut dyn Dice;
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: RngCore> CountingRng<R> {
    /// Number of rolls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> Dice for CountingRng<R> {
    fn roll(&mut self) -> f64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.r#gen::<f64>()
    }
}

/// Bundle of RNG streams segregated by simulation domain.
#[derive(Debug, Clone)]
pub struct RngBundle {
    seed: u64,
    systems: CountingRng<SmallRng>,
    events: CountingRng<SmallRng>,
    recovery: CountingRng<SmallRng>,
}

impl RngBundle {
    /// Construct the bundle from a session seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            systems: CountingRng::new(derive_stream_seed(seed, b"systems")),
            events: CountingRng::new(derive_stream_seed(seed, b"events")),
            recovery: CountingRng::new(derive_stream_seed(seed, b"recovery")),
        }
    }

    /// Construct the bundle from operating-system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::from_seed(rand::random())
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Total rolls drawn across all streams.
    #[must_use]
    pub const fn total_draws(&self) -> u64 {
        self.systems
            .draws()
            .saturating_add(self.events.draws())
            .saturating_add(self.recovery.draws())
    }
}

impl DiceBag for RngBundle {
    fn systems(&mut self) -> &mut dyn Dice {
        &mut self.systems
    }

    fn events(&mut self) -> &mut dyn Dice {
        &mut self.events
    }

    fn recovery(&mut self) -> &mut dyn Dice {
        &mut self.recovery
    }
}

fn derive_stream_seed(session_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&session_seed.to_le_bytes()) else {
        return session_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// Replays queued rolls, falling back to a fixed value once a queue drains.
#[derive(Debug, Clone)]
pub struct ScriptedStream {
    queue: VecDeque<f64>,
    fallback: f64,
    draws: u64,
}

impl ScriptedStream {
    #[must_use]
    pub fn new(fallback: f64) -> Self {
        Self {
            queue: VecDeque::new(),
            fallback,
            draws: 0,
        }
    }

    pub fn push(&mut self, roll: f64) {
        self.queue.push_back(roll);
    }

    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Dice for ScriptedStream {
    fn roll(&mut self) -> f64 {
        self.draws = self.draws.saturating_add(1);
        self.queue.pop_front().unwrap_or(self.fallback)
    }
}

/// Deterministic [`DiceBag`] for tests and scripted tester runs.
///
/// The default fallback of `0.999` makes every chance check fail, so nothing
/// random happens unless a roll is queued for it.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    systems: ScriptedStream,
    events: ScriptedStream,
    recovery: ScriptedStream,
}

impl Default for ScriptedDice {
    fn default() -> Self {
        Self::with_fallback(0.999)
    }
}

impl ScriptedDice {
    #[must_use]
    pub fn with_fallback(fallback: f64) -> Self {
        Self {
            systems: ScriptedStream::new(fallback),
            events: ScriptedStream::new(fallback),
            recovery: ScriptedStream::new(fallback),
        }
    }

    #[must_use]
    pub fn queue_systems(mut self, rolls: &[f64]) -> Self {
        rolls.iter().for_each(|roll| self.systems.push(*roll));
        self
    }

    #[must_use]
    pub fn queue_events(mut self, rolls: &[f64]) -> Self {
        rolls.iter().for_each(|roll| self.events.push(*roll));
        self
    }

    #[must_use]
    pub fn queue_recovery(mut self, rolls: &[f64]) -> Self {
        rolls.iter().for_each(|roll| self.recovery.push(*roll));
        self
    }

    #[must_use]
    pub const fn event_stream(&self) -> &ScriptedStream {
        &self.events
    }
}

impl DiceBag for ScriptedDice {
    fn systems(&mut self) -> &mut dyn Dice {
        &mut self.systems
    }

    fn events(&mut self) -> &mut dyn Dice {
        &mut self.events
    }

    fn recovery(&mut self) -> &mut dyn Dice {
        &mut self.recovery
    }
}
