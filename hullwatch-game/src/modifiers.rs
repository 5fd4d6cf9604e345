//! Damage modifier ledger.
//!
//! Modifiers are time-limited multiplicative damage factors keyed by target
//! system and damage category. Stacking is resolved when the ledger is
//! queried, never when a modifier is added: two modifiers of 0.5 yield 0.25.
//! Unknown targets never match, which leaves them at full damage.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which system a modifier protects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierTarget {
    /// Wildcard matching every system.
    All,
    System(String),
}

impl ModifierTarget {
    #[must_use]
    pub fn system(name: impl Into<String>) -> Self {
        Self::System(name.into())
    }

    fn matches(&self, system: &str) -> bool {
        match self {
            Self::All => true,
            Self::System(name) => name == system,
        }
    }
}

impl fmt::Display for ModifierTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::System(name) => f.write_str(name),
        }
    }
}

/// Category of damage a modifier applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageCategory {
    Deterioration,
    NegativeEvents,
    /// Wildcard matching every category.
    All,
}

impl DamageCategory {
    const fn matches(self, query: Self) -> bool {
        matches!(self, Self::All)
            || matches!(
                (self, query),
                (Self::Deterioration, Self::Deterioration)
                    | (Self::NegativeEvents, Self::NegativeEvents)
            )
    }
}

/// A single time-limited damage factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageModifier {
    pub target: ModifierTarget,
    pub category: DamageCategory,
    /// 0 = full immunity, 1 = no protection.
    pub factor: f64,
    pub turns_remaining: u32,
    /// Opaque tag used for bulk removal.
    pub source: String,
}

impl DamageModifier {
    fn applies_to(&self, system: &str, category: DamageCategory) -> bool {
        self.target.matches(system) && self.category.matches(category)
    }
}

/// Unordered collection of active damage modifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModifierLedger {
    entries: Vec<DamageModifier>,
}

impl ModifierLedger {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a modifier. Factors are clamped to `[0, 1]`; a zero-turn modifier is ignored.
    pub fn add(
        &mut self,
        target: ModifierTarget,
        factor: f64,
        category: DamageCategory,
        turns: u32,
        source: impl Into<String>,
    ) {
        if turns == 0 {
            return;
        }
        let factor = if factor.is_finite() {
            factor.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.entries.push(DamageModifier {
            target,
            category,
            factor,
            turns_remaining: turns,
            source: source.into(),
        });
    }

    /// Product of every applicable factor; 1.0 when nothing applies.
    #[must_use]
    pub fn effective_factor(&self, system: &str, category: DamageCategory) -> f64 {
        self.entries
            .iter()
            .filter(|modifier| modifier.applies_to(system, category))
            .map(|modifier| modifier.factor)
            .product()
    }

    /// Fraction of damage the ledger currently removes.
    #[must_use]
    pub fn protected_fraction(&self, system: &str, category: DamageCategory) -> f64 {
        1.0 - self.effective_factor(system, category)
    }

    #[must_use]
    pub fn is_immune(&self, system: &str, category: DamageCategory) -> bool {
        self.effective_factor(system, category) <= 0.0
    }

    /// Age every modifier by one turn and drop the expired ones.
    ///
    /// Returns true when the modifier set changed.
    pub fn tick(&mut self) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        for modifier in &mut self.entries {
            modifier.turns_remaining = modifier.turns_remaining.saturating_sub(1);
        }
        self.entries.retain(|modifier| modifier.turns_remaining > 0);
        true
    }

    /// Remove every modifier tagged with `source`. Returns true when anything was removed.
    pub fn remove_by_source(&mut self, source: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|modifier| modifier.source != source);
        before != self.entries.len()
    }

    /// Remove every modifier aimed at exactly `target`. Wildcard modifiers are kept.
    pub fn remove_by_target(&mut self, target: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|modifier| !matches!(&modifier.target, ModifierTarget::System(name) if name == target));
        before != self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DamageModifier> {
        self.entries.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[DamageModifier] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn has_source(&self, source: &str) -> bool {
        self.entries.iter().any(|modifier| modifier.source == source)
    }
}
