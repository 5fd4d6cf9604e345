//! Tunable parameters consumed by the turn engine.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_EVENT_CHANCE, DEFAULT_FORCE_RECOVERY_CHANCE, DEFAULT_INITIAL_HEALTH_MAX,
    DEFAULT_INITIAL_HEALTH_MIN, DEFAULT_POSITIVE_EVENT_PROBABILITY, HEALTH_MAX, HEALTH_MIN,
};

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("initial health minimum {min} exceeds maximum {max}")]
    HealthRangeInverted { min: i32, max: i32 },
}

/// Inclusive starting-health window applied to normal systems at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRange {
    #[serde(default = "HealthRange::default_min")]
    pub min: i32,
    #[serde(default = "HealthRange::default_max")]
    pub max: i32,
}

impl HealthRange {
    const fn default_min() -> i32 {
        DEFAULT_INITIAL_HEALTH_MIN
    }

    const fn default_max() -> i32 {
        DEFAULT_INITIAL_HEALTH_MAX
    }

    /// A degenerate range that always yields `value`.
    #[must_use]
    pub const fn fixed(value: i32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    fn validate(self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("initial_health_range.min", self.min),
            ("initial_health_range.max", self.max),
        ] {
            if !(HEALTH_MIN..=HEALTH_MAX).contains(&value) {
                return Err(ConfigError::RangeViolation {
                    field,
                    min: f64::from(HEALTH_MIN),
                    max: f64::from(HEALTH_MAX),
                    value: f64::from(value),
                });
            }
        }
        if self.min > self.max {
            return Err(ConfigError::HealthRangeInverted {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

impl Default for HealthRange {
    fn default() -> Self {
        Self {
            min: Self::default_min(),
            max: Self::default_max(),
        }
    }
}

/// Engine tunables. Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "GameConfig::default_event_chance")]
    pub event_chance: f64,
    #[serde(default = "GameConfig::default_positive_event_probability")]
    pub positive_event_probability: f64,
    #[serde(default)]
    pub initial_health_range: HealthRange,
    #[serde(default = "GameConfig::default_force_recovery_chance")]
    pub force_recovery_chance: f64,
    /// When false, interactive positive events must be resolved; declining is refused.
    #[serde(default = "GameConfig::default_allow_cancel_positive_interactive")]
    pub allow_cancel_positive_interactive: bool,
}

impl GameConfig {
    const fn default_event_chance() -> f64 {
        DEFAULT_EVENT_CHANCE
    }

    const fn default_positive_event_probability() -> f64 {
        DEFAULT_POSITIVE_EVENT_PROBABILITY
    }

    const fn default_force_recovery_chance() -> f64 {
        DEFAULT_FORCE_RECOVERY_CHANCE
    }

    const fn default_allow_cancel_positive_interactive() -> bool {
        true
    }

    /// Load configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate configuration invariants before sanitization.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_probability("event_chance", self.event_chance)?;
        validate_probability(
            "positive_event_probability",
            self.positive_event_probability,
        )?;
        validate_probability("force_recovery_chance", self.force_recovery_chance)?;
        self.initial_health_range.validate()?;
        Ok(())
    }

    /// Clamp every field into its legal range.
    pub fn sanitize(&mut self) {
        self.event_chance = sanitize_probability(self.event_chance, DEFAULT_EVENT_CHANCE);
        self.positive_event_probability = sanitize_probability(
            self.positive_event_probability,
            DEFAULT_POSITIVE_EVENT_PROBABILITY,
        );
        self.force_recovery_chance =
            sanitize_probability(self.force_recovery_chance, DEFAULT_FORCE_RECOVERY_CHANCE);
        let range = &mut self.initial_health_range;
        range.min = range.min.clamp(HEALTH_MIN, HEALTH_MAX);
        range.max = range.max.clamp(HEALTH_MIN, HEALTH_MAX);
        if range.min > range.max {
            std::mem::swap(&mut range.min, &mut range.max);
        }
    }

    /// Return a sanitized copy.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let mut cfg = self.clone();
        cfg.sanitize();
        cfg
    }

    #[must_use]
    pub const fn with_event_chance(mut self, chance: f64) -> Self {
        self.event_chance = chance;
        self
    }

    #[must_use]
    pub const fn with_positive_event_probability(mut self, probability: f64) -> Self {
        self.positive_event_probability = probability;
        self
    }

    #[must_use]
    pub const fn with_initial_health(mut self, range: HealthRange) -> Self {
        self.initial_health_range = range;
        self
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            event_chance: Self::default_event_chance(),
            positive_event_probability: Self::default_positive_event_probability(),
            initial_health_range: HealthRange::default(),
            force_recovery_chance: Self::default_force_recovery_chance(),
            allow_cancel_positive_interactive: Self::default_allow_cancel_positive_interactive(),
        }
    }
}

fn validate_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::RangeViolation {
            field,
            min: 0.0,
            max: 1.0,
            value,
        });
    }
    Ok(())
}

fn sanitize_probability(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let cfg = GameConfig::from_json("{}").expect("deserialize");
        assert_eq!(cfg, GameConfig::default());
        cfg.validate().expect("defaults are valid");
        assert!((cfg.event_chance - 0.3).abs() < f64::EPSILON);
        assert!((cfg.positive_event_probability - 0.5).abs() < f64::EPSILON);
        assert_eq!(cfg.initial_health_range, HealthRange { min: 50, max: 100 });
    }

    #[test]
    fn validation_rejects_out_of_range_probability() {
        let cfg = GameConfig::default().with_event_chance(1.4);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RangeViolation { field, .. }) if field == "event_chance"
        ));
    }

    #[test]
    fn validation_rejects_inverted_health_range() {
        let cfg = GameConfig::default().with_initial_health(HealthRange { min: 90, max: 60 });
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::HealthRangeInverted { min: 90, max: 60 })
        );
    }

    #[test]
    fn sanitize_clamps_and_restores_defaults() {
        let mut cfg = GameConfig {
            event_chance: f64::NAN,
            positive_event_probability: -0.5,
            initial_health_range: HealthRange { min: 120, max: 10 },
            ..GameConfig::default()
        };
        cfg.sanitize();
        assert!((cfg.event_chance - DEFAULT_EVENT_CHANCE).abs() < f64::EPSILON);
        assert!(cfg.positive_event_probability.abs() < f64::EPSILON);
        assert_eq!(cfg.initial_health_range, HealthRange { min: 10, max: 100 });
        cfg.validate().expect("sanitized config is valid");
    }
}
