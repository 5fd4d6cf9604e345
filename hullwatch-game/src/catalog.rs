//! Ship manifest loading and validation.
//!
//! A manifest lists the systems a player may pick plus the events to leave out
//! of the deck. Entries are checked against the static behavior registry;
//! [`ValidationMode::Lenient`] drops bad entries with a warning while
//! [`ValidationMode::Strict`] rejects the whole manifest.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use thiserror::Error;

use crate::constants::HEALTH_MAX;
use crate::events::EventDeck;
use crate::systems::{SystemBehavior, SystemKind};

const DEFAULT_SHIP_DATA: &str = include_str!("../data/ship.json");

/// Errors raised while validating a manifest or a system selection.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse ship manifest: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("system entry #{index} has an empty name")]
    EmptyName { index: usize },
    #[error("system `{0}` is declared more than once")]
    DuplicateName(String),
    #[error("system `{name}` uses unknown behavior `{behavior}`")]
    UnknownBehavior { name: String, behavior: String },
    #[error("system `{name}` is declared {declared} but behavior `{behavior}` is {actual}")]
    KindMismatch {
        name: String,
        declared: SystemKind,
        behavior: String,
        actual: SystemKind,
    },
    #[error("system `{name}` cannot deteriorate or be repaired")]
    MissingCapability { name: String },
    #[error("system `{name}` has rate {rate}; rates must be between 0 and 100")]
    InvalidRate { name: String, rate: i32 },
    #[error("event `{0}` does not exist")]
    UnknownEvent(String),
    #[error("no systems were selected")]
    EmptySelection,
    #[error("system `{0}` is not in the catalog")]
    UnknownSelection(String),
    #[error("system `{0}` was selected twice")]
    DuplicateSelection(String),
}

/// How manifest problems are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Abort on the first invalid entry.
    Strict,
    /// Drop invalid entries and keep going.
    #[default]
    Lenient,
}

/// Raw system entry as written in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemEntry {
    pub name: String,
    pub kind: SystemKind,
    pub behavior: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<bool>,
}

/// Serialized ship definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipManifest {
    #[serde(default)]
    pub systems: Vec<SystemEntry>,
    /// Event descriptions removed from the deck for this ship.
    #[serde(default)]
    pub disabled_events: Vec<String>,
}

impl ShipManifest {
    /// Parse the manifest bundled with the crate.
    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_SHIP_DATA).unwrap_or_default()
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a manifest.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Immutable blueprint for one selectable system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemTemplate {
    pub name: String,
    pub behavior: SystemBehavior,
    pub rate: i32,
    pub critical: bool,
}

impl SystemTemplate {
    /// Template using the behavior's default rate and criticality.
    #[must_use]
    pub fn new(name: impl Into<String>, behavior: SystemBehavior) -> Self {
        Self {
            name: name.into(),
            behavior,
            rate: behavior.default_rate(),
            critical: behavior.default_critical(),
        }
    }

    #[must_use]
    pub const fn with_rate(mut self, rate: i32) -> Self {
        self.rate = rate;
        self
    }

    #[must_use]
    pub const fn with_critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    #[must_use]
    pub const fn kind(&self) -> SystemKind {
        self.behavior.kind()
    }

    fn from_entry(entry: &SystemEntry, index: usize) -> Result<Self, CatalogError> {
        let name = entry.name.trim();
        if name.is_empty() {
            return Err(CatalogError::EmptyName { index });
        }
        let Some(behavior) = SystemBehavior::from_key(&entry.behavior) else {
            return Err(CatalogError::UnknownBehavior {
                name: name.to_string(),
                behavior: entry.behavior.clone(),
            });
        };
        if behavior.kind() != entry.kind {
            return Err(CatalogError::KindMismatch {
                name: name.to_string(),
                declared: entry.kind,
                behavior: entry.behavior.clone(),
                actual: behavior.kind(),
            });
        }
        let caps = behavior.capabilities();
        if entry.kind == SystemKind::Normal && !(caps.deteriorate && caps.fix) {
            return Err(CatalogError::MissingCapability {
                name: name.to_string(),
            });
        }
        let rate = entry.rate.unwrap_or_else(|| behavior.default_rate());
        if !(0..=HEALTH_MAX).contains(&rate) {
            return Err(CatalogError::InvalidRate {
                name: name.to_string(),
                rate,
            });
        }
        Ok(Self {
            name: name.to_string(),
            behavior,
            rate,
            critical: entry.critical.unwrap_or_else(|| behavior.default_critical()),
        })
    }
}

/// Validated systems and the event deck available to a run.
#[derive(Debug, Clone, Default)]
pub struct ShipCatalog {
    systems: Vec<SystemTemplate>,
    deck: EventDeck,
}

impl ShipCatalog {
    /// Validate a manifest against the behavior registry and the built-in events.
    ///
    /// # Errors
    ///
    /// In strict mode, returns the first `CatalogError` found. Lenient mode never fails.
    pub fn from_manifest(manifest: &ShipManifest, mode: ValidationMode) -> Result<Self, CatalogError> {
        let mut systems = Vec::with_capacity(manifest.systems.len());
        let mut seen = HashSet::new();
        for (index, entry) in manifest.systems.iter().enumerate() {
            let checked = SystemTemplate::from_entry(entry, index).and_then(|template| {
                if seen.contains(&template.name) {
                    Err(CatalogError::DuplicateName(template.name))
                } else {
                    Ok(template)
                }
            });
            match checked {
                Ok(template) => {
                    seen.insert(template.name.clone());
                    systems.push(template);
                }
                Err(err) => reject(mode, err)?,
            }
        }

        let builtin = EventDeck::builtin();
        let mut disabled = Vec::with_capacity(manifest.disabled_events.len());
        for description in &manifest.disabled_events {
            if builtin.find(description).is_some() {
                disabled.push(description.as_str());
            } else {
                reject(mode, CatalogError::UnknownEvent(description.clone()))?;
            }
        }

        Ok(Self {
            systems,
            deck: builtin.without(&disabled),
        })
    }

    /// Parse and validate a manifest document.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed JSON, or a validation error in strict mode.
    pub fn from_json(json: &str, mode: ValidationMode) -> Result<Self, CatalogError> {
        let manifest = ShipManifest::from_json(json)?;
        Self::from_manifest(&manifest, mode)
    }

    /// The catalog built from the bundled manifest.
    #[must_use]
    pub fn default_catalog() -> &'static Self {
        static CATALOG: OnceLock<ShipCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| {
            Self::from_manifest(&ShipManifest::load_from_static(), ValidationMode::Lenient)
                .unwrap_or_default()
        })
    }

    #[must_use]
    pub fn systems(&self) -> &[SystemTemplate] {
        &self.systems
    }

    #[must_use]
    pub fn template(&self, name: &str) -> Option<&SystemTemplate> {
        self.systems.iter().find(|template| template.name == name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.systems.iter().map(|template| template.name.as_str()).collect()
    }

    #[must_use]
    pub const fn deck(&self) -> &EventDeck {
        &self.deck
    }

    /// Resolve a player selection into templates, preserving selection order.
    ///
    /// # Errors
    ///
    /// Returns an error for empty selections, unknown names or duplicates.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<SystemTemplate>, CatalogError> {
        if names.is_empty() {
            return Err(CatalogError::EmptySelection);
        }
        let mut seen = HashSet::new();
        names
            .iter()
            .map(|name| {
                let name = name.as_ref().trim();
                if !seen.insert(name.to_string()) {
                    return Err(CatalogError::DuplicateSelection(name.to_string()));
                }
                self.template(name)
                    .cloned()
                    .ok_or_else(|| CatalogError::UnknownSelection(name.to_string()))
            })
            .collect()
    }
}

fn reject(mode: ValidationMode, err: CatalogError) -> Result<(), CatalogError> {
    match mode {
        ValidationMode::Strict => Err(err),
        ValidationMode::Lenient => {
            log::warn!("skipping manifest entry: {err}");
            Ok(())
        }
    }
}
