//! Hullwatch Game Engine
//!
//! Platform-agnostic turn engine for Hullwatch, a ship-survival game where the
//! player keeps a failing starship alive until rescue arrives. The crate holds
//! every rule of the game and no presentation code: front ends drive a
//! [`ShipSession`] and listen through [`TurnObserver`].

pub mod catalog;
pub mod config;
pub mod constants;
pub mod deterioration;
pub mod dice;
pub mod events;
pub mod modifiers;
pub mod notify;
pub mod numbers;
pub mod state;
pub mod systems;
pub mod turn;
pub mod verdict;

use anyhow::Context;

// Re-export commonly used types
pub use catalog::{CatalogError, ShipCatalog, ShipManifest, SystemEntry, SystemTemplate, ValidationMode};
pub use config::{ConfigError, GameConfig, HealthRange};
pub use deterioration::{PassReport, run_pass};
pub use dice::{Dice, DiceBag, RngBundle, ScriptedDice};
pub use events::{
    Eligibility, Event, EventDeck, EventDraw, EventError, EventPool, InteractiveError,
    PendingInteractive,
};
pub use modifiers::{DamageCategory, DamageModifier, ModifierLedger, ModifierTarget};
pub use notify::{Notice, NoticeLog, Notices, TurnObserver};
pub use state::{GameState, ShipSystem};
pub use systems::{
    ActiveBehavior, NormalBehavior, PassEffect, PassiveBehavior, SystemBehavior, SystemKind,
};
pub use turn::{ActionError, PlayerAction, ShipSession, TurnKernel, TurnOutcome, TurnReport};
pub use verdict::{LossCause, Verdict};

/// Source of the ship manifest.
/// Front ends provide their own implementation; the bundled one is [`StaticManifestLoader`].
pub trait ManifestLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the manifest describing which systems a ship can carry.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be read or parsed.
    fn load_manifest(&self) -> Result<ShipManifest, Self::Error>;
}

/// Loads the manifest compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticManifestLoader;

impl ManifestLoader for StaticManifestLoader {
    type Error = std::convert::Infallible;

    fn load_manifest(&self) -> Result<ShipManifest, Self::Error> {
        Ok(ShipManifest::load_from_static())
    }
}

/// Loads a manifest from an in-memory JSON document.
#[derive(Debug, Clone)]
pub struct JsonManifestLoader {
    json: String,
}

impl JsonManifestLoader {
    #[must_use]
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }
}

impl ManifestLoader for JsonManifestLoader {
    type Error = serde_json::Error;

    fn load_manifest(&self) -> Result<ShipManifest, Self::Error> {
        ShipManifest::from_json(&self.json)
    }
}

/// Main game engine for creating sessions from a manifest source
pub struct GameEngine<L: ManifestLoader> {
    loader: L,
    mode: ValidationMode,
}

impl<L: ManifestLoader> GameEngine<L> {
    /// Create an engine that validates manifests leniently.
    pub const fn new(loader: L) -> Self {
        Self {
            loader,
            mode: ValidationMode::Lenient,
        }
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Load and validate the catalog of available systems and events.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be loaded, or if strict
    /// validation rejects one of its entries.
    pub fn catalog(&self) -> anyhow::Result<ShipCatalog> {
        let manifest = self
            .loader
            .load_manifest()
            .context("failed to load ship manifest")?;
        ShipCatalog::from_manifest(&manifest, self.mode).context("ship manifest failed validation")
    }

    /// Start a new run with the chosen systems, in the order given.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be built, a selected system is
    /// unknown or repeated, or the config violates its bounds.
    pub fn create_session<S: AsRef<str>>(
        &self,
        selection: &[S],
        config: GameConfig,
    ) -> anyhow::Result<ShipSession> {
        let (templates, deck) = self.prepare(selection, &config)?;
        Ok(ShipSession::new(templates, config, deck))
    }

    /// Like [`Self::create_session`] but with reproducible dice.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_session`].
    pub fn create_seeded_session<S: AsRef<str>>(
        &self,
        selection: &[S],
        config: GameConfig,
        seed: u64,
    ) -> anyhow::Result<ShipSession> {
        let (templates, deck) = self.prepare(selection, &config)?;
        Ok(ShipSession::seeded(templates, config, deck, seed))
    }

    fn prepare<S: AsRef<str>>(
        &self,
        selection: &[S],
        config: &GameConfig,
    ) -> anyhow::Result<(Vec<SystemTemplate>, EventDeck)> {
        config.validate().context("invalid game config")?;
        let catalog = self.catalog()?;
        let templates = catalog
            .select(selection)
            .context("invalid system selection")?;
        anyhow::ensure!(!templates.is_empty(), "select at least one system");
        Ok((templates, catalog.deck().clone()))
    }
}

impl Default for GameEngine<StaticManifestLoader> {
    fn default() -> Self {
        Self::new(StaticManifestLoader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "systems": [
            { "name": "Reactor", "kind": "normal", "behavior": "power" },
            { "name": "Air", "kind": "normal", "behavior": "life_support" },
            { "name": "Guard", "kind": "active", "behavior": "protection" }
        ],
        "disabled_events": ["Solar Flare"]
    }"#;

    #[test]
    fn engine_builds_sessions_from_a_json_manifest() {
        let engine = GameEngine::new(JsonManifestLoader::new(FIXTURE));
        let session = engine
            .create_seeded_session(&["Air", "Reactor"], GameConfig::default(), 9)
            .expect("session");
        let names: Vec<&str> = session
            .state()
            .systems
            .iter()
            .map(|system| system.name.as_str())
            .collect();
        assert_eq!(names, vec!["Air", "Reactor"]);
        assert_eq!(session.state().max_turns, 10);
        assert!(session.deck().find("Solar Flare").is_none());
    }

    #[test]
    fn engine_rejects_bad_input() {
        let engine = GameEngine::new(JsonManifestLoader::new(FIXTURE));
        assert!(engine.create_session(&["Warp Core"], GameConfig::default()).is_err());
        assert!(engine.create_session::<&str>(&[], GameConfig::default()).is_err());
        assert!(
            engine
                .create_session(&["Air"], GameConfig::default().with_event_chance(2.0))
                .is_err()
        );

        let broken = GameEngine::new(JsonManifestLoader::new("{ not json"));
        let err = broken.catalog().expect_err("parse failure");
        assert!(err.to_string().contains("failed to load ship manifest"));
    }

    #[test]
    fn default_engine_uses_the_bundled_manifest() {
        let catalog = GameEngine::default().catalog().expect("bundled manifest");
        assert!(catalog.template("Life Support").is_some());
    }
}
