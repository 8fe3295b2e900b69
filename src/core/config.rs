//! Simulation configuration with documented constants
//!
//! Every behavioral switch the engine exposes is collected here with an
//! explanation of what it changes. The config is passed explicitly to the
//! city; there is no global instance.

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};

/// How a building resolves the storage it pulls from and pushes to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StoragePolicy {
    /// Explicit assignment if the target owns a storage, else own storage
    AssignedOrSelf,
    /// Explicit assignment if valid, else the nearest registered storage
    /// within `fetch_radius` that can meet the request (radius <= 0 means
    /// unlimited)
    AssignedOrNearby { fetch_radius: f32 },
}

impl Default for StoragePolicy {
    fn default() -> Self {
        StoragePolicy::AssignedOrSelf
    }
}

/// Which stock is discarded when an inventory shrinks below its contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationPolicy {
    /// Every kind keeps `floor(q * capacity / total)`; leftover slots go to
    /// the largest fractional remainders, ties broken by kind order
    #[default]
    Proportional,
    /// Discard from the last resource kind (declaration order) first
    ReverseKindOrder,
}

/// Configuration for the rule engine and turn loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === RULE ENGINE ===
    /// Stop evaluating the remaining rules of a phase as soon as the
    /// building levels up
    ///
    /// When true, the new level's rules never run retroactively in the
    /// phase the upgrade happened and the old level's remaining rules are
    /// skipped. When false, the old level's rule list runs to completion and
    /// the experience threshold is checked afterwards.
    pub upgrade_interrupts_phase: bool,

    /// Copy the old inventory's contents into the storage allocated on
    /// level-up (truncated to the new capacity)
    ///
    /// When false the new level starts with an empty storage.
    pub carry_storage_on_level_up: bool,

    // === RESOURCES ===
    /// Storage resolution for "assigned storage" conditions and effects
    pub storage_policy: StoragePolicy,

    /// Discard order used when storage capacity shrinks
    pub truncation_policy: TruncationPolicy,

    // === TURN LOOP ===
    /// Maximum extra turns that may be queued while one turn resolves
    ///
    /// Requests beyond this bound are dropped with a warning so a
    /// subscriber that always queues cannot spin forever.
    pub max_queued_turns: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            upgrade_interrupts_phase: true,
            carry_storage_on_level_up: false,
            storage_policy: StoragePolicy::AssignedOrSelf,
            truncation_policy: TruncationPolicy::Proportional,
            max_queued_turns: 16,
        }
    }
}

/// Wrapper for the optional `[simulation]` table of a TOML file
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    simulation: SimulationConfig,
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `[simulation]` table of a TOML document
    ///
    /// Missing keys keep their default values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        file.simulation
            .validate()
            .map_err(SimError::InvalidConfig)?;
        Ok(file.simulation)
    }

    /// Load and validate a config file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let StoragePolicy::AssignedOrNearby { fetch_radius } = self.storage_policy {
            if !fetch_radius.is_finite() {
                return Err(format!("fetch_radius ({}) must be finite", fetch_radius));
            }
        }

        if self.max_queued_turns == 0 {
            return Err("max_queued_turns must be at least 1".into());
        }

        Ok(())
    }
}
