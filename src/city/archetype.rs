//! Building archetypes - immutable templates with a level ladder

use serde::{Deserialize, Serialize};

use crate::city::environment::AuraSpec;
use crate::rules::{Rule, StatModifier};

/// Largest footprint side length an archetype may declare
pub const MAX_ARCHETYPE_SIZE: u32 = 64;

/// Largest aura ring radius an archetype may declare
pub const MAX_RING_RADIUS: u32 = 256;

/// Broad building group, used for catalog filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    #[default]
    Basic,
    Municipal,
    Industrial,
    Agricultural,
}

/// One tier of an archetype's capability curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDef {
    /// Max population before modifiers
    #[serde(default)]
    pub base_max_population: u32,
    /// Storage capacity; 0 means the level owns no storage
    #[serde(default)]
    pub base_storage_capacity: u32,
    /// Worker slots
    #[serde(default)]
    pub base_max_jobs: u32,
    /// Experience needed to advance; <= 0 marks a terminal level
    #[serde(default)]
    pub exp_to_next: i32,
    /// Folded left to right over `base_max_population`
    #[serde(default)]
    pub modifiers: Vec<StatModifier>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Projected by `apply_aura` effects
    #[serde(default)]
    pub auras: Vec<AuraSpec>,
    /// Population granted when arriving here from a population-less level 0
    #[serde(default)]
    pub arrival_population: u32,
    /// Overrides the configured discovery radius at this level; 0 ignores
    /// distance. Has no effect under the assigned-or-self policy
    #[serde(default)]
    pub fetch_radius: Option<f32>,
}

impl LevelDef {
    pub fn is_terminal(&self) -> bool {
        self.exp_to_next <= 0
    }
}

impl Default for LevelDef {
    fn default() -> Self {
        Self {
            base_max_population: 0,
            base_storage_capacity: 0,
            base_max_jobs: 0,
            exp_to_next: 0,
            modifiers: Vec::new(),
            rules: Vec::new(),
            auras: Vec::new(),
            arrival_population: 0,
            fetch_radius: None,
        }
    }
}

/// Building template
///
/// Never mutated after loading; instances share it through an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    /// Unique identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Footprint side length (S x S)
    #[serde(default = "default_size")]
    pub size: u32,
    #[serde(default)]
    pub classification: Classification,
    /// Turns under construction before rules fire
    #[serde(default)]
    pub build_turns: u32,
    /// Max live instances per city
    #[serde(default)]
    pub quantity_limit: Option<u32>,
    pub levels: Vec<LevelDef>,
}

fn default_size() -> u32 {
    1
}

impl Archetype {
    /// Level `index`, clamped to the last level
    ///
    /// Archetypes coming out of the catalog always have at least one level.
    pub fn level(&self, index: usize) -> Option<&LevelDef> {
        self.levels.get(index.min(self.levels.len().saturating_sub(1)))
    }

    pub fn max_level(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Check authoring mistakes, one message per problem
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.id.trim().is_empty() {
            problems.push("archetype with empty id".to_string());
        }
        if self.levels.is_empty() {
            problems.push(format!("{}: archetype has no levels", self.id));
        }
        if self.size == 0 {
            problems.push(format!("{}: size must be at least 1", self.id));
        } else if self.size > MAX_ARCHETYPE_SIZE {
            problems.push(format!(
                "{}: size {} exceeds the limit of {}",
                self.id, self.size, MAX_ARCHETYPE_SIZE
            ));
        }
        if self.quantity_limit == Some(0) {
            problems.push(format!("{}: quantity_limit of 0 forbids every placement", self.id));
        }
        for (idx, level) in self.levels.iter().enumerate() {
            for spec in &level.auras {
                if spec.rings.is_empty() {
                    problems.push(format!("{} level {}: aura without rings", self.id, idx));
                }
                if let Some(ring) = spec.rings.iter().find(|r| r.radius > MAX_RING_RADIUS) {
                    problems.push(format!(
                        "{} level {}: ring radius {} exceeds the limit of {}",
                        self.id, idx, ring.radius, MAX_RING_RADIUS
                    ));
                }
            }
            if let Some(radius) = level.fetch_radius {
                if !radius.is_finite() || radius < 0.0 {
                    problems.push(format!(
                        "{} level {}: fetch_radius {} must be finite and >= 0",
                        self.id, idx, radius
                    ));
                }
            }
            for modifier in &level.modifiers {
                if let StatModifier::Scale { factor } = modifier {
                    if !factor.is_finite() || *factor < 0.0 {
                        problems.push(format!(
                            "{} level {}: scale factor {} must be finite and >= 0",
                            self.id, idx, factor
                        ));
                    }
                }
            }
        }
        problems
    }
}
