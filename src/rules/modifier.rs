//! Stat modifiers folded over a level's base maxima

use serde::{Deserialize, Serialize};

use crate::city::environment::CityEnvironment;
use crate::city::tech::TechTree;
use crate::core::types::{AuraCategory, Cell};

/// One `(category, minimum)` requirement of an environment bonus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentRequirement {
    pub category: AuraCategory,
    pub min: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatModifier {
    /// Add `add` when the tech node is unlocked
    RequiresTechNode { node: String, add: i32 },
    /// Add `add` when every requirement is met by at least one footprint
    /// cell (each requirement may be met by a different cell)
    EnvironmentBonus { requirements: Vec<EnvironmentRequirement>, add: i32 },
    /// Multiply the running value, rounded
    Scale { factor: f32 },
}

impl StatModifier {
    /// Apply to the running value; unmet modifiers return it unchanged
    pub fn apply(
        &self,
        value: u32,
        cells: &[Cell],
        tech: &TechTree,
        environment: &CityEnvironment,
    ) -> u32 {
        match self {
            StatModifier::RequiresTechNode { node, add } => {
                if tech.has_node(node) {
                    offset(value, *add)
                } else {
                    value
                }
            }
            StatModifier::EnvironmentBonus { requirements, add } => {
                let met = requirements
                    .iter()
                    .all(|req| environment.any_cell_at_least(cells, req.category, req.min));
                if met {
                    offset(value, *add)
                } else {
                    value
                }
            }
            StatModifier::Scale { factor } => {
                let scaled = (value as f32 * factor).round();
                if scaled.is_finite() && scaled > 0.0 {
                    scaled.min(u32::MAX as f32) as u32
                } else {
                    0
                }
            }
        }
    }
}

/// Fold `modifiers` left to right starting from `base`
pub fn fold_modifiers(
    base: u32,
    modifiers: &[StatModifier],
    cells: &[Cell],
    tech: &TechTree,
    environment: &CityEnvironment,
) -> u32 {
    modifiers
        .iter()
        .fold(base, |acc, m| m.apply(acc, cells, tech, environment))
}

fn offset(value: u32, add: i32) -> u32 {
    if add >= 0 {
        value.saturating_add(add as u32)
    } else {
        value.saturating_sub(add.unsigned_abs())
    }
}
