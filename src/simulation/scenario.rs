//! Scenarios and the top-level simulation loop
//!
//! A scenario is a TOML description of a starting city: unlocked tech,
//! optional map bounds and a list of placements.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::city::catalog::ArchetypeCatalog;
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{BuildingId, ResourceAmount, Turn, Vec2};
use crate::simulation::city::{City, PhaseReport};
use crate::simulation::turn::TurnDriver;
use crate::spatial::coords::GridBounds;

/// One building to place when the scenario starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementSpec {
    pub archetype: String,
    pub center: Vec2,
    #[serde(default)]
    pub workers: u32,
    /// Index of another placement whose storage this one uses
    #[serde(default)]
    pub assign_to: Option<usize>,
    /// Initial contents of the building's own storage
    #[serde(default)]
    pub stock: Vec<ResourceAmount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tech: Vec<String>,
    #[serde(default)]
    pub bounds: Option<GridBounds>,
    #[serde(default)]
    pub placements: Vec<PlacementSpec>,
}

impl Scenario {
    pub fn parse_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Build a ready-to-run simulation
    pub fn build(&self, catalog: ArchetypeCatalog, config: SimulationConfig) -> Result<Simulation> {
        config.validate().map_err(SimError::InvalidConfig)?;

        let mut city = City::new(catalog, config);
        if let Some(bounds) = self.bounds {
            city = city.with_bounds(bounds);
        }
        for node in &self.tech {
            city.tech_mut().unlock(node.as_str());
        }

        let mut ids: Vec<BuildingId> = Vec::with_capacity(self.placements.len());
        for spec in &self.placements {
            ids.push(city.construct_at(&spec.archetype, spec.center)?);
        }

        for (idx, spec) in self.placements.iter().enumerate() {
            let id = ids[idx];
            if let Some(target) = spec.assign_to {
                if target == idx || target >= ids.len() {
                    return Err(SimError::InvalidScenario(format!(
                        "placement {} assigned to invalid placement {}",
                        idx, target
                    )));
                }
                city.assign_storage(id, Some(ids[target]))?;
            }
            if spec.workers > 0 {
                city.assign_workers(id, spec.workers)?;
            }
            if !spec.stock.is_empty() {
                city.seed_stock(id, &spec.stock)?;
            }
        }

        tracing::info!(
            scenario = self.name.as_deref().unwrap_or("unnamed"),
            buildings = ids.len(),
            "scenario built"
        );
        Ok(Simulation::new(city))
    }
}

/// Everything that happened during one `advance_turn` call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReport {
    /// Last turn that ran
    pub turn: Turn,
    /// Turns run, including queued ones
    pub turns_run: u32,
    pub phases: Vec<PhaseReport>,
}

impl TurnReport {
    pub fn level_up_count(&self) -> usize {
        self.phases.iter().map(|p| p.level_ups.len()).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.phases.iter().map(|p| p.failures.len()).sum()
    }
}

/// Top-level loop: owns the driver and the city
pub struct Simulation {
    driver: TurnDriver,
    city: City,
}

impl Simulation {
    pub fn new(city: City) -> Self {
        let driver = TurnDriver::new(city.config().max_queued_turns);
        Self { driver, city }
    }

    pub fn city(&self) -> &City {
        &self.city
    }

    pub fn city_mut(&mut self) -> &mut City {
        &mut self.city
    }

    pub fn current_turn(&self) -> Turn {
        self.driver.current_turn()
    }

    /// Run one full turn (and any queued ones)
    pub fn advance_turn(&mut self) -> TurnReport {
        let turns_run = self.driver.advance(&mut [&mut self.city]);
        TurnReport {
            turn: self.driver.current_turn(),
            turns_run,
            phases: self.city.take_reports(),
        }
    }
}
