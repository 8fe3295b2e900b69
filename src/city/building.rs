//! Building instances - mutable runtime state for one placed building

use std::sync::Arc;

use serde::Serialize;

use crate::city::archetype::{Archetype, LevelDef};
use crate::city::environment::{AuraSourceId, CityEnvironment};
use crate::city::inventory::Inventory;
use crate::city::network::{ResourceNetwork, StorageId};
use crate::city::tech::TechTree;
use crate::core::config::TruncationPolicy;
use crate::core::error::{Result, SimError};
use crate::core::types::{BuildingId, Cell, Vec2};
use crate::rules::context::RuleContext;
use crate::rules::modifier::fold_modifiers;
use crate::spatial::coords::{center_from_cells, footprint_cells};

/// Occupied cells and the geometric center of a footprint
///
/// Only built through `at` or `from_cells`, so the cells always form a
/// gap-free square.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    cells: Vec<Cell>,
    center: Vec2,
    /// Even footprints center on a grid intersection
    center_is_corner: bool,
}

impl Placement {
    /// Square footprint of `size` around `center`, snapped to the grid
    pub fn at(center: Vec2, size: u32) -> Self {
        let size = size.max(1);
        Self {
            cells: footprint_cells(center, size),
            center: Vec2::new(center.x.round(), center.y.round()),
            center_is_corner: size % 2 == 0,
        }
    }

    /// Placement from explicit cells, which must form a gap-free square
    pub fn from_cells(mut cells: Vec<Cell>) -> Result<Self> {
        let footprint = center_from_cells(&cells).ok_or_else(|| {
            SimError::InvalidPlacement(format!("{} cells do not form a square", cells.len()))
        })?;
        cells.sort_by_key(|c| (c.y, c.x));
        cells.dedup();
        Ok(Self {
            cells,
            center: footprint.center,
            center_is_corner: footprint.center_is_corner,
        })
    }

    /// Occupied cells, row-major
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn center_is_corner(&self) -> bool {
        self.center_is_corner
    }

    /// Side length of the square
    pub fn size(&self) -> u32 {
        (self.cells.len() as f64).sqrt().round() as u32
    }
}

/// A placed building
///
/// `level` always indexes into `archetype.levels`: instances are only built
/// from archetypes with at least one level and level changes clamp.
#[derive(Debug, Clone)]
pub struct BuildingInstance {
    id: BuildingId,
    archetype: Arc<Archetype>,
    level: usize,
    experience: u32,
    population: u32,
    workers: u32,
    construction_turns_left: u32,
    /// Non-owning link to another building's storage
    assigned_storage: Option<BuildingId>,
    placement: Placement,
}

impl BuildingInstance {
    /// New level-0 instance with empty stats
    ///
    /// Storage is not registered here; see `attach_storage`.
    pub fn new(id: BuildingId, archetype: Arc<Archetype>, placement: Placement) -> Result<Self> {
        if archetype.levels.is_empty() {
            return Err(SimError::InvalidConfig(format!(
                "archetype {} has no levels",
                archetype.id
            )));
        }
        let construction_turns_left = archetype.build_turns;
        Ok(Self {
            id,
            archetype,
            level: 0,
            experience: 0,
            population: 0,
            workers: 0,
            construction_turns_left,
            assigned_storage: None,
            placement,
        })
    }

    pub fn id(&self) -> BuildingId {
        self.id
    }

    pub fn archetype(&self) -> &Arc<Archetype> {
        &self.archetype
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn level_def(&self) -> &LevelDef {
        &self.archetype.levels[self.level]
    }

    pub fn experience(&self) -> u32 {
        self.experience
    }

    pub fn population(&self) -> u32 {
        self.population
    }

    pub fn workers(&self) -> u32 {
        self.workers
    }

    pub fn assigned_storage(&self) -> Option<BuildingId> {
        self.assigned_storage
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn cells(&self) -> &[Cell] {
        &self.placement.cells
    }

    pub fn center(&self) -> Vec2 {
        self.placement.center
    }

    pub fn is_operational(&self) -> bool {
        self.construction_turns_left == 0
    }

    pub fn construction_turns_left(&self) -> u32 {
        self.construction_turns_left
    }

    /// Base max population folded through the level's modifiers
    pub fn max_population(&self, tech: &TechTree, environment: &CityEnvironment) -> u32 {
        let level = self.level_def();
        fold_modifiers(
            level.base_max_population,
            &level.modifiers,
            &self.placement.cells,
            tech,
            environment,
        )
    }

    pub fn max_jobs(&self) -> u32 {
        self.level_def().base_max_jobs
    }

    pub(crate) fn set_population(&mut self, population: u32, max: u32) {
        self.population = population.min(max);
    }

    pub(crate) fn add_experience(&mut self, amount: u32) {
        self.experience = self.experience.saturating_add(amount);
    }

    /// Set the worker count, clamped to max jobs; returns the count kept
    pub fn assign_workers(&mut self, count: u32) -> u32 {
        self.workers = count.min(self.max_jobs());
        self.workers
    }

    pub fn set_assigned_storage(&mut self, target: Option<BuildingId>) {
        self.assigned_storage = target;
    }

    /// Count one construction turn down; true when it just finished
    pub(crate) fn advance_construction(&mut self) -> bool {
        if self.construction_turns_left == 0 {
            return false;
        }
        self.construction_turns_left -= 1;
        self.construction_turns_left == 0
    }

    /// Whether the automatic end-of-phase check would level up now
    pub fn threshold_reached(&self) -> bool {
        let level = self.level_def();
        !level.is_terminal()
            && self.level < self.archetype.max_level()
            && i64::from(self.experience) >= i64::from(level.exp_to_next)
    }

    /// Register storage for the current level if it has capacity
    ///
    /// `carried` contents are kept up to the new capacity.
    pub(crate) fn attach_storage(
        &self,
        network: &mut ResourceNetwork,
        carried: Option<Inventory>,
        policy: TruncationPolicy,
    ) -> Option<StorageId> {
        let capacity = self.level_def().base_storage_capacity;
        if capacity == 0 {
            return None;
        }
        let mut inventory = carried.unwrap_or_default();
        inventory.set_capacity(capacity);
        inventory.truncate_excess(policy);
        Some(network.register_storage(self.id, self.placement.center, inventory))
    }

    /// Replace this building's auras with the current level's
    pub(crate) fn project_auras(&self, environment: &mut CityEnvironment) {
        environment.remove_aura(self.id);
        for spec in &self.level_def().auras {
            environment.apply_aura(
                self.id,
                self.placement.center,
                self.placement.center_is_corner,
                spec.category,
                &spec.rings,
            );
        }
    }

    /// Manual upgrade; ignores experience but never leaves a terminal or
    /// final level
    pub fn try_upgrade(&mut self, ctx: &mut RuleContext) -> bool {
        if self.level_def().is_terminal() || self.level >= self.archetype.max_level() {
            return false;
        }
        self.level_up(ctx);
        true
    }

    pub(crate) fn level_up(&mut self, ctx: &mut RuleContext) {
        let from = self.level;
        let leaving_empty_start = from == 0 && self.level_def().base_max_population == 0;

        let old_storage = ctx.network.unregister_storage(self.id);
        self.level = (self.level + 1).min(self.archetype.max_level());
        self.experience = 0;

        let carried = if ctx.config.carry_storage_on_level_up { old_storage } else { None };
        self.attach_storage(ctx.network, carried, ctx.config.truncation_policy);

        if leaving_empty_start {
            self.population = self.population.max(self.level_def().arrival_population);
        }
        let max = self.max_population(ctx.tech, ctx.environment);
        self.population = self.population.min(max);
        self.workers = self.workers.min(self.max_jobs());

        if ctx.environment.has_source(&AuraSourceId::from(self.id)) {
            self.project_auras(ctx.environment);
        }

        tracing::info!(
            building = %self.id,
            archetype = %self.archetype.id,
            from,
            to = self.level,
            "building leveled up"
        );
    }
}
