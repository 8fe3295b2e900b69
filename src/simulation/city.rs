//! City - building registry and per-phase rule dispatch
//!
//! Buildings are kept in insertion order; every phase walks them front to
//! back so two buildings competing for one storage resolve the same way on
//! every run.

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::AHashMap;
use serde::Serialize;

use crate::city::building::{BuildingInstance, Placement};
use crate::city::catalog::ArchetypeCatalog;
use crate::city::environment::CityEnvironment;
use crate::city::inventory::Inventory;
use crate::city::network::ResourceNetwork;
use crate::city::tech::TechTree;
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{BuildingId, Cell, ResourceAmount, ResourceKind, Turn, TurnPhase, Vec2};
use crate::rules::{EffectOutcome, RuleContext, Verdict};
use crate::simulation::turn::{PhaseSubscriber, TurnControl};
use crate::spatial::coords::GridBounds;

/// A rule whose conditions did not all pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleFailure {
    pub building: BuildingId,
    /// Index into the level's rule list
    pub rule_index: usize,
    pub label: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelUp {
    pub building: BuildingId,
    pub from: usize,
    pub to: usize,
}

/// What happened during one phase
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseReport {
    pub turn: Turn,
    pub phase: TurnPhase,
    pub rules_evaluated: u32,
    pub rules_passed: u32,
    pub rules_failed: u32,
    pub failures: Vec<RuleFailure>,
    pub level_ups: Vec<LevelUp>,
    pub constructions_completed: Vec<BuildingId>,
}

impl PhaseReport {
    pub fn new(turn: Turn, phase: TurnPhase) -> Self {
        Self {
            turn,
            phase,
            rules_evaluated: 0,
            rules_passed: 0,
            rules_failed: 0,
            failures: Vec::new(),
            level_ups: Vec::new(),
            constructions_completed: Vec::new(),
        }
    }
}

/// Storage snapshot for presentation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageView {
    pub capacity: u32,
    pub total: u32,
    pub contents: BTreeMap<ResourceKind, u32>,
}

impl From<&Inventory> for StorageView {
    fn from(inv: &Inventory) -> Self {
        Self {
            capacity: inv.capacity(),
            total: inv.total_quantity(),
            contents: inv.iter().collect(),
        }
    }
}

/// Read-only snapshot of one building
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingView {
    pub id: BuildingId,
    pub archetype: String,
    pub level: usize,
    pub experience: u32,
    pub population: u32,
    pub max_population: u32,
    pub workers: u32,
    pub max_jobs: u32,
    pub construction_turns_left: u32,
    pub center: Vec2,
    pub assigned_storage: Option<BuildingId>,
    pub storage: Option<StorageView>,
}

/// All runtime state of one city
pub struct City {
    catalog: ArchetypeCatalog,
    buildings: Vec<BuildingInstance>,
    index: AHashMap<BuildingId, usize>,
    occupied: AHashMap<Cell, BuildingId>,
    next_id: u64,
    network: ResourceNetwork,
    environment: CityEnvironment,
    tech: TechTree,
    config: SimulationConfig,
    /// Reports collected while driven by a `TurnDriver`
    reports: Vec<PhaseReport>,
}

impl City {
    pub fn new(catalog: ArchetypeCatalog, config: SimulationConfig) -> Self {
        Self {
            catalog,
            buildings: Vec::new(),
            index: AHashMap::new(),
            occupied: AHashMap::new(),
            next_id: 1,
            network: ResourceNetwork::new(),
            environment: CityEnvironment::new(),
            tech: TechTree::new(),
            config,
            reports: Vec::new(),
        }
    }

    /// Restrict placement and auras to `bounds`
    pub fn with_bounds(mut self, bounds: GridBounds) -> Self {
        self.environment = CityEnvironment::with_bounds(bounds);
        self
    }

    // === Queries ===

    pub fn catalog(&self) -> &ArchetypeCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn network(&self) -> &ResourceNetwork {
        &self.network
    }

    pub fn environment(&self) -> &CityEnvironment {
        &self.environment
    }

    pub fn tech(&self) -> &TechTree {
        &self.tech
    }

    pub fn tech_mut(&mut self) -> &mut TechTree {
        &mut self.tech
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn building(&self, id: BuildingId) -> Option<&BuildingInstance> {
        self.index.get(&id).map(|idx| &self.buildings[*idx])
    }

    /// Buildings in insertion order
    pub fn buildings(&self) -> impl Iterator<Item = &BuildingInstance> {
        self.buildings.iter()
    }

    pub fn inventory_of(&self, id: BuildingId) -> Option<&Inventory> {
        self.network.inventory_of(id)
    }

    pub fn max_population(&self, id: BuildingId) -> Option<u32> {
        self.building(id)
            .map(|b| b.max_population(&self.tech, &self.environment))
    }

    pub fn view(&self, id: BuildingId) -> Option<BuildingView> {
        self.building(id).map(|b| self.view_of(b))
    }

    pub fn views(&self) -> Vec<BuildingView> {
        self.buildings.iter().map(|b| self.view_of(b)).collect()
    }

    fn view_of(&self, b: &BuildingInstance) -> BuildingView {
        BuildingView {
            id: b.id(),
            archetype: b.archetype().id.clone(),
            level: b.level(),
            experience: b.experience(),
            population: b.population(),
            max_population: b.max_population(&self.tech, &self.environment),
            workers: b.workers(),
            max_jobs: b.max_jobs(),
            construction_turns_left: b.construction_turns_left(),
            center: b.center(),
            assigned_storage: b.assigned_storage(),
            storage: self.network.inventory_of(b.id()).map(StorageView::from),
        }
    }

    /// Drain reports collected by `on_phase`
    pub fn take_reports(&mut self) -> Vec<PhaseReport> {
        std::mem::take(&mut self.reports)
    }

    // === Commands ===

    /// Place a new level-0 building of `archetype_id` at `center`
    pub fn construct_at(&mut self, archetype_id: &str, center: Vec2) -> Result<BuildingId> {
        let archetype = self
            .catalog
            .get(archetype_id)
            .ok_or_else(|| SimError::UnknownArchetype(archetype_id.to_string()))?;
        self.construct(archetype_id, Placement::at(center, archetype.size))
    }

    /// Place a new level-0 building of `archetype_id` on `placement`
    ///
    /// Fails without touching state if the archetype is unknown, its quantity
    /// limit is reached, or the footprint is wrong, off-map or occupied.
    pub fn construct(&mut self, archetype_id: &str, placement: Placement) -> Result<BuildingId> {
        let archetype = self
            .catalog
            .get(archetype_id)
            .ok_or_else(|| SimError::UnknownArchetype(archetype_id.to_string()))?;

        if let Some(limit) = archetype.quantity_limit {
            let live = self
                .buildings
                .iter()
                .filter(|b| Arc::ptr_eq(b.archetype(), &archetype))
                .count();
            if live >= limit as usize {
                return Err(SimError::QuantityLimitReached {
                    archetype: archetype.id.clone(),
                    limit,
                });
            }
        }

        let expected = (archetype.size as usize).pow(2);
        if placement.cells().len() != expected {
            return Err(SimError::InvalidPlacement(format!(
                "{} needs {} cells, got {}",
                archetype.id,
                expected,
                placement.cells().len()
            )));
        }
        if let Some(bounds) = self.environment.bounds() {
            if let Some(cell) = placement.cells().iter().find(|c| !bounds.contains(**c)) {
                return Err(SimError::InvalidPlacement(format!("cell {} is off the map", cell)));
            }
        }
        if let Some((cell, other)) = placement
            .cells()
            .iter()
            .find_map(|c| self.occupied.get(c).map(|o| (*c, *o)))
        {
            return Err(SimError::InvalidPlacement(format!(
                "cell {} is occupied by {}",
                cell, other
            )));
        }

        let id = BuildingId(self.next_id);
        let instance = BuildingInstance::new(id, archetype, placement)?;
        self.next_id += 1;

        instance.attach_storage(&mut self.network, None, self.config.truncation_policy);
        for cell in instance.cells() {
            self.occupied.insert(*cell, id);
        }
        tracing::info!(
            building = %id,
            archetype = %instance.archetype().id,
            center = ?instance.center(),
            "building constructed"
        );
        self.index.insert(id, self.buildings.len());
        self.buildings.push(instance);
        Ok(id)
    }

    /// Set a building's worker count; returns the clamped count
    pub fn assign_workers(&mut self, id: BuildingId, count: u32) -> Result<u32> {
        let building = self.building_mut(id)?;
        let kept = building.assign_workers(count);
        if kept < count {
            tracing::debug!(building = %id, requested = count, kept, "workers clamped");
        }
        Ok(kept)
    }

    /// Point `id` at `target`'s storage, or clear the link with `None`
    pub fn assign_storage(&mut self, id: BuildingId, target: Option<BuildingId>) -> Result<()> {
        if let Some(target) = target {
            if !self.index.contains_key(&target) {
                return Err(SimError::BuildingNotFound(target));
            }
        }
        self.building_mut(id)?.set_assigned_storage(target);
        Ok(())
    }

    /// Put resources into a building's own storage; returns the amount stored
    pub fn seed_stock(&mut self, id: BuildingId, items: &[ResourceAmount]) -> Result<u32> {
        if !self.index.contains_key(&id) {
            return Err(SimError::BuildingNotFound(id));
        }
        let inv = self.network.inventory_of_mut(id).ok_or(SimError::NoStorage(id))?;
        Ok(inv.add_all(items))
    }

    /// Remove a building with its storage and auras
    pub fn demolish(&mut self, id: BuildingId) -> Result<()> {
        let idx = *self.index.get(&id).ok_or(SimError::BuildingNotFound(id))?;
        let removed = self.buildings.remove(idx);

        if let Some(inv) = self.network.unregister_storage(id) {
            if !inv.is_empty() {
                let lost = inv.total_quantity();
                tracing::debug!(building = %id, lost, "stock lost on demolition");
            }
        }
        self.environment.remove_aura(id);
        for cell in removed.cells() {
            self.occupied.remove(cell);
        }
        for building in &mut self.buildings {
            if building.assigned_storage() == Some(id) {
                building.set_assigned_storage(None);
            }
        }

        self.index.remove(&id);
        for (pos, building) in self.buildings.iter().enumerate().skip(idx) {
            self.index.insert(building.id(), pos);
        }
        tracing::info!(building = %id, archetype = %removed.archetype().id, "building demolished");
        Ok(())
    }

    fn building_mut(&mut self, id: BuildingId) -> Result<&mut BuildingInstance> {
        let idx = *self.index.get(&id).ok_or(SimError::BuildingNotFound(id))?;
        Ok(&mut self.buildings[idx])
    }

    // === Phase dispatch ===

    /// Evaluate every building's rules for `phase`
    ///
    /// Buildings under construction skip their rules; post-turn counts their
    /// construction down and fires `construction_complete` rules once when
    /// it finishes. Afterwards every population is clamped to its freshly
    /// computed maximum.
    pub fn run_phase(&mut self, turn: Turn, phase: TurnPhase) -> PhaseReport {
        let mut report = PhaseReport::new(turn, phase);
        let City { buildings, network, environment, tech, config, .. } = self;
        let mut ctx = RuleContext::new(network, environment, tech, config);

        for building in buildings.iter_mut() {
            if !building.is_operational() {
                if phase == TurnPhase::PostTurn && building.advance_construction() {
                    tracing::info!(
                        building = %building.id(),
                        archetype = %building.archetype().id,
                        "construction complete"
                    );
                    report.constructions_completed.push(building.id());
                    run_rules(building, TurnPhase::ConstructionComplete, &mut ctx, &mut report);
                }
                continue;
            }
            run_rules(building, phase, &mut ctx, &mut report);
        }

        // Revoke bonuses lost during the phase
        for building in buildings.iter_mut() {
            let max = building.max_population(ctx.tech, ctx.environment);
            let population = building.population();
            if population > max {
                tracing::debug!(
                    building = %building.id(),
                    from = population,
                    to = max,
                    "population clamped"
                );
            }
            building.set_population(population, max);
        }

        report
    }
}

/// One building's rules for one trigger, then the automatic level check
fn run_rules(
    building: &mut BuildingInstance,
    trigger: TurnPhase,
    ctx: &mut RuleContext,
    report: &mut PhaseReport,
) {
    // Hold the level's rule list even if an effect levels the building up
    let archetype = Arc::clone(building.archetype());
    let Some(level) = archetype.level(building.level()) else {
        tracing::warn!(
            building = %building.id(),
            archetype = %archetype.id,
            "archetype has no levels"
        );
        return;
    };
    let interrupts = ctx.config.upgrade_interrupts_phase;

    'rules: for (rule_index, rule) in level.rules.iter().enumerate() {
        if rule.trigger != trigger {
            continue;
        }
        report.rules_evaluated += 1;

        let mut failure = None;
        for condition in &rule.conditions {
            if let Verdict::Fail(reason) = condition.evaluate(building, ctx) {
                failure = Some(reason);
                break;
            }
        }

        let effects = match failure {
            None => {
                report.rules_passed += 1;
                &rule.on_success
            }
            Some(reason) => {
                report.rules_failed += 1;
                tracing::debug!(
                    building = %building.id(),
                    rule = rule_index,
                    label = rule.label.as_deref().unwrap_or("unnamed"),
                    %reason,
                    "rule failed"
                );
                report.failures.push(RuleFailure {
                    building: building.id(),
                    rule_index,
                    label: rule.label.clone(),
                    reason,
                });
                &rule.on_failure
            }
        };

        for effect in effects {
            let from = building.level();
            if effect.apply(building, ctx) == EffectOutcome::LeveledUp {
                let to = building.level();
                report.level_ups.push(LevelUp { building: building.id(), from, to });
                if interrupts {
                    break 'rules;
                }
            }
        }
    }

    if building.threshold_reached() {
        let from = building.level();
        building.level_up(ctx);
        report.level_ups.push(LevelUp { building: building.id(), from, to: building.level() });
    }
}

impl PhaseSubscriber for City {
    fn on_phase(&mut self, turn: Turn, phase: TurnPhase, _control: &mut TurnControl) {
        let report = self.run_phase(turn, phase);
        self.reports.push(report);
    }
}
