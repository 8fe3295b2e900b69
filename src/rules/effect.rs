//! Effects - single mutations applied by a rule branch

use serde::{Deserialize, Serialize};

use crate::city::building::BuildingInstance;
use crate::core::types::{ResourceAmount, ResourceKind};
use crate::rules::condition::per_population;
use crate::rules::context::RuleContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    /// Clamped to `[0, max population]`
    ChangePopulation { delta: i32 },
    AddExperience { amount: u32 },
    /// Manual upgrade, independent of the experience threshold
    UpgradeToNextLevel,
    ConsumeFromSelf { costs: Vec<ResourceAmount> },
    ConsumeFromAssigned { costs: Vec<ResourceAmount> },
    AddToSelf { items: Vec<ResourceAmount> },
    AddToAssigned { items: Vec<ResourceAmount> },
    /// Consume `ceil(population * per_capita)` from assigned storage
    ConsumePerPopulation { resource: ResourceKind, per_capita: f64 },
    /// Add `workers * per_worker`, to own storage unless `to_assigned`
    AddPerWorker {
        resource: ResourceKind,
        per_worker: u32,
        #[serde(default)]
        to_assigned: bool,
    },
    /// Move from own storage to assigned storage; `None` moves everything
    /// held, capped by the target's free space
    TransferToAssigned {
        resource: ResourceKind,
        #[serde(default)]
        amount: Option<u32>,
    },
    /// Re-project the current level's auras, keyed by this building
    ApplyAura,
    RemoveAura,
    /// Recompute own capacity from the level's base capacity
    AdjustStorageCapacityWithWorkers {
        low_threshold: u32,
        full_threshold: u32,
        low_multiplier: f32,
        normal_multiplier: f32,
        full_multiplier: f32,
    },
}

/// What applying an effect did to the building's level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectOutcome {
    Applied,
    LeveledUp,
}

impl Effect {
    pub fn apply(&self, building: &mut BuildingInstance, ctx: &mut RuleContext) -> EffectOutcome {
        match self {
            Effect::ChangePopulation { delta } => {
                let max = building.max_population(ctx.tech, ctx.environment);
                let next = (i64::from(building.population()) + i64::from(*delta))
                    .clamp(0, i64::from(max));
                building.set_population(next as u32, max);
            }
            Effect::AddExperience { amount } => building.add_experience(*amount),
            Effect::UpgradeToNextLevel => {
                if building.try_upgrade(ctx) {
                    return EffectOutcome::LeveledUp;
                }
            }
            Effect::ConsumeFromSelf { costs } => {
                if let Some(inv) = ctx.network.inventory_of_mut(building.id()) {
                    inv.consume_all(costs);
                }
            }
            Effect::ConsumeFromAssigned { costs } => {
                let target = ctx.storage_for_withdrawal(building, costs);
                match target.and_then(|id| ctx.network.get_mut(id)) {
                    Some(inv) => {
                        inv.consume_all(costs);
                    }
                    None => {
                        tracing::debug!(building = %building.id(), "no storage to consume from")
                    }
                }
            }
            Effect::AddToSelf { items } => {
                if let Some(inv) = ctx.network.inventory_of_mut(building.id()) {
                    inv.add_all(items);
                }
            }
            Effect::AddToAssigned { items } => {
                let space = items.iter().map(|i| i.amount).fold(0u32, u32::saturating_add);
                deposit(building, ctx, items, space);
            }
            Effect::ConsumePerPopulation { resource, per_capita } => {
                let amount = per_population(building.population(), *per_capita);
                if amount > 0 {
                    let costs = [ResourceAmount::new(*resource, amount)];
                    if let Some(inv) = ctx
                        .storage_for_withdrawal(building, &costs)
                        .and_then(|id| ctx.network.get_mut(id))
                    {
                        inv.consume_all(&costs);
                    }
                }
            }
            Effect::AddPerWorker { resource, per_worker, to_assigned } => {
                let amount = building.workers().saturating_mul(*per_worker);
                if amount > 0 {
                    let items = [ResourceAmount::new(*resource, amount)];
                    if *to_assigned {
                        deposit(building, ctx, &items, amount);
                    } else if let Some(inv) = ctx.network.inventory_of_mut(building.id()) {
                        inv.add_all(&items);
                    }
                }
            }
            Effect::TransferToAssigned { resource, amount } => {
                transfer_to_assigned(building, ctx, *resource, *amount);
            }
            Effect::ApplyAura => building.project_auras(ctx.environment),
            Effect::RemoveAura => {
                ctx.environment.remove_aura(building.id());
            }
            Effect::AdjustStorageCapacityWithWorkers {
                low_threshold,
                full_threshold,
                low_multiplier,
                normal_multiplier,
                full_multiplier,
            } => {
                let workers = building.workers();
                let multiplier = if workers >= *full_threshold {
                    *full_multiplier
                } else if workers < *low_threshold {
                    *low_multiplier
                } else {
                    *normal_multiplier
                };

                let base = building.level_def().base_storage_capacity;
                let capacity = (base as f32 * multiplier).round().max(0.0) as u32;
                let policy = ctx.config.truncation_policy;

                let Some(inv) = ctx.network.inventory_of_mut(building.id()) else {
                    tracing::warn!(
                        building = %building.id(),
                        "capacity adjustment on building without storage"
                    );
                    return EffectOutcome::Applied;
                };
                inv.set_capacity(capacity);
                let discarded = inv.truncate_excess(policy);
                if discarded > 0 {
                    tracing::debug!(
                        building = %building.id(),
                        capacity,
                        discarded,
                        "storage shrank below stock"
                    );
                }
            }
        }
        EffectOutcome::Applied
    }
}

fn deposit(
    building: &BuildingInstance,
    ctx: &mut RuleContext,
    items: &[ResourceAmount],
    space: u32,
) {
    match ctx
        .storage_for_deposit(building, space)
        .and_then(|id| ctx.network.get_mut(id))
    {
        Some(inv) => {
            inv.add_all(items);
        }
        None => tracing::debug!(building = %building.id(), "no storage to deposit into"),
    }
}

fn transfer_to_assigned(
    building: &BuildingInstance,
    ctx: &mut RuleContext,
    resource: ResourceKind,
    amount: Option<u32>,
) {
    let Some(source) = ctx.network.storage_of(building.id()) else {
        return;
    };
    let held = ctx.network.get(source).map_or(0, |inv| inv.amount(resource));
    let wanted = amount.unwrap_or(held).min(held);
    if wanted == 0 {
        return;
    }

    let Some(target) = ctx.storage_for_deposit(building, wanted) else {
        return;
    };
    if target == source {
        return;
    }

    let space = ctx.network.get(target).map_or(0, |inv| inv.free_space());
    let moved = wanted.min(space);
    if moved == 0 {
        return;
    }
    if let Some(inv) = ctx.network.get_mut(source) {
        inv.consume(resource, moved);
    }
    if let Some(inv) = ctx.network.get_mut(target) {
        inv.add(resource, moved);
    }
}
