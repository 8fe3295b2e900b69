//! Conditions - read-only predicates over a building and the city

use serde::{Deserialize, Serialize};

use crate::city::building::BuildingInstance;
use crate::core::types::{AuraCategory, ResourceAmount, ResourceKind};
use crate::rules::context::RuleContext;

/// Outcome of evaluating one condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// Human-readable reason, surfaced in phase reports
    Fail(String),
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    fn check(ok: bool, reason: impl FnOnce() -> String) -> Self {
        if ok {
            Verdict::Pass
        } else {
            Verdict::Fail(reason())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    PopulationAtLeast { min: u32 },
    PopulationLessThan { max: u32 },
    /// `min = 0` uses the current level's experience threshold and fails on
    /// terminal levels
    ExperienceAtLeast {
        #[serde(default)]
        min: u32,
    },
    WorkersAtLeast { min: u32 },
    WorkersLessThan { max: u32 },
    WorkersEquals { count: u32 },
    /// All-or-nothing over the cost list
    HasResourcesInAssignedStorage { costs: Vec<ResourceAmount> },
    /// Needs `ceil(population * per_capita)` of `resource`
    HasResourceForPopulation {
        resource: ResourceKind,
        per_capita: f64,
        #[serde(default)]
        waive_when_empty: bool,
    },
    /// Own storage total / capacity > threshold (0..1)
    FillPercentOver { threshold: f32 },
    /// Own storage total / network total > threshold (0..1)
    ShareOfNetworkStockOver { threshold: f32 },
    /// Any footprint cell reaches `min`
    EnvironmentAtLeast { category: AuraCategory, min: u32 },
}

impl Condition {
    pub fn evaluate(&self, building: &BuildingInstance, ctx: &RuleContext) -> Verdict {
        match self {
            Condition::PopulationAtLeast { min } => {
                let pop = building.population();
                Verdict::check(pop >= *min, || format!("population {} < {}", pop, min))
            }
            Condition::PopulationLessThan { max } => {
                let pop = building.population();
                Verdict::check(pop < *max, || format!("population {} >= {}", pop, max))
            }
            Condition::ExperienceAtLeast { min } => {
                let required = if *min > 0 {
                    i64::from(*min)
                } else {
                    i64::from(building.level_def().exp_to_next)
                };
                if required <= 0 {
                    return Verdict::Fail("level has no experience threshold".into());
                }
                let exp = building.experience();
                Verdict::check(i64::from(exp) >= required, || {
                    format!("experience {} < {}", exp, required)
                })
            }
            Condition::WorkersAtLeast { min } => {
                let w = building.workers();
                Verdict::check(w >= *min, || format!("workers {} < {}", w, min))
            }
            Condition::WorkersLessThan { max } => {
                let w = building.workers();
                Verdict::check(w < *max, || format!("workers {} >= {}", w, max))
            }
            Condition::WorkersEquals { count } => {
                let w = building.workers();
                Verdict::check(w == *count, || format!("workers {} != {}", w, count))
            }
            Condition::HasResourcesInAssignedStorage { costs } => {
                stock_check(building, ctx, costs)
            }
            Condition::HasResourceForPopulation { resource, per_capita, waive_when_empty } => {
                let pop = building.population();
                if pop == 0 && *waive_when_empty {
                    return Verdict::Pass;
                }
                let required = per_population(pop, *per_capita);
                if required == 0 {
                    return Verdict::Pass;
                }
                stock_check(building, ctx, &[ResourceAmount::new(*resource, required)])
            }
            Condition::FillPercentOver { threshold } => {
                let Some(inv) = ctx.network.inventory_of(building.id()) else {
                    return Verdict::Fail("building has no storage".into());
                };
                match inv.fill_ratio() {
                    None => Verdict::Fail("storage capacity is 0".into()),
                    Some(fill) => Verdict::check(fill > *threshold, || {
                        format!("fill {:.2} <= {:.2}", fill, threshold)
                    }),
                }
            }
            Condition::ShareOfNetworkStockOver { threshold } => {
                let Some(inv) = ctx.network.inventory_of(building.id()) else {
                    return Verdict::Fail("building has no storage".into());
                };
                let total = ctx.network.total_quantity();
                if total == 0 {
                    return Verdict::Fail("network holds no stock".into());
                }
                let share = inv.total_quantity() as f64 / total as f64;
                Verdict::check(share > f64::from(*threshold), || {
                    format!("network share {:.2} <= {:.2}", share, threshold)
                })
            }
            Condition::EnvironmentAtLeast { category, min } => {
                let ok = ctx.environment.any_cell_at_least(building.cells(), *category, *min);
                Verdict::check(ok, || format!("no footprint cell has {} >= {}", category, min))
            }
        }
    }
}

/// `ceil(population * per_capita)`, never negative
pub(crate) fn per_population(population: u32, per_capita: f64) -> u32 {
    let raw = (f64::from(population) * per_capita).ceil();
    if raw.is_finite() && raw > 0.0 {
        raw.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

fn stock_check(
    building: &BuildingInstance,
    ctx: &RuleContext,
    costs: &[ResourceAmount],
) -> Verdict {
    let Some(id) = ctx.storage_for_withdrawal(building, costs) else {
        return Verdict::Fail("no storage available".into());
    };
    let Some(inv) = ctx.network.get(id) else {
        return Verdict::Fail("no storage available".into());
    };
    for cost in costs {
        let held = inv.amount(cost.resource);
        if held < cost.amount {
            return Verdict::Fail(format!(
                "insufficient {}: need {}, have {}",
                cost.resource, cost.amount, held
            ));
        }
    }
    Verdict::Pass
}
