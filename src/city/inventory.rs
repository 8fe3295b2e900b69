//! Inventory - capacity-bounded storage owned by one building

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::config::TruncationPolicy;
use crate::core::types::{ResourceAmount, ResourceKind};

/// A capacity-bounded multiset of resources
///
/// The capacity bounds the sum over all kinds. Kinds with zero quantity are
/// not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    capacity: u32,
    stock: BTreeMap<ResourceKind, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: u32) -> Self {
        Self { capacity, stock: BTreeMap::new() }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Change the capacity without touching contents
    ///
    /// Shrinking below the current total leaves the inventory over capacity
    /// until `truncate_excess` runs.
    pub fn set_capacity(&mut self, capacity: u32) {
        self.capacity = capacity;
    }

    /// Get current amount of a resource
    pub fn amount(&self, resource: ResourceKind) -> u32 {
        self.stock.get(&resource).copied().unwrap_or(0)
    }

    pub fn total_quantity(&self) -> u32 {
        self.stock.values().fold(0u32, |acc, q| acc.saturating_add(*q))
    }

    pub fn free_space(&self) -> u32 {
        self.capacity.saturating_sub(self.total_quantity())
    }

    pub fn is_empty(&self) -> bool {
        self.stock.is_empty()
    }

    /// Stored fraction of capacity, `None` for a zero-capacity inventory
    pub fn fill_ratio(&self) -> Option<f32> {
        if self.capacity == 0 {
            return None;
        }
        Some(self.total_quantity() as f32 / self.capacity as f32)
    }

    /// Iterate held resources in kind order
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        self.stock.iter().map(|(k, q)| (*k, *q))
    }

    /// Store up to `amount`, clamped to free space; returns amount stored
    pub fn add(&mut self, resource: ResourceKind, amount: u32) -> u32 {
        let added = amount.min(self.free_space());
        if added > 0 {
            *self.stock.entry(resource).or_insert(0) += added;
        }
        added
    }

    /// Add each entry independently, in order
    pub fn add_all(&mut self, items: &[ResourceAmount]) -> u32 {
        items.iter().map(|it| self.add(it.resource, it.amount)).sum()
    }

    /// Remove up to `amount`, floored at zero; returns amount removed
    ///
    /// Does not check sufficiency - pair with `has_all` in a condition.
    pub fn consume(&mut self, resource: ResourceKind, amount: u32) -> u32 {
        let Some(held) = self.stock.get_mut(&resource) else {
            return 0;
        };
        let removed = amount.min(*held);
        *held -= removed;
        if *held == 0 {
            self.stock.remove(&resource);
        }
        removed
    }

    /// Consume each entry independently, in order
    pub fn consume_all(&mut self, costs: &[ResourceAmount]) -> u32 {
        costs.iter().map(|c| self.consume(c.resource, c.amount)).sum()
    }

    /// Check if every listed amount is held
    pub fn has_all(&self, costs: &[ResourceAmount]) -> bool {
        costs.iter().all(|c| self.amount(c.resource) >= c.amount)
    }

    /// Discard stock until the total fits the capacity; returns amount
    /// discarded
    pub fn truncate_excess(&mut self, policy: TruncationPolicy) -> u32 {
        let total = self.total_quantity();
        if total <= self.capacity {
            return 0;
        }

        match policy {
            TruncationPolicy::Proportional => self.truncate_proportional(total),
            TruncationPolicy::ReverseKindOrder => {
                let mut excess = total - self.capacity;
                let kinds: Vec<ResourceKind> = self.stock.keys().rev().copied().collect();
                for kind in kinds {
                    if excess == 0 {
                        break;
                    }
                    excess -= self.consume(kind, excess);
                }
            }
        }

        total - self.total_quantity()
    }

    fn truncate_proportional(&mut self, total: u32) {
        let cap = u64::from(self.capacity);
        let total = u64::from(total);

        // (kind, kept, remainder)
        let mut shares: Vec<(ResourceKind, u64, u64)> = self
            .stock
            .iter()
            .map(|(kind, q)| {
                let scaled = u64::from(*q) * cap;
                (*kind, scaled / total, scaled % total)
            })
            .collect();

        let kept: u64 = shares.iter().map(|(_, k, _)| *k).sum();
        let mut leftover = cap - kept;

        // Largest remainder first; stable sort keeps kind order on ties
        let mut order: Vec<usize> = (0..shares.len()).collect();
        order.sort_by(|a, b| shares[*b].2.cmp(&shares[*a].2));
        for idx in order {
            if leftover == 0 {
                break;
            }
            if shares[idx].2 > 0 {
                shares[idx].1 += 1;
                leftover -= 1;
            }
        }

        self.stock = shares
            .into_iter()
            .filter(|(_, keep, _)| *keep > 0)
            .map(|(kind, keep, _)| (kind, keep as u32))
            .collect();
    }
}
