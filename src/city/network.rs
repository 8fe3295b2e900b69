//! Resource network - registry of building storages
//!
//! The network is the arena the storages live in; buildings refer to their
//! own storage through their `BuildingId`. Identity is the `StorageId`
//! handed out on registration, so a storage re-created on level-up is a new
//! member even though the owner is the same.

use std::collections::BTreeMap;

use ahash::AHashMap;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::city::inventory::Inventory;
use crate::core::types::{BuildingId, ResourceAmount, Vec2};

/// Identity of one registered storage
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "storage#{}", _0)]
pub struct StorageId(pub u64);

/// A registered storage and where its owner stands
#[derive(Debug, Clone)]
pub struct StorageEntry {
    pub owner: BuildingId,
    pub position: Vec2,
    pub inventory: Inventory,
}

/// Index of every live storage in the city
#[derive(Debug, Clone, Default)]
pub struct ResourceNetwork {
    next_id: u64,
    storages: BTreeMap<StorageId, StorageEntry>,
    by_owner: AHashMap<BuildingId, StorageId>,
}

impl ResourceNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a storage for `owner`
    ///
    /// An owner holds at most one storage; registering again returns the
    /// existing id and leaves it untouched.
    pub fn register_storage(
        &mut self,
        owner: BuildingId,
        position: Vec2,
        inventory: Inventory,
    ) -> StorageId {
        if let Some(existing) = self.by_owner.get(&owner) {
            return *existing;
        }

        let id = StorageId(self.next_id);
        self.next_id += 1;
        self.storages.insert(id, StorageEntry { owner, position, inventory });
        self.by_owner.insert(owner, id);
        id
    }

    /// Remove `owner`'s storage, returning its contents; no-op if absent
    pub fn unregister_storage(&mut self, owner: BuildingId) -> Option<Inventory> {
        let id = self.by_owner.remove(&owner)?;
        self.storages.remove(&id).map(|entry| entry.inventory)
    }

    pub fn storage_of(&self, owner: BuildingId) -> Option<StorageId> {
        self.by_owner.get(&owner).copied()
    }

    pub fn is_registered(&self, id: StorageId) -> bool {
        self.storages.contains_key(&id)
    }

    pub fn get(&self, id: StorageId) -> Option<&Inventory> {
        self.storages.get(&id).map(|e| &e.inventory)
    }

    pub fn get_mut(&mut self, id: StorageId) -> Option<&mut Inventory> {
        self.storages.get_mut(&id).map(|e| &mut e.inventory)
    }

    pub fn owner_of(&self, id: StorageId) -> Option<BuildingId> {
        self.storages.get(&id).map(|e| e.owner)
    }

    pub fn inventory_of(&self, owner: BuildingId) -> Option<&Inventory> {
        self.storage_of(owner).and_then(|id| self.get(id))
    }

    pub fn inventory_of_mut(&mut self, owner: BuildingId) -> Option<&mut Inventory> {
        let id = self.storage_of(owner)?;
        self.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.storages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storages.is_empty()
    }

    /// Iterate registered storages in registration order
    pub fn iter(&self) -> impl Iterator<Item = (StorageId, &StorageEntry)> {
        self.storages.iter().map(|(id, e)| (*id, e))
    }

    /// Sum of stored quantities across all registered storages
    pub fn total_quantity(&self) -> u64 {
        self.storages
            .values()
            .map(|e| u64::from(e.inventory.total_quantity()))
            .sum()
    }

    /// Resolve the storage a building pulls from and pushes to
    ///
    /// The explicit assignment wins if the assigned building currently owns
    /// a storage; otherwise the building's own storage, if any.
    pub fn assigned_storage(
        &self,
        owner: BuildingId,
        assigned: Option<BuildingId>,
    ) -> Option<StorageId> {
        assigned
            .and_then(|target| self.storage_of(target))
            .or_else(|| self.storage_of(owner))
    }

    /// Nearest storage within `radius` holding every listed amount
    ///
    /// A radius <= 0 ignores distance. The `requester`'s own storage is never
    /// a candidate.
    pub fn find_with_resources(
        &self,
        requester: BuildingId,
        origin: Vec2,
        radius: f32,
        costs: &[ResourceAmount],
    ) -> Option<StorageId> {
        self.nearest(requester, origin, radius, |inv| inv.has_all(costs))
    }

    /// Nearest storage within `radius` with at least `space` free, other
    /// than the `requester`'s own
    pub fn find_with_space(
        &self,
        requester: BuildingId,
        origin: Vec2,
        radius: f32,
        space: u32,
    ) -> Option<StorageId> {
        self.nearest(requester, origin, radius, |inv| inv.free_space() >= space)
    }

    fn nearest(
        &self,
        requester: BuildingId,
        origin: Vec2,
        radius: f32,
        accept: impl Fn(&Inventory) -> bool,
    ) -> Option<StorageId> {
        let limit = if radius > 0.0 { radius * radius } else { f32::INFINITY };
        let mut best: Option<(StorageId, f32)> = None;

        for (id, entry) in &self.storages {
            if entry.owner == requester || !accept(&entry.inventory) {
                continue;
            }
            let dist = entry.position.distance_squared(&origin);
            if dist > limit {
                continue;
            }
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((*id, dist));
            }
        }

        best.map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ResourceKind;

    fn stocked(capacity: u32, food: u32) -> Inventory {
        let mut inv = Inventory::with_capacity(capacity);
        inv.add(ResourceKind::Food, food);
        inv
    }

    #[test]
    fn test_register_is_idempotent_per_owner() {
        let mut net = ResourceNetwork::new();
        let a = net.register_storage(BuildingId(1), Vec2::default(), stocked(10, 5));
        let again = net.register_storage(BuildingId(1), Vec2::default(), stocked(10, 9));

        assert_eq!(a, again);
        assert_eq!(net.len(), 1);
        assert_eq!(net.total_quantity(), 5);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut net = ResourceNetwork::new();
        net.register_storage(BuildingId(1), Vec2::default(), stocked(10, 5));

        let removed = net.unregister_storage(BuildingId(1)).unwrap();
        assert_eq!(removed.amount(ResourceKind::Food), 5);
        assert!(net.unregister_storage(BuildingId(1)).is_none());
        assert!(net.is_empty());
        assert_eq!(net.total_quantity(), 0);
    }

    #[test]
    fn test_reregistration_gets_new_identity() {
        let mut net = ResourceNetwork::new();
        let first = net.register_storage(BuildingId(1), Vec2::default(), Inventory::new());
        net.unregister_storage(BuildingId(1));
        let second = net.register_storage(BuildingId(1), Vec2::default(), Inventory::new());

        assert_ne!(first, second);
        assert!(!net.is_registered(first));
        assert!(net.is_registered(second));
    }

    #[test]
    fn test_total_quantity_sums_all() {
        let mut net = ResourceNetwork::new();
        net.register_storage(BuildingId(1), Vec2::default(), stocked(100, 30));
        net.register_storage(BuildingId(2), Vec2::default(), stocked(100, 12));
        assert_eq!(net.total_quantity(), 42);
    }

    #[test]
    fn test_assigned_storage_fallback() {
        let mut net = ResourceNetwork::new();
        let warehouse = net.register_storage(BuildingId(10), Vec2::default(), stocked(100, 0));
        let own = net.register_storage(BuildingId(2), Vec2::default(), stocked(5, 0));

        // Valid assignment wins
        assert_eq!(net.assigned_storage(BuildingId(2), Some(BuildingId(10))), Some(warehouse));
        // Assigned building without storage falls back to own storage
        assert_eq!(net.assigned_storage(BuildingId(2), Some(BuildingId(99))), Some(own));
        // No assignment, no own storage
        assert_eq!(net.assigned_storage(BuildingId(3), None), None);
    }

    #[test]
    fn test_find_nearest_with_resources() {
        let mut net = ResourceNetwork::new();
        let far = net.register_storage(BuildingId(1), Vec2::new(10.0, 0.0), stocked(100, 50));
        let near = net.register_storage(BuildingId(2), Vec2::new(2.0, 0.0), stocked(100, 50));
        net.register_storage(BuildingId(3), Vec2::new(1.0, 0.0), stocked(100, 1));

        let need = [ResourceAmount::new(ResourceKind::Food, 10)];
        let who = BuildingId(9);
        assert_eq!(net.find_with_resources(who, Vec2::default(), 5.0, &need), Some(near));
        assert_eq!(net.find_with_resources(who, Vec2::new(11.0, 0.0), 5.0, &need), Some(far));
        assert_eq!(net.find_with_resources(who, Vec2::new(50.0, 0.0), 5.0, &need), None);
        // Unlimited radius
        assert!(net.find_with_resources(who, Vec2::new(50.0, 0.0), 0.0, &need).is_some());
    }

    #[test]
    fn test_find_with_space() {
        let mut net = ResourceNetwork::new();
        net.register_storage(BuildingId(1), Vec2::new(1.0, 0.0), stocked(10, 10));
        let roomy = net.register_storage(BuildingId(2), Vec2::new(3.0, 0.0), stocked(10, 2));
        let who = BuildingId(9);

        assert_eq!(net.find_with_space(who, Vec2::default(), 5.0, 8), Some(roomy));
        assert_eq!(net.find_with_space(who, Vec2::default(), 5.0, 9), None);
    }

    #[test]
    fn test_discovery_skips_requester_storage() {
        let mut net = ResourceNetwork::new();
        let own = net.register_storage(BuildingId(1), Vec2::new(0.0, 0.0), stocked(40, 12));
        let depot = net.register_storage(BuildingId(2), Vec2::new(4.0, 0.0), stocked(100, 30));

        let origin = Vec2::new(0.0, 0.0);
        assert_eq!(net.find_with_space(BuildingId(1), origin, 8.0, 12), Some(depot));
        assert_eq!(net.find_with_space(BuildingId(2), origin, 8.0, 12), Some(own));

        let need = [ResourceAmount::new(ResourceKind::Food, 10)];
        assert_eq!(net.find_with_resources(BuildingId(1), origin, 8.0, &need), Some(depot));
        // Only candidate is the requester itself
        assert_eq!(net.find_with_resources(BuildingId(2), origin, 8.0, &need), Some(own));
        net.unregister_storage(BuildingId(1));
        assert_eq!(net.find_with_resources(BuildingId(2), origin, 8.0, &need), None);
    }
}
