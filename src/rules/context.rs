//! Explicit context threaded through rule evaluation

use crate::city::building::BuildingInstance;
use crate::city::environment::CityEnvironment;
use crate::city::network::{ResourceNetwork, StorageId};
use crate::city::tech::TechTree;
use crate::core::config::{SimulationConfig, StoragePolicy};
use crate::core::types::{ResourceAmount, Vec2};

/// Shared city state a rule may read or write
///
/// Built by the city for the duration of one phase; conditions only ever
/// see it through a shared reference.
pub struct RuleContext<'a> {
    pub network: &'a mut ResourceNetwork,
    pub environment: &'a mut CityEnvironment,
    pub tech: &'a TechTree,
    pub config: &'a SimulationConfig,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        network: &'a mut ResourceNetwork,
        environment: &'a mut CityEnvironment,
        tech: &'a TechTree,
        config: &'a SimulationConfig,
    ) -> Self {
        Self { network, environment, tech, config }
    }

    /// Storage `building` should pull `costs` from
    pub fn storage_for_withdrawal(
        &self,
        building: &BuildingInstance,
        costs: &[ResourceAmount],
    ) -> Option<StorageId> {
        self.resolve(building, |net, origin, radius| {
            net.find_with_resources(building.id(), origin, radius, costs)
        })
    }

    /// Storage `building` should push `space` units into
    pub fn storage_for_deposit(
        &self,
        building: &BuildingInstance,
        space: u32,
    ) -> Option<StorageId> {
        self.resolve(building, |net, origin, radius| {
            net.find_with_space(building.id(), origin, radius, space)
        })
    }

    /// Discovery radius for `building`, honouring its level's override
    pub fn fetch_radius(&self, building: &BuildingInstance) -> Option<f32> {
        match self.config.storage_policy {
            StoragePolicy::AssignedOrSelf => None,
            StoragePolicy::AssignedOrNearby { fetch_radius } => {
                Some(building.level_def().fetch_radius.unwrap_or(fetch_radius))
            }
        }
    }

    /// Assignment first, then discovery under the nearby policy, then the
    /// building's own storage
    fn resolve(
        &self,
        building: &BuildingInstance,
        discover: impl FnOnce(&ResourceNetwork, Vec2, f32) -> Option<StorageId>,
    ) -> Option<StorageId> {
        let owner = building.id();
        let assigned = building.assigned_storage();

        let Some(radius) = self.fetch_radius(building) else {
            return self.network.assigned_storage(owner, assigned);
        };
        if let Some(id) = assigned.and_then(|target| self.network.storage_of(target)) {
            return Some(id);
        }
        discover(&*self.network, building.center(), radius)
            .or_else(|| self.network.storage_of(owner))
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::fixture::{workshop, World};
    use super::*;
    use crate::core::types::ResourceKind;

    fn food(amount: u32) -> [ResourceAmount; 1] {
        [ResourceAmount::new(ResourceKind::Food, amount)]
    }

    #[test]
    fn test_assigned_policy_ignores_neighbours() {
        let mut world = World::new();
        let arch = workshop(50);
        let shop = world.place(1, &arch, 0.0, 0.0);
        let depot = world.place(2, &arch, 4.0, 0.0);
        world.stock(&depot, &food(20));

        let ctx = world.ctx();
        let own = ctx.network.storage_of(shop.id());
        assert_eq!(ctx.storage_for_withdrawal(&shop, &food(5)), own);
        assert_eq!(ctx.storage_for_deposit(&shop, 5), own);
        assert_eq!(ctx.fetch_radius(&shop), None);
    }

    #[test]
    fn test_nearby_policy_prefers_other_storage() {
        let mut world = World::with_policy(StoragePolicy::AssignedOrNearby { fetch_radius: 8.0 });
        let arch = workshop(50);
        let shop = world.place(1, &arch, 0.0, 0.0);
        let depot = world.place(2, &arch, 4.0, 0.0);
        world.stock(&shop, &food(20));
        world.stock(&depot, &food(20));

        let ctx = world.ctx();
        let own = ctx.network.storage_of(shop.id());
        let other = ctx.network.storage_of(depot.id());
        assert_eq!(ctx.storage_for_deposit(&shop, 10), other);
        assert_eq!(ctx.storage_for_withdrawal(&shop, &food(10)), other);
        // Nothing nearby qualifies, so fall back to self
        assert_eq!(ctx.storage_for_deposit(&shop, 40), own);
        assert_eq!(ctx.storage_for_withdrawal(&shop, &food(25)), own);
    }

    #[test]
    fn test_explicit_assignment_beats_discovery() {
        let mut world = World::with_policy(StoragePolicy::AssignedOrNearby { fetch_radius: 8.0 });
        let arch = workshop(50);
        let mut shop = world.place(1, &arch, 0.0, 0.0);
        world.place(2, &arch, 4.0, 0.0);
        let far = world.place(3, &arch, 40.0, 0.0);
        shop.set_assigned_storage(Some(far.id()));

        let ctx = world.ctx();
        assert_eq!(ctx.storage_for_deposit(&shop, 10), ctx.network.storage_of(far.id()));
    }

    #[test]
    fn test_level_fetch_radius_overrides_config() {
        let mut world = World::with_policy(StoragePolicy::AssignedOrNearby { fetch_radius: 8.0 });
        let arch = workshop(50);
        let mut wide = (*arch).clone();
        wide.levels[0].fetch_radius = Some(30.0);
        let wide = Arc::new(wide);

        let near_sighted = world.place(1, &arch, 0.0, 0.0);
        let depot = world.place(2, &arch, 20.0, 0.0);
        let far_sighted = world.place(3, &wide, 40.0, 0.0);

        let ctx = world.ctx();
        let depot_id = ctx.network.storage_of(depot.id());
        assert_eq!(ctx.fetch_radius(&near_sighted), Some(8.0));
        assert_eq!(ctx.fetch_radius(&far_sighted), Some(30.0));
        assert_eq!(ctx.storage_for_deposit(&far_sighted, 10), depot_id);
        // Depot is 20 away from both; only the override reaches it
        let own = ctx.network.storage_of(near_sighted.id());
        assert_eq!(ctx.storage_for_deposit(&near_sighted, 10), own);
    }
}
