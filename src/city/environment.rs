//! City environment - per-category aura field over the grid
//!
//! Every category keeps a global per-cell total plus the exact per-cell
//! contribution of every source, so a source can be retracted in time
//! proportional to its own footprint.

use std::collections::hash_map::Entry;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{AuraCategory, BuildingId, Cell, Vec2};
use crate::spatial::coords::{cells_in_radius, GridBounds, RadiusQuery};

/// Name a contribution is recorded under
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AuraSourceId(pub String);

impl From<BuildingId> for AuraSourceId {
    fn from(id: BuildingId) -> Self {
        AuraSourceId(format!("building:{}", id.0))
    }
}

impl From<&str> for AuraSourceId {
    fn from(name: &str) -> Self {
        AuraSourceId(name.to_string())
    }
}

impl From<String> for AuraSourceId {
    fn from(name: String) -> Self {
        AuraSourceId(name)
    }
}

impl std::fmt::Display for AuraSourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One concentric ring of an aura
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ring {
    pub radius: u32,
    pub value: u32,
}

impl Ring {
    pub const fn new(radius: u32, value: u32) -> Self {
        Self { radius, value }
    }
}

/// Authored aura: the rings a level projects into one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuraSpec {
    pub category: AuraCategory,
    pub rings: Vec<Ring>,
}

/// Value test used by overlays and queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuraPredicate {
    AtLeast(u32),
    AtMost(u32),
    Equals(u32),
}

impl AuraPredicate {
    #[inline]
    pub fn matches(&self, value: u32) -> bool {
        match *self {
            AuraPredicate::AtLeast(min) => value >= min,
            AuraPredicate::AtMost(max) => value <= max,
            AuraPredicate::Equals(v) => value == v,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct AuraLayer {
    totals: AHashMap<Cell, u32>,
    sources: AHashMap<AuraSourceId, AHashMap<Cell, u32>>,
}

impl AuraLayer {
    fn retract(&mut self, source: &AuraSourceId) -> bool {
        let Some(contribution) = self.sources.remove(source) else {
            return false;
        };
        for (cell, value) in contribution {
            if let Entry::Occupied(mut total) = self.totals.entry(cell) {
                let remaining = total.get().saturating_sub(value);
                if remaining == 0 {
                    total.remove();
                } else {
                    *total.get_mut() = remaining;
                }
            }
        }
        true
    }
}

/// Aura accumulator for the whole city
#[derive(Debug, Clone, Default)]
pub struct CityEnvironment {
    layers: AHashMap<AuraCategory, AuraLayer>,
    bounds: Option<GridBounds>,
}

impl CityEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment that ignores cells outside `bounds`
    pub fn with_bounds(bounds: GridBounds) -> Self {
        Self { layers: AHashMap::new(), bounds: Some(bounds) }
    }

    pub fn bounds(&self) -> Option<GridBounds> {
        self.bounds
    }

    /// Project `rings` around `center` under `source`
    ///
    /// Any earlier contribution of `source` to the same category is
    /// retracted first. Within one source the strongest ring wins per cell;
    /// across sources values add. Other categories the source contributes to
    /// are left alone.
    pub fn apply_aura(
        &mut self,
        source: impl Into<AuraSourceId>,
        center: Vec2,
        center_is_corner: bool,
        category: AuraCategory,
        rings: &[Ring],
    ) {
        let source = source.into();
        let bounds = self.bounds;
        let layer = self.layers.entry(category).or_default();
        layer.retract(&source);

        let mut contribution: AHashMap<Cell, u32> = AHashMap::new();
        for ring in rings.iter().filter(|r| r.value > 0) {
            let query = RadiusQuery::default();
            for cell in cells_in_radius(center, ring.radius, center_is_corner, query) {
                if bounds.map_or(false, |b| !b.contains(cell)) {
                    continue;
                }
                let slot = contribution.entry(cell).or_insert(0);
                *slot = (*slot).max(ring.value);
            }
        }

        if contribution.is_empty() {
            return;
        }
        for (cell, value) in &contribution {
            let total = layer.totals.entry(*cell).or_insert(0);
            *total = total.saturating_add(*value);
        }
        layer.sources.insert(source, contribution);
    }

    /// Retract every contribution recorded under `source`
    ///
    /// Returns false if the source had nothing applied.
    pub fn remove_aura(&mut self, source: impl Into<AuraSourceId>) -> bool {
        let source = source.into();
        let mut removed = false;
        for layer in self.layers.values_mut() {
            removed |= layer.retract(&source);
        }
        removed
    }

    /// Accumulated value at `cell`, 0 if nothing reaches it
    #[inline]
    pub fn value(&self, cell: Cell, category: AuraCategory) -> u32 {
        self.layers
            .get(&category)
            .and_then(|l| l.totals.get(&cell))
            .copied()
            .unwrap_or(0)
    }

    /// Lazily enumerate cells whose accumulated value matches `predicate`
    ///
    /// Only cells with a non-zero value are visited. Order is unspecified.
    pub fn cells_where(
        &self,
        category: AuraCategory,
        predicate: AuraPredicate,
    ) -> impl Iterator<Item = Cell> + '_ {
        self.cells_matching(category, move |v| predicate.matches(v))
    }

    pub fn cells_matching<'a>(
        &'a self,
        category: AuraCategory,
        predicate: impl Fn(u32) -> bool + 'a,
    ) -> impl Iterator<Item = Cell> + 'a {
        self.layers
            .get(&category)
            .into_iter()
            .flat_map(|layer| layer.totals.iter())
            .filter(move |(_, v)| predicate(**v))
            .map(|(cell, _)| *cell)
    }

    /// Bucket cells into overlay tiers
    ///
    /// `thresholds` are ascending minimums; a cell lands in the highest tier
    /// whose minimum it reaches. Cells in each tier are sorted.
    pub fn tiers(&self, category: AuraCategory, thresholds: &[u32]) -> Vec<Vec<Cell>> {
        let mut tiers = vec![Vec::new(); thresholds.len()];
        if let Some(layer) = self.layers.get(&category) {
            for (cell, value) in &layer.totals {
                if let Some(tier) = thresholds.iter().rposition(|t| value >= t) {
                    tiers[tier].push(*cell);
                }
            }
        }
        for tier in &mut tiers {
            tier.sort();
        }
        tiers
    }

    /// True if any of `cells` reaches `min` in `category`
    pub fn any_cell_at_least(&self, cells: &[Cell], category: AuraCategory, min: u32) -> bool {
        cells.iter().any(|c| self.value(*c, category) >= min)
    }

    /// Number of distinct sources with a live contribution
    pub fn source_count(&self) -> usize {
        let mut names: Vec<&AuraSourceId> =
            self.layers.values().flat_map(|l| l.sources.keys()).collect();
        names.sort();
        names.dedup();
        names.len()
    }

    /// True if `source` has a live contribution in any category
    pub fn has_source(&self, source: &AuraSourceId) -> bool {
        self.layers.values().any(|l| l.sources.contains_key(source))
    }

    /// What `source` currently adds at `cell`
    pub fn contribution(
        &self,
        source: &AuraSourceId,
        category: AuraCategory,
        cell: Cell,
    ) -> u32 {
        self.layers
            .get(&category)
            .and_then(|l| l.sources.get(source))
            .and_then(|c| c.get(&cell))
            .copied()
            .unwrap_or(0)
    }

    /// Number of cells with a non-zero value in `category`
    pub fn covered_cells(&self, category: AuraCategory) -> usize {
        self.layers.get(&category).map_or(0, |l| l.totals.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AuraCategory::*;

    const ORIGIN: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[test]
    fn test_rings_take_max_within_source() {
        let mut env = CityEnvironment::new();
        env.apply_aura("fountain", ORIGIN, false, Beauty, &[Ring::new(1, 3), Ring::new(2, 1)]);

        assert_eq!(env.value(Cell::new(0, 0), Beauty), 3);
        assert_eq!(env.value(Cell::new(1, 0), Beauty), 3);
        assert_eq!(env.value(Cell::new(2, 0), Beauty), 1);
        assert_eq!(env.value(Cell::new(3, 0), Beauty), 0);
    }

    #[test]
    fn test_sources_sum() {
        let mut env = CityEnvironment::new();
        env.apply_aura("a", ORIGIN, false, Security, &[Ring::new(2, 2)]);
        env.apply_aura("b", Vec2::new(1.0, 0.0), false, Security, &[Ring::new(2, 2)]);

        assert_eq!(env.value(Cell::new(0, 0), Security), 4);
        assert_eq!(env.value(Cell::new(3, 0), Security), 2);
    }

    #[test]
    fn test_reapply_is_idempotent() {
        let mut once = CityEnvironment::new();
        once.apply_aura("a", ORIGIN, false, Health, &[Ring::new(2, 2)]);

        let mut twice = CityEnvironment::new();
        twice.apply_aura("a", ORIGIN, false, Health, &[Ring::new(2, 2)]);
        twice.apply_aura("a", ORIGIN, false, Health, &[Ring::new(2, 2)]);

        for x in -3..=3 {
            for y in -3..=3 {
                let cell = Cell::new(x, y);
                assert_eq!(once.value(cell, Health), twice.value(cell, Health));
            }
        }
        assert_eq!(twice.source_count(), 1);
    }

    #[test]
    fn test_remove_is_exact() {
        let mut env = CityEnvironment::new();
        env.apply_aura("a", ORIGIN, false, Security, &[Ring::new(2, 2)]);
        env.apply_aura("b", ORIGIN, true, Security, &[Ring::new(3, 1)]);
        let before: Vec<u32> = (-4..=4).map(|x| env.value(Cell::new(x, 0), Security)).collect();

        env.apply_aura("c", Vec2::new(2.0, 1.0), false, Security, &[Ring::new(1, 5)]);
        assert!(env.remove_aura("c"));

        let after: Vec<u32> = (-4..=4).map(|x| env.value(Cell::new(x, 0), Security)).collect();
        assert_eq!(before, after);
        assert!(!env.remove_aura("c"));
    }

    #[test]
    fn test_remove_clears_entries() {
        let mut env = CityEnvironment::new();
        env.apply_aura("a", ORIGIN, false, Beauty, &[Ring::new(1, 1)]);
        env.apply_aura("a", ORIGIN, false, Health, &[Ring::new(1, 1)]);
        assert_eq!(env.covered_cells(Beauty), 5);

        env.remove_aura("a");
        assert_eq!(env.covered_cells(Beauty), 0);
        assert_eq!(env.covered_cells(Health), 0);
        assert_eq!(env.source_count(), 0);
    }

    #[test]
    fn test_categories_are_independent() {
        let mut env = CityEnvironment::new();
        env.apply_aura("a", ORIGIN, false, Beauty, &[Ring::new(1, 1)]);
        env.apply_aura("a", ORIGIN, false, Security, &[Ring::new(1, 2)]);

        assert_eq!(env.value(Cell::new(0, 0), Beauty), 1);
        assert_eq!(env.value(Cell::new(0, 0), Security), 2);
    }

    #[test]
    fn test_zero_value_rings_ignored() {
        let mut env = CityEnvironment::new();
        env.apply_aura("a", ORIGIN, false, Beauty, &[Ring::new(4, 0)]);
        assert_eq!(env.covered_cells(Beauty), 0);
        assert_eq!(env.source_count(), 0);
    }

    #[test]
    fn test_bounds_clip_contribution() {
        let bounds = GridBounds::new(Cell::new(0, 0), Cell::new(9, 9));
        let mut env = CityEnvironment::with_bounds(bounds);
        env.apply_aura("a", ORIGIN, false, Security, &[Ring::new(1, 2)]);

        // (0,0), (1,0), (0,1) survive; (-1,0), (0,-1) are off-map
        assert_eq!(env.covered_cells(Security), 3);
        assert_eq!(env.value(Cell::new(-1, 0), Security), 0);
    }

    #[test]
    fn test_cells_where_and_tiers() {
        let mut env = CityEnvironment::new();
        env.apply_aura("a", ORIGIN, false, Beauty, &[Ring::new(0, 3), Ring::new(1, 1)]);

        let strong: Vec<Cell> = env.cells_where(Beauty, AuraPredicate::AtLeast(2)).collect();
        assert_eq!(strong, vec![Cell::new(0, 0)]);
        assert_eq!(env.cells_where(Beauty, AuraPredicate::Equals(1)).count(), 4);
        assert_eq!(env.cells_where(Beauty, AuraPredicate::AtMost(3)).count(), 5);

        let tiers = env.tiers(Beauty, &[1, 2, 3]);
        assert_eq!(tiers[0].len(), 4);
        assert!(tiers[1].is_empty());
        assert_eq!(tiers[2], vec![Cell::new(0, 0)]);
    }

    #[test]
    fn test_contribution_lookup() {
        let mut env = CityEnvironment::new();
        let source = AuraSourceId::from(BuildingId(4));
        env.apply_aura(source.clone(), ORIGIN, false, Health, &[Ring::new(1, 2)]);

        assert_eq!(env.contribution(&source, Health, Cell::new(1, 0)), 2);
        assert_eq!(env.contribution(&source, Beauty, Cell::new(1, 0)), 0);
        assert_eq!(source.to_string(), "building:4");
    }
}
