//! Core type definitions used throughout the codebase

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Unique identifier for building instances
///
/// Allocated sequentially by the city, never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display(fmt = "building#{}", _0)]
pub struct BuildingId(pub u64);

/// Turn counter (simulation time unit)
pub type Turn = u64;

/// Integer grid cell
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// 2D position in grid space
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Self) -> f32 {
        self.distance_squared(other).sqrt()
    }

    pub fn distance_squared(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

impl From<Cell> for Vec2 {
    fn from(cell: Cell) -> Self {
        Self::new(cell.x as f32, cell.y as f32)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

/// Kind of stored resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Food,
    Wood,
    Stone,
    Clay,
    Cloth,
    Furniture,
    Iron,
    Tools,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Food,
        ResourceKind::Wood,
        ResourceKind::Stone,
        ResourceKind::Clay,
        ResourceKind::Cloth,
        ResourceKind::Furniture,
        ResourceKind::Iron,
        ResourceKind::Tools,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Food => "food",
            ResourceKind::Wood => "wood",
            ResourceKind::Stone => "stone",
            ResourceKind::Clay => "clay",
            ResourceKind::Cloth => "cloth",
            ResourceKind::Furniture => "furniture",
            ResourceKind::Iron => "iron",
            ResourceKind::Tools => "tools",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A quantity of one resource kind, as authored in content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAmount {
    pub resource: ResourceKind,
    pub amount: u32,
}

impl ResourceAmount {
    pub const fn new(resource: ResourceKind, amount: u32) -> Self {
        Self { resource, amount }
    }
}

/// Category of spatial influence projected by auras
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuraCategory {
    Beauty,
    Security,
    Health,
}

impl AuraCategory {
    pub const ALL: [AuraCategory; 3] =
        [AuraCategory::Beauty, AuraCategory::Security, AuraCategory::Health];
}

impl std::fmt::Display for AuraCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AuraCategory::Beauty => "beauty",
            AuraCategory::Security => "security",
            AuraCategory::Health => "health",
        };
        f.write_str(name)
    }
}

/// Named stage of a turn, also used as a rule trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    PreTurn,
    Consumption,
    Production,
    Settlement,
    PostTurn,
    /// Fired once per instance when construction finishes; never broadcast
    ConstructionComplete,
}

impl TurnPhase {
    /// Phases broadcast by the turn driver, in order
    pub const SEQUENCE: [TurnPhase; 5] = [
        TurnPhase::PreTurn,
        TurnPhase::Consumption,
        TurnPhase::Production,
        TurnPhase::Settlement,
        TurnPhase::PostTurn,
    ];
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TurnPhase::PreTurn => "pre_turn",
            TurnPhase::Consumption => "consumption",
            TurnPhase::Production => "production",
            TurnPhase::Settlement => "settlement",
            TurnPhase::PostTurn => "post_turn",
            TurnPhase::ConstructionComplete => "construction_complete",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_building_id_display() {
        assert_eq!(BuildingId(7).to_string(), "building#7");
        assert_eq!(BuildingId::from(3), BuildingId(3));
    }

    #[test]
    fn test_phase_sequence_order() {
        assert_eq!(TurnPhase::SEQUENCE[0], TurnPhase::PreTurn);
        assert_eq!(TurnPhase::SEQUENCE[4], TurnPhase::PostTurn);
        assert!(!TurnPhase::SEQUENCE.contains(&TurnPhase::ConstructionComplete));
    }

    #[test]
    fn test_resource_kind_ordering_is_declaration_order() {
        let mut kinds = ResourceKind::ALL.to_vec();
        kinds.sort();
        assert_eq!(kinds, ResourceKind::ALL.to_vec());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&TurnPhase::PostTurn).unwrap();
        assert_eq!(json, "\"post_turn\"");
        let kind: ResourceKind = serde_json::from_str("\"furniture\"").unwrap();
        assert_eq!(kind, ResourceKind::Furniture);
    }

    #[test]
    fn test_vec2_distance() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
        assert!((a.distance_squared(&b) - 25.0).abs() < 1e-6);
    }
}
