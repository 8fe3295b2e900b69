//! Simulation loop - city engine, turn driver and scenarios

pub mod city;
pub mod scenario;
pub mod turn;

pub use city::{BuildingView, City, LevelUp, PhaseReport, RuleFailure, StorageView};
pub use scenario::{PlacementSpec, Scenario, Simulation, TurnReport};
pub use turn::{PhaseSubscriber, TurnControl, TurnDriver};
