pub mod config;
pub mod error;
pub mod types;

pub use config::{SimulationConfig, StoragePolicy, TruncationPolicy};
pub use error::{Result, SimError};
pub use types::{
    AuraCategory, BuildingId, Cell, ResourceAmount, ResourceKind, Turn, TurnPhase, Vec2,
};
