//! City layer - buildings, storage, environment and content

pub mod archetype;
pub mod building;
pub mod catalog;
pub mod environment;
pub mod inventory;
pub mod network;
pub mod tech;

pub use archetype::{Archetype, Classification, LevelDef};
pub use building::{BuildingInstance, Placement};
pub use catalog::{ArchetypeCatalog, CatalogError};
pub use environment::{AuraPredicate, AuraSourceId, AuraSpec, CityEnvironment, Ring};
pub use inventory::Inventory;
pub use network::{ResourceNetwork, StorageEntry, StorageId};
pub use tech::TechTree;
