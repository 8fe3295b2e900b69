use thiserror::Error;

use crate::city::catalog::CatalogError;
use crate::core::types::BuildingId;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Unknown archetype: {0}")]
    UnknownArchetype(String),

    #[error("Building not found: {0}")]
    BuildingNotFound(BuildingId),

    #[error("Building has no storage: {0}")]
    NoStorage(BuildingId),

    #[error("Quantity limit of {limit} reached for archetype {archetype}")]
    QuantityLimitReached { archetype: String, limit: u32 },

    #[error("Invalid placement: {0}")]
    InvalidPlacement(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
