//! Grid geometry - footprints, centers and radius sampling

pub mod coords;

pub use coords::{
    cells_in_radius, cells_in_radius_of, center_from_cells, footprint_cells, DistanceMetric,
    Footprint, GridBounds, RadiusQuery,
};
