//! Footprint and radius math on the integer grid
//!
//! Centers follow the footprint convention: an odd-sized footprint is
//! centered on a cell (the center is that cell's index), an even-sized one is
//! centered on a grid intersection (the center is the corner coordinate,
//! which sits between cells `c - 1` and `c`).

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::types::{Cell, Vec2};

/// Distance metric used when sampling cells around a center
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    Chebyshev,
    #[default]
    Manhattan,
    Euclidean,
}

/// How `cells_in_radius` decides membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadiusQuery {
    pub metric: DistanceMetric,
    /// Include cells exactly on the radius
    pub include_edge: bool,
    /// Euclidean only: widen the threshold by half a cell for rounder discs
    pub euclidean_plus_half: bool,
}

impl Default for RadiusQuery {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Manhattan,
            include_edge: true,
            euclidean_plus_half: true,
        }
    }
}

impl RadiusQuery {
    pub fn with_metric(metric: DistanceMetric) -> Self {
        Self { metric, ..Self::default() }
    }

    pub fn strict(mut self) -> Self {
        self.include_edge = false;
        self
    }
}

/// A square footprint recovered from its cells
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub center: Vec2,
    pub size: u32,
    pub center_is_corner: bool,
}

/// Inclusive rectangle of playable cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBounds {
    pub min: Cell,
    pub max: Cell,
}

impl GridBounds {
    pub fn new(min: Cell, max: Cell) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= self.min.x && cell.x <= self.max.x && cell.y >= self.min.y && cell.y <= self.max.y
    }
}

/// Enumerate the S×S cells of a footprint around `center`
///
/// The center is snapped to the nearest integer point first. Odd sizes span
/// `[c-k, c+k]`, even sizes `[c-k, c+k-1]` with `k = size / 2`. A size of 0
/// is treated as 1. Cells come out row-major.
pub fn footprint_cells(center: Vec2, size: u32) -> Vec<Cell> {
    let size = size.max(1) as i32;
    let k = size / 2;
    let cx = center.x.round() as i32;
    let cy = center.y.round() as i32;

    let (xmin, xmax, ymin, ymax) = if size % 2 == 1 {
        (cx - k, cx + k, cy - k, cy + k)
    } else {
        (cx - k, cx + k - 1, cy - k, cy + k - 1)
    };

    let mut cells = Vec::with_capacity((size * size) as usize);
    for y in ymin..=ymax {
        for x in xmin..=xmax {
            cells.push(Cell::new(x, y));
        }
    }
    cells
}

/// Recover center and size from a set of cells
///
/// Returns `None` unless the cells form an axis-aligned square with no gaps.
/// Duplicate cells are tolerated.
pub fn center_from_cells(cells: &[Cell]) -> Option<Footprint> {
    let first = cells.first()?;
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for cell in cells {
        min_x = min_x.min(cell.x);
        max_x = max_x.max(cell.x);
        min_y = min_y.min(cell.y);
        max_y = max_y.max(cell.y);
    }

    let width = i64::from(max_x) - i64::from(min_x) + 1;
    let height = i64::from(max_y) - i64::from(min_y) + 1;
    if width != height {
        return None;
    }

    // Every distinct cell lies inside the bounding box, so a full count
    // means no holes.
    let distinct: AHashSet<Cell> = cells.iter().copied().collect();
    if distinct.len() as i64 != width * height {
        return None;
    }

    let size = width as u32;
    let k = (size / 2) as i32;
    Some(Footprint {
        center: Vec2::new((min_x + k) as f32, (min_y + k) as f32),
        size,
        center_is_corner: size % 2 == 0,
    })
}

/// Sample every cell whose center lies within `radius` of `center`
///
/// When `center_is_corner` is set the center is a grid intersection and cell
/// centers are offset by (0.5, 0.5) relative to it.
pub fn cells_in_radius(
    center: Vec2,
    radius: u32,
    center_is_corner: bool,
    query: RadiusQuery,
) -> Vec<Cell> {
    let offset = if center_is_corner { 0.5 } else { 0.0 };
    sample(center, radius, offset, query)
}

/// Sample cells around the centroid of an arbitrary cell set
///
/// The centroid is taken over cell centers; it is treated as a corner when it
/// lands on an integer coordinate on both axes.
pub fn cells_in_radius_of(cells: &[Cell], radius: u32, query: RadiusQuery) -> Vec<Cell> {
    if cells.is_empty() {
        return Vec::new();
    }

    let n = cells.len() as f64;
    let sum_x: f64 = cells.iter().map(|c| f64::from(c.x) + 0.5).sum();
    let sum_y: f64 = cells.iter().map(|c| f64::from(c.y) + 0.5).sum();
    let (cx, cy) = (sum_x / n, sum_y / n);

    let center_is_corner = is_nearly_integer(cx) && is_nearly_integer(cy);
    if center_is_corner {
        cells_in_radius(Vec2::new(cx as f32, cy as f32), radius, true, query)
    } else {
        // Back to the cell-index convention
        cells_in_radius(Vec2::new((cx - 0.5) as f32, (cy - 0.5) as f32), radius, false, query)
    }
}

#[inline]
fn is_nearly_integer(v: f64) -> bool {
    (v - v.round()).abs() <= 1e-5
}

fn sample(center: Vec2, radius: u32, offset: f32, query: RadiusQuery) -> Vec<Cell> {
    let r = radius as f32;
    let pad = radius as i32 + 1;
    let bx = center.x.floor() as i32;
    let by = center.y.floor() as i32;

    let threshold = match (query.include_edge, query.euclidean_plus_half) {
        (true, true) => r + 0.5,
        (true, false) => r,
        (false, true) => r - 0.5,
        (false, false) => r,
    };

    let mut cells = Vec::new();
    for y in (by - pad)..=(by + pad) {
        for x in (bx - pad)..=(bx + pad) {
            let dx = x as f32 + offset - center.x;
            let dy = y as f32 + offset - center.y;

            let inside = match query.metric {
                DistanceMetric::Chebyshev => {
                    let d = dx.abs().max(dy.abs());
                    if query.include_edge { d <= r } else { d < r }
                }
                DistanceMetric::Manhattan => {
                    let d = dx.abs() + dy.abs();
                    if query.include_edge { d <= r } else { d < r }
                }
                DistanceMetric::Euclidean => {
                    let e2 = dx * dx + dy * dy;
                    if !query.include_edge && !query.euclidean_plus_half {
                        e2 < r * r
                    } else {
                        e2.sqrt() <= threshold
                    }
                }
            };

            if inside {
                cells.push(Cell::new(x, y));
            }
        }
    }
    cells
}
