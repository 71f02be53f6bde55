pub mod grid;
pub mod spatial;

pub use grid::{GridGeometry, GridRegion};
pub use spatial::{Direction, Point, Spacing, Vector};
