//! Physical geometry of a lattice: origin, spacing, orientation, and region.
//!
//! `GridGeometry` describes both the fixed-image domain handed to the
//! schedule computer and the control-point grids it produces.

use super::GridRegion;
use crate::spatial::{Direction, Point, Spacing, Vector};

/// Geometry of a D-dimensional lattice in physical space.
///
/// The origin is the physical position of lattice index 0 along every axis;
/// the direction matrix maps lattice axes into physical space.
#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry<const D: usize> {
    origin: Point<D>,
    spacing: Spacing<D>,
    direction: Direction<D>,
    region: GridRegion<D>,
}

impl<const D: usize> GridGeometry<D> {
    /// Create a new geometry.
    pub fn new(
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
        region: GridRegion<D>,
    ) -> Self {
        Self {
            origin,
            spacing,
            direction,
            region,
        }
    }

    /// Axis-aligned geometry with identity orientation and zero index.
    pub fn axis_aligned(origin: Point<D>, spacing: Spacing<D>, size: [usize; D]) -> Self {
        Self::new(origin, spacing, Direction::identity(), GridRegion::from_size(size))
    }

    /// Get the origin.
    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    /// Get the spacing.
    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    /// Get the direction.
    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    /// Get the index region.
    pub fn region(&self) -> &GridRegion<D> {
        &self.region
    }

    /// Number of lattice points.
    pub fn num_points(&self) -> usize {
        self.region.num_points()
    }

    /// Convert a continuous lattice index to a physical point.
    ///
    /// `point = origin + direction * (index * spacing)`
    pub fn continuous_index_to_point(&self, index: [f64; D]) -> Point<D> {
        let mut scaled = Vector::<D>::zeros();
        for d in 0..D {
            scaled[d] = index[d] * self.spacing[d];
        }
        self.origin + self.direction * scaled
    }

    /// Convert a physical point to a continuous lattice index.
    ///
    /// Requires an invertible (orthonormal in practice) direction matrix.
    pub fn point_to_continuous_index(&self, point: &Point<D>) -> [f64; D] {
        let diff = *point - self.origin;
        let inv = self
            .direction
            .try_inverse()
            .expect("Direction matrix must be invertible");
        let rotated = inv * diff;
        let mut index = [0.0; D];
        for d in 0..D {
            index[d] = rotated[d] / self.spacing[d];
        }
        index
    }

    /// True if the two geometries live in the same physical coordinate frame,
    /// i.e. their direction matrices agree within `tol` per entry.
    pub fn same_frame(&self, other: &Self, tol: f64) -> bool {
        self.direction.approx_eq(&other.direction, tol)
    }
}
