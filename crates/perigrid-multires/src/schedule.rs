//! Per-level control-grid geometry computation.
//!
//! The schedule computer turns the fixed-image geometry, a final grid
//! spacing, and per-level spacing multipliers into one grid geometry per
//! resolution level. Along periodic axes the spacing is snapped so an
//! integer number of control-point intervals tiles the domain, with no
//! control point duplicated at the seam.

use crate::error::{GridError, Result};
use perigrid_core::grid::{GridGeometry, GridRegion};
use perigrid_core::spatial::{Spacing, Vector};
use tracing::warn;

/// B-spline order used throughout the transform stack.
pub const DEFAULT_SPLINE_ORDER: usize = 3;

/// Relative deviation above which a periodic spacing snap is reported.
const ADJUSTMENT_TOLERANCE: f64 = 1e-10;

/// Record of a periodic spacing snap at one level/axis.
///
/// Non-fatal: registration proceeds with the resolved spacing, but the
/// deviation is observable both here and via `tracing`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpacingAdjustment {
    pub level: usize,
    pub axis: usize,
    pub requested: f64,
    pub resolved: f64,
}

/// Precomputed grid geometries for every resolution level.
#[derive(Debug, Clone)]
pub struct GridSchedule<const D: usize> {
    levels: Vec<GridGeometry<D>>,
    final_spacing: Spacing<D>,
    adjustments: Vec<SpacingAdjustment>,
}

impl<const D: usize> GridSchedule<D> {
    /// Number of resolution levels.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Grid geometry of `level` (0 = coarsest).
    pub fn level(&self, level: usize) -> Option<&GridGeometry<D>> {
        self.levels.get(level)
    }

    /// Final grid spacing in physical units.
    pub fn final_spacing(&self) -> &Spacing<D> {
        &self.final_spacing
    }

    /// Spacing snaps applied to satisfy periodic tiling.
    pub fn adjustments(&self) -> &[SpacingAdjustment] {
        &self.adjustments
    }
}

/// Computes the per-level grid geometries once, before level 0 starts.
#[derive(Debug, Clone)]
pub struct GridScheduleComputer<const D: usize> {
    image: GridGeometry<D>,
    domain_override: Option<GridGeometry<D>>,
    periodic: [bool; D],
    final_spacing: Spacing<D>,
    schedule: Vec<[f64; D]>,
}

impl<const D: usize> GridScheduleComputer<D> {
    /// Create a computer for the given fixed-image geometry, resolved final
    /// grid spacing (physical units), and per-level spacing multipliers.
    pub fn new(
        image: GridGeometry<D>,
        final_spacing: Spacing<D>,
        schedule: Vec<[f64; D]>,
    ) -> Self {
        Self {
            image,
            domain_override: None,
            periodic: [false; D],
            final_spacing,
            schedule,
        }
    }

    /// Mark the axes along which the deformation field wraps.
    pub fn with_periodic_axes(mut self, periodic: [bool; D]) -> Self {
        self.periodic = periodic;
        self
    }

    /// Use `domain` instead of the raw image geometry when placing grids.
    ///
    /// When an initial transform is composed with this one, the orchestrator
    /// supplies the transformed domain here; the computer itself does not
    /// interpret the initial transform.
    pub fn with_domain_override(mut self, domain: GridGeometry<D>) -> Self {
        self.domain_override = Some(domain);
        self
    }

    /// The default schedule: `levels` entries, level `l` gets the isotropic
    /// multiplier `2^(levels-1-l)`, so the finest level is 1.
    pub fn default_schedule(levels: usize) -> Vec<[f64; D]> {
        (0..levels)
            .map(|l| [2f64.powi((levels - 1 - l) as i32); D])
            .collect()
    }

    /// Compute the geometry of every resolution level.
    pub fn compute(&self) -> Result<GridSchedule<D>> {
        if self.schedule.is_empty() {
            return Err(GridError::invalid_configuration(
                "schedule must have at least one level",
            ));
        }
        if !self.final_spacing.is_positive() {
            return Err(GridError::invalid_configuration(
                "final grid spacing must be positive along every axis",
            ));
        }

        let domain = self.domain_override.as_ref().unwrap_or(&self.image);
        if domain.region().size().iter().any(|&s| s == 0) {
            return Err(GridError::invalid_configuration(
                "image region must be non-empty along every axis",
            ));
        }
        let extent = self.domain_extent(domain);

        let mut levels = Vec::with_capacity(self.schedule.len());
        let mut adjustments = Vec::new();

        for (level, entry) in self.schedule.iter().enumerate() {
            if entry.iter().any(|&m| m <= 0.0) {
                return Err(GridError::invalid_configuration(format!(
                    "schedule multiplier at level {level} must be positive"
                )));
            }

            let mut size = [0usize; D];
            let mut spacing = Spacing::<D>::zeros();
            let mut offset = Vector::<D>::zeros();

            for d in 0..D {
                let target = self.final_spacing[d] * entry[d];
                if self.periodic[d] {
                    let cells = (extent[d] / target).round().max(1.0);
                    let resolved = extent[d] / cells;
                    if (resolved - target).abs() > ADJUSTMENT_TOLERANCE * target {
                        warn!(
                            level,
                            axis = d,
                            requested = target,
                            resolved,
                            "grid spacing adjusted to tile the periodic domain"
                        );
                        adjustments.push(SpacingAdjustment {
                            level,
                            axis: d,
                            requested: target,
                            resolved,
                        });
                    }
                    size[d] = cells as usize;
                    spacing[d] = resolved;
                    offset[d] = 0.0;
                } else {
                    // Covering nodes over the extent plus the support border.
                    let bare = (extent[d] / target).ceil() as usize + 1;
                    size[d] = bare + DEFAULT_SPLINE_ORDER;
                    spacing[d] = target;
                    offset[d] = -((size[d] - 1) as f64 * target - extent[d]) / 2.0;
                }
            }

            // The domain start accounts for a nonzero image region index.
            let mut start = Vector::<D>::zeros();
            let index = domain.region().index();
            for d in 0..D {
                start[d] = index[d] as f64 * domain.spacing()[d] + offset[d];
            }
            let origin = *domain.origin() + *domain.direction() * start;

            levels.push(GridGeometry::new(
                origin,
                spacing,
                *domain.direction(),
                GridRegion::from_size(size),
            ));
        }

        Ok(GridSchedule {
            levels,
            final_spacing: self.final_spacing,
            adjustments,
        })
    }

    /// Physical extent of the domain along each axis: `(size-1) * spacing`
    /// for ordinary axes, a full cycle `size * spacing` for periodic axes.
    fn domain_extent(&self, domain: &GridGeometry<D>) -> [f64; D] {
        let size = domain.region().size();
        let mut extent = [0.0; D];
        for d in 0..D {
            let samples = if self.periodic[d] {
                size[d] as f64
            } else {
                (size[d] - 1) as f64
            };
            extent[d] = samples * domain.spacing()[d];
        }
        extent
    }
}
