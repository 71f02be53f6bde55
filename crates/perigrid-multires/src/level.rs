//! Level-transition driver.
//!
//! Walks the grid through the resolution levels of one registration run:
//! a placeholder grid before anything starts, the precomputed level-0 grid
//! with zero coefficients, then upsampled coefficients for every subsequent
//! level. The driver returns fresh geometry/coefficient/scale triples; the
//! registration loop decides how to install them in the live transform.

use crate::config::GridConfig;
use crate::error::{GridError, Result};
use crate::scales::build_scales;
use crate::schedule::{GridSchedule, GridScheduleComputer};
use crate::upsample::GridUpsampler;
use perigrid_core::grid::{GridGeometry, GridRegion};
use perigrid_core::spatial::{Direction, Point, Spacing};

/// Everything the registration loop needs to install one resolution level.
#[derive(Debug, Clone)]
pub struct LevelUpdate<const D: usize> {
    /// Control-grid geometry of the level.
    pub geometry: GridGeometry<D>,
    /// Initial coefficients for the level (zero for level 0, upsampled after).
    pub coefficients: Vec<f64>,
    /// Per-parameter optimizer scales with the passive edge applied.
    pub scales: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelState {
    Uninitialized,
    Placeholder,
    Level(usize),
}

/// Drives the control grid through the resolution levels.
///
/// Transitions are one-way: `initialize` once, then `begin_level(0)`,
/// `begin_level(1)`, ... in order. Anything else is a logic error.
#[derive(Debug, Clone)]
pub struct GridLevelDriver<const D: usize> {
    config: GridConfig<D>,
    image: GridGeometry<D>,
    domain_override: Option<GridGeometry<D>>,
    schedule: Option<GridSchedule<D>>,
    state: LevelState,
}

impl<const D: usize> GridLevelDriver<D> {
    /// Create a driver for the given fixed-image geometry and configuration.
    pub fn new(image: GridGeometry<D>, config: GridConfig<D>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            image,
            domain_override: None,
            schedule: None,
            state: LevelState::Uninitialized,
        })
    }

    /// Place grids over `domain` instead of the raw image geometry.
    ///
    /// Used when an initial transform is composed with this one; the
    /// orchestrator owns that transform and supplies the domain it implies.
    pub fn with_domain_override(mut self, domain: GridGeometry<D>) -> Self {
        self.domain_override = Some(domain);
        self
    }

    /// The precomputed schedule, available after [`initialize`](Self::initialize).
    pub fn schedule(&self) -> Option<&GridSchedule<D>> {
        self.schedule.as_ref()
    }

    /// Install the placeholder grid and precompute the per-level schedule.
    ///
    /// The placeholder exists only so that the parameter-count check the
    /// registration loop performs before the first level sees a consistent
    /// transform; its coefficients are zero and are never optimized.
    pub fn initialize(&mut self) -> Result<LevelUpdate<D>> {
        if self.state != LevelState::Uninitialized {
            return Err(GridError::level_transition(
                "initialize called twice on the same driver",
            ));
        }

        let final_spacing = self.config.final_spacing.resolve(self.image.spacing());
        let entries = self
            .config
            .schedule
            .clone()
            .unwrap_or_else(|| GridScheduleComputer::<D>::default_schedule(self.config.levels));

        let mut computer = GridScheduleComputer::new(self.image.clone(), final_spacing, entries)
            .with_periodic_axes(self.config.periodic);
        if let Some(domain) = &self.domain_override {
            computer = computer.with_domain_override(domain.clone());
        }
        self.schedule = Some(computer.compute()?);
        self.state = LevelState::Placeholder;

        let geometry = Self::placeholder_geometry();
        let coefficients = vec![0.0; geometry.num_points() * D];
        let scales = vec![1.0; geometry.num_points() * D];
        Ok(LevelUpdate {
            geometry,
            coefficients,
            scales,
        })
    }

    /// Enter resolution level `level`.
    ///
    /// Level 0 installs the precomputed coarsest grid with zero coefficients;
    /// later levels refine `previous` (the final coefficients the optimizer
    /// produced on the previous level's grid) onto the new geometry.
    pub fn begin_level(&mut self, level: usize, previous: Option<&[f64]>) -> Result<LevelUpdate<D>> {
        let schedule = self.schedule.as_ref().ok_or_else(|| {
            GridError::level_transition("begin_level called before initialize")
        })?;
        let num_levels = schedule.num_levels();
        let geometry = schedule
            .level(level)
            .ok_or_else(|| {
                GridError::level_transition(format!(
                    "level {level} out of range: the schedule has {num_levels} levels"
                ))
            })?
            .clone();

        let coefficients = if level == 0 {
            if self.state != LevelState::Placeholder {
                return Err(GridError::level_transition(
                    "level 0 must follow initialization",
                ));
            }
            vec![0.0; geometry.num_points() * D]
        } else {
            if self.state != LevelState::Level(level - 1) {
                return Err(GridError::level_transition(format!(
                    "level {level} requested out of order"
                )));
            }
            let previous = previous.ok_or_else(|| {
                GridError::level_transition(format!(
                    "level {level} requires the previous level's coefficients"
                ))
            })?;
            let coarse = schedule.level(level - 1).cloned().ok_or_else(|| {
                GridError::level_transition(format!("no geometry for level {}", level - 1))
            })?;
            GridUpsampler::new()
                .with_periodic_axes(self.config.periodic)
                .upsample(&coarse, previous, &geometry)?
        };

        let scales = build_scales(&geometry, self.config.passive_edge_width(level))?;
        self.state = LevelState::Level(level);
        Ok(LevelUpdate {
            geometry,
            coefficients,
            scales,
        })
    }

    /// The 1×…×1×4 placeholder grid installed before the first level.
    fn placeholder_geometry() -> GridGeometry<D> {
        let mut size = [1usize; D];
        if D > 0 {
            size[D - 1] = 4;
        }
        GridGeometry::new(
            Point::origin(),
            Spacing::uniform(1.0),
            Direction::identity(),
            GridRegion::from_size(size),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> GridLevelDriver<2> {
        let image = GridGeometry::axis_aligned(
            Point::origin(),
            Spacing::new([1.0, 1.0]),
            [64, 60],
        );
        GridLevelDriver::new(image, GridConfig::new(3)).unwrap()
    }

    #[test]
    fn test_placeholder_shape() {
        let mut d = driver();
        let update = d.initialize().unwrap();
        assert_eq!(update.geometry.region().size(), [1, 4]);
        assert_eq!(update.coefficients, vec![0.0; 8]);
        assert_eq!(update.scales, vec![1.0; 8]);
        assert_eq!(d.schedule().unwrap().num_levels(), 3);
    }

    #[test]
    fn test_initialize_twice_fails() {
        let mut d = driver();
        d.initialize().unwrap();
        assert!(matches!(
            d.initialize(),
            Err(GridError::LevelTransition(_))
        ));
    }

    #[test]
    fn test_level_zero_before_initialize_fails() {
        let mut d = driver();
        assert!(matches!(
            d.begin_level(0, None),
            Err(GridError::LevelTransition(_))
        ));
    }

    #[test]
    fn test_out_of_order_level_fails() {
        let mut d = driver();
        d.initialize().unwrap();
        assert!(matches!(
            d.begin_level(1, Some(&[])),
            Err(GridError::LevelTransition(_))
        ));
    }

    #[test]
    fn test_upsampling_requires_previous_coefficients() {
        let mut d = driver();
        d.initialize().unwrap();
        d.begin_level(0, None).unwrap();
        assert!(matches!(
            d.begin_level(1, None),
            Err(GridError::LevelTransition(_))
        ));
    }
}
