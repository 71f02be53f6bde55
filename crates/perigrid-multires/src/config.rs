//! Typed grid configuration read from a parameter source.

use crate::error::{GridError, Result};
use crate::params::ParameterMap;
use perigrid_core::spatial::Spacing;

/// Default final grid spacing when neither spacing key is supplied.
pub const DEFAULT_FINAL_SPACING_IN_VOXELS: f64 = 16.0;

/// Final grid spacing of the finest level, in voxel or physical units.
#[derive(Debug, Clone, PartialEq)]
pub enum FinalSpacing<const D: usize> {
    /// Multiples of the fixed-image voxel spacing per axis.
    Voxels(Spacing<D>),
    /// Physical units per axis, used as-is.
    PhysicalUnits(Spacing<D>),
}

impl<const D: usize> FinalSpacing<D> {
    /// Resolve to physical units against the fixed-image spacing.
    pub fn resolve(&self, image_spacing: &Spacing<D>) -> Spacing<D> {
        match self {
            Self::Voxels(v) => v.component_mul(image_spacing),
            Self::PhysicalUnits(p) => *p,
        }
    }
}

/// Configuration of the control-grid schedule for one registration run.
#[derive(Debug, Clone)]
pub struct GridConfig<const D: usize> {
    /// Number of resolution levels.
    pub levels: usize,
    /// Axes along which the deformation field wraps.
    pub periodic: [bool; D],
    /// Finest-level grid spacing specification.
    pub final_spacing: FinalSpacing<D>,
    /// Per-level, per-axis spacing multipliers; `None` selects the default
    /// geometric schedule (factor 2 per coarser level, finest = 1).
    pub schedule: Option<Vec<[f64; D]>>,
    /// Passive edge widths, indexed per level with last-entry fallback.
    pub passive_edge_widths: Vec<usize>,
}

impl<const D: usize> GridConfig<D> {
    /// Create a configuration with defaults: last axis periodic, final
    /// spacing 16 voxels, default schedule, no passive edge.
    pub fn new(levels: usize) -> Self {
        let mut periodic = [false; D];
        if D > 0 {
            periodic[D - 1] = true;
        }
        Self {
            levels,
            periodic,
            final_spacing: FinalSpacing::Voxels(Spacing::uniform(DEFAULT_FINAL_SPACING_IN_VOXELS)),
            schedule: None,
            passive_edge_widths: Vec::new(),
        }
    }

    /// Set the periodic axes.
    pub fn with_periodic_axes(mut self, periodic: [bool; D]) -> Self {
        self.periodic = periodic;
        self
    }

    /// Set the final grid spacing specification.
    pub fn with_final_spacing(mut self, final_spacing: FinalSpacing<D>) -> Self {
        self.final_spacing = final_spacing;
        self
    }

    /// Set an explicit per-level schedule.
    pub fn with_schedule(mut self, schedule: Vec<[f64; D]>) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Set the passive edge widths.
    pub fn with_passive_edge_widths(mut self, widths: Vec<usize>) -> Self {
        self.passive_edge_widths = widths;
        self
    }

    /// Passive edge width for `level`: the entry for that level, or the last
    /// given entry for later levels, or 0 when none are configured.
    pub fn passive_edge_width(&self, level: usize) -> usize {
        match self.passive_edge_widths.len() {
            0 => 0,
            n => self.passive_edge_widths[level.min(n - 1)],
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.levels == 0 {
            return Err(GridError::invalid_configuration(
                "at least 1 resolution level is required",
            ));
        }
        if let Some(schedule) = &self.schedule {
            if schedule.len() != self.levels {
                return Err(GridError::invalid_configuration(format!(
                    "schedule has {} entries for {} levels",
                    schedule.len(),
                    self.levels
                )));
            }
            for (level, entry) in schedule.iter().enumerate() {
                if entry.iter().any(|&m| m <= 0.0) {
                    return Err(GridError::invalid_configuration(format!(
                        "schedule multiplier at level {level} must be positive"
                    )));
                }
            }
        }
        let spacing = match &self.final_spacing {
            FinalSpacing::Voxels(s) | FinalSpacing::PhysicalUnits(s) => s,
        };
        if !spacing.is_positive() {
            return Err(GridError::invalid_configuration(
                "final grid spacing must be positive along every axis",
            ));
        }
        Ok(())
    }

    /// Read the configuration from a parameter map.
    ///
    /// Keys: `FinalGridSpacingInVoxels`, `FinalGridSpacingInPhysicalUnits`
    /// (physical units take precedence when both are given),
    /// `GridSpacingSchedule` (`levels` isotropic entries or `levels * D`
    /// per-axis entries), `PassiveEdgeWidth` (indexed per level).
    pub fn from_parameters(map: &ParameterMap, levels: usize) -> Result<Self> {
        let mut config = Self::new(levels);

        config.final_spacing = Self::read_final_spacing(map)?;
        config.schedule = Self::read_schedule(map, levels)?;

        let width_count = map.count("PassiveEdgeWidth");
        let mut widths = Vec::with_capacity(width_count);
        for i in 0..width_count {
            // usize_at never yields None below count
            widths.push(map.usize_at("PassiveEdgeWidth", i)?.unwrap_or(0));
        }
        config.passive_edge_widths = widths;

        config.validate()?;
        Ok(config)
    }

    fn read_final_spacing(map: &ParameterMap) -> Result<FinalSpacing<D>> {
        let voxel_count = map.count("FinalGridSpacingInVoxels");
        let physical_count = map.count("FinalGridSpacingInPhysicalUnits");

        // Physical units win whenever they are given at all. The one input
        // with no defensible answer is both keys present with neither
        // covering every axis.
        if voxel_count > 0 && physical_count > 0 && voxel_count < D && physical_count < D {
            return Err(GridError::invalid_configuration(format!(
                "FinalGridSpacingInVoxels ({voxel_count} entries) and \
                 FinalGridSpacingInPhysicalUnits ({physical_count} entries) \
                 are both partially specified; complete one of them"
            )));
        }

        let (key, default) = if physical_count > 0 {
            ("FinalGridSpacingInPhysicalUnits", 0.0)
        } else {
            ("FinalGridSpacingInVoxels", DEFAULT_FINAL_SPACING_IN_VOXELS)
        };

        let mut values = [default; D];
        for (dim, value) in values.iter_mut().enumerate() {
            if let Some(v) = map.f64_at_or_last(key, dim)? {
                *value = v;
            }
        }
        let spacing = Spacing::new(values);

        Ok(if physical_count > 0 {
            FinalSpacing::PhysicalUnits(spacing)
        } else {
            FinalSpacing::Voxels(spacing)
        })
    }

    fn read_schedule(map: &ParameterMap, levels: usize) -> Result<Option<Vec<[f64; D]>>> {
        let count = map.count("GridSpacingSchedule");
        if count == 0 {
            return Ok(None);
        }

        let mut schedule = vec![[1.0; D]; levels];
        if count == levels {
            for (level, entry) in schedule.iter_mut().enumerate() {
                let m = map.f64_at("GridSpacingSchedule", level)?.unwrap_or(1.0);
                *entry = [m; D];
            }
        } else if count == levels * D {
            let mut entry_nr = 0;
            for entry in schedule.iter_mut() {
                for value in entry.iter_mut() {
                    *value = map.f64_at("GridSpacingSchedule", entry_nr)?.unwrap_or(1.0);
                    entry_nr += 1;
                }
            }
        } else {
            return Err(GridError::invalid_configuration(format!(
                "GridSpacingSchedule has {count} entries; expected the number \
                 of levels ({levels}) or levels * dimension ({})",
                levels * D
            )));
        }
        Ok(Some(schedule))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Config2 = GridConfig<2>;

    #[test]
    fn test_defaults() {
        let config = Config2::new(3);
        assert_eq!(config.levels, 3);
        assert_eq!(config.periodic, [false, true]);
        assert_eq!(config.passive_edge_width(0), 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_voxel_spacing_resolution() {
        let config = Config2::new(3)
            .with_final_spacing(FinalSpacing::Voxels(Spacing::uniform(16.0)));
        let resolved = config.final_spacing.resolve(&Spacing::new([2.0, 2.0]));
        assert_eq!(resolved, Spacing::new([32.0, 32.0]));
    }

    #[test]
    fn test_physical_units_win_when_both_given() {
        let mut map = ParameterMap::new();
        map.set("FinalGridSpacingInVoxels", ["16", "16"]);
        map.set("FinalGridSpacingInPhysicalUnits", ["8.0", "9.0"]);
        let config = Config2::from_parameters(&map, 3).unwrap();
        assert_eq!(
            config.final_spacing,
            FinalSpacing::PhysicalUnits(Spacing::new([8.0, 9.0]))
        );
    }

    #[test]
    fn test_both_keys_partially_specified_rejected() {
        let mut map = ParameterMap::new();
        map.set("FinalGridSpacingInVoxels", ["16"]);
        map.set("FinalGridSpacingInPhysicalUnits", ["8.0"]);
        let err = Config2::from_parameters(&map, 3).unwrap_err();
        assert!(matches!(err, GridError::InvalidConfiguration(_)));
        let msg = err.to_string();
        assert!(msg.contains("FinalGridSpacingInPhysicalUnits"), "{msg}");
    }

    #[test]
    fn test_schedule_count_validation() {
        let mut map = ParameterMap::new();
        map.set("GridSpacingSchedule", ["4.0", "2.0", "1.0", "1.0", "1.0"]);
        let err = Config2::from_parameters(&map, 3).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains('5'), "message should carry the offending count: {msg}");
    }

    #[test]
    fn test_isotropic_schedule_expansion() {
        let mut map = ParameterMap::new();
        map.set("GridSpacingSchedule", ["4.0", "2.0", "1.0"]);
        let config = Config2::from_parameters(&map, 3).unwrap();
        assert_eq!(
            config.schedule,
            Some(vec![[4.0, 4.0], [2.0, 2.0], [1.0, 1.0]])
        );
    }

    #[test]
    fn test_per_axis_schedule() {
        let mut map = ParameterMap::new();
        map.set("GridSpacingSchedule", ["4.0", "8.0", "2.0", "4.0", "1.0", "1.0"]);
        let config = Config2::from_parameters(&map, 3).unwrap();
        assert_eq!(
            config.schedule,
            Some(vec![[4.0, 8.0], [2.0, 4.0], [1.0, 1.0]])
        );
    }

    #[test]
    fn test_passive_edge_width_per_level() {
        let mut map = ParameterMap::new();
        map.set("PassiveEdgeWidth", ["0", "1", "2"]);
        let config = Config2::from_parameters(&map, 4).unwrap();
        assert_eq!(config.passive_edge_width(0), 0);
        assert_eq!(config.passive_edge_width(1), 1);
        assert_eq!(config.passive_edge_width(2), 2);
        // Levels past the last entry reuse it
        assert_eq!(config.passive_edge_width(3), 2);
    }

    #[test]
    fn test_partial_axis_spacing_extends_last() {
        let mut map = ParameterMap::new();
        map.set("FinalGridSpacingInPhysicalUnits", ["8.0"]);
        let config = Config2::from_parameters(&map, 2).unwrap();
        assert_eq!(
            config.final_spacing,
            FinalSpacing::PhysicalUnits(Spacing::new([8.0, 8.0]))
        );
    }

    #[test]
    fn test_nonpositive_multiplier_rejected() {
        let config = Config2::new(2).with_schedule(vec![[2.0, 2.0], [0.0, 1.0]]);
        assert!(config.validate().is_err());
    }
}
