//! Grid block of the transform-parameter text file.
//!
//! After the generic transform header, the file carries five lines that pin
//! down the control grid:
//!
//! ```text
//! (GridSize 10 10 12)
//! (GridIndex 0 0 0)
//! (GridSpacing 16 16 15)
//! (GridOrigin -24 -24 0)
//! (GridDirection 1 0 0 0 1 0 0 0 1)
//! ```
//!
//! `GridDirection` is the column-major flattening of the direction matrix.
//! Floats are written with Rust's shortest round-trip formatting, so reading
//! the block back reproduces the geometry bit for bit. The grid must be
//! installed before the generic parameter vector is parsed, because the
//! parameter-count check depends on the grid size.

use anyhow::Result;
use perigrid_core::grid::{GridGeometry, GridRegion};
use perigrid_core::spatial::{Direction, Point, Spacing};
use perigrid_multires::ParameterMap;
use std::fmt::Display;
use std::io::Write;

fn write_line<W: Write, T: Display>(writer: &mut W, key: &str, values: &[T]) -> Result<()> {
    write!(writer, "({key}")?;
    for v in values {
        write!(writer, " {v}")?;
    }
    writeln!(writer, ")")?;
    Ok(())
}

/// Append the grid block for `grid` to `writer`.
pub fn write_grid_block<W: Write, const D: usize>(
    writer: &mut W,
    grid: &GridGeometry<D>,
) -> Result<()> {
    write_line(writer, "GridSize", &grid.region().size())?;
    write_line(writer, "GridIndex", &grid.region().index())?;
    write_line(writer, "GridSpacing", &grid.spacing().to_vec())?;
    write_line(writer, "GridOrigin", &grid.origin().to_vec())?;
    write_line(writer, "GridDirection", &grid.direction().to_column_major())?;
    Ok(())
}

/// Rebuild a grid geometry from the parameter map of a transform file.
///
/// Keys absent from the map fall back to their defaults per axis: size 1,
/// index 0, spacing 1.0, origin 0.0, identity direction.
pub fn read_grid_block<const D: usize>(map: &ParameterMap) -> Result<GridGeometry<D>> {
    let mut size = [1usize; D];
    let mut index = [0i64; D];
    let mut spacing = Spacing::<D>::uniform(1.0);
    let mut origin = Point::<D>::origin();
    let mut direction_flat = Direction::<D>::identity().to_column_major();

    for i in 0..D {
        if let Some(v) = map.usize_at("GridSize", i)? {
            size[i] = v;
        }
        if let Some(v) = map.i64_at("GridIndex", i)? {
            index[i] = v;
        }
        if let Some(v) = map.f64_at("GridSpacing", i)? {
            spacing[i] = v;
        }
        if let Some(v) = map.f64_at("GridOrigin", i)? {
            origin[i] = v;
        }
        for j in 0..D {
            if let Some(v) = map.f64_at("GridDirection", i * D + j)? {
                direction_flat[i * D + j] = v;
            }
        }
    }

    Ok(GridGeometry::new(
        origin,
        spacing,
        Direction::from_column_major(&direction_flat),
        GridRegion::new(index, size),
    ))
}

/// Parse `(Key value value ...)` lines into a [`ParameterMap`].
///
/// Lines that do not open a parenthesized entry and `//` comments are
/// skipped; this covers the grid block and any other keyed line of the
/// transform-parameter format.
pub fn parse_transform_parameters(text: &str) -> ParameterMap {
    let mut map = ParameterMap::new();
    for line in text.lines() {
        let line = match line.find("//") {
            Some(pos) => &line[..pos],
            None => line,
        };
        let line = line.trim();
        let Some(body) = line.strip_prefix('(').and_then(|l| l.strip_suffix(')')) else {
            continue;
        };
        let mut tokens = body.split_whitespace();
        let Some(key) = tokens.next() else {
            continue;
        };
        let values: Vec<String> = tokens
            .map(|t| t.trim_matches('"').to_string())
            .collect();
        map.set(key, values);
    }
    map
}
