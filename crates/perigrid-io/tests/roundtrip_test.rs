use perigrid_core::grid::{GridGeometry, GridRegion};
use perigrid_core::spatial::{Direction, Point, Spacing};
use perigrid_io::{parse_transform_parameters, read_grid_block, write_grid_block};

fn rotated_direction(angle: f64) -> Direction<2> {
    let mut d = Direction::identity();
    d[(0, 0)] = angle.cos();
    d[(0, 1)] = -angle.sin();
    d[(1, 0)] = angle.sin();
    d[(1, 1)] = angle.cos();
    d
}

#[test]
fn grid_block_roundtrip_is_bit_exact() {
    // Values that do not have finite decimal expansions
    let grid = GridGeometry::<2>::new(
        Point::new([-37.5, 1.0 / 3.0]),
        Spacing::new([90.0 / 13.0, 16.0]),
        rotated_direction(0.7),
        GridRegion::new([0, -2], [13, 9]),
    );

    let mut out = Vec::new();
    write_grid_block(&mut out, &grid).unwrap();
    let text = String::from_utf8(out).unwrap();

    let map = parse_transform_parameters(&text);
    let restored: GridGeometry<2> = read_grid_block(&map).unwrap();

    assert_eq!(restored, grid);
}

#[test]
fn roundtrip_through_full_parameter_file() {
    let grid = GridGeometry::<3>::axis_aligned(
        Point::new([0.0, -12.25, 4.0]),
        Spacing::new([16.0, 16.0, 90.0 / 7.0]),
        [10, 10, 7],
    );

    let mut block = Vec::new();
    write_grid_block(&mut block, &grid).unwrap();
    let file = format!(
        "(Transform \"PeriodicBSplineTransform\")\n\
         (NumberOfParameters {})\n\
         // BSplineTransform specific\n\
         {}",
        grid.num_points() * 3,
        String::from_utf8(block).unwrap()
    );

    let map = parse_transform_parameters(&file);
    let restored: GridGeometry<3> = read_grid_block(&map).unwrap();
    assert_eq!(restored, grid);

    // The grid must be installable before the generic parameter vector is
    // parsed: the expected parameter count comes from the grid size.
    let count: usize = map.raw("NumberOfParameters", 0).unwrap().parse().unwrap();
    assert_eq!(count, restored.num_points() * 3);
}

#[test]
fn missing_direction_defaults_to_identity() {
    let text = "(GridSize 4 4)\n(GridSpacing 8 8)\n";
    let map = parse_transform_parameters(text);
    let restored: GridGeometry<2> = read_grid_block(&map).unwrap();
    assert_eq!(restored.region().size(), [4, 4]);
    assert_eq!(*restored.direction(), Direction::identity());
    assert_eq!(*restored.origin(), Point::origin());
}
