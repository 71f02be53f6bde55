pub mod transform_file;

pub use transform_file::{parse_transform_parameters, read_grid_block, write_grid_block};
