//! Isosurface extraction from padded scalar fields.

mod marching_cubes;
mod tables;

pub use marching_cubes::extract_mesh;
