//! Pixel encodings and scaling math shared by every presentation backend.

pub mod color;
pub mod geometry;

pub use color::{ColorOps, ColorTables, PixelFormat};
pub use geometry::{compute_transform, Affine, Geometry, Transform, ViewParams};
