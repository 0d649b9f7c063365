//! Geometric primitives for FLIP transitions: Point, Size, Rect, EdgeInsets
//! and a 2D affine matrix.

mod geometry;
mod matrix;

pub use geometry::{EdgeInsets, Point, Rect, Size};
pub use matrix::Matrix2d;
