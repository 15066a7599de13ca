//! Uniform point sampling over the configuration space window.

use rand::Rng;

use crate::tree::Point;

/// Draws a point uniformly from `[0, width) x [0, height)`.
pub fn sample_point(width: f32, height: f32, rng: &mut impl Rng) -> Point {
    Point::new(rng.gen_range(0.0..width), rng.gen_range(0.0..height))
}
