//! This module is full of primitives that all impl Intersect

mod aabb;
mod cube;
mod quad;
mod sphere;
mod triangle;

pub use aabb::*;
pub use cube::*;
pub use quad::*;
pub use sphere::*;
pub use triangle::*;

use crate::ray::{Hit, Interval, Ray};
use glam::{Vec2, Vec3};

/// Sampled points are pushed this far off the emitter along its normal
pub const LIGHT_SAMPLE_OFFSET: f32 = 0.001;

/// Computes whether a ray intersects a primitive
pub trait Intersect: Send + Sync {
    /// Computes the intersection between the ray and the primitive.
    /// Only roots strictly inside `range` count. On a hit the record is filled in,
    /// `range.max` is tightened to the new `t` and true is returned.
    fn intersection(&self, ray: &Ray, range: &mut Interval, hit: &mut Hit) -> bool;

    /// World space bounds of the primitive
    fn bounds(&self) -> AABB;
}

/// A point sampled on an emitting surface
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightSample {
    pub point: Vec3,
    /// Faces the reference point the sample was taken for
    pub normal: Vec3,
    pub area_pdf: f32,
}

/// Primitives that can act as area lights
pub trait Emitter {
    fn area(&self) -> f32;

    /// Picks a point uniformly over the surface from `u` in `[0, 1)^2`
    fn sample(&self, u: Vec2, reference: Vec3) -> LightSample;
}

/// Orients the sample towards `reference` and lifts it off the surface
fn face_sample(point: Vec3, normal: Vec3, reference: Vec3, area: f32) -> LightSample {
    let normal = if (reference - point).dot(normal) < 0.0 {
        -normal
    } else {
        normal
    };

    LightSample {
        point: point + LIGHT_SAMPLE_OFFSET * normal,
        normal,
        area_pdf: 1.0 / area,
    }
}
