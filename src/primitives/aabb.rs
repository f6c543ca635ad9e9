use crate::{
    bvh::{Axis, GetAxis},
    ray::{Hit, Interval, Ray},
};
use glam::{vec2, vec3, Mat4, Vec3};
use itertools::iproduct;

/// Axis aligned bounding box.
/// The empty box has `min = +inf` and `max = -inf` so a union with it is a no-op.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for AABB {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl AABB {
    pub const EMPTY: AABB = AABB {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// The smallest box containing every point
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points
            .into_iter()
            .fold(AABB::EMPTY, |b, p| b.point_union(p))
    }

    // Create a union AABB of two AABBs that surrounds both of them
    pub fn union(self, other: AABB) -> Self {
        let min = vec3(
            self.min.x.min(other.min.x),
            self.min.y.min(other.min.y),
            self.min.z.min(other.min.z),
        );
        let max = vec3(
            self.max.x.max(other.max.x),
            self.max.y.max(other.max.y),
            self.max.z.max(other.max.z),
        );

        AABB::new(min, max)
    }

    pub fn point_union(self, other: Vec3) -> Self {
        self.union(AABB::new(other, other))
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn diagonal(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn centroid(&self) -> Vec3 {
        0.5 * (self.min + self.max)
    }

    // Returns the axis which has greatest extent, ties go to the earlier axis
    pub fn max_extent(&self) -> Axis {
        let extent = self.diagonal();

        if extent.x >= extent.y && extent.x >= extent.z {
            Axis::X
        } else if extent.y >= extent.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }

        let d = self.diagonal();
        2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    /// Position of `point` relative to the box, `0` at `min` and `1` at `max`
    pub fn relative(&self, point: Vec3) -> Vec3 {
        (point - self.min) / self.diagonal()
    }

    /// True if the point lies strictly inside the box on every axis
    pub fn contains(&self, point: Vec3) -> bool {
        Axis::ALL.iter().all(|&axis| {
            self.min.axis(axis) < point.axis(axis) && point.axis(axis) < self.max.axis(axis)
        })
    }

    pub fn padded(&self, eps: f32) -> Self {
        AABB::new(self.min - Vec3::splat(eps), self.max + Vec3::splat(eps))
    }

    /// World space bounds of a box placed by `model`.
    /// Boxes are not affine invariant, so all 8 corners are transformed.
    pub fn transformed(&self, model: &Mat4) -> Self {
        let ends = [self.min, self.max];

        AABB::from_points(
            iproduct!(0..2, 0..2, 0..2)
                .map(|(i, j, k)| model.transform_point3(vec3(ends[i].x, ends[j].y, ends[k].z))),
        )
    }

    /// Raw slab test: the parametric entry and exit of the ray, unclamped.
    /// Zero direction components produce infinities, and the NaN from `0 * inf`
    /// is dropped by `f32::min`/`f32::max`.
    // Taken from tavianator.com
    pub fn slab(&self, ray: &Ray) -> (f32, f32) {
        let mut near = f32::NEG_INFINITY;
        let mut far = f32::INFINITY;

        for axis in Axis::ALL {
            let t1 = (self.min.axis(axis) - ray.origin.axis(axis)) * ray.inv_direction.axis(axis);
            let t2 = (self.max.axis(axis) - ray.origin.axis(axis)) * ray.inv_direction.axis(axis);

            near = f32::max(near, f32::min(t1, t2));
            far = f32::min(far, f32::max(t1, t2));
        }

        (near, far)
    }

    pub fn hit(&self, ray: &Ray, range: Interval) -> bool {
        self.hit_t(ray, range).is_some()
    }

    /// Entry distance of the ray into the box, clamped to the start of the range
    pub fn hit_t(&self, ray: &Ray, range: Interval) -> Option<f32> {
        let (near, far) = self.slab(ray);
        let tmin = f32::max(near, range.min);
        let tmax = f32::min(far, range.max);

        if tmax < tmin || tmax < 0.0 {
            None
        } else {
            Some(tmin)
        }
    }

    /// Intersects the surface of the box and fills in the hit record.
    /// A ray starting inside the box hits the far face instead of the near one.
    pub fn intersection(&self, ray: &Ray, range: &mut Interval, hit: &mut Hit) -> bool {
        let mut near = f32::NEG_INFINITY;
        let mut far = f32::INFINITY;
        let mut near_axis = Axis::X;
        let mut far_axis = Axis::X;

        for axis in Axis::ALL {
            let t1 = (self.min.axis(axis) - ray.origin.axis(axis)) * ray.inv_direction.axis(axis);
            let t2 = (self.max.axis(axis) - ray.origin.axis(axis)) * ray.inv_direction.axis(axis);

            let enter = f32::min(t1, t2);
            let exit = f32::max(t1, t2);

            if enter > near {
                near = enter;
                near_axis = axis;
            }
            if exit < far {
                far = exit;
                far_axis = axis;
            }
        }

        if far < near || far < 0.0 {
            return false;
        }

        let inside = self.contains(ray.origin) || near <= range.min;
        let (t, axis) = if inside { (far, far_axis) } else { (near, near_axis) };

        if !range.surrounds(t) {
            return false;
        }

        // Outward facing normal of the face we went through
        let towards_positive = ray.direction.axis(axis) > 0.0;
        let sign = if towards_positive != inside { -1.0 } else { 1.0 };
        let mut normal = [0.0; 3];
        normal[axis.index()] = sign;

        let point = ray.at(t);
        let ratio = self.relative(point);

        hit.t = t;
        hit.point = point;
        hit.uv = vec2(ratio.axis(axis.next()), ratio.axis(axis.next().next()));
        hit.set_face(ray, Vec3::from(normal));

        range.max = t;

        true
    }
}
