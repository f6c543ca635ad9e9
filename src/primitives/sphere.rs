use crate::{
    primitives::{Intersect, AABB},
    ray::{Hit, Interval, Ray},
};
use glam::{vec2, Vec2, Vec3};
use std::f32::consts::{FRAC_PI_2, PI};

#[derive(Clone, Debug, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    pub material: u32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32, material: u32) -> Self {
        Self {
            center,
            radius,
            material,
        }
    }

    /// Spherical mapping of a point on the unit sphere
    pub fn uv(p: Vec3) -> Vec2 {
        let phi = p.z.atan2(p.x);
        let theta = p.y.clamp(-1.0, 1.0).asin();

        vec2(1.0 - (phi + PI) / (2.0 * PI), (theta + FRAC_PI_2) / PI)
    }
}

impl Intersect for Sphere {
    fn intersection(&self, ray: &Ray, range: &mut Interval, hit: &mut Hit) -> bool {
        let oc = ray.origin - self.center;
        let a = ray.direction.dot(ray.direction);
        let b = oc.dot(ray.direction);
        let c = oc.dot(oc) - self.radius * self.radius;
        let discriminant = b * b - a * c;

        if discriminant <= 0.0 {
            return false;
        }

        let root = discriminant.sqrt();
        let t_1 = (-b - root) / a;
        let t_2 = (-b + root) / a;

        // Prefer the nearer root, the far one is the way out when starting inside
        for t in [t_1, t_2] {
            if range.surrounds(t) {
                let point = ray.at(t);
                let normal = (point - self.center) / self.radius;

                hit.t = t;
                hit.point = point;
                hit.uv = Sphere::uv(normal);
                hit.material = self.material;
                hit.set_face(ray, normal);

                range.max = t;

                return true;
            }
        }

        false
    }

    fn bounds(&self) -> AABB {
        let r = Vec3::splat(self.radius.abs());
        AABB::new(self.center - r, self.center + r)
    }
}
