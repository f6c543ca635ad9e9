use crate::{
    primitives::{Intersect, AABB},
    ray::{Hit, Interval, Ray},
};
use glam::{Mat4, Quat, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// An oriented box: an axis aligned box in local space placed by a model matrix
#[derive(Clone, Debug, PartialEq)]
pub struct Cube {
    pub local: AABB,
    pub material: u32,
    model: Mat4,
    inverse: Mat4,
    normal: Mat4,
}

impl Cube {
    pub fn new(local: AABB, model: Mat4, material: u32) -> Self {
        let inverse = model.inverse();

        Self {
            local,
            material,
            model,
            inverse,
            normal: inverse.transpose(),
        }
    }

    pub fn with_transform(local: AABB, transform: Transform, material: u32) -> Self {
        Self::new(local, transform.matrix(), material)
    }

    pub fn model(&self) -> &Mat4 {
        &self.model
    }
}

impl Intersect for Cube {
    fn intersection(&self, ray: &Ray, range: &mut Interval, hit: &mut Hit) -> bool {
        // The local direction is left unnormalized so `t` means the same on both sides
        let local_ray = Ray::raw(
            self.inverse.transform_point3(ray.origin),
            self.inverse.transform_vector3(ray.direction),
        );

        let mut local_range = *range;
        let mut local_hit = Hit::default();
        if !self.local.intersection(&local_ray, &mut local_range, &mut local_hit) {
            return false;
        }

        let point = self.model.transform_point3(local_hit.point);
        // Distance along the world ray, measured in world units
        let t = ray.origin.distance(point) / ray.direction.length();
        if !range.surrounds(t) {
            return false;
        }

        let normal = self
            .normal
            .transform_vector3(local_hit.geometric_normal)
            .normalize();

        hit.t = t;
        hit.point = point;
        hit.uv = local_hit.uv;
        hit.material = self.material;
        hit.set_face(ray, normal);

        range.max = t;

        true
    }

    fn bounds(&self) -> AABB {
        self.local.transformed(&self.model)
    }
}
