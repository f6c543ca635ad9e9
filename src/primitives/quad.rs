use crate::{
    bvh::{Axis, GetAxis},
    primitives::{face_sample, Emitter, Intersect, LightSample, AABB},
    ray::{Hit, Interval, Ray},
};
use glam::{vec2, Vec2, Vec3};

/// Axis aligned rectangle lying in the plane `p[axis] = offset`.
/// `range_i` bounds the axis after `axis`, `range_j` the one after that.
#[derive(Clone, Debug, PartialEq)]
pub struct Quad {
    pub axis: Axis,
    pub offset: f32,
    pub range_i: [f32; 2],
    pub range_j: [f32; 2],
    pub material: u32,
}

impl Quad {
    pub fn new(axis: Axis, offset: f32, range_i: [f32; 2], range_j: [f32; 2], material: u32) -> Self {
        let sorted = |[a, b]: [f32; 2]| [a.min(b), a.max(b)];

        Self {
            axis,
            offset,
            range_i: sorted(range_i),
            range_j: sorted(range_j),
            material,
        }
    }

    fn axes(&self) -> (Axis, Axis) {
        (self.axis.next(), self.axis.next().next())
    }

    fn unit_normal(&self) -> Vec3 {
        let mut normal = [0.0; 3];
        normal[self.axis.index()] = 1.0;
        Vec3::from(normal)
    }

    fn point(&self, a: f32, b: f32) -> Vec3 {
        let (i, j) = self.axes();
        let mut p = [0.0; 3];
        p[self.axis.index()] = self.offset;
        p[i.index()] = a;
        p[j.index()] = b;
        Vec3::from(p)
    }
}

impl Intersect for Quad {
    fn intersection(&self, ray: &Ray, range: &mut Interval, hit: &mut Hit) -> bool {
        let [i0, i1] = self.range_i;
        let [j0, j1] = self.range_j;
        if self.area() <= 0.0 {
            return false;
        }

        let (i, j) = self.axes();
        let direction = ray.direction.axis(self.axis);
        if direction == 0.0 {
            return false;
        }

        let t = (self.offset - ray.origin.axis(self.axis)) / direction;
        if !t.is_finite() || !range.surrounds(t) {
            return false;
        }

        let a = ray.origin.axis(i) + t * ray.direction.axis(i);
        let b = ray.origin.axis(j) + t * ray.direction.axis(j);
        if a < i0 || a > i1 || b < j0 || b > j1 {
            return false;
        }

        hit.t = t;
        hit.point = self.point(a, b);
        hit.uv = vec2((a - i0) / (i1 - i0), (b - j0) / (j1 - j0));
        hit.material = self.material;
        hit.set_face(ray, self.unit_normal());

        range.max = t;

        true
    }

    fn bounds(&self) -> AABB {
        AABB::new(
            self.point(self.range_i[0], self.range_j[0]),
            self.point(self.range_i[1], self.range_j[1]),
        )
    }
}

impl Emitter for Quad {
    fn area(&self) -> f32 {
        (self.range_i[1] - self.range_i[0]) * (self.range_j[1] - self.range_j[0])
    }

    fn sample(&self, u: Vec2, reference: Vec3) -> LightSample {
        let [i0, i1] = self.range_i;
        let [j0, j1] = self.range_j;
        let point = self.point(i0 + u.x * (i1 - i0), j0 + u.y * (j1 - j0));

        face_sample(point, self.unit_normal(), reference, self.area())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::LIGHT_SAMPLE_OFFSET;
    use glam::vec3;

    /// Square in the plane y = 1 spanning [-1, 1] on z and x
    fn ceiling() -> Quad {
        Quad::new(Axis::Y, 1.0, [-1.0, 1.0], [1.0, -1.0], 7)
    }

    #[test]
    fn hit_from_below() {
        let ray = Ray::new(vec3(0.5, -1.0, 0.0), Vec3::Y);
        let mut range = Interval::new(1e-4, f32::INFINITY);
        let mut hit = Hit::default();

        assert!(ceiling().intersection(&ray, &mut range, &mut hit));
        assert!((hit.t - 2.0).abs() < 1e-6);
        assert_eq!(range.max, hit.t);
        assert_eq!(hit.point, vec3(0.5, 1.0, 0.0));
        assert_eq!(hit.material, 7);
        // Geometric normal keeps pointing along +y, the shading one faces the ray
        assert_eq!(hit.geometric_normal, Vec3::Y);
        assert_eq!(hit.shading_normal, -Vec3::Y);
        assert!(!hit.front_face);
        // i is z, j is x
        assert!((hit.uv - vec2(0.5, 0.75)).length() < 1e-6);
    }

    #[test]
    fn parallel_ray_misses() {
        let ray = Ray::new(vec3(-5.0, 1.0, 0.0), Vec3::X);
        let mut hit = Hit::default();
        assert!(!ceiling().intersection(&ray, &mut Interval::default(), &mut hit));
    }

    #[test]
    fn outside_extent_misses() {
        let ray = Ray::new(vec3(1.5, -1.0, 0.0), Vec3::Y);
        let mut hit = Hit::default();
        assert!(!ceiling().intersection(&ray, &mut Interval::default(), &mut hit));
    }

    #[test]
    fn respects_range() {
        let ray = Ray::new(vec3(0.0, -1.0, 0.0), Vec3::Y);
        let mut range = Interval::new(0.0, 1.5);
        let mut hit = Hit::default();
        assert!(!ceiling().intersection(&ray, &mut range, &mut hit));
        assert_eq!(range.max, 1.5);
    }

    #[test]
    fn zero_extent_is_never_hit() {
        let sliver = Quad::new(Axis::Z, 0.0, [0.0, 0.0], [-1.0, 1.0], 0);
        let ray = Ray::new(vec3(0.0, 0.0, -1.0), Vec3::Z);
        let mut hit = Hit::default();
        assert!(!sliver.intersection(&ray, &mut Interval::default(), &mut hit));
    }

    #[test]
    fn flat_bounds() {
        let b = ceiling().bounds();
        assert_eq!(b, AABB::new(vec3(-1.0, 1.0, -1.0), vec3(1.0, 1.0, 1.0)));
    }

    #[test]
    fn sample_faces_reference() {
        let quad = ceiling();
        assert_eq!(quad.area(), 4.0);

        let below = quad.sample(vec2(0.5, 0.5), vec3(0.0, -3.0, 0.0));
        assert_eq!(below.normal, -Vec3::Y);
        assert!((below.point - vec3(0.0, 1.0 - LIGHT_SAMPLE_OFFSET, 0.0)).length() < 1e-6);
        assert_eq!(below.area_pdf, 0.25);

        let above = quad.sample(vec2(0.0, 1.0), vec3(0.0, 3.0, 0.0));
        assert_eq!(above.normal, Vec3::Y);
        assert!((above.point - vec3(1.0, 1.0 + LIGHT_SAMPLE_OFFSET, -1.0)).length() < 1e-6);
    }
}
