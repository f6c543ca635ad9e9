use crate::{
    primitives::{face_sample, Emitter, Intersect, LightSample, AABB},
    ray::{Hit, Interval, Ray},
};
use glam::{vec2, Vec2, Vec3};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
    pub material: u32,
}

impl Triangle {
    pub fn new(vertices: [Vertex; 3], material: u32) -> Self {
        Self { vertices, material }
    }

    /// A flat shaded triangle, normals follow the winding `a -> b -> c`
    pub fn from_positions(a: Vec3, b: Vec3, c: Vec3, material: u32) -> Self {
        let normal = (b - a).cross(c - a).normalize_or_zero();

        Self::new(
            [
                Vertex::new(a, normal, vec2(0.0, 0.0)),
                Vertex::new(b, normal, vec2(1.0, 0.0)),
                Vertex::new(c, normal, vec2(0.0, 1.0)),
            ],
            material,
        )
    }

    fn edges(&self) -> (Vec3, Vec3) {
        let [a, b, c] = &self.vertices;
        (b.position - a.position, c.position - a.position)
    }

    pub fn face_normal(&self) -> Vec3 {
        let (e1, e2) = self.edges();
        e1.cross(e2).normalize_or_zero()
    }
}

impl Intersect for Triangle {
    // Möller–Trumbore
    fn intersection(&self, ray: &Ray, range: &mut Interval, hit: &mut Hit) -> bool {
        let [a, b, c] = &self.vertices;
        let (e1, e2) = self.edges();

        let pvec = ray.direction.cross(e2);
        let det = e1.dot(pvec);

        // Parallel to the plane, or no area at all
        if det.abs() < f32::EPSILON {
            return false;
        }

        let inv_det = 1.0 / det;
        let tvec = ray.origin - a.position;
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return false;
        }

        let qvec = tvec.cross(e1);
        let v = ray.direction.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return false;
        }

        let t = e2.dot(qvec) * inv_det;
        if !range.surrounds(t) {
            return false;
        }

        let w = 1.0 - u - v;
        let normal = (w * a.normal + u * b.normal + v * c.normal).normalize_or_zero();
        let normal = if normal == Vec3::ZERO {
            self.face_normal()
        } else {
            normal
        };

        hit.t = t;
        hit.point = ray.at(t);
        hit.uv = w * a.uv + u * b.uv + v * c.uv;
        hit.material = self.material;
        hit.set_face(ray, normal);

        range.max = t;

        true
    }

    fn bounds(&self) -> AABB {
        AABB::from_points(self.vertices.iter().map(|vertex| vertex.position))
    }
}

impl Emitter for Triangle {
    fn area(&self) -> f32 {
        let (e1, e2) = self.edges();
        0.5 * e1.cross(e2).length()
    }

    fn sample(&self, u: Vec2, reference: Vec3) -> LightSample {
        let [a, b, c] = &self.vertices;

        // Square root warp keeps the samples uniform over the area
        let su = u.x.sqrt();
        let (ba, bb) = (1.0 - su, u.y * su);
        let point = ba * a.position + bb * b.position + (1.0 - ba - bb) * c.position;

        face_sample(point, self.face_normal(), reference, self.area())
    }
}
