use glam::{vec3, Vec2, Vec3};

/// The ray data type
#[derive(Clone, Copy, Debug, Default)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub inv_direction: Vec3,
}

impl Ray {
    /// Creates a ray with a unit length direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self::raw(origin, direction.normalize_or_zero())
    }

    /// Creates a ray keeping the direction exactly as given.
    /// Used for rays transformed into a primitive's local space, where the parameter `t`
    /// has to stay the same as in world space.
    pub fn raw(origin: Vec3, direction: Vec3) -> Self {
        // Zero components turn into +-inf, the slab test relies on that
        let inv_direction = vec3(1.0 / direction.x, 1.0 / direction.y, 1.0 / direction.z);

        Self {
            origin,
            direction,
            inv_direction,
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + t * self.direction
    }

    /// A ray without a usable direction can never hit anything
    pub fn is_degenerate(&self) -> bool {
        !self.direction.is_finite() || self.direction == Vec3::ZERO
    }
}

/// The valid parametric range `[min, max]` along a ray.
/// Hit routines narrow `max` whenever they find something closer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn surrounds(&self, t: f32) -> bool {
        self.min < t && t < self.max
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::new(0.0, f32::INFINITY)
    }
}

/// The hit record: describes the closest intersection found so far along a ray.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Hit {
    pub t: f32,
    pub point: Vec3,
    /// Normal as defined by the surface, never flipped
    pub geometric_normal: Vec3,
    /// Normal facing against the incoming ray
    pub shading_normal: Vec3,
    pub uv: Vec2,
    /// Opaque material id, only carried through
    pub material: u32,
    pub front_face: bool,
}

impl Hit {
    /// Face classification shared by every primitive.
    pub fn set_face(&mut self, ray: &Ray, geometric_normal: Vec3) {
        self.geometric_normal = geometric_normal;
        self.front_face = ray.direction.dot(geometric_normal) <= 0.0;
        self.shading_normal = if self.front_face {
            geometric_normal
        } else {
            -geometric_normal
        };
    }
}
