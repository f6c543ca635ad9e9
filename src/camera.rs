use crate::ray::Ray;
use glam::Vec3;
use rand::Rng;
use rand_distr::{Distribution, UnitDisc};

/// Thin lens camera focused on its target
#[derive(Debug)]
pub struct Camera {
    origin: Vec3,
    lower_left_corner: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
    u: Vec3,
    v: Vec3,
    lens_radius: f32,
}

impl Camera {
    /// `vfov` is in degrees
    pub fn new(origin: Vec3, target: Vec3, up: Vec3, vfov: f32, aspect: f32, aperture: f32) -> Self {
        let lens_radius = aperture / 2.0;
        let focus_dist = (origin - target).length();
        let half_height = (vfov.to_radians() / 2.0).tan();
        let half_width = aspect * half_height;

        let w = (origin - target).normalize();
        let u = up.cross(w).normalize();
        let v = w.cross(u);

        let lower_left_corner =
            origin - half_width * focus_dist * u - half_height * focus_dist * v - focus_dist * w;
        let horizontal = 2.0 * half_width * focus_dist * u;
        let vertical = 2.0 * half_height * focus_dist * v;

        Self {
            origin,
            lower_left_corner,
            horizontal,
            vertical,
            u,
            v,
            lens_radius,
        }
    }

    /// Primary ray through the film at `(s, t)`, both in `[0, 1]` from the lower left
    pub fn ray<R: Rng + ?Sized>(&self, s: f32, t: f32, rng: &mut R) -> Ray {
        let [x, y]: [f32; 2] = UnitDisc.sample(rng);
        let offset = self.lens_radius * (self.u * x + self.v * y);

        Ray::new(
            self.origin + offset,
            self.lower_left_corner + s * self.horizontal + t * self.vertical - self.origin - offset,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn center_ray_points_at_target() {
        let target = vec3(4.0, 1.0, 0.0);
        let camera = Camera::new(vec3(13.0, 2.0, 3.0), target, Vec3::Y, 20.0, 16.0 / 9.0, 0.0);
        let mut rng = Xoshiro256Plus::seed_from_u64(0);

        let ray = camera.ray(0.5, 0.5, &mut rng);
        let expected = (target - vec3(13.0, 2.0, 3.0)).normalize();
        assert!((ray.direction - expected).length() < 1e-5);
        assert!((ray.direction.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn lens_rays_converge_on_focus_plane() {
        let origin = Vec3::ZERO;
        let target = vec3(0.0, 0.0, -10.0);
        let camera = Camera::new(origin, target, Vec3::Y, 40.0, 1.0, 1.0);
        let mut rng = Xoshiro256Plus::seed_from_u64(5);

        for _ in 0..32 {
            let ray = camera.ray(0.5, 0.5, &mut rng);
            assert!(ray.origin.distance(origin) <= 0.5 + 1e-5);

            // Every lens sample meets at the target
            let t = (target.z - ray.origin.z) / ray.direction.z;
            assert!((ray.at(t) - target).length() < 1e-3);
        }
    }
}
