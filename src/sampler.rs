use glam::{vec2, Vec2};
use rand::Rng;

/// Source of uniform samples in `[0, 1)`.
/// Anything implementing `rand::Rng` is a sampler.
pub trait Sampler {
    fn next_1d(&mut self) -> f32;

    fn next_2d(&mut self) -> Vec2 {
        let u = self.next_1d();
        vec2(u, self.next_1d())
    }
}

impl<R: Rng + ?Sized> Sampler for R {
    fn next_1d(&mut self) -> f32 {
        self.gen()
    }
}
