use anyhow::Context;
use glam::{vec3, Quat, Vec3};
use rand::prelude::*;
use rayon::prelude::*;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};
use tracer::{
    bvh::{Axis, PrimitiveRef},
    camera::Camera,
    primitives::{Cube, Quad, Sphere, Transform, Triangle, AABB},
    sampler::Sampler,
    Config, Ray, Scene, SceneBuilder,
};

const WIDTH: u32 = 960;
const HEIGHT: u32 = 540;
const SAMPLES: usize = 16;
const COLOR_CHANNELS: u32 = 3;
const GAMMA: f32 = 2.2;
const SEED: u64 = 0x5eed;

type DefaultRng = rand_xoshiro::Xoshiro256Plus;

// Generate a semi random scene, returns it with its light
fn random(config: &Config) -> (Scene, PrimitiveRef) {
    let mut rng = DefaultRng::seed_from_u64(SEED);
    let mut builder = SceneBuilder::new();

    // The ground
    builder.add_quad(Quad::new(Axis::Y, 0.0, [-50.0, 50.0], [-50.0, 50.0], 0));

    for a in -12..12 {
        for b in -12..12 {
            let center = vec3(
                a as f32 + 0.9 * rng.gen::<f32>(),
                0.2,
                b as f32 + 0.9 * rng.gen::<f32>(),
            );

            if (center - vec3(4.0, 0.2, 0.0)).length() <= 0.9 {
                continue;
            }

            let material = rng.gen_range(1..8);
            if rng.gen::<f32>() < 0.7 {
                builder.add_sphere(Sphere::new(center, 0.2, material));
            } else {
                let transform = Transform {
                    translation: center,
                    rotation: Quat::from_rotation_y(rng.gen_range(0.0..std::f32::consts::PI)),
                    scale: Vec3::splat(0.3),
                };
                builder.add_cube(Cube::with_transform(
                    AABB::new(Vec3::splat(-0.5), Vec3::splat(0.5)),
                    transform,
                    material,
                ));
            }
        }
    }

    builder.add_sphere(Sphere::new(vec3(-4.0, 1.0, 0.0), 1.0, 8));
    builder.add_sphere(Sphere::new(vec3(0.0, 1.0, 0.0), 1.0, 9));

    // Tetrahedron, wound so every face points outward
    let [p0, p1, p2, p3] = [
        vec3(4.0, 2.0, 0.0),
        vec3(3.2, 0.0, -0.8),
        vec3(4.8, 0.0, -0.8),
        vec3(4.0, 0.0, 1.0),
    ];
    for [a, b, c] in [[p0, p2, p1], [p0, p3, p2], [p0, p1, p3], [p1, p2, p3]] {
        builder.add_triangle(Triangle::from_positions(a, b, c, 10));
    }

    let light = builder.add_quad(Quad::new(Axis::Y, 12.0, [-4.0, 4.0], [-4.0, 4.0], 11));

    (builder.build(config), light)
}

// Normal shading with a hard shadow from the light
fn color(scene: &Scene, light: PrimitiveRef, ray: &Ray, rng: &mut DefaultRng) -> Vec3 {
    let Some(hit) = scene.hit(ray, f32::INFINITY) else {
        let t = 0.5 * (ray.direction.y + 1.0);
        return (1.0 - t) * Vec3::ONE + t * vec3(0.5, 0.7, 1.0);
    };

    let base = 0.5 * (hit.shading_normal + Vec3::ONE);
    let Some(sample) = scene.sample_light(light, rng.next_2d(), hit.point) else {
        return base;
    };

    let to_light = sample.point - hit.point;
    let distance = to_light.length();
    let shadow = Ray::new(hit.point, to_light);
    let facing = hit.shading_normal.dot(shadow.direction).max(0.0);

    if facing > 0.0 && !scene.any_hit(&shadow, distance) {
        base * (0.2 + 0.8 * facing)
    } else {
        base * 0.2
    }
}

fn render(scene: &Scene, light: PrimitiveRef) -> Vec<u8> {
    let eye = vec3(13.0, 2.0, 3.0);
    let target = vec3(4.0, 1.0, 0.0);
    let camera = Camera::new(eye, target, Vec3::Y, 20.0, WIDTH as f32 / HEIGHT as f32, 0.1);

    let mut buffer = vec![0u8; (WIDTH * HEIGHT * COLOR_CHANNELS) as usize];
    let global_ray_count = AtomicU64::new(0);
    let start = Instant::now();

    buffer
        .par_chunks_mut((WIDTH * COLOR_CHANNELS) as usize)
        .rev()
        .enumerate()
        .for_each(|(y, row)| {
            let mut rng = DefaultRng::seed_from_u64(SEED ^ y as u64);
            let mut ray_count = 0;

            for (i, pixel) in row.chunks_mut(COLOR_CHANNELS as usize).enumerate() {
                let mut out = Vec3::ZERO;

                // Antialiasing via multisampling
                for _ in 0..SAMPLES {
                    let jitter = rng.next_2d();
                    let u = (jitter.x + i as f32) / WIDTH as f32;
                    let v = (jitter.y + y as f32) / HEIGHT as f32;

                    let ray = camera.ray(u, v, &mut rng);
                    out += color(scene, light, &ray, &mut rng);
                    // Primary plus shadow ray
                    ray_count += 2;
                }

                out /= SAMPLES as f32;
                let out = out.clamp(Vec3::ZERO, Vec3::ONE).powf(1.0 / GAMMA);

                pixel[0] = (255.99 * out.x) as u8;
                pixel[1] = (255.99 * out.y) as u8;
                pixel[2] = (255.99 * out.z) as u8;
            }

            global_ray_count.fetch_add(ray_count, Ordering::Relaxed);
        });

    let duration = start.elapsed();
    let rays = global_ray_count.load(Ordering::Relaxed) as f64 / 1_000_000.0;
    log::info!(
        "Time elapsed: {:.2?}, total rays: {:.2}M, rays per second: {:.2}M",
        duration,
        rays,
        rays / duration.as_secs_f64()
    );

    buffer
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let (scene, light) = random(&config);
    log::info!("Scene bounds: {:?}", scene.bounds());

    let image = render(&scene, light);
    image::save_buffer("output.png", &image, WIDTH, HEIGHT, image::ColorType::Rgb8)
        .context("Failed to write output.png")?;

    Ok(())
}
