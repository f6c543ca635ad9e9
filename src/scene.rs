use crate::{
    bvh::{Bvh, BvhNode, PrimitiveRef, STACKLESS_MAX_DEPTH},
    config::{Config, TraceConfig, TraversalMode},
    primitives::{Cube, Emitter, Intersect, LightSample, Quad, Sphere, Triangle, Vertex, AABB},
    ray::{Hit, Interval, Ray},
};
use glam::{Vec2, Vec3};

/// Collects the primitive tables of a scene before the hierarchy is built
#[derive(Clone, Debug, Default)]
pub struct SceneBuilder {
    spheres: Vec<Sphere>,
    quads: Vec<Quad>,
    cubes: Vec<Cube>,
    triangles: Vec<Triangle>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sphere(&mut self, sphere: Sphere) -> PrimitiveRef {
        self.spheres.push(sphere);
        PrimitiveRef::Sphere(self.spheres.len() as u32 - 1)
    }

    pub fn add_quad(&mut self, quad: Quad) -> PrimitiveRef {
        self.quads.push(quad);
        PrimitiveRef::Quad(self.quads.len() as u32 - 1)
    }

    pub fn add_cube(&mut self, cube: Cube) -> PrimitiveRef {
        self.cubes.push(cube);
        PrimitiveRef::Cube(self.cubes.len() as u32 - 1)
    }

    pub fn add_triangle(&mut self, triangle: Triangle) -> PrimitiveRef {
        self.triangles.push(triangle);
        PrimitiveRef::Triangle(self.triangles.len() as u32 - 1)
    }

    /// Adds an indexed triangle mesh, one triangle per index triple
    pub fn add_mesh(&mut self, vertices: &[Vertex], indices: &[[u32; 3]], material: u32) -> Vec<PrimitiveRef> {
        indices
            .iter()
            .map(|&[a, b, c]| {
                let triangle = Triangle::new(
                    [
                        vertices[a as usize],
                        vertices[b as usize],
                        vertices[c as usize],
                    ],
                    material,
                );
                self.add_triangle(triangle)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.spheres.len() + self.quads.len() + self.cubes.len() + self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One leaf per primitive with its world space bounds
    pub fn leaves(&self) -> Vec<BvhNode> {
        fn leaves_of<'a, T: Intersect + 'a>(
            items: &'a [T],
            kind: fn(u32) -> PrimitiveRef,
        ) -> impl Iterator<Item = BvhNode> + 'a {
            items
                .iter()
                .enumerate()
                .map(move |(i, item)| BvhNode::leaf(kind(i as u32), item.bounds()))
        }

        leaves_of(&self.spheres, PrimitiveRef::Sphere)
            .chain(leaves_of(&self.quads, PrimitiveRef::Quad))
            .chain(leaves_of(&self.cubes, PrimitiveRef::Cube))
            .chain(leaves_of(&self.triangles, PrimitiveRef::Triangle))
            .collect()
    }

    pub fn build(self, config: &Config) -> Scene {
        log::info!(
            "Building scene: {} spheres, {} quads, {} cubes, {} triangles",
            self.spheres.len(),
            self.quads.len(),
            self.cubes.len(),
            self.triangles.len()
        );

        let bvh = if self.is_empty() {
            None
        } else {
            Some(Bvh::build(self.leaves(), &config.build))
        };

        if let Some(bvh) = &bvh {
            if log::log_enabled!(log::Level::Debug) {
                if let Err(err) = bvh.validate() {
                    log::warn!("BVH failed validation: {:#}", err);
                }
            }
            if config.trace.traversal != TraversalMode::Stack && bvh.depth() > STACKLESS_MAX_DEPTH {
                log::warn!(
                    "BVH depth {} exceeds {}, using stack traversal",
                    bvh.depth(),
                    STACKLESS_MAX_DEPTH
                );
            }
        }

        Scene {
            spheres: self.spheres,
            quads: self.quads,
            cubes: self.cubes,
            triangles: self.triangles,
            bvh,
            trace: config.trace.clone(),
        }
    }
}

/// Primitive tables bound to the hierarchy built over them. Read only, so any
/// number of threads can trace against it at once.
#[derive(Clone, Debug)]
pub struct Scene {
    spheres: Vec<Sphere>,
    quads: Vec<Quad>,
    cubes: Vec<Cube>,
    triangles: Vec<Triangle>,
    bvh: Option<Bvh>,
    trace: TraceConfig,
}

impl Scene {
    /// Closest hit along the ray within `[t_min, t_max)`
    pub fn hit(&self, ray: &Ray, t_max: f32) -> Option<Hit> {
        let mut hit = Hit::default();
        self.trace_ray(ray, t_max, false, &mut hit).then_some(hit)
    }

    /// Whether anything lies along the ray before `t_max`, for shadow rays
    pub fn any_hit(&self, ray: &Ray, t_max: f32) -> bool {
        let mut hit = Hit::default();
        self.trace_ray(ray, t_max, true, &mut hit)
    }

    fn trace_ray(&self, ray: &Ray, t_max: f32, any_hit: bool, hit: &mut Hit) -> bool {
        let Some(bvh) = &self.bvh else {
            return false;
        };
        if ray.is_degenerate() {
            return false;
        }

        let mut range = Interval::new(self.trace.t_min, t_max);
        bvh.traverse(ray, &mut range, any_hit, self.trace.traversal, |primitive, range| {
            self.intersect(primitive, ray, range, hit)
        });

        range.max < t_max
    }

    /// Runs the hit routine of a single primitive
    pub fn intersect(&self, primitive: PrimitiveRef, ray: &Ray, range: &mut Interval, hit: &mut Hit) -> bool {
        match primitive {
            PrimitiveRef::Sphere(i) => self.spheres[i as usize].intersection(ray, range, hit),
            PrimitiveRef::Quad(i) => self.quads[i as usize].intersection(ray, range, hit),
            PrimitiveRef::Cube(i) => self.cubes[i as usize].intersection(ray, range, hit),
            PrimitiveRef::Triangle(i) => self.triangles[i as usize].intersection(ray, range, hit),
        }
    }

    /// Samples a point on an emitting primitive as seen from `reference`.
    /// Only quads and triangles can be sampled.
    pub fn sample_light(&self, primitive: PrimitiveRef, u: Vec2, reference: Vec3) -> Option<LightSample> {
        match primitive {
            PrimitiveRef::Quad(i) => self.quads.get(i as usize).map(|quad| quad.sample(u, reference)),
            PrimitiveRef::Triangle(i) => self
                .triangles
                .get(i as usize)
                .map(|triangle| triangle.sample(u, reference)),
            PrimitiveRef::Sphere(_) | PrimitiveRef::Cube(_) => None,
        }
    }

    /// Every primitive in the scene, in table order
    pub fn primitives(&self) -> impl Iterator<Item = PrimitiveRef> + '_ {
        let kinds: [(usize, fn(u32) -> PrimitiveRef); 4] = [
            (self.spheres.len(), PrimitiveRef::Sphere),
            (self.quads.len(), PrimitiveRef::Quad),
            (self.cubes.len(), PrimitiveRef::Cube),
            (self.triangles.len(), PrimitiveRef::Triangle),
        ];

        kinds
            .into_iter()
            .flat_map(|(count, kind)| (0..count as u32).map(kind))
    }

    pub fn bounds(&self) -> AABB {
        self.bvh.as_ref().map_or(AABB::EMPTY, Bvh::bounds)
    }

    pub fn bvh(&self) -> Option<&Bvh> {
        self.bvh.as_ref()
    }

    pub fn trace_config(&self) -> &TraceConfig {
        &self.trace
    }

    pub fn len(&self) -> usize {
        self.spheres.len() + self.quads.len() + self.cubes.len() + self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bvh::Axis, primitives::Transform};
    use glam::{vec2, vec3};

    fn small_scene() -> (Scene, [PrimitiveRef; 4]) {
        let mut builder = SceneBuilder::new();
        let refs = [
            builder.add_sphere(Sphere::new(vec3(0.0, 0.0, 5.0), 1.0, 1)),
            builder.add_quad(Quad::new(Axis::Z, 10.0, [-5.0, 5.0], [-5.0, 5.0], 2)),
            builder.add_cube(Cube::with_transform(
                AABB::new(Vec3::splat(-0.5), Vec3::splat(0.5)),
                Transform {
                    translation: vec3(3.0, 0.0, 5.0),
                    ..Default::default()
                },
                3,
            )),
            builder.add_triangle(Triangle::from_positions(
                vec3(-4.0, -1.0, 4.0),
                vec3(-2.0, -1.0, 4.0),
                vec3(-3.0, 1.0, 4.0),
                4,
            )),
        ];

        (builder.build(&Config::default()), refs)
    }

    #[test]
    fn closest_primitive_wins() {
        let (scene, _) = small_scene();

        let hit = scene.hit(&Ray::new(Vec3::ZERO, Vec3::Z), f32::INFINITY).unwrap();
        assert_eq!(hit.material, 1);
        assert!((hit.t - 4.0).abs() < 1e-5);

        let hit = scene.hit(&Ray::new(vec3(3.0, 0.0, 0.0), Vec3::Z), f32::INFINITY).unwrap();
        assert_eq!(hit.material, 3);
        assert!((hit.t - 4.5).abs() < 1e-5);

        let hit = scene.hit(&Ray::new(vec3(-3.0, 0.0, 0.0), Vec3::Z), f32::INFINITY).unwrap();
        assert_eq!(hit.material, 4);

        let hit = scene.hit(&Ray::new(vec3(0.0, 4.0, 0.0), Vec3::Z), f32::INFINITY).unwrap();
        assert_eq!(hit.material, 2);
        assert!((hit.t - 10.0).abs() < 1e-5);
    }

    #[test]
    fn t_max_limits_the_search() {
        let (scene, _) = small_scene();
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);

        assert!(scene.hit(&ray, 3.0).is_none());
        assert!(!scene.any_hit(&ray, 3.0));
        assert!(scene.any_hit(&ray, 4.5));
        assert!(scene.hit(&Ray::new(Vec3::ZERO, -Vec3::Z), f32::INFINITY).is_none());
    }

    #[test]
    fn degenerate_ray_hits_nothing() {
        let (scene, _) = small_scene();
        assert!(scene.hit(&Ray::new(Vec3::ZERO, Vec3::ZERO), f32::INFINITY).is_none());
        assert!(!scene.any_hit(&Ray::new(Vec3::ZERO, Vec3::ZERO), f32::INFINITY));
    }

    #[test]
    fn empty_scene() {
        let scene = SceneBuilder::new().build(&Config::default());
        assert!(scene.is_empty());
        assert!(scene.bvh().is_none());
        assert!(scene.bounds().is_empty());
        assert!(scene.hit(&Ray::new(Vec3::ZERO, Vec3::Z), f32::INFINITY).is_none());
    }

    #[test]
    fn primitives_and_leaves_line_up() {
        let (scene, refs) = small_scene();
        assert_eq!(scene.primitives().collect::<Vec<_>>(), refs.to_vec());
        assert_eq!(scene.bvh().unwrap().leaf_count(), 4);
        scene.bvh().unwrap().validate().unwrap();
    }

    #[test]
    fn light_sampling_dispatch() {
        let (scene, [sphere, quad, cube, triangle]) = small_scene();
        let reference = Vec3::ZERO;

        let sample = scene.sample_light(quad, vec2(0.5, 0.5), reference).unwrap();
        assert_eq!(sample.normal, -Vec3::Z);
        assert!((sample.area_pdf - 0.01).abs() < 1e-6);

        assert!(scene.sample_light(triangle, vec2(0.3, 0.6), reference).is_some());
        assert!(scene.sample_light(sphere, vec2(0.5, 0.5), reference).is_none());
        assert!(scene.sample_light(cube, vec2(0.5, 0.5), reference).is_none());
    }

    #[test]
    fn mesh_indices_resolve_vertices() {
        let vertices = [
            Vertex::new(Vec3::ZERO, Vec3::Z, Vec2::ZERO),
            Vertex::new(Vec3::X, Vec3::Z, Vec2::X),
            Vertex::new(Vec3::Y, Vec3::Z, Vec2::Y),
            Vertex::new(Vec3::ONE, Vec3::Z, Vec2::ONE),
        ];
        let mut builder = SceneBuilder::new();
        let refs = builder.add_mesh(&vertices, &[[0, 1, 2], [1, 3, 2]], 9);
        assert_eq!(refs, vec![PrimitiveRef::Triangle(0), PrimitiveRef::Triangle(1)]);

        let scene = builder.build(&Config::default());
        let hit = scene
            .hit(&Ray::new(vec3(0.75, 0.75, -1.0), Vec3::Z), f32::INFINITY)
            .unwrap();
        assert_eq!(hit.material, 9);
    }
}
