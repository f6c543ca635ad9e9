//! Ray intersection core: primitives, a SAH bounding volume hierarchy over them and
//! stackless traversal for closest hit and occlusion queries.

pub mod bvh;
pub mod camera;
pub mod config;
pub mod primitives;
pub mod ray;
pub mod sampler;
pub mod scene;

pub use crate::{
    bvh::{Bvh, PrimitiveRef},
    config::{BuildConfig, Config, TraceConfig, TraversalMode},
    ray::{Hit, Interval, Ray},
    scene::{Scene, SceneBuilder},
};
