use super::{Axis, Bvh, BvhNode, GetAxis, NodeContent, NodeId};
use crate::{config::BuildConfig, primitives::AABB};
use glam::Vec3;
use smallvec::{smallvec, SmallVec};
use std::{
    sync::{Mutex, PoisonError},
    time::Instant,
};

/// Number of uniform SAH buckets along the split axis
const BUCKET_COUNT: usize = 10;

impl Bvh {
    /// Builds the hierarchy over leaves that already carry a primitive and its world
    /// space bounds. The leaf set must not be empty.
    pub fn build(leaves: Vec<BvhNode>, config: &BuildConfig) -> Self {
        assert!(!leaves.is_empty());

        let start = Instant::now();
        let leaf_count = leaves.len();

        // Precompute build info about the geometry, indexed like the leaves
        let geometry = leaves
            .iter()
            .map(|leaf| GeometryInfo {
                bounds: leaf.bounds,
                center: leaf.bounds.centroid(),
            })
            .collect::<Vec<_>>();

        let mut tree = Vec::with_capacity(2 * leaf_count - 1);
        tree.extend(leaves.into_iter().map(|leaf| BvhNode {
            parent: NodeId::NONE,
            left: NodeId::NONE,
            right: NodeId::NONE,
            ..leaf
        }));

        let tree = Mutex::new(tree);
        let mut indices = (0..leaf_count as u32).collect::<Vec<_>>();

        Builder {
            geometry: &geometry,
            tree: &tree,
            parallel_depth: config.parallel_depth,
        }
        .build(&mut indices, 0);

        let mut nodes = tree.into_inner().unwrap_or_else(PoisonError::into_inner);
        move_root_to_front(&mut nodes);
        let depth = depth_of(&nodes);

        log::debug!(
            "Total Nodes Built: {} from {} leaves, depth {}, in {:.2?}",
            nodes.len(),
            leaf_count,
            depth,
            start.elapsed()
        );

        Self { nodes, depth }
    }
}

struct GeometryInfo {
    bounds: AABB,
    center: Vec3,
}

#[derive(Copy, Clone, Debug, Default)]
struct SAHBucket {
    count: usize,
    bounds: AABB,
}

impl SAHBucket {
    fn merge(mut self, other: &SAHBucket) -> Self {
        self.bounds = self.bounds.union(other.bounds);
        self.count += other.count;
        self
    }

    fn cost(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.count as f32 * self.bounds.surface_area()
        }
    }
}

/// Shared state of one build. Tasks own disjoint slices of the index array and only
/// meet when appending to the node table.
struct Builder<'a> {
    geometry: &'a [GeometryInfo],
    tree: &'a Mutex<Vec<BvhNode>>,
    parallel_depth: u32,
}

impl Builder<'_> {
    /// Builds the subtree over `indices` and returns its table index and bounds
    fn build(&self, indices: &mut [u32], depth: u32) -> (usize, AABB) {
        match indices.len() {
            1 => {
                let index = indices[0] as usize;
                (index, self.geometry[index].bounds)
            }
            2 => {
                let (a, b) = (indices[0] as usize, indices[1] as usize);
                let (center_a, center_b) = (self.geometry[a].center, self.geometry[b].center);
                let axis = AABB::from_points([center_a, center_b]).max_extent();

                // Smaller centroid goes left, equal ones keep their order
                let (left, right) = if center_b.axis(axis) < center_a.axis(axis) {
                    (b, a)
                } else {
                    (a, b)
                };

                self.push_interior(
                    (left, self.geometry[left].bounds),
                    (right, self.geometry[right].bounds),
                    axis,
                )
            }
            _ => self.build_split(indices, depth),
        }
    }

    fn build_split(&self, indices: &mut [u32], depth: u32) -> (usize, AABB) {
        let geometry = self.geometry;
        let center = |index: u32| geometry[index as usize].center;

        let bounds = indices
            .iter()
            .fold(AABB::EMPTY, |b, &i| b.union(geometry[i as usize].bounds));
        let centroids = indices
            .iter()
            .fold(AABB::EMPTY, |b, &i| b.point_union(center(i)));
        let axis = centroids.max_extent();

        // All centroids in one spot make the relative position NaN, which lands in bucket 0
        let bucket_of = |index: u32| {
            let b = (BUCKET_COUNT as f32 * centroids.relative(center(index)).axis(axis)) as usize;
            b.min(BUCKET_COUNT - 1)
        };

        // SAH guided partitioning
        let mut buckets = [SAHBucket::default(); BUCKET_COUNT];
        for &index in indices.iter() {
            let bucket = &mut buckets[bucket_of(index)];
            bucket.count += 1;
            bucket.bounds = bucket.bounds.union(geometry[index as usize].bounds);
        }

        let parent_area = bounds.surface_area();
        let split = (0..BUCKET_COUNT - 1)
            .map(|i| {
                let left = buckets[..=i]
                    .iter()
                    .fold(SAHBucket::default(), SAHBucket::merge);
                let right = buckets[i + 1..]
                    .iter()
                    .fold(SAHBucket::default(), SAHBucket::merge);

                1.0 + (left.cost() + right.cost()) / parent_area
            })
            .enumerate()
            .fold((0, f32::INFINITY), |(pi, pc), (i, c)| {
                if c < pc {
                    (i, c)
                } else {
                    (pi, pc)
                }
            })
            .0;

        let mid = itertools::partition(indices.iter_mut(), |&index| bucket_of(index) <= split);

        // One side came out empty, fall back to a median split along the axis
        let mid = if mid == 0 || mid == indices.len() {
            indices.sort_by(|&a, &b| center(a).axis(axis).total_cmp(&center(b).axis(axis)));
            indices.len() / 2
        } else {
            mid
        };

        let (lower, upper) = indices.split_at_mut(mid);
        let (left, right) = if depth < self.parallel_depth {
            rayon::join(
                || self.build(lower, depth + 1),
                || self.build(upper, depth + 1),
            )
        } else {
            (self.build(lower, depth + 1), self.build(upper, depth + 1))
        };

        self.push_interior(left, right, axis)
    }

    fn push_interior(&self, left: (usize, AABB), right: (usize, AABB), axis: Axis) -> (usize, AABB) {
        let bounds = left.1.union(right.1);

        let mut tree = self.tree.lock().unwrap_or_else(PoisonError::into_inner);
        let index = tree.len();

        tree[left.0].parent = NodeId::new(index);
        tree[right.0].parent = NodeId::new(index);
        tree.push(BvhNode::interior(left.0, right.0, axis, bounds));

        (index, bounds)
    }
}

/// The root is appended last; swap it into slot 0 and patch every link that pointed
/// at either of the two swapped slots.
fn move_root_to_front(nodes: &mut [BvhNode]) {
    let root = nodes.len() - 1;

    if root != 0 {
        let mut touched: SmallVec<[usize; 8]> = smallvec![0, root];
        for slot in [0, root] {
            let node = &nodes[slot];
            touched.extend(
                [node.parent, node.left, node.right]
                    .into_iter()
                    .filter_map(NodeId::index),
            );
        }
        touched.sort_unstable();
        touched.dedup();

        nodes.swap(0, root);

        let remap = |id: NodeId| match id.index() {
            Some(0) => NodeId::new(root),
            Some(index) if index == root => NodeId::new(0),
            _ => id,
        };

        for slot in touched {
            let node = &mut nodes[slot];
            node.parent = remap(node.parent);
            node.left = remap(node.left);
            node.right = remap(node.right);
        }
    }

    nodes[0].parent = NodeId::NONE;
}

fn depth_of(nodes: &[BvhNode]) -> usize {
    let mut deepest = 0;
    let mut pending = vec![(0, 0)];

    while let Some((index, depth)) = pending.pop() {
        let node: &BvhNode = &nodes[index];
        deepest = usize::max(deepest, depth);

        if node.content == NodeContent::Internal {
            pending.extend(
                [node.left, node.right]
                    .into_iter()
                    .filter_map(NodeId::index)
                    .map(|child| (child, depth + 1)),
            );
        }
    }

    deepest
}
