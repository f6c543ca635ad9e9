//! Flat bounding volume hierarchy: a single node table addressed by index.
//! Leaves reference one primitive each, interior nodes always have two children.

mod build;
mod traverse;

pub use traverse::STACKLESS_MAX_DEPTH;

use crate::primitives::AABB;
use anyhow::ensure;
use glam::Vec3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 3]
    }

    /// The following axis, wrapping from z back to x
    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }
}

pub trait GetAxis {
    type Output;

    fn axis(&self, axis: Axis) -> Self::Output;
}

impl GetAxis for Vec3 {
    type Output = f32;

    fn axis(&self, axis: Axis) -> Self::Output {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// Link to a node in the table.
/// Stored as `index + 1` so that `0` always means "absent", which is what the
/// root's parent and a leaf's children hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(0);

    pub fn new(index: usize) -> Self {
        NodeId(index as u32 + 1)
    }

    pub fn index(self) -> Option<usize> {
        self.0.checked_sub(1).map(|index| index as usize)
    }

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

/// A primitive in one of the scene's per type tables
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveRef {
    Sphere(u32),
    Quad(u32),
    Cube(u32),
    Triangle(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeContent {
    Internal,
    Leaf(PrimitiveRef),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BvhNode {
    pub parent: NodeId,
    pub left: NodeId,
    pub right: NodeId,
    /// Split axis, only meaningful for interior nodes
    pub axis: Axis,
    pub content: NodeContent,
    pub bounds: AABB,
}

impl BvhNode {
    /// A leaf with world space bounds of its primitive
    pub fn leaf(primitive: PrimitiveRef, bounds: AABB) -> Self {
        Self {
            parent: NodeId::NONE,
            left: NodeId::NONE,
            right: NodeId::NONE,
            axis: Axis::X,
            content: NodeContent::Leaf(primitive),
            bounds,
        }
    }

    fn interior(left: usize, right: usize, axis: Axis, bounds: AABB) -> Self {
        Self {
            parent: NodeId::NONE,
            left: NodeId::new(left),
            right: NodeId::new(right),
            axis,
            content: NodeContent::Internal,
            bounds,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.content, NodeContent::Leaf(_))
    }

    pub fn primitive(&self) -> Option<PrimitiveRef> {
        match self.content {
            NodeContent::Leaf(primitive) => Some(primitive),
            NodeContent::Internal => None,
        }
    }
}

/// A Bounding Volume Hierarchy.
/// The root always lives in slot 0 and the table is read only once built.
#[derive(Clone, Debug)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    depth: usize,
}

impl Bvh {
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn root(&self) -> &BvhNode {
        &self.nodes[0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of edges on the longest root to leaf path
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn bounds(&self) -> AABB {
        self.root().bounds
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// Checks the structural invariants of the table: every link decodes to a real
    /// node, parents and children agree, every non root node has exactly one parent,
    /// interior boxes are the exact union of their children and a tree over `n`
    /// leaves has `2n - 1` nodes.
    pub fn validate(&self) -> anyhow::Result<()> {
        let nodes = &self.nodes;
        ensure!(!nodes.is_empty(), "empty node table");
        ensure!(nodes[0].parent.is_none(), "root has a parent");

        let mut referenced = vec![0u32; nodes.len()];

        for (index, node) in nodes.iter().enumerate() {
            match node.content {
                NodeContent::Leaf(_) => {
                    ensure!(
                        node.left.is_none() && node.right.is_none(),
                        "leaf {} has children",
                        index
                    );
                }
                NodeContent::Internal => {
                    let left = node.left.index().filter(|&i| i < nodes.len());
                    let right = node.right.index().filter(|&i| i < nodes.len());
                    let (Some(left), Some(right)) = (left, right) else {
                        anyhow::bail!("node {} has an invalid child link", index);
                    };

                    ensure!(left != right, "node {} links the same child twice", index);
                    for child in [left, right] {
                        ensure!(child != 0, "node {} links back to the root", index);
                        ensure!(
                            nodes[child].parent == NodeId::new(index),
                            "child {} does not point back to {}",
                            child,
                            index
                        );
                        referenced[child] += 1;
                    }

                    ensure!(
                        node.bounds == nodes[left].bounds.union(nodes[right].bounds),
                        "bounds of node {} are not the union of its children",
                        index
                    );
                }
            }
        }

        for (index, &count) in referenced.iter().enumerate().skip(1) {
            ensure!(count == 1, "node {} has {} parents", index, count);
        }

        let leaves = self.leaf_count();
        ensure!(leaves > 0, "no leaves in the table");
        ensure!(
            nodes.len() == 2 * leaves - 1,
            "{} nodes for {} leaves",
            nodes.len(),
            leaves
        );

        Ok(())
    }
}
