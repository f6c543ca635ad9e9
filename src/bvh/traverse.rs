use super::{Bvh, NodeContent, PrimitiveRef};
use crate::{
    config::TraversalMode,
    ray::{Interval, Ray},
};
use smallvec::SmallVec;

/// Deepest tree the stackless walk can handle, one revisit bit per level
pub const STACKLESS_MAX_DEPTH: usize = u64::BITS as usize;

impl Bvh {
    /// The traversal that will actually run for `mode` on this tree.
    /// Trees too deep for the revisit mask always use the explicit stack.
    pub fn resolve_mode(&self, mode: TraversalMode) -> TraversalMode {
        match mode {
            TraversalMode::Auto | TraversalMode::Stackless if self.depth <= STACKLESS_MAX_DEPTH => {
                TraversalMode::Stackless
            }
            _ => TraversalMode::Stack,
        }
    }

    /// Walks the tree along `ray`, calling `intersect` for every leaf whose box is
    /// reached inside `range`. `intersect` must return true only when it found a hit
    /// and tightened `range.max` to it.
    ///
    /// With `any_hit` the walk stops at the first such hit, otherwise it keeps going
    /// until the closest one is known. Returns whether anything was hit.
    pub fn traverse<F>(
        &self,
        ray: &Ray,
        range: &mut Interval,
        any_hit: bool,
        mode: TraversalMode,
        intersect: F,
    ) -> bool
    where
        F: FnMut(PrimitiveRef, &mut Interval) -> bool,
    {
        if self.nodes.is_empty() {
            return false;
        }

        match self.resolve_mode(mode) {
            TraversalMode::Stack => self.traverse_stack(ray, range, any_hit, intersect),
            _ => self.traverse_stackless(ray, range, any_hit, intersect),
        }
    }

    /// Iterative walk without any stack. Parent links take us back up, `last` tells
    /// whether we came down from the parent or back up from a child, and bit `level`
    /// of `revisit` marks a sibling that still has to be tested.
    fn traverse_stackless<F>(&self, ray: &Ray, range: &mut Interval, any_hit: bool, mut intersect: F) -> bool
    where
        F: FnMut(PrimitiveRef, &mut Interval) -> bool,
    {
        let nodes = &self.nodes;

        if !nodes[0].bounds.hit(ray, *range) {
            return false;
        }
        if let NodeContent::Leaf(primitive) = nodes[0].content {
            return intersect(primitive, range);
        }

        let mut found = false;
        let mut current = 0;
        let mut last = usize::MAX;
        let mut revisit = 0u64;
        let mut level = 0u32;

        loop {
            let node = &nodes[current];
            let children = node.left.index().zip(node.right.index());

            let selected = match children {
                // Came down from the parent, decide which children are worth a look
                Some((left, right)) if last != left && last != right => {
                    let t_left = nodes[left].bounds.hit_t(ray, *range);
                    let t_right = nodes[right].bounds.hit_t(ray, *range);

                    match (t_left, t_right) {
                        (Some(t_left), Some(t_right)) => {
                            revisit |= 1 << level;
                            Some(if t_left <= t_right { left } else { right })
                        }
                        (Some(_), None) => Some(left),
                        (None, Some(_)) => Some(right),
                        (None, None) => None,
                    }
                }
                // Came back up from a child
                Some((left, right)) => {
                    let pending = (revisit >> level) & 1 == 1;
                    revisit &= !(1 << level);

                    if pending {
                        let sibling = if last == left { right } else { left };

                        // A closer hit may have been found since the box was tested
                        if nodes[sibling].bounds.hit(ray, *range) {
                            Some(sibling)
                        } else {
                            last = sibling;
                            continue;
                        }
                    } else {
                        None
                    }
                }
                None => None,
            };

            let Some(selected) = selected else {
                // Nothing left below this node, go back up
                match node.parent.index() {
                    Some(parent) => {
                        last = current;
                        current = parent;
                        level -= 1;
                        continue;
                    }
                    None => break,
                }
            };

            match nodes[selected].content {
                NodeContent::Internal => {
                    current = selected;
                    level += 1;
                }
                NodeContent::Leaf(primitive) => {
                    if intersect(primitive, range) {
                        found = true;
                        if any_hit {
                            return true;
                        }
                    }
                    // Treat the leaf as a child we just returned from
                    last = selected;
                }
            }
        }

        found
    }

    /// Same walk with an explicit stack of pending nodes and their entry distances.
    /// Stays on the call stack for trees up to `STACKLESS_MAX_DEPTH` deep.
    fn traverse_stack<F>(&self, ray: &Ray, range: &mut Interval, any_hit: bool, mut intersect: F) -> bool
    where
        F: FnMut(PrimitiveRef, &mut Interval) -> bool,
    {
        let nodes = &self.nodes;
        let mut stack: SmallVec<[(usize, f32); STACKLESS_MAX_DEPTH]> = SmallVec::new();
        let mut found = false;

        if let Some(t) = nodes[0].bounds.hit_t(ray, *range) {
            stack.push((0, t));
        }

        while let Some((index, entry)) = stack.pop() {
            // Something closer than this box was found while it waited
            if entry > range.max {
                continue;
            }

            let node = &nodes[index];
            match node.content {
                NodeContent::Leaf(primitive) => {
                    if intersect(primitive, range) {
                        found = true;
                        if any_hit {
                            return true;
                        }
                    }
                }
                NodeContent::Internal => {
                    let Some((left, right)) = node.left.index().zip(node.right.index()) else {
                        continue;
                    };

                    let t_left = nodes[left].bounds.hit_t(ray, *range);
                    let t_right = nodes[right].bounds.hit_t(ray, *range);

                    // Push the farther child first so the nearer one is popped next
                    match (t_left, t_right) {
                        (Some(t_left), Some(t_right)) if t_left <= t_right => {
                            stack.push((right, t_right));
                            stack.push((left, t_left));
                        }
                        (Some(t_left), Some(t_right)) => {
                            stack.push((left, t_left));
                            stack.push((right, t_right));
                        }
                        (Some(t_left), None) => stack.push((left, t_left)),
                        (None, Some(t_right)) => stack.push((right, t_right)),
                        (None, None) => {}
                    }
                }
            }
        }

        found
    }
}
