//! SAH-based BVH builder.
//!
//! Produces a flat node array over a triangle list. Leaves address
//! contiguous ranges of `tri_indices`; the scene reorders its triangles by
//! that permutation so traversal can index triangles directly.

use super::bvh::{Aabb, BvhNode, Triangle};
use crate::util::Vec3;

/// Number of SAH bins per axis.
const NUM_BINS: usize = 12;

/// Relative cost of one traversal step vs one triangle test.
const TRAVERSAL_COST: f32 = 1.0;
const INTERSECT_COST: f32 = 1.0;

/// Ranges at or below this size always become leaves.
const MAX_LEAF_SIZE: usize = 4;

/// Built BVH.
#[derive(Debug, Clone)]
pub struct Bvh {
    /// Flat node array (index 0 = root).
    pub nodes: Vec<BvhNode>,
    /// Triangle permutation; leaf ranges index into this.
    pub tri_indices: Vec<usize>,
}

#[derive(Clone, Copy)]
struct Bin {
    bounds: Aabb,
    count: usize,
}

impl Bin {
    const EMPTY: Self = Self {
        bounds: Aabb::EMPTY,
        count: 0,
    };
}

/// Candidate split plane.
#[derive(Debug, Clone, Copy)]
struct Split {
    axis: usize,
    pos: f32,
    /// Cost relative to the parent surface area.
    cost: f32,
}

fn leaf(aabb: &Aabb, first: usize, count: usize) -> BvhNode {
    BvhNode {
        aabb_min: aabb.min,
        left_or_first: first as u32,
        aabb_max: aabb.max,
        count: count as u32,
    }
}

/// Build a BVH over `triangles` using binned SAH.
#[tracing::instrument(skip_all, fields(tri_count = triangles.len()))]
pub fn build_bvh(triangles: &[Triangle]) -> Bvh {
    let n = triangles.len();
    if n == 0 {
        return Bvh {
            nodes: vec![BvhNode::EMPTY],
            tri_indices: vec![],
        };
    }

    let centroids: Vec<Vec3> = triangles.iter().map(Triangle::centroid).collect();
    let aabbs: Vec<Aabb> = triangles.iter().map(Triangle::aabb).collect();
    let mut indices: Vec<usize> = (0..n).collect();

    let mut nodes: Vec<BvhNode> = Vec::with_capacity(2 * n);
    nodes.push(BvhNode::EMPTY);

    struct Task {
        node_idx: usize,
        start: usize,
        end: usize,
    }

    let mut stack = vec![Task {
        node_idx: 0,
        start: 0,
        end: n,
    }];

    while let Some(Task { node_idx, start, end }) = stack.pop() {
        let count = end - start;

        let mut node_aabb = Aabb::EMPTY;
        let mut centroid_bounds = Aabb::EMPTY;
        for &idx in &indices[start..end] {
            node_aabb.grow(&aabbs[idx]);
            centroid_bounds.grow_point(centroids[idx]);
        }

        if count <= MAX_LEAF_SIZE {
            nodes[node_idx] = leaf(&node_aabb, start, count);
            continue;
        }

        let parent_area = node_aabb.area();
        let split = find_best_split(&indices[start..end], &aabbs, &centroids, &centroid_bounds, parent_area);
        let leaf_cost = count as f32 * INTERSECT_COST;

        let Some(split) = split.filter(|s| s.cost < leaf_cost) else {
            nodes[node_idx] = leaf(&node_aabb, start, count);
            continue;
        };

        let mid = partition(&mut indices[start..end], |&idx| centroids[idx][split.axis] < split.pos) + start;
        // Degenerate partition: split the range in half
        let mid = if mid == start || mid == end { (start + end) / 2 } else { mid };

        let left_idx = nodes.len();
        nodes.push(BvhNode::EMPTY);
        nodes.push(BvhNode::EMPTY);
        nodes[node_idx] = BvhNode {
            aabb_min: node_aabb.min,
            left_or_first: left_idx as u32,
            aabb_max: node_aabb.max,
            count: 0,
        };

        stack.push(Task {
            node_idx: left_idx + 1,
            start: mid,
            end,
        });
        stack.push(Task {
            node_idx: left_idx,
            start,
            end: mid,
        });
    }

    tracing::debug!(nodes = nodes.len(), "BVH built");
    Bvh {
        nodes,
        tri_indices: indices,
    }
}

/// Binned SAH search over all three axes. `None` when every axis is degenerate.
fn find_best_split(
    indices: &[usize],
    aabbs: &[Aabb],
    centroids: &[Vec3],
    centroid_bounds: &Aabb,
    parent_area: f32,
) -> Option<Split> {
    let mut best: Option<Split> = None;
    let inv_parent = if parent_area > 0.0 { 1.0 / parent_area } else { 0.0 };

    for axis in 0..3 {
        let lo = centroid_bounds.min[axis];
        let extent = centroid_bounds.max[axis] - lo;
        if extent < 1e-8 {
            continue;
        }

        let mut bins = [Bin::EMPTY; NUM_BINS];
        let scale = NUM_BINS as f32 / extent;
        for &idx in indices {
            let b = (((centroids[idx][axis] - lo) * scale) as usize).min(NUM_BINS - 1);
            bins[b].bounds.grow(&aabbs[idx]);
            bins[b].count += 1;
        }

        // Prefix sweep from the left
        let mut left_area = [0.0f32; NUM_BINS - 1];
        let mut left_count = [0usize; NUM_BINS - 1];
        let mut sweep = Aabb::EMPTY;
        let mut sweep_count = 0;
        for i in 0..NUM_BINS - 1 {
            sweep.grow(&bins[i].bounds);
            sweep_count += bins[i].count;
            left_area[i] = sweep.area();
            left_count[i] = sweep_count;
        }

        // Suffix sweep from the right, evaluating each plane
        sweep = Aabb::EMPTY;
        sweep_count = 0;
        for i in (1..NUM_BINS).rev() {
            sweep.grow(&bins[i].bounds);
            sweep_count += bins[i].count;
            if left_count[i - 1] == 0 || sweep_count == 0 {
                continue;
            }
            let cost = TRAVERSAL_COST
                + INTERSECT_COST
                    * inv_parent
                    * (left_count[i - 1] as f32 * left_area[i - 1] + sweep_count as f32 * sweep.area());
            if best.map_or(true, |b| cost < b.cost) {
                best = Some(Split {
                    axis,
                    pos: lo + (i as f32 / NUM_BINS as f32) * extent,
                    cost,
                });
            }
        }
    }

    best
}

/// In-place partition. Returns the number of elements satisfying `pred`.
fn partition<T, F>(slice: &mut [T], pred: F) -> usize
where
    F: Fn(&T) -> bool,
{
    let mut left = 0;
    let mut right = slice.len();
    while left < right {
        if pred(&slice[left]) {
            left += 1;
        } else {
            right -= 1;
            slice.swap(left, right);
        }
    }
    left
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tri(cx: f32, cy: f32, cz: f32) -> Triangle {
        Triangle::flat(
            Vec3::new(cx - 0.5, cy - 0.5, cz),
            Vec3::new(cx + 0.5, cy - 0.5, cz),
            Vec3::new(cx, cy + 0.5, cz),
            0,
        )
    }

    /// Every triangle must be referenced by exactly one leaf.
    fn leaf_coverage(bvh: &Bvh) -> Vec<usize> {
        let mut seen = vec![0usize; bvh.tri_indices.len()];
        for node in bvh.nodes.iter().filter(|n| n.is_leaf()) {
            let first = node.left_or_first as usize;
            for slot in &mut seen[first..first + node.count as usize] {
                *slot += 1;
            }
        }
        seen
    }

    #[test]
    fn test_empty_bvh() {
        let bvh = build_bvh(&[]);
        assert_eq!(bvh.nodes.len(), 1);
        assert!(bvh.tri_indices.is_empty());
    }

    #[test]
    fn test_single_triangle() {
        let bvh = build_bvh(&[make_tri(0.0, 0.0, 0.0)]);
        assert_eq!(bvh.nodes.len(), 1);
        assert_eq!(bvh.nodes[0].count, 1);
        assert_eq!(bvh.tri_indices, vec![0]);
    }

    #[test]
    fn test_many_triangles_builds_tree() {
        let tris: Vec<Triangle> = (0..100).map(|i| make_tri(i as f32 * 2.0, 0.0, 0.0)).collect();
        let bvh = build_bvh(&tris);

        assert!(bvh.nodes.len() > 1, "BVH should have internal nodes");

        let mut sorted = bvh.tri_indices.clone();
        sorted.sort();
        assert_eq!(sorted, (0..100).collect::<Vec<_>>());
        assert!(leaf_coverage(&bvh).iter().all(|&c| c == 1));

        let root = &bvh.nodes[0];
        assert!(root.aabb_min.x < 0.0);
        assert!(root.aabb_max.x > 198.0);
    }

    #[test]
    fn test_small_range_is_leaf() {
        let tris = vec![make_tri(0.0, 0.0, 0.0), make_tri(1.0, 0.0, 0.0), make_tri(2.0, 0.0, 0.0)];
        let bvh = build_bvh(&tris);
        assert_eq!(bvh.nodes[0].count, 3);
    }

    #[test]
    fn test_coincident_centroids_terminate() {
        // All centroids equal: no valid split, must still produce a leaf
        let tris: Vec<Triangle> = (0..16).map(|_| make_tri(1.0, 1.0, 1.0)).collect();
        let bvh = build_bvh(&tris);
        assert!(leaf_coverage(&bvh).iter().all(|&c| c == 1));
    }

    #[test]
    fn test_children_bounded_by_parent() {
        let tris: Vec<Triangle> = (0..64)
            .map(|i| make_tri((i % 8) as f32 * 3.0, (i / 8) as f32 * 3.0, (i % 3) as f32))
            .collect();
        let bvh = build_bvh(&tris);
        for node in bvh.nodes.iter().filter(|n| !n.is_leaf()) {
            for child in [node.left_or_first, node.left_or_first + 1] {
                let c = &bvh.nodes[child as usize];
                assert!(c.aabb_min.cmpge(node.aabb_min).all());
                assert!(c.aabb_max.cmple(node.aabb_max).all());
            }
        }
    }
}
