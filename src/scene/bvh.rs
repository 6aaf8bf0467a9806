//! BVH node and primitive types, plus CPU traversal.
//!
//! Flat array layout:
//! - 32-byte nodes (cache-line friendly)
//! - Triangles stored in BVH leaf order so leaves address contiguous ranges

use bytemuck::{Pod, Zeroable};
use smallvec::SmallVec;

use crate::tracer::dispatch::{RayDesc, RayFlags};
use crate::util::{Vec2, Vec3};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Grow to include a point.
    #[inline]
    pub fn grow_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grow to include another AABB.
    #[inline]
    pub fn grow(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Surface area (for SAH cost).
    #[inline]
    pub fn area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.max - self.min;
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Centroid of the AABB.
    #[inline]
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Slab test. Returns the entry distance when the box overlaps `[t_min, t_max]`.
    #[inline]
    pub fn intersect(&self, origin: Vec3, inv_dir: Vec3, t_min: f32, t_max: f32) -> Option<f32> {
        let t0 = (self.min - origin) * inv_dir;
        let t1 = (self.max - origin) * inv_dir;
        let near = t0.min(t1).max_element().max(t_min);
        let far = t0.max(t1).min_element().min(t_max);
        (near <= far).then_some(near)
    }
}

/// Flat BVH node (32 bytes).
///
/// Internal node: left_or_first = left child index, count = 0
/// Leaf node: left_or_first = first triangle index, count > 0
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BvhNode {
    pub aabb_min: Vec3,
    pub left_or_first: u32,
    pub aabb_max: Vec3,
    pub count: u32,
}

impl BvhNode {
    pub const EMPTY: Self = Self {
        aabb_min: Vec3::ZERO,
        left_or_first: 0,
        aabb_max: Vec3::ZERO,
        count: 0,
    };

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.count > 0
    }

    #[inline]
    pub fn aabb(&self) -> Aabb {
        Aabb {
            min: self.aabb_min,
            max: self.aabb_max,
        }
    }
}

/// Scene triangle with per-vertex shading normals.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub p0: Vec3,
    pub p1: Vec3,
    pub p2: Vec3,
    pub n0: Vec3,
    pub n1: Vec3,
    pub n2: Vec3,
    pub material_id: u32,
    /// Instance mask bits; a ray only sees triangles sharing a bit with its mask.
    pub mask: u32,
}

impl Triangle {
    /// Flat-shaded triangle (shading normals = geometric normal).
    pub fn flat(p0: Vec3, p1: Vec3, p2: Vec3, material_id: u32) -> Self {
        let n = (p1 - p0).cross(p2 - p0).normalize_or_zero();
        Self {
            p0,
            p1,
            p2,
            n0: n,
            n1: n,
            n2: n,
            material_id,
            mask: 0xff,
        }
    }

    /// Compute AABB of this triangle.
    pub fn aabb(&self) -> Aabb {
        let mut b = Aabb::EMPTY;
        b.grow_point(self.p0);
        b.grow_point(self.p1);
        b.grow_point(self.p2);
        b
    }

    /// Centroid of the triangle.
    pub fn centroid(&self) -> Vec3 {
        (self.p0 + self.p1 + self.p2) / 3.0
    }

    /// Unit normal from the winding order (counter-clockwise = front).
    pub fn geometric_normal(&self) -> Vec3 {
        (self.p1 - self.p0).cross(self.p2 - self.p0).normalize_or_zero()
    }

    pub fn area(&self) -> f32 {
        0.5 * (self.p1 - self.p0).cross(self.p2 - self.p0).length()
    }

    /// Point from barycentrics `(b1, b2)` of vertices 1 and 2.
    #[inline]
    pub fn point(&self, b: Vec2) -> Vec3 {
        self.p0 * (1.0 - b.x - b.y) + self.p1 * b.x + self.p2 * b.y
    }

    /// Interpolated shading normal (not normalized).
    #[inline]
    pub fn shading_normal(&self, b: Vec2) -> Vec3 {
        self.n0 * (1.0 - b.x - b.y) + self.n1 * b.x + self.n2 * b.y
    }

    /// Möller-Trumbore, two-sided. Returns `(t, barycentrics)` for `t` in `(t_min, t_max]`.
    #[inline]
    pub fn intersect(&self, ray: &RayDesc, t_max: f32) -> Option<(f32, Vec2)> {
        let e1 = self.p1 - self.p0;
        let e2 = self.p2 - self.p0;
        let pvec = ray.direction.cross(e2);
        let det = e1.dot(pvec);
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        let tvec = ray.origin - self.p0;
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let qvec = tvec.cross(e1);
        let v = ray.direction.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(qvec) * inv_det;
        (t > ray.t_min && t <= t_max).then(|| (t, Vec2::new(u, v)))
    }
}

/// Closest (or first accepted) hit of a ray against the scene triangles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Index into the scene triangle array (BVH order).
    pub triangle: u32,
    pub t: f32,
    /// Barycentrics of vertices 1 and 2.
    pub barycentrics: Vec2,
}

/// Stack traversal of a flat BVH.
///
/// With `ACCEPT_FIRST_HIT_AND_END_SEARCH` the first triangle found ends the
/// search, which is all a visibility query needs.
pub fn traverse(
    nodes: &[BvhNode],
    triangles: &[Triangle],
    ray: &RayDesc,
    flags: RayFlags,
    instance_mask: u32,
) -> Option<TriangleHit> {
    if triangles.is_empty() || ray.t_max <= ray.t_min {
        return None;
    }
    let inv_dir = ray.direction.recip();
    let first_hit = flags.contains(RayFlags::ACCEPT_FIRST_HIT_AND_END_SEARCH);

    let mut closest: Option<TriangleHit> = None;
    let mut t_max = ray.t_max;
    nodes[0].aabb().intersect(ray.origin, inv_dir, ray.t_min, t_max)?;
    let mut stack: SmallVec<[u32; 64]> = SmallVec::new();
    stack.push(0);

    while let Some(index) = stack.pop() {
        let node = &nodes[index as usize];

        if node.is_leaf() {
            let first = node.left_or_first as usize;
            for (i, tri) in triangles[first..first + node.count as usize].iter().enumerate() {
                if tri.mask & instance_mask == 0 {
                    continue;
                }
                if let Some((t, barycentrics)) = tri.intersect(ray, t_max) {
                    t_max = t;
                    closest = Some(TriangleHit {
                        triangle: (first + i) as u32,
                        t,
                        barycentrics,
                    });
                    if first_hit {
                        return closest;
                    }
                }
            }
            continue;
        }

        // Visit the nearer child first
        let left = node.left_or_first;
        let right = left + 1;
        let t_left = nodes[left as usize].aabb().intersect(ray.origin, inv_dir, ray.t_min, t_max);
        let t_right = nodes[right as usize].aabb().intersect(ray.origin, inv_dir, ray.t_min, t_max);
        match (t_left, t_right) {
            (Some(a), Some(b)) => {
                let (near, far) = if a <= b { (left, right) } else { (right, left) };
                stack.push(far);
                stack.push(near);
            }
            (Some(_), None) => stack.push(left),
            (None, Some(_)) => stack.push(right),
            (None, None) => {}
        }
    }

    closest
}
