//! CPU model of the hardware ray-tracing call.
//!
//! A [`RayProgram`] stands in for one ray type's hit group and miss
//! shader. [`trace_ray`] walks the scene and synchronously invokes exactly
//! one of the two programs, mutating the payload in place, the way a
//! `TraceRay` call returns to its caller once the hit or miss stage ends.

use std::ops::{BitOr, BitOrAssign};

use crate::scene::{Scene, TriangleHit};
use crate::util::Vec3;

/// Ray descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayDesc {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
    pub t_min: f32,
    pub t_max: f32,
}

impl RayDesc {
    pub fn new(origin: Vec3, direction: Vec3, t_max: f32) -> Self {
        Self {
            origin,
            direction,
            t_min: 0.0,
            t_max,
        }
    }

    /// Point at distance `t`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Traversal flags of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RayFlags(u32);

impl RayFlags {
    pub const NONE: RayFlags = RayFlags(0);
    /// Stop at the first accepted intersection instead of the closest.
    pub const ACCEPT_FIRST_HIT_AND_END_SEARCH: RayFlags = RayFlags(0x4);
    /// Do not run the closest-hit program on a hit.
    pub const SKIP_CLOSEST_HIT_SHADER: RayFlags = RayFlags(0x8);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn union(self, other: RayFlags) -> RayFlags {
        RayFlags(self.0 | other.0)
    }

    #[inline]
    pub const fn contains(self, other: RayFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for RayFlags {
    type Output = RayFlags;

    fn bitor(self, rhs: RayFlags) -> RayFlags {
        self.union(rhs)
    }
}

impl BitOrAssign for RayFlags {
    fn bitor_assign(&mut self, rhs: RayFlags) {
        self.0 |= rhs.0;
    }
}

/// Hit and miss programs of one ray type.
pub trait RayProgram {
    type Payload;

    /// Invoked for the closest (or first accepted) hit.
    fn closest_hit(&self, scene: &Scene, ray: &RayDesc, hit: &TriangleHit, payload: &mut Self::Payload);

    /// Invoked when the ray leaves the scene without an accepted hit.
    fn miss(&self, scene: &Scene, ray: &RayDesc, payload: &mut Self::Payload);
}

/// Trace `ray` through `scene` and run the matching program on `payload`.
///
/// Only triangles whose mask shares a bit with `instance_mask` are
/// considered. A ray with `t_max <= t_min` never hits and goes straight to
/// the miss program.
pub fn trace_ray<P: RayProgram>(
    scene: &Scene,
    program: &P,
    ray: &RayDesc,
    flags: RayFlags,
    instance_mask: u32,
    payload: &mut P::Payload,
) {
    match scene.intersect(ray, flags, instance_mask) {
        Some(hit) => {
            if !flags.contains(RayFlags::SKIP_CLOSEST_HIT_SHADER) {
                program.closest_hit(scene, ray, &hit, payload);
            }
        }
        None => program.miss(scene, ray, payload),
    }
}
