//! Visibility-only rays.

use super::dispatch::{trace_ray, RayDesc, RayFlags, RayProgram};
use super::payload::{ShadowRayPayload, ShadowRayRequest};
use super::TraceContext;
use crate::scene::{Scene, TriangleHit, DEFAULT_INSTANCE_MASK};
use crate::util::Vec3;

/// Any accepted hit occludes; only the miss program reports visibility.
struct ShadowProgram;

impl RayProgram for ShadowProgram {
    type Payload = ShadowRayPayload;

    fn closest_hit(&self, _: &Scene, _: &RayDesc, _: &TriangleHit, _: &mut ShadowRayPayload) {}

    fn miss(&self, _: &Scene, _: &RayDesc, payload: &mut ShadowRayPayload) {
        payload.visible = true;
    }
}

const SHADOW_FLAGS: RayFlags = RayFlags::ACCEPT_FIRST_HIT_AND_END_SEARCH.union(RayFlags::SKIP_CLOSEST_HIT_SHADER);

/// True when nothing blocks `origin + t * dir` for `t` in `(0, distance]`.
///
/// Invalid requests report "not visible" and are not counted. With
/// `dummy_shadow_rays` they still dispatch a zero-length ray so every lane
/// issues the same trace call.
pub fn trace_shadow_ray(ctx: &TraceContext<'_>, origin: Vec3, dir: Vec3, distance: f32, valid: bool) -> bool {
    let ray = RayDesc::new(origin, dir, if valid { distance } else { 0.0 });
    let mut payload = ShadowRayPayload::default();

    if !valid {
        if ctx.shared.params.dummy_shadow_rays {
            trace_ray(ctx.scene, &ShadowProgram, &ray, SHADOW_FLAGS, DEFAULT_INSTANCE_MASK, &mut payload);
            ctx.counters.count_dummy();
        }
        return false;
    }

    trace_ray(ctx.scene, &ShadowProgram, &ray, SHADOW_FLAGS, DEFAULT_INSTANCE_MASK, &mut payload);
    ctx.counters.count_shadow();
    payload.visible
}

/// Resolve a deferred next-event request into its radiance contribution.
pub fn trace_shadow_request(ctx: &TraceContext<'_>, origin: Vec3, request: Option<&ShadowRayRequest>) -> Vec3 {
    match request {
        Some(r) if trace_shadow_ray(ctx, origin, r.direction, r.distance, true) => r.contribution,
        Some(_) => Vec3::ZERO,
        None => {
            trace_shadow_ray(ctx, origin, Vec3::Y, 0.0, false);
            Vec3::ZERO
        }
    }
}
