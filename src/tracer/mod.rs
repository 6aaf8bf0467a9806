//! Megakernel path tracer.
//!
//! Path state lives in a [`ScatterRayPayload`] that is packed into a
//! [`PackedScatterPayload`] for every scatter-ray dispatch, handed to the
//! hit or miss program, and unpacked again by the caller. The raygen loop
//! owns the path: it fires the scatter ray, accumulates the segment's
//! emitted radiance, and traces the shadow ray the hit program requested.
//!
//! Stages, in the order a path visits them:
//! - [`raygen::trace_path`] - primary ray, direct lighting, path loop
//! - [`scatter::generate_scatter_ray`] - next direction and throughput update
//! - [`scatter::trace_scatter_ray`] - pack, dispatch, unpack
//! - [`hit::handle_hit`] - MIS-weighted emission, next-event request, next scatter ray
//! - [`miss::handle_miss`] - MIS-weighted environment, termination
//! - [`shadow::trace_shadow_ray`] - visibility

pub mod codec;
pub mod direct;
pub mod dispatch;
pub mod hit;
pub mod light_sampling;
pub mod miss;
mod params;
mod payload;
pub mod raygen;
pub mod scatter;
pub mod shadow;
mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use codec::PackedScatterPayload;
pub use direct::evaluate_direct_illumination;
pub use dispatch::{trace_ray, RayDesc, RayFlags, RayProgram};
pub use hit::{generate_shadow_ray, handle_hit};
pub use light_sampling::{sample_scene_lights, SceneLightSample};
pub use miss::handle_miss;
pub use params::{
    LightSelection, LightTypeProbabilities, PathTracerParams, PathTracerSharedData, ScatterStrategy,
    MAX_BOUNCES_LIMIT,
};
pub use payload::{ScatterRayPayload, ShadowRayPayload, ShadowRayRequest};
pub use raygen::{trace_path, Frame, Renderer};
pub use scatter::{generate_scatter_ray, trace_scatter_ray};
pub use shadow::{trace_shadow_ray, trace_shadow_request};
pub use stats::{RayCounters, RayCounts};

use crate::scene::Scene;

/// Everything a lane needs to dispatch rays.
#[derive(Clone, Copy)]
pub struct TraceContext<'a> {
    pub scene: &'a Scene,
    pub shared: &'a PathTracerSharedData,
    /// Counters of the worker running this lane.
    pub counters: &'a RayCounters,
}

impl<'a> TraceContext<'a> {
    pub fn new(scene: &'a Scene, shared: &'a PathTracerSharedData, counters: &'a RayCounters) -> Self {
        Self {
            scene,
            shared,
            counters,
        }
    }
}
