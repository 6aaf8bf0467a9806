//! Miss handling of scatter rays.

use super::params::PathTracerSharedData;
use super::payload::ScatterRayPayload;
use crate::util::Vec3;

/// Resolve a scatter ray that left the scene along `dir` and end the path.
///
/// The environment contributes here only when it is a light and MIS is
/// enabled; without MIS next-event estimation accounts for it in full.
pub fn handle_miss(shared: &PathTracerSharedData, dir: Vec3, payload: &mut ScatterRayPayload) {
    payload.terminated = true;
    payload.radiance = Vec3::ZERO;
    payload.shadow = None;

    if let (Some(env), Some(mis)) = (shared.env_light(), shared.mis) {
        let light_pdf = env.eval_pdf(dir) * shared.selection.env;
        payload.radiance = payload.throughput * env.eval(dir) * mis.weight(payload.pdf, light_pdf);
    }
}
