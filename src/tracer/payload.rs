//! Per-path and per-shadow-ray payloads.

use crate::sampling::SampleGenerator;
use crate::util::Vec3;

/// Deferred shadow ray produced by next-event estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowRayRequest {
    /// Unit direction toward the light sample.
    pub direction: Vec3,
    pub distance: f32,
    /// Radiance added to the pixel when the ray is unoccluded, throughput included.
    pub contribution: Vec3,
}

/// State of one path, carried across every scatter-ray dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterRayPayload {
    /// Origin of the next segment.
    pub origin: Vec3,
    /// Direction of the next segment.
    pub direction: Vec3,
    pub throughput: Vec3,
    /// Emitted radiance found by the last segment, throughput included.
    pub radiance: Vec3,
    /// Scatter pdf of `direction`. Meaningful only with MIS.
    pub pdf: f32,
    /// Shading normal at `origin`. Meaningful only with MIS.
    pub normal: Vec3,
    pub path_length: u32,
    pub shadow: Option<ShadowRayRequest>,
    pub terminated: bool,
    pub sg: SampleGenerator,
}

impl ScatterRayPayload {
    pub fn new(sg: SampleGenerator) -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::ZERO,
            throughput: Vec3::ONE,
            radiance: Vec3::ZERO,
            pdf: 0.0,
            normal: Vec3::ZERO,
            path_length: 0,
            shadow: None,
            terminated: false,
            sg,
        }
    }
}

/// Visibility query result. Only the shadow miss program sets `visible`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShadowRayPayload {
    pub visible: bool,
}
