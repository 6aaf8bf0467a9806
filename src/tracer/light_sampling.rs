//! One light sample drawn from the union of enabled light types.
//!
//! A light type is picked with the normalized selection probabilities of
//! [`PathTracerSharedData`], then one sample is drawn from it. The returned
//! radiance is already divided by the full sampling density (type
//! selection included) and, for the area-like types, MIS weighted against
//! the scatter strategy with the same heuristic the hit and miss handlers
//! apply to BRDF-sampled rays.

use standard_surface::MIN_COS_THETA;

use super::params::{LightTypeProbabilities, PathTracerSharedData};
use super::scatter::scatter_pdf;
use crate::sampling::SampleGenerator;
use crate::scene::ShadingData;
use crate::util::{any_positive, Vec3, RAY_T_MAX};

/// Fraction of the light distance kept by the shadow ray so it stops short
/// of the emitting triangle itself.
const EMITTER_DISTANCE_SCALE: f32 = 1.0 - 1e-4;

/// Result of [`sample_scene_lights`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLightSample {
    /// Unit direction toward the light.
    pub dir: Vec3,
    pub distance: f32,
    /// Incident radiance divided by `pdf` and MIS weighted.
    pub li: Vec3,
    /// Solid-angle pdf times the light-type selection probability; 0 for delta lights.
    pub pdf: f32,
}

impl SceneLightSample {
    pub const INVALID: Self = Self {
        dir: Vec3::ZERO,
        distance: 0.0,
        li: Vec3::ZERO,
        pdf: 0.0,
    };

    #[inline]
    pub fn is_valid(&self) -> bool {
        any_positive(self.li)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LightType {
    Env,
    Emissive,
    Analytic,
}

/// Pick a light type for `u` in [0, 1). Returns the type and its probability.
fn select_light_type(sel: &LightTypeProbabilities, u: f32) -> Option<(LightType, f32)> {
    let candidates = [
        (LightType::Env, sel.env),
        (LightType::Emissive, sel.emissive),
        (LightType::Analytic, sel.analytic),
    ];
    let mut cdf = 0.0;
    let mut last = None;
    for (ty, p) in candidates {
        if p <= 0.0 {
            continue;
        }
        cdf += p;
        last = Some((ty, p));
        if u < cdf {
            return last;
        }
    }
    // Rounding left the sum just below one
    last
}

/// Draw one light sample for the shading point `sd`, as seen from `origin`.
///
/// Samples below the shading hemisphere are rejected and come back as
/// [`SceneLightSample::INVALID`].
pub fn sample_scene_lights(
    shared: &PathTracerSharedData,
    sd: &ShadingData,
    origin: Vec3,
    sg: &mut SampleGenerator,
) -> SceneLightSample {
    let Some((ty, p_select)) = select_light_type(&shared.selection, sg.next_1d()) else {
        return SceneLightSample::INVALID;
    };
    let sample = match ty {
        LightType::Env => sample_env(shared, sd, p_select, sg),
        LightType::Emissive => sample_emissive(shared, sd, origin, p_select, sg),
        LightType::Analytic => sample_analytic(shared, sd, origin, p_select, sg),
    };
    sample.unwrap_or(SceneLightSample::INVALID)
}

fn sample_env(
    shared: &PathTracerSharedData,
    sd: &ShadingData,
    p_select: f32,
    sg: &mut SampleGenerator,
) -> Option<SceneLightSample> {
    let env = shared.env_light()?;
    let s = env.sample(sg.next_2d())?;
    if sd.n.dot(s.dir) < MIN_COS_THETA {
        return None;
    }
    let pdf = s.pdf * p_select;
    Some(SceneLightSample {
        dir: s.dir,
        distance: RAY_T_MAX,
        li: s.le / pdf * mis_weight(shared, sd, s.dir, pdf),
        pdf,
    })
}

fn sample_emissive(
    shared: &PathTracerSharedData,
    sd: &ShadingData,
    origin: Vec3,
    p_select: f32,
    sg: &mut SampleGenerator,
) -> Option<SceneLightSample> {
    let sampler = shared.emissive_sampler()?;
    let s = sampler.sample(origin, sg)?;
    if sd.n.dot(s.dir) < MIN_COS_THETA {
        return None;
    }
    let pdf = s.pdf * p_select;
    Some(SceneLightSample {
        dir: s.dir,
        distance: s.distance * EMITTER_DISTANCE_SCALE,
        li: s.le / pdf * mis_weight(shared, sd, s.dir, pdf),
        pdf,
    })
}

fn sample_analytic(
    shared: &PathTracerSharedData,
    sd: &ShadingData,
    origin: Vec3,
    p_select: f32,
    sg: &mut SampleGenerator,
) -> Option<SceneLightSample> {
    let lights = shared.lights();
    if lights.is_empty() {
        return None;
    }
    let n = lights.len();
    let index = ((sg.next_1d() * n as f32) as usize).min(n - 1);
    let inc = lights[index].incidence(origin)?;
    if sd.n.dot(inc.dir) < MIN_COS_THETA {
        return None;
    }
    // Delta lights cannot be hit by scatter rays, so no MIS
    Some(SceneLightSample {
        dir: inc.dir,
        distance: inc.distance,
        li: inc.li * (n as f32 / p_select),
        pdf: 0.0,
    })
}

#[inline]
fn mis_weight(shared: &PathTracerSharedData, sd: &ShadingData, dir: Vec3, light_pdf: f32) -> f32 {
    match shared.mis {
        Some(mis) => mis.weight(light_pdf, scatter_pdf(shared, sd, dir)),
        None => 1.0,
    }
}
