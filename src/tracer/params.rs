//! Tracing parameters and the per-frame shared data derived from them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::sampling::MisHeuristic;
use crate::scene::{AnalyticLight, EmissiveUniformSampler, EnvProbe, Scene};
use crate::util::{Error, Result};

/// Upper bound accepted for `max_bounces`.
pub const MAX_BOUNCES_LIMIT: u32 = 64;

/// Relative weights used to pick a light type for next-event estimation.
///
/// Types that are disabled or absent from the scene drop out and the
/// remaining weights are renormalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightSelection {
    pub env: f32,
    pub emissive: f32,
    pub analytic: f32,
}

impl Default for LightSelection {
    fn default() -> Self {
        Self {
            env: 1.0,
            emissive: 1.0,
            analytic: 1.0,
        }
    }
}

/// Path tracer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathTracerParams {
    /// Indirect bounces after the primary hit; 0 renders direct lighting only.
    pub max_bounces: u32,
    /// Next-event estimation at the primary hit.
    pub compute_direct: bool,
    /// Continue paths past the primary hit.
    pub compute_indirect: bool,
    /// Importance sample the BRDF; cosine hemisphere otherwise.
    pub use_brdf_sampling: bool,
    pub use_mis: bool,
    pub mis_heuristic: MisHeuristic,

    // Light types
    pub use_env_light: bool,
    pub use_emissive_lights: bool,
    /// Sample emissive triangles explicitly; otherwise they are only found by BRDF rays.
    pub use_emissive_sampler: bool,
    pub use_analytic_lights: bool,
    pub light_selection: LightSelection,

    /// Dispatch zero-length rays for rejected light samples.
    pub dummy_shadow_rays: bool,

    pub samples_per_pixel: u32,
    pub seed: u32,
}

impl Default for PathTracerParams {
    fn default() -> Self {
        Self {
            max_bounces: 3,
            compute_direct: true,
            compute_indirect: true,
            use_brdf_sampling: true,
            use_mis: true,
            mis_heuristic: MisHeuristic::default(),
            use_env_light: true,
            use_emissive_lights: true,
            use_emissive_sampler: true,
            use_analytic_lights: true,
            light_selection: LightSelection::default(),
            dummy_shadow_rays: false,
            samples_per_pixel: 1,
            seed: 0,
        }
    }
}

impl PathTracerParams {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let params: PathTracerParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let params = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        tracing::debug!(path = %path.display(), "params loaded");
        Ok(params)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_bounces > MAX_BOUNCES_LIMIT {
            return Err(Error::config(format!(
                "max_bounces {} exceeds {MAX_BOUNCES_LIMIT}",
                self.max_bounces
            )));
        }
        if self.samples_per_pixel == 0 {
            return Err(Error::config("samples_per_pixel must be at least 1"));
        }
        let sel = &self.light_selection;
        for (name, w) in [("env", sel.env), ("emissive", sel.emissive), ("analytic", sel.analytic)] {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::config(format!("light_selection.{name} must be finite and >= 0, got {w}")));
            }
        }
        if let MisHeuristic::Power { exponent } = self.mis_heuristic {
            if !exponent.is_finite() || exponent <= 0.0 {
                return Err(Error::config(format!("MIS power exponent must be > 0, got {exponent}")));
            }
        }
        Ok(())
    }
}

/// How the next path direction is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScatterStrategy {
    BrdfSampling,
    CosineHemisphere,
}

/// Normalized light-type selection probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LightTypeProbabilities {
    pub env: f32,
    pub emissive: f32,
    pub analytic: f32,
}

impl LightTypeProbabilities {
    fn new(weights: &LightSelection, has_env: bool, has_emissive: bool, has_analytic: bool) -> Self {
        let pick = |on: bool, w: f32| if on { w } else { 0.0 };
        let env = pick(has_env, weights.env);
        let emissive = pick(has_emissive, weights.emissive);
        let analytic = pick(has_analytic, weights.analytic);
        let sum = env + emissive + analytic;
        if sum <= 0.0 {
            return Self::default();
        }
        Self {
            env: env / sum,
            emissive: emissive / sum,
            analytic: analytic / sum,
        }
    }

    /// True when no light type can be sampled.
    pub fn is_empty(&self) -> bool {
        self.env + self.emissive + self.analytic <= 0.0
    }
}

/// Read-only data shared by every path of a frame.
///
/// Capability flags are resolved once here so per-path code branches on
/// plain options instead of re-deriving them.
#[derive(Debug, Clone)]
pub struct PathTracerSharedData {
    pub params: PathTracerParams,
    /// `None` when MIS is disabled.
    pub mis: Option<MisHeuristic>,
    pub scatter: ScatterStrategy,
    pub selection: LightTypeProbabilities,
    env_probe: Option<EnvProbe>,
    emissive_sampler: Option<EmissiveUniformSampler>,
    lights: Vec<AnalyticLight>,
}

impl PathTracerSharedData {
    pub fn new(params: PathTracerParams, scene: &Scene, env_probe: Option<EnvProbe>) -> Result<Self> {
        params.validate()?;

        let emissive_sampler = if params.use_emissive_lights && params.use_emissive_sampler {
            EmissiveUniformSampler::new(scene)
        } else {
            None
        };
        let lights = if params.use_analytic_lights {
            scene.lights().to_vec()
        } else {
            Vec::new()
        };
        let has_env = params.use_env_light && env_probe.as_ref().is_some_and(|e| !e.is_black());
        let selection = LightTypeProbabilities::new(
            &params.light_selection,
            has_env,
            emissive_sampler.is_some(),
            !lights.is_empty(),
        );
        let mis = params.use_mis.then_some(params.mis_heuristic);
        let scatter = if params.use_brdf_sampling {
            ScatterStrategy::BrdfSampling
        } else {
            ScatterStrategy::CosineHemisphere
        };

        tracing::debug!(
            ?mis,
            ?scatter,
            env = selection.env,
            emissive = selection.emissive,
            analytic = selection.analytic,
            "path tracer shared data"
        );
        if selection.is_empty() {
            tracing::warn!("no light type can be sampled; next-event estimation disabled");
        }

        Ok(Self {
            params,
            mis,
            scatter,
            selection,
            env_probe,
            emissive_sampler,
            lights,
        })
    }

    /// Environment probe, if any, regardless of whether it acts as a light.
    pub fn env_probe(&self) -> Option<&EnvProbe> {
        self.env_probe.as_ref()
    }

    /// Environment probe when it is an enabled light source.
    pub fn env_light(&self) -> Option<&EnvProbe> {
        self.env_probe
            .as_ref()
            .filter(|e| self.params.use_env_light && !e.is_black())
    }

    pub fn emissive_sampler(&self) -> Option<&EmissiveUniformSampler> {
        self.emissive_sampler.as_ref()
    }

    /// Enabled analytic lights.
    pub fn lights(&self) -> &[AnalyticLight] {
        &self.lights
    }

    #[inline]
    pub fn max_bounces(&self) -> u32 {
        self.params.max_bounces
    }
}
