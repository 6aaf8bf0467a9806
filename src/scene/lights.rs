//! Analytic (delta) lights.

use serde::{Deserialize, Serialize};

use crate::util::{Vec3, RAY_T_MAX};

/// Point or directional light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalyticLight {
    /// Isotropic point light; `intensity` is radiant intensity (W/sr per channel).
    Point { position: Vec3, intensity: Vec3 },
    /// Light at infinity; `direction` points from the light into the scene.
    Directional { direction: Vec3, irradiance: Vec3 },
}

/// Incident light from one analytic light at a shading point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightIncidence {
    /// Unit direction toward the light.
    pub dir: Vec3,
    pub distance: f32,
    /// Incident radiance scaled to a delta measure (intensity / d^2 or irradiance).
    pub li: Vec3,
}

impl AnalyticLight {
    pub fn incidence(&self, p: Vec3) -> Option<LightIncidence> {
        match *self {
            AnalyticLight::Point { position, intensity } => {
                let to_light = position - p;
                let d2 = to_light.length_squared();
                if d2 <= 0.0 {
                    return None;
                }
                let distance = d2.sqrt();
                Some(LightIncidence {
                    dir: to_light / distance,
                    distance,
                    li: intensity / d2,
                })
            }
            AnalyticLight::Directional { direction, irradiance } => {
                let dir = -direction.normalize_or_zero();
                (dir != Vec3::ZERO).then_some(LightIncidence {
                    dir,
                    distance: RAY_T_MAX,
                    li: irradiance,
                })
            }
        }
    }
}
