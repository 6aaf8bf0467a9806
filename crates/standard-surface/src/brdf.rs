//! CPU evaluation and importance sampling of the Standard Surface BRDF.
//!
//! Two lobes: Lambert diffuse and GGX microfacet specular with Schlick
//! Fresnel and separable Smith masking. All functions take world-space
//! unit vectors: `n` shading normal, `v` toward the viewer, `l` toward
//! the light. Samples or evaluations below [`MIN_COS_THETA`] on either
//! side are rejected.

use glam::{Vec2, Vec3};
use std::f32::consts::{FRAC_1_PI, PI};

use crate::params::StandardSurfaceParams;
use crate::warp::{sample_cosine_hemisphere_concentric, Frame};

/// Minimum cosine of a valid direction against the shading normal.
pub const MIN_COS_THETA: f32 = 1e-6;

/// Smallest GGX alpha, keeps the NDF finite for mirror-like surfaces.
const MIN_GGX_ALPHA: f32 = 0.0064;

/// Luminance weights (Rec. 709).
#[inline]
pub fn luminance(c: Vec3) -> f32 {
    c.dot(Vec3::new(0.2126, 0.7152, 0.0722))
}

/// Lobe a sample was drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lobe {
    Diffuse,
    Specular,
    None,
}

/// Result of importance sampling the BRDF.
#[derive(Clone, Copy, Debug)]
pub struct BrdfSample {
    /// Sampled direction toward the light (world space).
    pub dir: Vec3,
    /// `f * cos / pdf`, zero for rejected samples.
    pub weight: Vec3,
    /// Solid-angle pdf of `dir` under the full lobe mixture.
    pub pdf: f32,
    pub lobe: Lobe,
}

impl BrdfSample {
    pub const INVALID: Self = Self {
        dir: Vec3::ZERO,
        weight: Vec3::ZERO,
        pdf: 0.0,
        lobe: Lobe::None,
    };

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.pdf > 0.0
    }
}

/// Pre-digested BRDF coefficients of one material.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceBrdf {
    /// Lambert albedo.
    pub diffuse: Vec3,
    /// Normal-incidence specular reflectance.
    pub f0: Vec3,
    /// Overall specular lobe scale.
    pub specular: f32,
    /// GGX alpha (roughness squared).
    pub alpha: f32,
}

impl SurfaceBrdf {
    pub fn from_params(params: &StandardSurfaceParams) -> Self {
        let metalness = params.metalness().clamp(0.0, 1.0);
        let base = params.base_color().max(Vec3::ZERO);
        let ior = params.ior().max(1.0);
        let r = (ior - 1.0) / (ior + 1.0);
        let dielectric_f0 = params.specular_color().max(Vec3::ZERO) * (r * r);
        let roughness = params.roughness().clamp(0.0, 1.0);

        Self {
            diffuse: base * (1.0 - metalness),
            f0: dielectric_f0.lerp(base, metalness),
            specular: params.specular_weight().max(0.0) + (1.0 - params.specular_weight().max(0.0)) * metalness,
            alpha: (roughness * roughness).max(MIN_GGX_ALPHA),
        }
    }

    /// Pure Lambert surface.
    pub fn lambert(albedo: Vec3) -> Self {
        Self {
            diffuse: albedo,
            f0: Vec3::ZERO,
            specular: 0.0,
            alpha: 1.0,
        }
    }

    fn has_specular(&self) -> bool {
        self.specular > 0.0 && self.f0.max_element() > 0.0
    }

    /// Probability of picking the specular lobe for a view cosine.
    fn specular_probability(&self, n_dot_v: f32) -> f32 {
        if !self.has_specular() {
            return 0.0;
        }
        let spec = self.specular * luminance(fresnel_schlick(self.f0, n_dot_v));
        let diff = luminance(self.diffuse);
        if spec + diff <= 0.0 {
            0.0
        } else {
            spec / (spec + diff)
        }
    }

    /// BRDF value `f(v, l)` without the cosine term.
    pub fn eval(&self, n: Vec3, v: Vec3, l: Vec3) -> Vec3 {
        let n_dot_v = n.dot(v);
        let n_dot_l = n.dot(l);
        if n_dot_v.min(n_dot_l) < MIN_COS_THETA {
            return Vec3::ZERO;
        }
        let mut f = self.diffuse * FRAC_1_PI;
        if self.has_specular() {
            let h = (v + l).normalize();
            let n_dot_h = n.dot(h).max(0.0);
            let v_dot_h = v.dot(h).max(0.0);
            let d = ggx_d(n_dot_h, self.alpha);
            let g = smith_g1(n_dot_v, self.alpha) * smith_g1(n_dot_l, self.alpha);
            let fr = fresnel_schlick(self.f0, v_dot_h);
            f += self.specular * fr * (d * g / (4.0 * n_dot_v * n_dot_l));
        }
        f
    }

    /// `f(v, l) * cos(theta_l)`.
    pub fn eval_cosine(&self, n: Vec3, v: Vec3, l: Vec3) -> Vec3 {
        self.eval(n, v, l) * n.dot(l).max(0.0)
    }

    /// Solid-angle pdf of [`SurfaceBrdf::sample`] producing `l`.
    pub fn pdf(&self, n: Vec3, v: Vec3, l: Vec3) -> f32 {
        let n_dot_v = n.dot(v);
        let n_dot_l = n.dot(l);
        if n_dot_v.min(n_dot_l) < MIN_COS_THETA {
            return 0.0;
        }
        let p_spec = self.specular_probability(n_dot_v);
        let mut pdf = (1.0 - p_spec) * n_dot_l * FRAC_1_PI;
        if p_spec > 0.0 {
            let h = (v + l).normalize();
            let v_dot_h = v.dot(h);
            if v_dot_h > 0.0 {
                let n_dot_h = n.dot(h).max(0.0);
                pdf += p_spec * ggx_d(n_dot_h, self.alpha) * n_dot_h / (4.0 * v_dot_h);
            }
        }
        pdf
    }

    /// Importance sample a direction. `u` holds three uniform numbers in [0, 1).
    pub fn sample(&self, n: Vec3, v: Vec3, u: [f32; 3]) -> BrdfSample {
        let n_dot_v = n.dot(v);
        if n_dot_v < MIN_COS_THETA {
            return BrdfSample::INVALID;
        }
        let p_spec = self.specular_probability(n_dot_v);
        if p_spec <= 0.0 && luminance(self.diffuse) <= 0.0 {
            return BrdfSample::INVALID;
        }

        let frame = Frame::from_normal(n);
        let (l, lobe) = if u[0] < p_spec {
            let h = frame.to_world(sample_ggx_half_vector(Vec2::new(u[1], u[2]), self.alpha));
            let v_dot_h = v.dot(h);
            if v_dot_h <= 0.0 {
                return BrdfSample::INVALID;
            }
            (2.0 * v_dot_h * h - v, Lobe::Specular)
        } else {
            let (local, _) = sample_cosine_hemisphere_concentric(Vec2::new(u[1], u[2]));
            (frame.to_world(local), Lobe::Diffuse)
        };

        if n.dot(l) < MIN_COS_THETA {
            return BrdfSample::INVALID;
        }
        let pdf = self.pdf(n, v, l);
        if pdf.is_nan() || pdf <= 0.0 {
            return BrdfSample::INVALID;
        }
        BrdfSample {
            dir: l,
            weight: self.eval_cosine(n, v, l) / pdf,
            pdf,
            lobe,
        }
    }
}

/// GGX / Trowbridge-Reitz normal distribution.
#[inline]
fn ggx_d(n_dot_h: f32, alpha: f32) -> f32 {
    let a2 = alpha * alpha;
    let d = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (PI * d * d)
}

/// Separable Smith masking for GGX.
#[inline]
fn smith_g1(n_dot_x: f32, alpha: f32) -> f32 {
    let a2 = alpha * alpha;
    2.0 * n_dot_x / (n_dot_x + (a2 + (1.0 - a2) * n_dot_x * n_dot_x).sqrt())
}

#[inline]
fn fresnel_schlick(f0: Vec3, cos_theta: f32) -> Vec3 {
    let m = (1.0 - cos_theta.clamp(0.0, 1.0)).powi(5);
    f0 + (Vec3::ONE - f0) * m
}

/// Sample a GGX half vector around +Z proportional to `D(h) * cos(theta_h)`.
fn sample_ggx_half_vector(u: Vec2, alpha: f32) -> Vec3 {
    let a2 = alpha * alpha;
    let cos2 = ((1.0 - u.x) / (1.0 + (a2 - 1.0) * u.x)).clamp(0.0, 1.0);
    let cos_theta = cos2.sqrt();
    let sin_theta = (1.0 - cos2).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}
