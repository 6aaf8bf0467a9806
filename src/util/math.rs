//! Math type re-exports and radiance helpers.
//!
//! This module re-exports the `glam` types used by the tracer and adds the
//! small RGB predicates the light-transport code relies on.

// Re-export glam types
pub use glam::{UVec2, Vec2, Vec3, Vec4};

pub use standard_surface::luminance;

/// Largest ray extent; used for scatter rays and lights at infinity.
pub const RAY_T_MAX: f32 = f32::MAX;

/// True when every channel is exactly zero.
#[inline]
pub fn is_black(c: Vec3) -> bool {
    c.x == 0.0 && c.y == 0.0 && c.z == 0.0
}

/// True when at least one channel is strictly positive.
#[inline]
pub fn any_positive(c: Vec3) -> bool {
    c.x > 0.0 || c.y > 0.0 || c.z > 0.0
}

/// True when some channel is NaN.
#[inline]
pub fn has_nan(c: Vec3) -> bool {
    c.is_nan()
}

/// Clamp NaN, infinite and negative channels to zero.
///
/// Release-build fallback for radiance and throughput values that broke a
/// numerical invariant; debug builds assert before reaching this.
#[inline]
pub fn sanitize(c: Vec3) -> Vec3 {
    let fix = |x: f32| if x.is_finite() && x > 0.0 { x } else { 0.0 };
    Vec3::new(fix(c.x), fix(c.y), fix(c.z))
}

/// Scalar counterpart of [`sanitize`].
#[inline]
pub fn sanitize_pdf(p: f32) -> f32 {
    if p.is_finite() && p > 0.0 {
        p
    } else {
        0.0
    }
}
