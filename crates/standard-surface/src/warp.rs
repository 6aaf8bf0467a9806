//! Sample warping: unit square to disk, hemisphere and triangle.

use glam::{Vec2, Vec3};
use std::f32::consts::{FRAC_1_PI, FRAC_PI_4, PI};

/// Concentric mapping of the unit square to the unit disk (Shirley-Chiu).
pub fn sample_disk_concentric(u: Vec2) -> Vec2 {
    let u = 2.0 * u - Vec2::ONE;
    if u.x == 0.0 && u.y == 0.0 {
        return Vec2::ZERO;
    }
    let (r, theta) = if u.x.abs() > u.y.abs() {
        (u.x, FRAC_PI_4 * (u.y / u.x))
    } else {
        (u.y, 0.5 * PI - FRAC_PI_4 * (u.x / u.y))
    };
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Cosine-weighted hemisphere sample around +Z using the concentric disk mapping.
///
/// Returns the local direction and its solid-angle pdf `cos(theta) / pi`.
pub fn sample_cosine_hemisphere_concentric(u: Vec2) -> (Vec3, f32) {
    let d = sample_disk_concentric(u);
    let z = (1.0 - d.length_squared()).max(0.0).sqrt();
    (Vec3::new(d.x, d.y, z), z * FRAC_1_PI)
}

/// Uniform barycentrics on a triangle (square-root parameterization).
///
/// Returns `(b1, b2)`; the first vertex weight is `1 - b1 - b2`.
pub fn sample_triangle_uniform(u: Vec2) -> Vec2 {
    let su = u.x.sqrt();
    Vec2::new(1.0 - su, u.y * su)
}

/// Orthonormal frame around a unit normal.
#[derive(Clone, Copy, Debug)]
pub struct Frame {
    pub t: Vec3,
    pub b: Vec3,
    pub n: Vec3,
}

impl Frame {
    pub fn from_normal(n: Vec3) -> Self {
        let (t, b) = n.any_orthonormal_pair();
        Self { t, b, n }
    }

    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.t * v.x + self.b * v.y + self.n * v.z
    }

    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.t), v.dot(self.b), v.dot(self.n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_stays_inside() {
        for i in 0..16 {
            for j in 0..16 {
                let u = Vec2::new(i as f32 / 15.0, j as f32 / 15.0);
                assert!(sample_disk_concentric(u).length() <= 1.0 + 1e-5);
            }
        }
    }

    #[test]
    fn test_cosine_pdf_matches_z() {
        let (d, pdf) = sample_cosine_hemisphere_concentric(Vec2::new(0.3, 0.8));
        assert!((d.length() - 1.0).abs() < 1e-5);
        assert!(d.z > 0.0);
        assert!((pdf - d.z / PI).abs() < 1e-6);
    }

    #[test]
    fn test_center_maps_to_pole() {
        let (d, pdf) = sample_cosine_hemisphere_concentric(Vec2::splat(0.5));
        assert_eq!(d, Vec3::Z);
        assert!((pdf - FRAC_1_PI).abs() < 1e-6);
    }

    #[test]
    fn test_triangle_barycentrics_valid() {
        let b = sample_triangle_uniform(Vec2::new(0.9, 0.9));
        assert!(b.x >= 0.0 && b.y >= 0.0 && b.x + b.y <= 1.0);
    }

    #[test]
    fn test_frame_roundtrip() {
        let n = Vec3::new(0.3, -0.5, 0.8).normalize();
        let f = Frame::from_normal(n);
        let v = Vec3::new(0.1, 0.7, -0.2);
        let back = f.to_world(f.to_local(v));
        assert!((back - v).length() < 1e-5);
        assert!((f.to_world(Vec3::Z) - n).length() < 1e-6);
    }
}
