//! Uniform emissive-triangle sampler.
//!
//! Picks one emissive triangle uniformly by count, then a uniform point on
//! it. Only the front (counter-clockwise) face emits. Densities are
//! reported per unit solid angle as seen from the shading point.

use standard_surface::MIN_COS_THETA;

use super::bvh::{Triangle, TriangleHit};
use super::Scene;
use crate::sampling::{sample_triangle_uniform, SampleGenerator};
use crate::util::{is_black, Vec3};

#[derive(Debug, Clone)]
struct EmissiveTriangle {
    p0: Vec3,
    p1: Vec3,
    p2: Vec3,
    normal: Vec3,
    area: f32,
    emission: Vec3,
}

/// One sampled point on an emitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissiveSample {
    /// Unit direction from the shading point toward the light point.
    pub dir: Vec3,
    pub distance: f32,
    pub le: Vec3,
    /// Solid-angle pdf including the triangle selection probability.
    pub pdf: f32,
}

/// Sampler over every emissive triangle of a scene.
#[derive(Debug, Clone)]
pub struct EmissiveUniformSampler {
    triangles: Vec<EmissiveTriangle>,
    /// Scene triangle index -> emissive slot, `u32::MAX` for non-emitters.
    lookup: Vec<u32>,
}

impl EmissiveUniformSampler {
    /// Collect the emitters of `scene`. `None` when nothing emits.
    pub fn new(scene: &Scene) -> Option<Self> {
        let mut triangles = Vec::new();
        let mut lookup = vec![u32::MAX; scene.triangles().len()];
        for (i, tri) in scene.triangles().iter().enumerate() {
            let emission = scene.material(tri.material_id).emission;
            let area = tri.area();
            if is_black(emission) || area <= 0.0 {
                continue;
            }
            lookup[i] = triangles.len() as u32;
            triangles.push(EmissiveTriangle::new(tri, emission, area));
        }
        if triangles.is_empty() {
            return None;
        }
        tracing::debug!(count = triangles.len(), "emissive sampler built");
        Some(Self { triangles, lookup })
    }

    /// Number of emissive triangles.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Sample a point on an emitter as seen from `origin`.
    ///
    /// `None` when the point lies behind the emitting face or coincides with
    /// the origin.
    pub fn sample(&self, origin: Vec3, sg: &mut SampleGenerator) -> Option<EmissiveSample> {
        let n = self.triangles.len();
        let index = ((sg.next_1d() * n as f32) as usize).min(n - 1);
        let tri = &self.triangles[index];

        let b = sample_triangle_uniform(sg.next_2d());
        let p = tri.p0 * (1.0 - b.x - b.y) + tri.p1 * b.x + tri.p2 * b.y;
        let to_light = p - origin;
        let dist2 = to_light.length_squared();
        if dist2 <= 0.0 {
            return None;
        }
        let distance = dist2.sqrt();
        let dir = to_light / distance;
        let pdf = tri.solid_angle_pdf(dir, dist2, n)?;
        Some(EmissiveSample {
            dir,
            distance,
            le: tri.emission,
            pdf,
        })
    }

    /// Density with which [`EmissiveUniformSampler::sample`] would have
    /// produced `hit` from `origin`, whose shading normal is `normal`.
    ///
    /// Zero for directions below the origin's hemisphere, since next-event
    /// estimation rejects those samples too.
    pub fn eval_pdf(&self, origin: Vec3, normal: Vec3, hit: &TriangleHit) -> f32 {
        let Some(&slot) = self.lookup.get(hit.triangle as usize) else {
            return 0.0;
        };
        if slot == u32::MAX {
            return 0.0;
        }
        let tri = &self.triangles[slot as usize];
        let b = hit.barycentrics;
        let p = tri.p0 * (1.0 - b.x - b.y) + tri.p1 * b.x + tri.p2 * b.y;
        let to_light = p - origin;
        let dist2 = to_light.length_squared();
        if dist2 <= 0.0 {
            return 0.0;
        }
        let dir = to_light / dist2.sqrt();
        if normal.dot(dir) < MIN_COS_THETA {
            return 0.0;
        }
        tri.solid_angle_pdf(dir, dist2, self.triangles.len()).unwrap_or(0.0)
    }
}

impl EmissiveTriangle {
    fn new(tri: &Triangle, emission: Vec3, area: f32) -> Self {
        Self {
            p0: tri.p0,
            p1: tri.p1,
            p2: tri.p2,
            normal: tri.geometric_normal(),
            area,
            emission,
        }
    }

    /// Area pdf `1 / (N * area)` converted to solid angle.
    fn solid_angle_pdf(&self, dir: Vec3, dist2: f32, count: usize) -> Option<f32> {
        let cos_light = -self.normal.dot(dir);
        if cos_light < MIN_COS_THETA {
            return None;
        }
        Some(dist2 / (cos_light * self.area * count as f32))
    }
}
