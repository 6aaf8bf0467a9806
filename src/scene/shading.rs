//! Shading data at a surface hit and the BRDF queries made against it.

use standard_surface::{BrdfSample, SurfaceBrdf};

use crate::sampling::SampleGenerator;
use crate::util::Vec3;

/// Relative scale of the ray-origin offset along the face normal.
const ORIGIN_OFFSET: f32 = 1e-4;

/// Everything the transport code needs to know about one surface point.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadingData {
    pub position: Vec3,
    /// Shading normal, flipped into the hemisphere of `face_n`.
    pub n: Vec3,
    /// Geometric normal, facing the incoming ray.
    pub face_n: Vec3,
    /// Direction toward the viewer (negated ray direction).
    pub v: Vec3,
    pub n_dot_v: f32,
    /// True when the ray hit the triangle's front (counter-clockwise) side.
    pub front_facing: bool,
    pub brdf: SurfaceBrdf,
    /// Emitted radiance toward `v`.
    pub emissive: Vec3,
    pub material_id: u32,
}

impl ShadingData {
    /// Shading data for a point whose geometric and shading normals agree.
    pub fn new(position: Vec3, normal: Vec3, v: Vec3, brdf: SurfaceBrdf, emissive: Vec3) -> Self {
        let n = normal.normalize();
        let v = v.normalize();
        Self {
            position,
            n,
            face_n: n,
            v,
            n_dot_v: n.dot(v),
            front_facing: true,
            brdf,
            emissive,
            material_id: 0,
        }
    }

    /// Origin for rays leaving this point, pushed off the surface along the
    /// face normal to avoid self-intersection.
    pub fn new_ray_origin(&self) -> Vec3 {
        let scale = 1.0 + self.position.abs().max_element();
        self.position + self.face_n * (ORIGIN_OFFSET * scale)
    }

    /// Importance sample the BRDF.
    pub fn sample_brdf(&self, sg: &mut SampleGenerator) -> BrdfSample {
        let u = sg.next_3d();
        self.brdf.sample(self.n, self.v, u.to_array())
    }

    /// `f(v, l)`.
    pub fn eval_brdf(&self, l: Vec3) -> Vec3 {
        self.brdf.eval(self.n, self.v, l)
    }

    /// `f(v, l) * cos(theta_l)`.
    pub fn eval_brdf_cosine(&self, l: Vec3) -> Vec3 {
        self.brdf.eval_cosine(self.n, self.v, l)
    }

    /// Solid-angle pdf of [`ShadingData::sample_brdf`] producing `l`.
    pub fn eval_brdf_pdf(&self, l: Vec3) -> f32 {
        self.brdf.pdf(self.n, self.v, l)
    }
}
