//! CPU reference scene: triangles in a BVH, materials, and light sources.
//!
//! - [`Scene`] - immutable triangle scene with closest/any-hit queries
//! - [`SceneBuilder`] - assembles materials, meshes and lights
//! - [`EmissiveUniformSampler`], [`EnvProbe`], [`AnalyticLight`] - light queries
//! - [`ShadingData`] - surface state at a hit
//! - [`SceneDesc`] - JSON scene description

mod build;
mod bvh;
mod camera;
mod desc;
mod emissive;
mod env_probe;
mod lights;
mod shading;

pub use build::{build_bvh, Bvh};
pub use bvh::{traverse, Aabb, BvhNode, Triangle, TriangleHit};
pub use camera::Camera;
pub use desc::{EnvironmentDesc, LightDesc, MaterialDesc, ObjectDesc, SceneDesc};
pub use emissive::{EmissiveSample, EmissiveUniformSampler};
pub use env_probe::{dir_to_equirect_uv, equirect_uv_to_dir, EnvProbe, EnvSample};
pub use lights::{AnalyticLight, LightIncidence};
pub use shading::ShadingData;

use standard_surface::{StandardSurfaceParams, SurfaceBrdf};

use crate::tracer::dispatch::{RayDesc, RayFlags};
use crate::util::Vec3;

/// Default instance mask of scene triangles.
pub const DEFAULT_INSTANCE_MASK: u32 = 0xff;

/// Surface material.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub params: StandardSurfaceParams,
    pub brdf: SurfaceBrdf,
    /// Emitted radiance of the front face.
    pub emission: Vec3,
}

impl Material {
    pub fn new(name: impl Into<String>, params: StandardSurfaceParams) -> Self {
        Self {
            name: name.into(),
            brdf: SurfaceBrdf::from_params(&params),
            emission: params.emission().max(Vec3::ZERO),
            params,
        }
    }
}

/// Immutable triangle scene.
#[derive(Debug, Clone)]
pub struct Scene {
    /// Triangles in BVH leaf order.
    triangles: Vec<Triangle>,
    nodes: Vec<BvhNode>,
    materials: Vec<Material>,
    lights: Vec<AnalyticLight>,
}

impl Scene {
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn material(&self, id: u32) -> &Material {
        &self.materials[id as usize]
    }

    pub fn lights(&self) -> &[AnalyticLight] {
        &self.lights
    }

    /// World bounds of all triangles.
    pub fn bounds(&self) -> Aabb {
        self.nodes[0].aabb()
    }

    /// Closest hit, or any hit when `flags` accept the first one.
    pub fn intersect(&self, ray: &RayDesc, flags: RayFlags, instance_mask: u32) -> Option<TriangleHit> {
        traverse(&self.nodes, &self.triangles, ray, flags, instance_mask)
    }

    /// Shading data for `hit` along `ray`.
    pub fn shading_data(&self, hit: &TriangleHit, ray: &RayDesc) -> ShadingData {
        let tri = &self.triangles[hit.triangle as usize];
        let material = self.material(tri.material_id);
        let v = -ray.direction;

        let geo_n = tri.geometric_normal();
        let front_facing = geo_n.dot(v) >= 0.0;
        let face_n = if front_facing { geo_n } else { -geo_n };

        // Shading normal on the same side as the viewer-facing face normal
        let mut n = tri.shading_normal(hit.barycentrics).normalize_or(geo_n);
        if n.dot(face_n) < 0.0 {
            n = -n;
        }

        ShadingData {
            position: tri.point(hit.barycentrics),
            n,
            face_n,
            v,
            n_dot_v: n.dot(v),
            front_facing,
            brdf: material.brdf,
            emissive: if front_facing { material.emission } else { Vec3::ZERO },
            material_id: tri.material_id,
        }
    }
}

/// Incremental scene assembly.
#[derive(Debug, Default)]
pub struct SceneBuilder {
    triangles: Vec<Triangle>,
    materials: Vec<Material>,
    lights: Vec<AnalyticLight>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material; returns its id.
    pub fn add_material(&mut self, name: impl Into<String>, params: StandardSurfaceParams) -> u32 {
        self.materials.push(Material::new(name, params));
        (self.materials.len() - 1) as u32
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Indexed triangle mesh. Without `normals` the triangles are flat shaded.
    /// Out-of-range indices skip the triangle.
    pub fn add_mesh(&mut self, positions: &[Vec3], normals: Option<&[Vec3]>, indices: &[u32], material_id: u32) {
        let normals = normals.filter(|n| n.len() == positions.len());
        let mut skipped = 0usize;
        for tri in indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a.max(b).max(c) >= positions.len() {
                skipped += 1;
                continue;
            }
            let mut t = Triangle::flat(positions[a], positions[b], positions[c], material_id);
            if let Some(n) = normals {
                t.n0 = n[a];
                t.n1 = n[b];
                t.n2 = n[c];
            }
            self.triangles.push(t);
        }
        if skipped > 0 {
            tracing::warn!(skipped, "mesh triangles with out-of-range indices skipped");
        }
    }

    /// Parallelogram `origin + s*u + t*v`, front face along `u x v`.
    pub fn add_quad(&mut self, origin: Vec3, u: Vec3, v: Vec3, material_id: u32) {
        let p = [origin, origin + u, origin + u + v, origin + v];
        self.triangles.push(Triangle::flat(p[0], p[1], p[2], material_id));
        self.triangles.push(Triangle::flat(p[0], p[2], p[3], material_id));
    }

    /// Axis-aligned box with outward-facing sides.
    pub fn add_box(&mut self, min: Vec3, max: Vec3, material_id: u32) {
        let d = max - min;
        let (dx, dy, dz) = (Vec3::X * d.x, Vec3::Y * d.y, Vec3::Z * d.z);
        self.add_quad(min, dx, dz, material_id); // -Y
        self.add_quad(max, -dz, -dx, material_id); // +Y
        self.add_quad(min, dz, dy, material_id); // -X
        self.add_quad(max, -dy, -dz, material_id); // +X
        self.add_quad(min, dy, dx, material_id); // -Z
        self.add_quad(max, -dx, -dy, material_id); // +Z
    }

    pub fn add_light(&mut self, light: AnalyticLight) {
        self.lights.push(light);
    }

    /// Build the BVH and freeze the scene.
    ///
    /// Triangles referencing a missing material fall back to material 0; a
    /// default gray material is added when none was registered.
    pub fn build(mut self) -> Scene {
        if self.materials.is_empty() {
            self.materials.push(Material::new("default", StandardSurfaceParams::default()));
        }
        let material_count = self.materials.len() as u32;
        for t in &mut self.triangles {
            if t.material_id >= material_count {
                tracing::warn!(material_id = t.material_id, "unknown material, using 0");
                t.material_id = 0;
            }
        }

        let bvh = build_bvh(&self.triangles);
        let triangles: Vec<Triangle> = bvh.tri_indices.iter().map(|&i| self.triangles[i].clone()).collect();

        tracing::debug!(
            triangles = triangles.len(),
            nodes = bvh.nodes.len(),
            materials = self.materials.len(),
            lights = self.lights.len(),
            "scene built"
        );
        Scene {
            triangles,
            nodes: bvh.nodes,
            materials: self.materials,
            lights: self.lights,
        }
    }
}
