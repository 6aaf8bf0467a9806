//! JSON scene description.
//!
//! ```json
//! {
//!   "camera": { "position": [0, 0, 3.5], "target": [0, 0, 0], "fov": 40 },
//!   "materials": [ { "name": "white", "base_color": [0.7, 0.7, 0.7] } ],
//!   "objects": [ { "type": "box", "min": [-1, -1, -1], "max": [1, 1, 1], "material": "white" } ],
//!   "lights": [ { "type": "point", "position": [0, 0.9, 0], "intensity": [5, 5, 5] } ],
//!   "environment": { "type": "constant", "color": [0.1, 0.1, 0.1] }
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use standard_surface::StandardSurfaceParams;

use super::{AnalyticLight, Camera, EnvProbe, Scene, SceneBuilder};
use crate::util::{Error, Result, Vec3};

/// Named material. Field names follow Standard Surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialDesc {
    pub name: String,
    pub base_color: Vec3,
    pub metalness: f32,
    pub roughness: f32,
    /// Specular layer weight; 0 gives a pure Lambert surface.
    pub specular: f32,
    pub ior: f32,
    pub emission: Vec3,
    pub emission_strength: f32,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_color: Vec3::splat(0.8),
            metalness: 0.0,
            roughness: 0.5,
            specular: 0.0,
            ior: 1.5,
            emission: Vec3::ONE,
            emission_strength: 0.0,
        }
    }
}

impl MaterialDesc {
    pub fn diffuse(name: &str, base_color: Vec3) -> Self {
        Self {
            name: name.into(),
            base_color,
            ..Default::default()
        }
    }

    pub fn emitter(name: &str, emission: Vec3, strength: f32) -> Self {
        Self {
            name: name.into(),
            base_color: Vec3::ZERO,
            emission,
            emission_strength: strength,
            ..Default::default()
        }
    }

    pub fn to_params(&self) -> StandardSurfaceParams {
        let mut p = StandardSurfaceParams::default();
        p.set_base_color(self.base_color);
        p.set_metalness(self.metalness);
        p.set_roughness(self.roughness);
        p.set_specular(self.specular);
        p.set_ior(self.ior);
        p.with_emission(self.emission, self.emission_strength)
    }
}

/// Scene geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectDesc {
    /// Parallelogram `origin + s*u + t*v`, front face along `u x v`.
    Quad {
        origin: Vec3,
        u: Vec3,
        v: Vec3,
        material: String,
    },
    /// Axis-aligned box.
    Box { min: Vec3, max: Vec3, material: String },
    /// Indexed triangle mesh.
    Mesh {
        positions: Vec<Vec3>,
        #[serde(default)]
        normals: Option<Vec<Vec3>>,
        indices: Vec<u32>,
        material: String,
    },
}

impl ObjectDesc {
    fn material(&self) -> &str {
        match self {
            ObjectDesc::Quad { material, .. } | ObjectDesc::Box { material, .. } | ObjectDesc::Mesh { material, .. } => {
                material
            }
        }
    }
}

/// Analytic light entry.
pub type LightDesc = AnalyticLight;

/// Environment light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnvironmentDesc {
    Constant { color: Vec3 },
    /// HDR/EXR lat-long map; relative paths resolve against the scene file.
    File {
        path: PathBuf,
        #[serde(default = "default_intensity")]
        intensity: f32,
    },
}

fn default_intensity() -> f32 {
    1.0
}

/// Whole scene.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDesc {
    pub camera: Camera,
    pub materials: Vec<MaterialDesc>,
    pub objects: Vec<ObjectDesc>,
    pub lights: Vec<LightDesc>,
    pub environment: Option<EnvironmentDesc>,
}

impl SceneDesc {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let desc: SceneDesc = serde_json::from_str(json)?;
        desc.validate()?;
        Ok(desc)
    }

    /// Load from a file. Relative environment paths are resolved against
    /// the file's directory.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let mut desc = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        if let Some(EnvironmentDesc::File { path: env_path, .. }) = &mut desc.environment {
            if env_path.is_relative() {
                if let Some(dir) = path.parent() {
                    *env_path = dir.join(&*env_path);
                }
            }
        }
        tracing::debug!(path = %path.display(), objects = desc.objects.len(), "scene description loaded");
        Ok(desc)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check references and numeric ranges.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashMap::new();
        for (i, m) in self.materials.iter().enumerate() {
            if names.insert(m.name.as_str(), i).is_some() {
                return Err(Error::scene(format!("duplicate material '{}'", m.name)));
            }
            if m.base_color.min_element() < 0.0 || m.emission.min_element() < 0.0 || m.emission_strength < 0.0 {
                return Err(Error::scene(format!("material '{}' has negative color", m.name)));
            }
        }
        for obj in &self.objects {
            if !names.contains_key(obj.material()) {
                return Err(Error::scene(format!("unknown material '{}'", obj.material())));
            }
            if let ObjectDesc::Mesh { positions, indices, .. } = obj {
                if indices.len() % 3 != 0 {
                    return Err(Error::scene("mesh index count is not a multiple of 3"));
                }
                if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
                    return Err(Error::scene(format!("mesh index {bad} out of range")));
                }
            }
        }
        if !(self.camera.fov > 0.0 && self.camera.fov < 180.0) {
            return Err(Error::scene(format!("camera fov {} outside (0, 180)", self.camera.fov)));
        }
        if (self.camera.target - self.camera.position).length_squared() == 0.0 {
            return Err(Error::scene("camera target equals position"));
        }
        match &self.environment {
            Some(EnvironmentDesc::Constant { color }) if !color.is_finite() || color.min_element() < 0.0 => {
                return Err(Error::scene(format!("environment color {color} must be finite and >= 0")));
            }
            Some(EnvironmentDesc::File { intensity, .. }) if !intensity.is_finite() || *intensity < 0.0 => {
                return Err(Error::scene(format!("environment intensity {intensity} must be finite and >= 0")));
            }
            _ => {}
        }
        Ok(())
    }

    /// Build the scene and its environment probe.
    pub fn build(&self) -> Result<(Scene, Option<EnvProbe>)> {
        self.validate()?;
        let mut builder = SceneBuilder::new();
        let ids: HashMap<&str, u32> = self
            .materials
            .iter()
            .map(|m| (m.name.as_str(), builder.add_material(m.name.clone(), m.to_params())))
            .collect();

        for obj in &self.objects {
            let id = ids[obj.material()];
            match obj {
                ObjectDesc::Quad { origin, u, v, .. } => builder.add_quad(*origin, *u, *v, id),
                ObjectDesc::Box { min, max, .. } => builder.add_box(min.min(*max), max.max(*min), id),
                ObjectDesc::Mesh {
                    positions,
                    normals,
                    indices,
                    ..
                } => builder.add_mesh(positions, normals.as_deref(), indices, id),
            }
        }
        for light in &self.lights {
            builder.add_light(*light);
        }

        let env = match &self.environment {
            None => None,
            Some(EnvironmentDesc::Constant { color }) => Some(EnvProbe::constant(*color)),
            Some(EnvironmentDesc::File { path, intensity }) => Some(EnvProbe::from_file(path, *intensity)?),
        };
        Ok((builder.build(), env))
    }

    /// Closed Cornell box lit by an emissive ceiling panel.
    pub fn cornell_box() -> Self {
        let quad = |origin: Vec3, u: Vec3, v: Vec3, material: &str| ObjectDesc::Quad {
            origin,
            u,
            v,
            material: material.into(),
        };
        let aabb = |min: Vec3, max: Vec3| ObjectDesc::Box {
            min,
            max,
            material: "white".into(),
        };
        Self {
            camera: Camera::look_at(Vec3::new(0.0, 0.0, 3.4), Vec3::ZERO, Vec3::Y, 40.0),
            materials: vec![
                MaterialDesc::diffuse("white", Vec3::splat(0.73)),
                MaterialDesc::diffuse("red", Vec3::new(0.65, 0.05, 0.05)),
                MaterialDesc::diffuse("green", Vec3::new(0.12, 0.45, 0.15)),
                MaterialDesc::emitter("light", Vec3::new(1.0, 0.85, 0.6), 15.0),
            ],
            objects: vec![
                quad(Vec3::new(-1.0, -1.0, 1.0), Vec3::X * 2.0, -Vec3::Z * 2.0, "white"), // floor
                quad(Vec3::new(-1.0, 1.0, -1.0), Vec3::X * 2.0, Vec3::Z * 2.0, "white"), // ceiling
                quad(Vec3::new(-1.0, -1.0, -1.0), Vec3::X * 2.0, Vec3::Y * 2.0, "white"), // back
                quad(Vec3::new(-1.0, -1.0, -1.0), Vec3::Y * 2.0, Vec3::Z * 2.0, "red"), // left
                quad(Vec3::new(1.0, -1.0, -1.0), Vec3::Z * 2.0, Vec3::Y * 2.0, "green"), // right
                quad(Vec3::new(-0.25, 0.98, -0.25), Vec3::X * 0.5, Vec3::Z * 0.5, "light"),
                aabb(Vec3::new(-0.6, -1.0, -0.1), Vec3::new(-0.05, -0.45, 0.45)),
                aabb(Vec3::new(0.1, -1.0, -0.65), Vec3::new(0.6, 0.2, -0.15)),
            ],
            lights: vec![],
            environment: None,
        }
    }
}
