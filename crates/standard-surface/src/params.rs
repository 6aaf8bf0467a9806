//! Standard Surface material parameters
//!
//! Based on Autodesk Standard Surface specification:
//! https://autodesk.github.io/standard-surface/
//!
//! Only the reflective subset used by the path tracer is kept: base,
//! specular and emission layers.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Standard Surface material parameters
///
/// All color values are linear (not sRGB).
///
/// Uses vec4 packing so the record can be copied as one block:
/// - Colors use rgb, weight uses alpha
/// - Scalar params packed into vec4
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct StandardSurfaceParams {
    /// Base color (rgb) and weight (a)
    pub base_color_weight: Vec4,
    /// Specular color (rgb) and weight (a)
    pub specular_color_weight: Vec4,
    /// Emission color (rgb) and weight (a)
    pub emission_color_weight: Vec4,
    /// Packed params: x=metalness, y=specular_roughness, z=specular_IOR, w=unused
    pub params: Vec4,
}

impl Default for StandardSurfaceParams {
    fn default() -> Self {
        Self {
            base_color_weight: Vec4::new(0.8, 0.8, 0.8, 1.0),
            specular_color_weight: Vec4::new(1.0, 1.0, 1.0, 1.0),
            emission_color_weight: Vec4::new(1.0, 1.0, 1.0, 0.0),
            // x=metalness, y=specular_roughness, z=specular_IOR
            params: Vec4::new(0.0, 0.2, 1.5, 0.0),
        }
    }
}

impl StandardSurfaceParams {
    /// Create a simple diffuse material
    pub fn diffuse(color: Vec3) -> Self {
        let mut p = Self::default();
        p.base_color_weight = color.extend(1.0);
        p.specular_color_weight.w = 0.0; // disable specular
        p
    }

    /// Create a plastic-like material
    pub fn plastic(color: Vec3, roughness: f32) -> Self {
        let mut p = Self::default();
        p.base_color_weight = color.extend(1.0);
        p.params.y = roughness;
        p
    }

    /// Create a metallic material
    pub fn metal(color: Vec3, roughness: f32) -> Self {
        let mut p = Self::default();
        p.base_color_weight = color.extend(1.0);
        p.params.x = 1.0;
        p.params.y = roughness;
        p
    }

    /// Create an emissive material (black, non-reflective)
    pub fn emissive(color: Vec3, intensity: f32) -> Self {
        let mut p = Self::default();
        p.base_color_weight.w = 0.0;
        p.specular_color_weight.w = 0.0;
        p.emission_color_weight = color.extend(intensity);
        p
    }

    /// Add an emission layer on top of the current material
    pub fn with_emission(mut self, color: Vec3, intensity: f32) -> Self {
        self.emission_color_weight = color.extend(intensity);
        self
    }

    /// Base color scaled by its weight.
    #[inline]
    pub fn base_color(&self) -> Vec3 {
        self.base_color_weight.truncate() * self.base_color_weight.w
    }

    /// Specular tint (rgb only).
    #[inline]
    pub fn specular_color(&self) -> Vec3 {
        self.specular_color_weight.truncate()
    }

    #[inline]
    pub fn specular_weight(&self) -> f32 {
        self.specular_color_weight.w
    }

    /// Emitted radiance (color times weight).
    #[inline]
    pub fn emission(&self) -> Vec3 {
        self.emission_color_weight.truncate() * self.emission_color_weight.w
    }

    #[inline]
    pub fn metalness(&self) -> f32 {
        self.params.x
    }

    #[inline]
    pub fn roughness(&self) -> f32 {
        self.params.y
    }

    #[inline]
    pub fn ior(&self) -> f32 {
        self.params.z
    }

    // Convenience setters

    /// Set base color
    pub fn set_base_color(&mut self, color: Vec3) {
        self.base_color_weight.x = color.x;
        self.base_color_weight.y = color.y;
        self.base_color_weight.z = color.z;
    }

    /// Set base weight
    pub fn set_base(&mut self, weight: f32) {
        self.base_color_weight.w = weight;
    }

    /// Set metalness
    pub fn set_metalness(&mut self, metalness: f32) {
        self.params.x = metalness;
    }

    /// Set specular roughness
    pub fn set_roughness(&mut self, roughness: f32) {
        self.params.y = roughness;
    }

    /// Set specular weight
    pub fn set_specular(&mut self, weight: f32) {
        self.specular_color_weight.w = weight;
    }

    /// Set specular IOR
    pub fn set_ior(&mut self, ior: f32) {
        self.params.z = ior;
    }
}
