//! Pinhole camera.

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::tracer::dispatch::RayDesc;
use crate::util::RAY_T_MAX;

/// Look-at pinhole camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical FOV in degrees
    pub fov: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 45.0,
        }
    }
}

impl Camera {
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3, fov: f32) -> Self {
        Self {
            position,
            target,
            up,
            fov,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Primary ray through `pixel` offset by `jitter` in [0, 1)^2.
    ///
    /// Pixel (0, 0) is the top-left corner of the image.
    pub fn generate_ray(&self, pixel: (u32, u32), size: (u32, u32), jitter: Vec2) -> RayDesc {
        let (w, h) = (size.0.max(1) as f32, size.1.max(1) as f32);
        let ndc = Vec2::new(
            (pixel.0 as f32 + jitter.x) / w * 2.0 - 1.0,
            1.0 - (pixel.1 as f32 + jitter.y) / h * 2.0,
        );
        let tan_half = (self.fov.to_radians() * 0.5).tan();
        let local = Vec3::new(ndc.x * tan_half * (w / h), ndc.y * tan_half, -1.0);
        // Camera-to-world rotation is the inverse of the view rotation
        let to_world = self.view_matrix().inverse();
        let direction = to_world.transform_vector3(local).normalize();
        RayDesc::new(self.position, direction, RAY_T_MAX)
    }
}
