//! Small scenes shared by the tracer unit tests.

use standard_surface::{StandardSurfaceParams, SurfaceBrdf};

use super::{PathTracerParams, PathTracerSharedData};
use crate::scene::{AnalyticLight, EnvProbe, Scene, SceneBuilder, ShadingData};
use crate::util::Vec3;

/// Gray (albedo 0.5) diffuse floor quad at y = 0, 20 x 20 units, facing +Y.
pub fn floor(b: &mut SceneBuilder) -> u32 {
    let m = b.add_material("floor", StandardSurfaceParams::diffuse(Vec3::splat(0.5)));
    b.add_quad(Vec3::new(-10.0, 0.0, 10.0), Vec3::X * 20.0, -Vec3::Z * 20.0, m);
    m
}

/// Floor lit by one point light at `light_pos`.
pub fn point_lit_floor(light_pos: Vec3, intensity: f32) -> Scene {
    let mut b = SceneBuilder::new();
    floor(&mut b);
    b.add_light(AnalyticLight::Point {
        position: light_pos,
        intensity: Vec3::splat(intensity),
    });
    b.build()
}

/// [`point_lit_floor`] with a blocker quad at y = 1 covering x, z in [-1, 1].
pub fn occluded_point_lit_floor(light_pos: Vec3, intensity: f32) -> Scene {
    let mut b = SceneBuilder::new();
    let m = floor(&mut b);
    b.add_quad(Vec3::new(-1.0, 1.0, 1.0), Vec3::X * 2.0, -Vec3::Z * 2.0, m);
    b.add_light(AnalyticLight::Point {
        position: light_pos,
        intensity: Vec3::splat(intensity),
    });
    b.build()
}

/// Floor under a downward-facing emissive quad at y = `height`.
pub fn emissive_panel_over_floor(height: f32, radiance: f32) -> Scene {
    let mut b = SceneBuilder::new();
    floor(&mut b);
    let lamp = b.add_material("lamp", StandardSurfaceParams::emissive(Vec3::ONE, radiance));
    b.add_quad(Vec3::new(-0.5, height, -0.5), Vec3::X, Vec3::Z, lamp);
    b.build()
}

/// Empty scene.
pub fn empty() -> Scene {
    SceneBuilder::new().build()
}

pub fn shared(scene: &Scene, env: Option<EnvProbe>, params: PathTracerParams) -> PathTracerSharedData {
    PathTracerSharedData::new(params, scene, env).unwrap()
}

/// Gray diffuse shading point at the origin facing +Y, viewed from straight above.
pub fn gray_floor_point() -> ShadingData {
    ShadingData::new(Vec3::ZERO, Vec3::Y, Vec3::Y, SurfaceBrdf::lambert(Vec3::splat(0.5)), Vec3::ZERO)
}
