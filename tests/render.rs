//! End-to-end rendering through the public API: scene files, params files,
//! frames on disk.

use std::fs;

use megakernel::prelude::*;
use megakernel::tracer::{PathTracerSharedData, RayCounters, RayDesc, TraceContext};

fn small_params(spp: u32) -> PathTracerParams {
    PathTracerParams {
        samples_per_pixel: spp,
        ..Default::default()
    }
}

#[test]
fn test_cornell_box_render() {
    let desc = SceneDesc::cornell_box();
    let (scene, env) = desc.build().unwrap();
    let renderer = Renderer::new(scene, env, small_params(2)).unwrap();
    let frame = renderer.render(&desc.camera, 24, 24, 0);

    assert_eq!(frame.pixels.len(), 24 * 24);
    assert!(frame.pixels.iter().all(|p| p.is_finite() && p.min_element() >= 0.0));
    assert!(frame.mean().max_element() > 0.0);

    let counts = frame.counts;
    assert_eq!(counts.primary, 24 * 24 * 2);
    assert!(counts.scatter > 0);
    assert!(counts.shadow > 0);
    assert_eq!(counts.dummy, 0);
    assert_eq!(counts.total(), counts.primary + counts.scatter + counts.shadow);
}

#[test]
fn test_dummy_shadow_rays_do_not_change_the_image() {
    // Ceiling points see the back of the lamp, so some light samples are rejected
    let desc = SceneDesc::cornell_box();
    let render = |dummy: bool| {
        let (scene, env) = desc.build().unwrap();
        let params = PathTracerParams {
            dummy_shadow_rays: dummy,
            ..small_params(1)
        };
        Renderer::new(scene, env, params).unwrap().render(&desc.camera, 16, 16, 3)
    };
    let plain = render(false);
    let dummies = render(true);
    assert_eq!(plain.pixels, dummies.pixels);
    assert_eq!(plain.counts.total(), dummies.counts.total());
    assert!(dummies.counts.dummy > 0);
}

#[test]
fn test_direct_only_is_darker_than_full_transport() {
    let desc = SceneDesc::cornell_box();
    let render = |max_bounces: u32| {
        let (scene, env) = desc.build().unwrap();
        let params = PathTracerParams {
            max_bounces,
            ..small_params(4)
        };
        Renderer::new(scene, env, params).unwrap().render(&desc.camera, 16, 16, 0)
    };
    let direct = render(0).mean();
    let full = render(4).mean();
    assert!(full.x > direct.x, "{full} vs {direct}");
}

#[test]
fn test_scene_and_params_from_files() {
    let dir = tempfile::tempdir().unwrap();

    // Small lat-long sky next to the scene file
    let sky = image::Rgb32FImage::from_fn(8, 4, |_, y| {
        if y < 2 {
            image::Rgb([1.0, 1.0, 1.0])
        } else {
            image::Rgb([0.0, 0.0, 0.0])
        }
    });
    sky.save(dir.path().join("sky.hdr")).unwrap();

    let scene_json = r#"{
        "camera": { "position": [0, 1, 3], "target": [0, 0, 0], "up": [0, 1, 0], "fov": 50 },
        "materials": [ { "name": "gray", "base_color": [0.5, 0.5, 0.5] } ],
        "objects": [
            { "type": "quad", "origin": [-5, 0, 5], "u": [10, 0, 0], "v": [0, 0, -10], "material": "gray" }
        ],
        "environment": { "type": "file", "path": "sky.hdr", "intensity": 2.0 }
    }"#;
    let scene_path = dir.path().join("scene.json");
    fs::write(&scene_path, scene_json).unwrap();
    let params_path = dir.path().join("params.json");
    fs::write(&params_path, r#"{ "max_bounces": 1, "samples_per_pixel": 2, "seed": 9 }"#).unwrap();

    let params = PathTracerParams::from_json_file(&params_path).unwrap();
    assert_eq!(params.max_bounces, 1);
    assert_eq!(params.samples_per_pixel, 2);
    assert!(params.use_mis);

    let desc = SceneDesc::from_json_file(&scene_path).unwrap();
    let (scene, env) = desc.build().unwrap();
    let env = env.unwrap();
    assert_eq!(env.dimensions(), (8, 4));
    assert_eq!(env.eval(Vec3::Y), Vec3::splat(2.0));

    let renderer = Renderer::new(scene, Some(env), params).unwrap();
    let frame = renderer.render(&desc.camera, 12, 8, 0);
    assert!(frame.pixels.iter().all(|p| p.is_finite()));
    assert!(frame.mean().x > 0.0);

    let out = dir.path().join("frame.exr");
    frame.save(&out).unwrap();
    let back = image::open(&out).unwrap().to_rgb32f();
    assert_eq!(back.dimensions(), (12, 8));
}

#[test]
fn test_missing_files_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.json");
    assert!(matches!(SceneDesc::from_json_file(&missing), Err(Error::FileNotFound(_))));
    assert!(matches!(PathTracerParams::from_json_file(&missing), Err(Error::FileNotFound(_))));

    let scene_path = dir.path().join("scene.json");
    fs::write(&scene_path, r#"{ "environment": { "type": "file", "path": "gone.exr" } }"#).unwrap();
    let desc = SceneDesc::from_json_file(&scene_path).unwrap();
    assert!(matches!(desc.build(), Err(Error::FileNotFound(_))));
}

#[test]
fn test_invalid_params_rejected() {
    let too_deep = format!(r#"{{ "max_bounces": {} }}"#, megakernel::tracer::MAX_BOUNCES_LIMIT + 1);
    assert!(matches!(PathTracerParams::from_json_str(&too_deep), Err(Error::InvalidConfig(_))));
    assert!(PathTracerParams::from_json_str(r#"{ "samples_per_pixel": 0 }"#).is_err());
    assert!(PathTracerParams::from_json_str(r#"{ "light_selection": { "env": -1 } }"#).is_err());
}

#[test]
fn test_env_only_light_selection() {
    // With every other light type off, a lit floor only sees the sky
    let mut b = SceneBuilder::new();
    let m = b.add_material("floor", standard_surface::StandardSurfaceParams::diffuse(Vec3::splat(0.5)));
    b.add_quad(Vec3::new(-5.0, 0.0, 5.0), Vec3::X * 10.0, -Vec3::Z * 10.0, m);
    let scene = b.build();
    let params = PathTracerParams {
        use_env_light: false,
        ..Default::default()
    };
    let shared = PathTracerSharedData::new(params, &scene, Some(EnvProbe::constant(Vec3::ONE))).unwrap();
    assert!(shared.env_light().is_none());
    assert!(shared.env_probe().is_some());

    // Without an env light nothing illuminates the floor, but a primary miss still shows the probe
    let counters = RayCounters::new();
    let ctx = TraceContext::new(&scene, &shared, &counters);
    let down = RayDesc::new(Vec3::new(0.0, 1.0, 0.0), -Vec3::Y, f32::MAX);
    let up = RayDesc::new(Vec3::new(0.0, 1.0, 0.0), Vec3::Y, f32::MAX);
    for i in 0..32 {
        let l = megakernel::tracer::trace_path(&ctx, &down, SampleGenerator::new(i, 0, 0, 0));
        assert_eq!(l, Vec3::ZERO);
    }
    assert_eq!(
        megakernel::tracer::trace_path(&ctx, &up, SampleGenerator::new(0, 0, 0, 0)),
        Vec3::ONE
    );
}
