//! Closest-hit handling of scatter rays.

use super::light_sampling::sample_scene_lights;
use super::params::PathTracerSharedData;
use super::payload::{ScatterRayPayload, ShadowRayRequest};
use super::scatter::generate_scatter_ray;
use crate::scene::{ShadingData, TriangleHit};
use crate::util::{any_positive, Vec3};

/// Resolve a scatter ray that hit `sd` and set up the next path segment.
///
/// `payload.radiance` receives the emission of the hit surface, MIS
/// weighted when next-event estimation could also have found it.
/// `payload.origin`, `pdf` and `normal` still describe the vertex the ray
/// left from. When `compute_indirect` holds and the bounce bound is not
/// reached, a shadow request is generated first, then the next scatter ray
/// (which updates the throughput), and the path length grows by one.
/// Otherwise no ray is requested and `terminated` is left alone.
pub fn handle_hit(
    shared: &PathTracerSharedData,
    sd: &ShadingData,
    hit: &TriangleHit,
    compute_indirect: bool,
    payload: &mut ScatterRayPayload,
) {
    payload.radiance = Vec3::ZERO;
    payload.shadow = None;

    let sampler = shared.emissive_sampler();
    let emission_visible = shared.params.use_emissive_lights && (sampler.is_none() || shared.mis.is_some());
    if emission_visible && any_positive(sd.emissive) {
        let weight = match (sampler, shared.mis) {
            (Some(sampler), Some(mis)) => {
                let light_pdf = sampler.eval_pdf(payload.origin, payload.normal, hit) * shared.selection.emissive;
                mis.weight(payload.pdf, light_pdf)
            }
            _ => 1.0,
        };
        payload.radiance = payload.throughput * sd.emissive * weight;
    }

    if compute_indirect && payload.path_length < shared.max_bounces() {
        let origin = sd.new_ray_origin();
        generate_shadow_ray(shared, sd, origin, payload);
        generate_scatter_ray(shared, sd, origin, payload);
        payload.path_length += 1;
    }
}

/// Next-event estimation at `sd`, deferred: the shadow ray is described in
/// `payload.shadow` and traced by the caller.
///
/// The contribution carries the current throughput, so this must run
/// before [`generate_scatter_ray`] updates it.
pub fn generate_shadow_ray(shared: &PathTracerSharedData, sd: &ShadingData, origin: Vec3, payload: &mut ScatterRayPayload) {
    let ls = sample_scene_lights(shared, sd, origin, &mut payload.sg);
    payload.shadow = ls.is_valid().then(|| ShadowRayRequest {
        direction: ls.dir,
        distance: ls.distance,
        contribution: sd.eval_brdf_cosine(ls.dir) * ls.li * payload.throughput,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::SampleGenerator;
    use crate::scene::{Scene, DEFAULT_INSTANCE_MASK};
    use crate::tracer::dispatch::{RayDesc, RayFlags};
    use crate::tracer::testing;
    use crate::tracer::PathTracerParams;
    use std::f32::consts::FRAC_1_PI;

    /// Hit of a ray from `origin` along `dir`, with its shading data.
    fn shoot(scene: &Scene, origin: Vec3, dir: Vec3) -> (TriangleHit, ShadingData) {
        let ray = RayDesc::new(origin, dir, f32::MAX);
        let hit = scene.intersect(&ray, RayFlags::NONE, DEFAULT_INSTANCE_MASK).unwrap();
        let sd = scene.shading_data(&hit, &ray);
        (hit, sd)
    }

    fn arriving(origin: Vec3, pdf: f32, path_length: u32) -> ScatterRayPayload {
        let mut p = ScatterRayPayload::new(SampleGenerator::new(9, 0, 0, 0));
        p.origin = origin;
        p.normal = Vec3::Y;
        p.pdf = pdf;
        p.path_length = path_length;
        p.throughput = Vec3::new(0.5, 0.5, 0.25);
        p
    }

    #[test]
    fn test_bounce_bound_issues_no_rays() {
        let scene = testing::point_lit_floor(Vec3::new(0.0, 2.0, 0.0), 1.0);
        let params = PathTracerParams {
            max_bounces: 2,
            ..Default::default()
        };
        let shared = testing::shared(&scene, None, params);
        let (hit, sd) = shoot(&scene, Vec3::new(0.0, 1.0, 0.0), -Vec3::Y);
        let mut p = arriving(Vec3::new(0.0, 1.0, 0.0), 0.3, 2);
        let before = p.clone();
        handle_hit(&shared, &sd, &hit, true, &mut p);
        assert_eq!(p.path_length, 2);
        assert!(p.shadow.is_none());
        assert!(!p.terminated);
        assert_eq!(p.sg, before.sg);
        assert_eq!(p.origin, before.origin);
        assert_eq!(p.throughput, before.throughput);
    }

    #[test]
    fn test_indirect_disabled_issues_no_rays() {
        let scene = testing::point_lit_floor(Vec3::new(0.0, 2.0, 0.0), 1.0);
        let shared = testing::shared(&scene, None, PathTracerParams::default());
        let (hit, sd) = shoot(&scene, Vec3::new(0.0, 1.0, 0.0), -Vec3::Y);
        let mut p = arriving(Vec3::new(0.0, 1.0, 0.0), 0.3, 0);
        handle_hit(&shared, &sd, &hit, false, &mut p);
        assert_eq!(p.path_length, 0);
        assert!(p.shadow.is_none());
        assert!(!p.terminated);
    }

    #[test]
    fn test_shadow_request_uses_throughput_before_scatter() {
        let scene = testing::point_lit_floor(Vec3::new(0.0, 2.0, 0.0), 4.0);
        let shared = testing::shared(&scene, None, PathTracerParams::default());
        let (hit, sd) = shoot(&scene, Vec3::new(0.0, 1.0, 0.0), -Vec3::Y);
        let mut p = arriving(Vec3::new(0.0, 1.0, 0.0), 0.3, 0);
        p.radiance = Vec3::ONE;
        handle_hit(&shared, &sd, &hit, true, &mut p);

        assert_eq!(p.path_length, 1);
        assert_eq!(p.radiance, Vec3::ZERO);
        let req = p.shadow.unwrap();
        assert!((req.direction - Vec3::Y).length() < 1e-4);
        assert!((req.distance - 2.0).abs() < 1e-3);
        // 0.5 / pi * (4 / 2^2) * old throughput
        let expected = Vec3::new(0.5, 0.5, 0.25) * (0.5 * FRAC_1_PI);
        assert!((req.contribution - expected).abs().max_element() < 1e-3, "{}", req.contribution);
        // Scatter update: Lambert weight is the albedo
        if !p.terminated {
            assert!((p.throughput - Vec3::new(0.25, 0.25, 0.125)).abs().max_element() < 1e-4);
        }
    }

    #[test]
    fn test_emission_full_weight_without_sampler() {
        let scene = testing::emissive_panel_over_floor(2.0, 5.0);
        let params = PathTracerParams {
            use_emissive_sampler: false,
            ..Default::default()
        };
        let shared = testing::shared(&scene, None, params);
        let (hit, sd) = shoot(&scene, Vec3::new(0.0, 1.0, 0.0), Vec3::Y);
        assert!(any_positive(sd.emissive));
        let mut p = arriving(Vec3::new(0.0, 1.0, 0.0), 0.3, 0);
        handle_hit(&shared, &sd, &hit, true, &mut p);
        assert_eq!(p.radiance, Vec3::new(0.5, 0.5, 0.25) * sd.emissive);
    }

    #[test]
    fn test_emission_mis_weighted_with_sampler() {
        let scene = testing::emissive_panel_over_floor(2.0, 5.0);
        let shared = testing::shared(&scene, None, PathTracerParams::default());
        let origin = Vec3::new(0.0, 1.0, 0.0);
        let (hit, sd) = shoot(&scene, origin, Vec3::Y);
        let mut p = arriving(origin, 0.3, 0);
        handle_hit(&shared, &sd, &hit, true, &mut p);

        let sampler = shared.emissive_sampler().unwrap();
        let light_pdf = sampler.eval_pdf(origin, Vec3::Y, &hit) * shared.selection.emissive;
        assert!(light_pdf > 0.0);
        let w = shared.mis.unwrap().weight(0.3, light_pdf);
        assert!(w > 0.0 && w < 1.0);
        let expected = Vec3::new(0.5, 0.5, 0.25) * sd.emissive * w;
        assert!((p.radiance - expected).abs().max_element() < 1e-5);
    }

    #[test]
    fn test_emission_skipped_when_sampler_without_mis() {
        let scene = testing::emissive_panel_over_floor(2.0, 5.0);
        let params = PathTracerParams {
            use_mis: false,
            ..Default::default()
        };
        let shared = testing::shared(&scene, None, params);
        let (hit, sd) = shoot(&scene, Vec3::new(0.0, 1.0, 0.0), Vec3::Y);
        let mut p = arriving(Vec3::new(0.0, 1.0, 0.0), 0.0, 0);
        handle_hit(&shared, &sd, &hit, true, &mut p);
        assert_eq!(p.radiance, Vec3::ZERO);
    }

    #[test]
    fn test_emissive_lights_disabled() {
        let scene = testing::emissive_panel_over_floor(2.0, 5.0);
        let params = PathTracerParams {
            use_emissive_lights: false,
            ..Default::default()
        };
        let shared = testing::shared(&scene, None, params);
        let (hit, sd) = shoot(&scene, Vec3::new(0.0, 1.0, 0.0), Vec3::Y);
        let mut p = arriving(Vec3::new(0.0, 1.0, 0.0), 0.3, 0);
        handle_hit(&shared, &sd, &hit, true, &mut p);
        assert_eq!(p.radiance, Vec3::ZERO);
    }
}
