//! Scatter-ray generation and dispatch.

use std::f32::consts::{FRAC_1_PI, PI};

use standard_surface::MIN_COS_THETA;

use super::codec::PackedScatterPayload;
use super::dispatch::{trace_ray, RayDesc, RayFlags, RayProgram};
use super::hit::handle_hit;
use super::miss::handle_miss;
use super::params::{PathTracerSharedData, ScatterStrategy};
use super::payload::ScatterRayPayload;
use super::TraceContext;
use crate::sampling::{sample_cosine_hemisphere_concentric, Frame, SampleGenerator};
use crate::scene::{Scene, ShadingData, TriangleHit, DEFAULT_INSTANCE_MASK};
use crate::util::{has_nan, is_black, sanitize, sanitize_pdf, Vec3, RAY_T_MAX};

/// Sample the next path direction at `sd` and fold its weight into the throughput.
///
/// The pdf and shading normal are stored only when MIS is enabled; the hit
/// and miss handlers read them for nothing else. A zero throughput marks
/// the payload terminated.
pub fn generate_scatter_ray(
    shared: &PathTracerSharedData,
    sd: &ShadingData,
    origin: Vec3,
    payload: &mut ScatterRayPayload,
) {
    let (dir, weight, pdf) = match shared.scatter {
        ScatterStrategy::BrdfSampling => {
            let s = sd.sample_brdf(&mut payload.sg);
            (s.dir, s.weight, s.pdf)
        }
        ScatterStrategy::CosineHemisphere => sample_cosine(sd, &mut payload.sg),
    };

    let mut throughput = payload.throughput * weight;
    let mut pdf = pdf;
    debug_assert!(!has_nan(throughput), "NaN throughput after scatter: {throughput}");
    debug_assert!(!pdf.is_nan(), "NaN scatter pdf");
    if has_nan(throughput) || pdf.is_nan() {
        tracing::warn!(%throughput, pdf, "NaN in scatter sample, clamped");
        throughput = sanitize(throughput);
        pdf = sanitize_pdf(pdf);
    }

    payload.origin = origin;
    payload.direction = dir;
    payload.throughput = throughput;
    if shared.mis.is_some() {
        payload.pdf = pdf;
        payload.normal = sd.n;
    } else {
        payload.pdf = 0.0;
    }
    if is_black(throughput) {
        payload.terminated = true;
    }
}

/// Cosine-weighted direction about the shading normal: `(dir, weight, pdf)`.
fn sample_cosine(sd: &ShadingData, sg: &mut SampleGenerator) -> (Vec3, Vec3, f32) {
    let (local, pdf) = sample_cosine_hemisphere_concentric(sg.next_2d());
    let dir = Frame::from_normal(sd.n).to_world(local);
    if sd.n_dot_v.min(local.z) < MIN_COS_THETA {
        return (dir, Vec3::ZERO, 0.0);
    }
    // f * cos / (cos / pi)
    (dir, sd.eval_brdf(dir) * PI, pdf)
}

/// Solid-angle pdf with which [`generate_scatter_ray`] picks `dir` at `sd`.
pub fn scatter_pdf(shared: &PathTracerSharedData, sd: &ShadingData, dir: Vec3) -> f32 {
    match shared.scatter {
        ScatterStrategy::BrdfSampling => sd.eval_brdf_pdf(dir),
        ScatterStrategy::CosineHemisphere => {
            let cos = sd.n.dot(dir);
            if sd.n_dot_v.min(cos) < MIN_COS_THETA {
                0.0
            } else {
                cos * FRAC_1_PI
            }
        }
    }
}

/// Hit group and miss program of scatter rays. Both work on the wire record.
struct ScatterProgram<'a> {
    shared: &'a PathTracerSharedData,
}

impl RayProgram for ScatterProgram<'_> {
    type Payload = PackedScatterPayload;

    fn closest_hit(&self, scene: &Scene, ray: &RayDesc, hit: &TriangleHit, packed: &mut PackedScatterPayload) {
        let mut payload = packed.unpack();
        let sd = scene.shading_data(hit, ray);
        handle_hit(self.shared, &sd, hit, self.shared.params.compute_indirect, &mut payload);
        *packed = PackedScatterPayload::pack(&payload);
    }

    fn miss(&self, _: &Scene, ray: &RayDesc, packed: &mut PackedScatterPayload) {
        let mut payload = packed.unpack();
        handle_miss(self.shared, ray.direction, &mut payload);
        *packed = PackedScatterPayload::pack(&payload);
    }
}

/// Trace one path segment from `payload.origin` along `payload.direction`.
///
/// The payload crosses the dispatch as a [`PackedScatterPayload`] and is
/// replaced by what the hit or miss program wrote back.
pub fn trace_scatter_ray(ctx: &TraceContext<'_>, payload: &mut ScatterRayPayload) {
    let ray = RayDesc::new(payload.origin, payload.direction, RAY_T_MAX);
    let program = ScatterProgram { shared: ctx.shared };
    let mut packed = PackedScatterPayload::pack(payload);
    trace_ray(ctx.scene, &program, &ray, RayFlags::NONE, DEFAULT_INSTANCE_MASK, &mut packed);
    *payload = packed.unpack();
    ctx.counters.count_scatter();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::EnvProbe;
    use crate::tracer::testing;
    use crate::tracer::{PathTracerParams, RayCounters};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use standard_surface::{StandardSurfaceParams, SurfaceBrdf};

    fn cosine_params(use_mis: bool) -> PathTracerParams {
        PathTracerParams {
            use_brdf_sampling: false,
            use_mis,
            ..Default::default()
        }
    }

    fn random_unit(rng: &mut SmallRng) -> Vec3 {
        loop {
            let v = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            let len = v.length();
            if len > 0.1 && len <= 1.0 {
                return v / len;
            }
        }
    }

    #[test]
    fn test_cosine_pdf_and_weight() {
        let scene = testing::empty();
        let shared = testing::shared(&scene, None, cosine_params(true));
        let sd = testing::gray_floor_point();
        for i in 0..256 {
            let mut p = ScatterRayPayload::new(SampleGenerator::new(i, 0, 0, 0));
            generate_scatter_ray(&shared, &sd, Vec3::ZERO, &mut p);
            if p.terminated {
                continue;
            }
            let cos = p.direction.dot(Vec3::Y);
            assert!((p.direction.length() - 1.0).abs() < 1e-5);
            assert!((p.pdf - cos * FRAC_1_PI).abs() < 1e-5, "pdf {} cos {cos}", p.pdf);
            assert!((p.pdf - scatter_pdf(&shared, &sd, p.direction)).abs() < 1e-5);
            // Lambert 0.5 / pi times pi
            assert!((p.throughput - Vec3::splat(0.5)).abs().max_element() < 1e-5);
            assert_eq!(p.normal, Vec3::Y);
        }
    }

    #[test]
    fn test_cosine_rejects_grazing_view() {
        let scene = testing::empty();
        let shared = testing::shared(&scene, None, cosine_params(true));
        let sd = ShadingData::new(Vec3::ZERO, Vec3::Y, Vec3::X, SurfaceBrdf::lambert(Vec3::splat(0.5)), Vec3::ZERO);
        let mut p = ScatterRayPayload::new(SampleGenerator::new(0, 0, 0, 0));
        generate_scatter_ray(&shared, &sd, Vec3::ZERO, &mut p);
        assert_eq!(p.pdf, 0.0);
        assert_eq!(p.throughput, Vec3::ZERO);
        assert!(p.terminated);
        assert_eq!(scatter_pdf(&shared, &sd, Vec3::Y), 0.0);
    }

    #[test]
    fn test_pdf_and_normal_only_with_mis() {
        let scene = testing::empty();
        let sd = testing::gray_floor_point();
        for params in [cosine_params(false), PathTracerParams { use_mis: false, ..Default::default() }] {
            let shared = testing::shared(&scene, None, params);
            let mut p = ScatterRayPayload::new(SampleGenerator::new(7, 0, 0, 0));
            p.pdf = 3.0;
            p.normal = Vec3::X;
            generate_scatter_ray(&shared, &sd, Vec3::new(0.0, 1e-4, 0.0), &mut p);
            assert_eq!(p.pdf, 0.0);
            assert_eq!(p.normal, Vec3::X);
            assert_eq!(p.origin, Vec3::new(0.0, 1e-4, 0.0));
            assert_eq!(p.path_length, 0);
        }
    }

    #[test]
    fn test_brdf_sampling_stores_material_pdf() {
        let scene = testing::empty();
        let shared = testing::shared(&scene, None, PathTracerParams::default());
        let sd = ShadingData::new(
            Vec3::ZERO,
            Vec3::Y,
            Vec3::new(0.3, 1.0, 0.0),
            SurfaceBrdf::from_params(&StandardSurfaceParams::plastic(Vec3::new(0.8, 0.2, 0.2), 0.3)),
            Vec3::ZERO,
        );
        for i in 0..128 {
            let mut p = ScatterRayPayload::new(SampleGenerator::new(i, 0, 0, 0));
            generate_scatter_ray(&shared, &sd, Vec3::ZERO, &mut p);
            if !p.terminated {
                let expected = sd.eval_brdf_pdf(p.direction);
                assert!((p.pdf - expected).abs() <= 1e-4 * expected.max(1.0));
            }
        }
    }

    #[test]
    fn test_no_nan_under_random_inputs() {
        let scene = testing::empty();
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let shared_brdf = testing::shared(&scene, None, PathTracerParams::default());
        let shared_cos = testing::shared(&scene, None, cosine_params(true));
        for i in 0..4000u32 {
            let color = Vec3::new(rng.gen(), rng.gen(), rng.gen());
            let roughness: f32 = rng.gen();
            let params = match i % 3 {
                0 => StandardSurfaceParams::diffuse(color),
                1 => StandardSurfaceParams::plastic(color, roughness),
                _ => StandardSurfaceParams::metal(color, roughness),
            };
            let sd = ShadingData::new(
                Vec3::new(rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0)),
                random_unit(&mut rng),
                random_unit(&mut rng),
                SurfaceBrdf::from_params(&params),
                Vec3::ZERO,
            );
            let shared = if i % 2 == 0 { &shared_brdf } else { &shared_cos };
            let mut p = ScatterRayPayload::new(SampleGenerator::new(rng.gen(), 0, 0, 0));
            p.throughput = Vec3::new(rng.gen(), rng.gen(), rng.gen()) * 4.0;
            generate_scatter_ray(shared, &sd, sd.new_ray_origin(), &mut p);
            assert!(p.throughput.is_finite(), "{:?}", p.throughput);
            assert!(p.throughput.min_element() >= 0.0);
            assert!(!p.pdf.is_nan() && p.pdf >= 0.0);
            assert_eq!(p.terminated, is_black(p.throughput));
        }
    }

    #[test]
    fn test_zero_throughput_terminates() {
        let scene = testing::empty();
        let shared = testing::shared(&scene, None, PathTracerParams::default());
        let sd = testing::gray_floor_point();
        let mut p = ScatterRayPayload::new(SampleGenerator::new(0, 0, 0, 0));
        p.throughput = Vec3::ZERO;
        generate_scatter_ray(&shared, &sd, Vec3::ZERO, &mut p);
        assert!(p.terminated);

        // Black material: the BRDF has nothing to sample
        let black = ShadingData::new(Vec3::ZERO, Vec3::Y, Vec3::Y, SurfaceBrdf::lambert(Vec3::ZERO), Vec3::ZERO);
        let mut p = ScatterRayPayload::new(SampleGenerator::new(0, 0, 0, 0));
        generate_scatter_ray(&shared, &black, Vec3::ZERO, &mut p);
        assert!(p.terminated);
        assert_eq!(p.throughput, Vec3::ZERO);
    }

    #[test]
    fn test_trace_scatter_ray_miss() {
        let scene = testing::empty();
        let shared = testing::shared(&scene, Some(EnvProbe::constant(Vec3::ONE)), PathTracerParams::default());
        let counters = RayCounters::new();
        let ctx = TraceContext::new(&scene, &shared, &counters);
        let mut p = ScatterRayPayload::new(SampleGenerator::new(0, 0, 0, 0));
        p.direction = Vec3::new(0.6, 0.8, 0.0);
        p.pdf = 1.0;
        trace_scatter_ray(&ctx, &mut p);
        assert!(p.terminated);
        assert!(p.radiance.x > 0.0 && p.radiance.x < 1.0);
        assert_eq!(counters.snapshot().scatter, 1);
    }

    #[test]
    fn test_trace_scatter_ray_hit_extends_path() {
        let scene = testing::point_lit_floor(Vec3::new(0.0, 2.0, 0.0), 1.0);
        let shared = testing::shared(&scene, None, PathTracerParams::default());
        let counters = RayCounters::new();
        let ctx = TraceContext::new(&scene, &shared, &counters);
        let mut p = ScatterRayPayload::new(SampleGenerator::new(0, 0, 0, 0));
        p.origin = Vec3::new(0.0, 1.0, 0.0);
        p.direction = -Vec3::Y;
        trace_scatter_ray(&ctx, &mut p);
        assert_eq!(p.path_length, 1);
        assert!(p.origin.y > 0.0 && p.origin.y < 1e-2);
        assert!(p.shadow.is_some());
        assert_eq!(counters.snapshot().scatter, 1);
        assert_eq!(counters.snapshot().shadow, 0);
    }
}
