//! One-shot direct illumination.
//!
//! Unlike the deferred next-event request of [`super::hit`], the shadow
//! ray is traced on the spot. The raygen driver uses this at the primary
//! vertex.

use super::light_sampling::sample_scene_lights;
use super::shadow::trace_shadow_ray;
use super::TraceContext;
use crate::sampling::SampleGenerator;
use crate::scene::ShadingData;
use crate::util::Vec3;

/// Radiance reflected at `sd` toward the viewer from one light sample.
pub fn evaluate_direct_illumination(
    ctx: &TraceContext<'_>,
    sd: &ShadingData,
    origin: Vec3,
    sg: &mut SampleGenerator,
) -> Vec3 {
    let ls = sample_scene_lights(ctx.shared, sd, origin, sg);
    if !trace_shadow_ray(ctx, origin, ls.dir, ls.distance, ls.is_valid()) {
        return Vec3::ZERO;
    }
    sd.eval_brdf_cosine(ls.dir) * ls.li
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::testing;
    use crate::tracer::{PathTracerParams, RayCounters};
    use std::f32::consts::FRAC_1_PI;

    fn direct_only() -> PathTracerParams {
        PathTracerParams {
            use_mis: false,
            max_bounces: 0,
            ..Default::default()
        }
    }

    /// Light 2 units away at 30 degrees from the normal; intensity 4 gives L = 1.
    fn light() -> Vec3 {
        Vec3::new(1.0, 3f32.sqrt(), 0.0)
    }

    #[test]
    fn test_point_light_unoccluded() {
        let scene = testing::point_lit_floor(light(), 4.0);
        let shared = testing::shared(&scene, None, direct_only());
        let counters = RayCounters::new();
        let ctx = TraceContext::new(&scene, &shared, &counters);
        let sd = testing::gray_floor_point();
        let mut sg = SampleGenerator::new(0, 0, 0, 0);

        let l = evaluate_direct_illumination(&ctx, &sd, sd.new_ray_origin(), &mut sg);
        let expected = 0.5 * FRAC_1_PI * 1.0 * (3f32.sqrt() / 2.0);
        assert!((l.x - expected).abs() < 1e-3 * expected, "{l} vs {expected}");
        assert_eq!(l.x, l.y);
        assert_eq!(counters.snapshot().shadow, 1);
    }

    #[test]
    fn test_point_light_occluded() {
        let scene = testing::occluded_point_lit_floor(light(), 4.0);
        let shared = testing::shared(&scene, None, direct_only());
        let counters = RayCounters::new();
        let ctx = TraceContext::new(&scene, &shared, &counters);
        let sd = testing::gray_floor_point();
        let mut sg = SampleGenerator::new(0, 0, 0, 0);

        let l = evaluate_direct_illumination(&ctx, &sd, sd.new_ray_origin(), &mut sg);
        assert_eq!(l, Vec3::ZERO);
        assert_eq!(counters.snapshot().shadow, 1);
    }

    #[test]
    fn test_invalid_sample_traces_nothing() {
        let scene = testing::point_lit_floor(Vec3::new(0.0, -1.0, 0.0), 4.0);
        for dummy in [false, true] {
            let params = PathTracerParams {
                dummy_shadow_rays: dummy,
                ..direct_only()
            };
            let shared = testing::shared(&scene, None, params);
            let counters = RayCounters::new();
            let ctx = TraceContext::new(&scene, &shared, &counters);
            let sd = testing::gray_floor_point();
            let mut sg = SampleGenerator::new(0, 0, 0, 0);
            let l = evaluate_direct_illumination(&ctx, &sd, sd.new_ray_origin(), &mut sg);
            assert_eq!(l, Vec3::ZERO);
            let counts = counters.snapshot();
            assert_eq!(counts.shadow, 0);
            assert_eq!(counts.dummy, u64::from(dummy));
        }
    }

    #[test]
    fn test_emissive_panel_estimate() {
        // Irradiance from a unit-radiance square of side 1 at height 2, by midpoint quadrature
        let scene = testing::emissive_panel_over_floor(2.0, 1.0);
        let shared = testing::shared(&scene, None, direct_only());
        let counters = RayCounters::new();
        let ctx = TraceContext::new(&scene, &shared, &counters);
        let sd = testing::gray_floor_point();
        let origin = sd.new_ray_origin();

        let steps = 200;
        let h = 2.0 - origin.y;
        let mut irradiance = 0.0f64;
        for i in 0..steps {
            for j in 0..steps {
                let x = -0.5 + (i as f32 + 0.5) / steps as f32;
                let z = -0.5 + (j as f32 + 0.5) / steps as f32;
                let d2 = x * x + z * z + h * h;
                irradiance += (h * h / (d2 * d2)) as f64 / (steps * steps) as f64;
            }
        }
        let expected = 0.5 / std::f64::consts::PI * irradiance;

        let n = 20_000;
        let mut sg = SampleGenerator::new(11, 0, 0, 0);
        let sum: f64 = (0..n)
            .map(|_| evaluate_direct_illumination(&ctx, &sd, origin, &mut sg).x as f64)
            .sum();
        let mean = sum / n as f64;
        assert!((mean - expected).abs() < 0.02 * expected, "{mean} vs {expected}");
    }
}
