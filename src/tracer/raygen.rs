//! Raygen driver: the per-path loop and frame rendering.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;

use super::direct::evaluate_direct_illumination;
use super::dispatch::{RayDesc, RayFlags};
use super::params::{PathTracerParams, PathTracerSharedData};
use super::payload::ScatterRayPayload;
use super::scatter::{generate_scatter_ray, trace_scatter_ray};
use super::shadow::trace_shadow_request;
use super::stats::{RayCounters, RayCounts};
use super::TraceContext;
use crate::sampling::SampleGenerator;
use crate::scene::{Camera, EnvProbe, Scene, DEFAULT_INSTANCE_MASK};
use crate::util::{sanitize, Error, Result, Vec3};

/// Radiance arriving along `primary`.
///
/// The primary vertex gets its own emission, one-shot direct lighting and
/// the first scatter ray. Each following segment adds the emission it
/// found and, when its hit produced a new vertex, that vertex's deferred
/// shadow ray. The loop ends on termination or when a hit stops extending
/// the path.
pub fn trace_path(ctx: &TraceContext<'_>, primary: &RayDesc, sg: SampleGenerator) -> Vec3 {
    let shared = ctx.shared;
    ctx.counters.count_primary();
    let Some(hit) = ctx.scene.intersect(primary, RayFlags::NONE, DEFAULT_INSTANCE_MASK) else {
        return shared.env_probe().map_or(Vec3::ZERO, |env| sanitize(env.eval(primary.direction)));
    };

    let sd = ctx.scene.shading_data(&hit, primary);
    let mut sg = sg;
    let mut color = Vec3::ZERO;
    if shared.params.use_emissive_lights {
        color += sd.emissive;
    }

    let origin = sd.new_ray_origin();
    if shared.params.compute_direct {
        color += sanitize(evaluate_direct_illumination(ctx, &sd, origin, &mut sg));
    }

    let mut payload = ScatterRayPayload::new(sg);
    generate_scatter_ray(shared, &sd, origin, &mut payload);

    while !payload.terminated {
        let path_length = payload.path_length;
        trace_scatter_ray(ctx, &mut payload);
        color += sanitize(payload.radiance);
        if payload.path_length == path_length {
            break;
        }
        color += sanitize(trace_shadow_request(ctx, payload.origin, payload.shadow.as_ref()));
    }
    color
}

/// Linear HDR image with the ray counts that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row-major, top row first.
    pub pixels: Vec<Vec3>,
    pub counts: RayCounts,
}

impl Frame {
    /// Pixel at `(x, y)`, `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Vec3> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize).copied()
    }

    /// Average of all pixels.
    pub fn mean(&self) -> Vec3 {
        if self.pixels.is_empty() {
            return Vec3::ZERO;
        }
        self.pixels.iter().copied().sum::<Vec3>() / self.pixels.len() as f32
    }

    /// Write as OpenEXR or Radiance HDR, picked by extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if !matches!(ext.as_deref(), Some("exr") | Some("hdr")) {
            return Err(Error::config(format!(
                "unsupported output format '{}', expected .exr or .hdr",
                path.display()
            )));
        }
        let data: Vec<f32> = self.pixels.iter().flat_map(|p| p.to_array()).collect();
        let image = image::Rgb32FImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| Error::config("frame buffer does not match its size"))?;
        image.save(path)?;
        tracing::debug!(path = %path.display(), "frame saved");
        Ok(())
    }
}

/// Scene plus shared tracing data, ready to render frames.
#[derive(Debug)]
pub struct Renderer {
    scene: Scene,
    shared: PathTracerSharedData,
}

impl Renderer {
    pub fn new(scene: Scene, env_probe: Option<EnvProbe>, params: PathTracerParams) -> Result<Self> {
        let shared = PathTracerSharedData::new(params, &scene, env_probe)?;
        Ok(Self { scene, shared })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn shared(&self) -> &PathTracerSharedData {
        &self.shared
    }

    pub fn params(&self) -> &PathTracerParams {
        &self.shared.params
    }

    /// Render one frame, averaging `samples_per_pixel` paths per pixel.
    ///
    /// Rows are traced in parallel; every row keeps its own counters and
    /// the frame sums them.
    #[tracing::instrument(skip_all, fields(width = width, height = height, frame = frame_index))]
    pub fn render(&self, camera: &Camera, width: u32, height: u32, frame_index: u32) -> Frame {
        let start = Instant::now();
        let mut pixels = vec![Vec3::ZERO; width as usize * height as usize];
        if pixels.is_empty() {
            return Frame {
                width,
                height,
                pixels,
                counts: RayCounts::default(),
            };
        }

        let spp = self.shared.params.samples_per_pixel.max(1);
        let seed = self.shared.params.seed;
        let counts: RayCounts = pixels
            .par_chunks_mut(width as usize)
            .enumerate()
            .map(|(y, row)| {
                let counters = RayCounters::new();
                let ctx = TraceContext::new(&self.scene, &self.shared, &counters);
                let y = y as u32;
                for (x, px) in row.iter_mut().enumerate() {
                    let x = x as u32;
                    let pixel_index = y * width + x;
                    let mut sum = Vec3::ZERO;
                    for s in 0..spp {
                        let mut sg = SampleGenerator::new(pixel_index, s, frame_index, seed);
                        let jitter = sg.next_2d();
                        let ray = camera.generate_ray((x, y), (width, height), jitter);
                        sum += trace_path(&ctx, &ray, sg);
                    }
                    *px = sum / spp as f32;
                }
                counters.snapshot()
            })
            .sum();

        let elapsed = start.elapsed();
        tracing::info!(
            primary = counts.primary,
            scatter = counts.scatter,
            shadow = counts.shadow,
            dummy = counts.dummy,
            total = counts.total(),
            ms = elapsed.as_secs_f64() * 1000.0,
            "frame {frame_index} rendered"
        );

        Frame {
            width,
            height,
            pixels,
            counts,
        }
    }
}
