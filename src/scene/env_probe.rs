//! Equirectangular environment probe with importance sampling.
//!
//! Texel lookups are nearest-neighbour. Sampling is piecewise constant over
//! texels: a row is drawn from the marginal CDF, a column from that row's
//! conditional CDF, and the remainder of each uniform number places the
//! direction inside the texel. Both CDFs carry the `sin(theta)` solid-angle
//! weight of the latitude-longitude layout.

use std::f32::consts::PI;
use std::path::Path;

use crate::util::{luminance, Error, Result, Vec2, Vec3};

/// Environment light at infinity.
#[derive(Debug, Clone)]
pub struct EnvProbe {
    width: u32,
    height: u32,
    texels: Vec<Vec3>,
    /// Per-row normalized CDFs, `width * height` entries.
    conditional_cdf: Vec<f32>,
    /// Normalized CDF over rows, `height` entries.
    marginal_cdf: Vec<f32>,
    /// Sum of `sin(theta)` weighted texel luminance.
    total: f32,
}

/// One importance-sampled direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvSample {
    pub dir: Vec3,
    pub le: Vec3,
    /// Solid-angle pdf.
    pub pdf: f32,
}

/// Equirect uv of a unit direction (`+Y` is up).
pub fn dir_to_equirect_uv(dir: Vec3) -> Vec2 {
    let phi = dir.z.atan2(dir.x);
    let theta = dir.y.clamp(-1.0, 1.0).acos();
    Vec2::new((phi + PI) / (2.0 * PI), theta / PI)
}

/// Inverse of [`dir_to_equirect_uv`].
pub fn equirect_uv_to_dir(uv: Vec2) -> Vec3 {
    let phi = uv.x * 2.0 * PI - PI;
    let theta = uv.y * PI;
    let (sin_t, cos_t) = theta.sin_cos();
    let (sin_p, cos_p) = phi.sin_cos();
    Vec3::new(sin_t * cos_p, cos_t, sin_t * sin_p)
}

/// Build importance sampling CDFs from texel luminance.
///
/// Returns `(conditional_cdf, marginal_cdf, total)`.
fn build_env_cdfs(width: u32, height: u32, luminance: &[f32]) -> (Vec<f32>, Vec<f32>, f32) {
    let w = width as usize;
    let h = height as usize;

    let mut conditional_cdf = vec![0.0f32; w * h];
    let mut row_integrals = vec![0.0f32; h];

    for y in 0..h {
        let sin_theta = (PI * (y as f32 + 0.5) / h as f32).sin();
        let row = &mut conditional_cdf[y * w..(y + 1) * w];
        let mut row_sum = 0.0f32;
        for (x, c) in row.iter_mut().enumerate() {
            row_sum += luminance[y * w + x].max(0.0) * sin_theta;
            *c = row_sum;
        }
        if row_sum > 0.0 {
            row.iter_mut().for_each(|c| *c /= row_sum);
        }
        row_integrals[y] = row_sum;
    }

    let mut marginal_cdf = vec![0.0f32; h];
    let mut total = 0.0f32;
    for (c, r) in marginal_cdf.iter_mut().zip(&row_integrals) {
        total += r;
        *c = total;
    }
    if total > 0.0 {
        marginal_cdf.iter_mut().for_each(|c| *c /= total);
    }

    (conditional_cdf, marginal_cdf, total)
}

/// Pick the bin containing `u` and return `(index, position of u inside the bin)`.
fn sample_cdf(cdf: &[f32], u: f32) -> (usize, f32) {
    let i = cdf.partition_point(|&c| c <= u).min(cdf.len() - 1);
    let lo = if i == 0 { 0.0 } else { cdf[i - 1] };
    let width = cdf[i] - lo;
    let frac = if width > 0.0 { ((u - lo) / width).clamp(0.0, 0.999_999) } else { 0.5 };
    (i, frac)
}

impl EnvProbe {
    /// Probe from linear RGB texels in row-major order, top row first.
    pub fn from_texels(width: u32, height: u32, texels: Vec<Vec3>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::EnvironmentMap(format!("empty environment map {width}x{height}")));
        }
        if texels.len() != (width * height) as usize {
            return Err(Error::EnvironmentMap(format!(
                "expected {} texels for {width}x{height}, got {}",
                width * height,
                texels.len()
            )));
        }
        if texels.iter().any(|t| !t.is_finite()) {
            return Err(Error::EnvironmentMap("non-finite texel".into()));
        }
        if texels.iter().any(|t| t.min_element() < 0.0) {
            return Err(Error::EnvironmentMap("negative texel".into()));
        }
        let lum: Vec<f32> = texels.iter().map(|&t| luminance(t)).collect();
        let (conditional_cdf, marginal_cdf, total) = build_env_cdfs(width, height, &lum);
        if !total.is_finite() {
            return Err(Error::EnvironmentMap("total radiance overflows f32".into()));
        }
        tracing::debug!(width, height, total, "environment probe built");
        Ok(Self {
            width,
            height,
            texels,
            conditional_cdf,
            marginal_cdf,
            total,
        })
    }

    /// Uniform radiance from every direction.
    pub fn constant(color: Vec3) -> Self {
        let color = color.max(Vec3::ZERO);
        let lum = [luminance(color)];
        let (conditional_cdf, marginal_cdf, total) = build_env_cdfs(1, 1, &lum);
        Self {
            width: 1,
            height: 1,
            texels: vec![color],
            conditional_cdf,
            marginal_cdf,
            total,
        }
    }

    /// Load an HDR or EXR latitude-longitude map, scaled by `intensity`.
    pub fn from_file(path: impl AsRef<Path>, intensity: f32) -> Result<Self> {
        use image::ImageReader;

        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        let rgb = img.to_rgb32f();
        let (width, height) = rgb.dimensions();
        let texels: Vec<Vec3> = rgb
            .as_raw()
            .chunks_exact(3)
            .map(|px| Vec3::new(px[0], px[1], px[2]) * intensity)
            .collect();
        tracing::info!(path = %path.display(), width, height, "loaded environment map");
        Self::from_texels(width, height, texels)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// True when the probe can never contribute.
    pub fn is_black(&self) -> bool {
        self.total <= 0.0
    }

    fn texel_coords(&self, dir: Vec3) -> (usize, usize) {
        let uv = dir_to_equirect_uv(dir);
        let x = ((uv.x * self.width as f32) as usize).min(self.width as usize - 1);
        let y = ((uv.y * self.height as f32) as usize).min(self.height as usize - 1);
        (x, y)
    }

    /// Radiance arriving from `dir` (unit vector pointing away from the scene).
    pub fn eval(&self, dir: Vec3) -> Vec3 {
        let (x, y) = self.texel_coords(dir);
        self.texels[y * self.width as usize + x]
    }

    /// Probability of the discrete texel `(x, y)`.
    fn texel_probability(&self, x: usize, y: usize) -> f32 {
        let w = self.width as usize;
        let row_lo = if y == 0 { 0.0 } else { self.marginal_cdf[y - 1] };
        let col_lo = if x == 0 { 0.0 } else { self.conditional_cdf[y * w + x - 1] };
        (self.marginal_cdf[y] - row_lo) * (self.conditional_cdf[y * w + x] - col_lo)
    }

    /// Solid-angle pdf of [`EnvProbe::sample`] returning `dir`.
    pub fn eval_pdf(&self, dir: Vec3) -> f32 {
        if self.total <= 0.0 {
            return 0.0;
        }
        let sin_theta = (1.0 - dir.y * dir.y).max(0.0).sqrt();
        if sin_theta <= 0.0 {
            return 0.0;
        }
        let (x, y) = self.texel_coords(dir);
        let p_uv = self.texel_probability(x, y) * (self.width * self.height) as f32;
        p_uv / (2.0 * PI * PI * sin_theta)
    }

    /// Importance sample a direction from two uniform numbers.
    pub fn sample(&self, u: Vec2) -> Option<EnvSample> {
        if self.total <= 0.0 {
            return None;
        }
        let w = self.width as usize;
        let (y, fy) = sample_cdf(&self.marginal_cdf, u.y);
        let (x, fx) = sample_cdf(&self.conditional_cdf[y * w..(y + 1) * w], u.x);
        let uv = Vec2::new(
            (x as f32 + fx) / self.width as f32,
            (y as f32 + fy) / self.height as f32,
        );
        let dir = equirect_uv_to_dir(uv);
        let pdf = self.eval_pdf(dir);
        (pdf > 0.0).then(|| EnvSample {
            dir,
            le: self.eval(dir),
            pdf,
        })
    }
}
