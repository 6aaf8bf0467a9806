//! Autodesk Standard Surface material for CPU path tracing
//!
//! Reflective subset of the MaterialX implementation: Lambert base layer,
//! GGX specular layer and emission.
//!
//! ## References
//! - [Autodesk Standard Surface](https://autodesk.github.io/standard-surface/)
//! - [MaterialX](https://github.com/AcademySoftwareFoundation/MaterialX)
//!
//! ## Usage
//!
//! ```ignore
//! use standard_surface::{StandardSurfaceParams, SurfaceBrdf};
//!
//! // Create material
//! let material = StandardSurfaceParams::metal(
//!     Vec3::new(1.0, 0.8, 0.3), // gold color
//!     0.3,                       // roughness
//! );
//!
//! // Digest it for sampling
//! let brdf = SurfaceBrdf::from_params(&material);
//! let s = brdf.sample(n, v, [u0, u1, u2]);
//! ```

mod brdf;
mod params;
pub mod warp;

pub use brdf::{luminance, BrdfSample, Lobe, SurfaceBrdf, MIN_COS_THETA};
pub use params::StandardSurfaceParams;
