//! # Megakernel
//!
//! CPU model of a megakernel GPU path tracer: BRDF importance sampling and
//! next-event estimation combined with multiple importance sampling, fixed
//! bounce depth, and a scatter-ray payload that is packed into a fixed-size
//! record at every ray dispatch the way a hardware ray-tracing pipeline
//! hands it between raygen, hit and miss stages.
//!
//! ## Modules
//!
//! - [`util`] - Errors, math re-exports and radiance helpers
//! - [`sampling`] - Per-path sample generator and MIS heuristics
//! - [`scene`] - Triangle scene, BVH, lights, environment probe, camera, JSON description
//! - [`tracer`] - Payload codec, ray dispatch, hit/miss handling and the raygen loop
//!
//! ## Example
//!
//! ```ignore
//! use megakernel::prelude::*;
//!
//! let desc = SceneDesc::cornell_box();
//! let (scene, env) = desc.build()?;
//! let renderer = Renderer::new(scene, env, PathTracerParams::default())?;
//! let frame = renderer.render(&desc.camera, 256, 256, 0);
//! frame.save("cornell.exr")?;
//! ```

pub mod sampling;
pub mod scene;
pub mod tracer;
pub mod util;

// Re-export commonly used types
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::sampling::{MisHeuristic, SampleGenerator};
    pub use crate::scene::{Camera, EnvProbe, Scene, SceneBuilder, SceneDesc};
    pub use crate::tracer::{Frame, PathTracerParams, RayCounts, Renderer};
    pub use crate::util::{Error, Result, Vec3};
}
