//! Random sequences and sampling-strategy weights.
//!
//! - [`SampleGenerator`] - per-path random state small enough to travel in
//!   the scatter-ray payload
//! - [`MisHeuristic`] - multiple importance sampling weights shared by the
//!   next-event and BRDF-hit sites

mod mis;
mod sample_generator;

pub use mis::MisHeuristic;
pub use sample_generator::SampleGenerator;

pub use standard_surface::warp::{sample_cosine_hemisphere_concentric, sample_triangle_uniform, Frame};
