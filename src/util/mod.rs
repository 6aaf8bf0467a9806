//! Utility types and functions shared by the tracer and the scene.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam plus radiance helpers

mod error;
mod math;

pub use error::*;
pub use math::*;
