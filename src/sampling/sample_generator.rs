//! Tiny per-path uniform sample generator.
//!
//! The whole state is one `u32` so it can be packed into the scatter-ray
//! wire record and resumed on the other side of a dispatch. Each draw
//! advances the state through the PCG output permutation.

use rand_core::{impls, RngCore};

use crate::util::{Vec2, Vec3};

/// Integer finalizer used to decorrelate seeds.
#[inline]
fn hash_u32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

/// PCG-RXS-M-XS permutation of a 32-bit LCG step.
#[inline]
fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// Per-path random state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleGenerator {
    state: u32,
}

impl SampleGenerator {
    /// Seed for one pixel sample of one frame.
    pub fn new(pixel: u32, sample_index: u32, frame: u32, seed: u32) -> Self {
        let h = hash_u32(pixel.wrapping_mul(73_856_093) ^ hash_u32(sample_index ^ 0x9e37_79b9));
        let h = hash_u32(h ^ frame.wrapping_mul(19_349_663) ^ seed.wrapping_mul(83_492_791));
        Self { state: h }
    }

    /// Restore a generator from its packed state.
    #[inline]
    pub const fn from_state(state: u32) -> Self {
        Self { state }
    }

    /// Packed state for the payload wire format.
    #[inline]
    pub const fn state(&self) -> u32 {
        self.state
    }

    /// Uniform float in [0, 1) with 24 bits of precision.
    #[inline]
    pub fn next_1d(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 * (1.0 / 16_777_216.0)
    }

    #[inline]
    pub fn next_2d(&mut self) -> Vec2 {
        let x = self.next_1d();
        Vec2::new(x, self.next_1d())
    }

    #[inline]
    pub fn next_3d(&mut self) -> Vec3 {
        let x = self.next_1d();
        let y = self.next_1d();
        Vec3::new(x, y, self.next_1d())
    }
}

impl RngCore for SampleGenerator {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.state = pcg_hash(self.state);
        self.state
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
