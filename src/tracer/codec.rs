//! Fixed-size wire format of [`ScatterRayPayload`].
//!
//! Layout (96 bytes, 16-byte rows):
//!
//! | offset | fields |
//! |---|---|
//! | 0  | origin, flags |
//! | 16 | direction, pdf |
//! | 32 | throughput, octahedral normal (2 x f16) |
//! | 48 | radiance, sample generator state |
//! | 64 | shadow direction, shadow distance |
//! | 80 | shadow contribution, padding |
//!
//! `flags` holds `terminated` in bit 0, the shadow-request bit in bit 1 and
//! the path length in bits 8..32.

use bytemuck::{Pod, Zeroable};
use half::f16;

use super::payload::{ScatterRayPayload, ShadowRayRequest};
use crate::sampling::SampleGenerator;
use crate::util::{Vec2, Vec3};

const FLAG_TERMINATED: u32 = 1 << 0;
const FLAG_SHADOW: u32 = 1 << 1;
const PATH_LENGTH_SHIFT: u32 = 8;
/// Largest path length the flags word can hold.
pub const MAX_PACKED_PATH_LENGTH: u32 = (1 << (32 - PATH_LENGTH_SHIFT)) - 1;

/// Packed scatter-ray payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PackedScatterPayload {
    pub origin: Vec3,
    pub flags: u32,
    pub direction: Vec3,
    pub pdf: f32,
    pub throughput: Vec3,
    pub normal: u32,
    pub radiance: Vec3,
    pub sg_state: u32,
    pub shadow_dir: Vec3,
    pub shadow_distance: f32,
    pub shadow_contribution: Vec3,
    pub _pad: u32,
}

/// Octahedral map of a unit vector to `[-1, 1]^2`.
pub fn oct_encode(n: Vec3) -> Vec2 {
    let sum = n.x.abs() + n.y.abs() + n.z.abs();
    if sum <= 0.0 || !sum.is_finite() {
        return Vec2::ZERO;
    }
    let p = Vec2::new(n.x, n.y) / sum;
    if n.z < 0.0 {
        (Vec2::ONE - Vec2::new(p.y.abs(), p.x.abs())) * sign_not_zero(p)
    } else {
        p
    }
}

/// Inverse of [`oct_encode`].
pub fn oct_decode(f: Vec2) -> Vec3 {
    let mut n = Vec3::new(f.x, f.y, 1.0 - f.x.abs() - f.y.abs());
    let t = (-n.z).max(0.0);
    n.x += if n.x >= 0.0 { -t } else { t };
    n.y += if n.y >= 0.0 { -t } else { t };
    n.normalize()
}

#[inline]
fn sign_not_zero(v: Vec2) -> Vec2 {
    Vec2::new(
        if v.x >= 0.0 { 1.0 } else { -1.0 },
        if v.y >= 0.0 { 1.0 } else { -1.0 },
    )
}

/// Unit normal to two `f16` octahedral coordinates in one word.
fn pack_normal(n: Vec3) -> u32 {
    let e = oct_encode(n);
    let x = f16::from_f32(e.x).to_bits() as u32;
    let y = f16::from_f32(e.y).to_bits() as u32;
    x | (y << 16)
}

fn unpack_normal(bits: u32) -> Vec3 {
    let x = f16::from_bits(bits as u16).to_f32();
    let y = f16::from_bits((bits >> 16) as u16).to_f32();
    oct_decode(Vec2::new(x, y))
}

impl PackedScatterPayload {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Pack for dispatch. The normal is quantized; a zero normal decodes to `+Z`.
    pub fn pack(payload: &ScatterRayPayload) -> Self {
        debug_assert!(payload.path_length <= MAX_PACKED_PATH_LENGTH);
        let mut flags = payload.path_length.min(MAX_PACKED_PATH_LENGTH) << PATH_LENGTH_SHIFT;
        if payload.terminated {
            flags |= FLAG_TERMINATED;
        }
        let shadow = payload.shadow.unwrap_or(ShadowRayRequest {
            direction: Vec3::ZERO,
            distance: 0.0,
            contribution: Vec3::ZERO,
        });
        if payload.shadow.is_some() {
            flags |= FLAG_SHADOW;
        }
        Self {
            origin: payload.origin,
            flags,
            direction: payload.direction,
            pdf: payload.pdf,
            throughput: payload.throughput,
            normal: pack_normal(payload.normal),
            radiance: payload.radiance,
            sg_state: payload.sg.state(),
            shadow_dir: shadow.direction,
            shadow_distance: shadow.distance,
            shadow_contribution: shadow.contribution,
            _pad: 0,
        }
    }

    pub fn unpack(&self) -> ScatterRayPayload {
        let shadow = (self.flags & FLAG_SHADOW != 0).then_some(ShadowRayRequest {
            direction: self.shadow_dir,
            distance: self.shadow_distance,
            contribution: self.shadow_contribution,
        });
        ScatterRayPayload {
            origin: self.origin,
            direction: self.direction,
            throughput: self.throughput,
            radiance: self.radiance,
            pdf: self.pdf,
            normal: unpack_normal(self.normal),
            path_length: self.flags >> PATH_LENGTH_SHIFT,
            shadow,
            terminated: self.flags & FLAG_TERMINATED != 0,
            sg: SampleGenerator::from_state(self.sg_state),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Read a record from possibly unaligned bytes. `None` on a size mismatch.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytemuck::try_pod_read_unaligned(bytes).ok()
    }
}

impl From<&ScatterRayPayload> for PackedScatterPayload {
    fn from(payload: &ScatterRayPayload) -> Self {
        Self::pack(payload)
    }
}

impl From<&PackedScatterPayload> for ScatterRayPayload {
    fn from(packed: &PackedScatterPayload) -> Self {
        packed.unpack()
    }
}
