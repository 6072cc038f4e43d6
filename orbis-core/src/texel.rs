//! # Texel - One Slot of One Variable
//!
//! Every simulation variable is a grid of `(x, y, z, w)` float records,
//! the CPU counterpart of an RGBA float texture. What the channels mean
//! depends on the variable:
//!
//! - **position**: `(x, y, z, tag)`, tag = [`ANCHOR_TAG`](crate::ANCHOR_TAG) or a side tag
//! - **velocity**: `(vx, vy, vz, target)`, target = 0 for a free slot
//! - **aggregate**: `(distance, owner tag, 0, signal)`, signal < 0 on arrival
//!
//! Texels are always written whole; there is no per-channel write path.

use bytemuck::{Pod, Zeroable};

/// A 4-channel float record (16 bytes, GPU layout compatible)
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Texel {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Texel {
    /// All channels zero
    pub const ZERO: Texel = Texel::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Build a texel from a 3-vector and a 4th channel
    pub const fn from_xyz(xyz: [f32; 3], w: f32) -> Self {
        Self::new(xyz[0], xyz[1], xyz[2], w)
    }

    /// The first three channels
    #[inline]
    pub fn xyz(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Same xyz, different 4th channel
    #[inline]
    pub fn with_w(self, w: f32) -> Self {
        Self { w, ..self }
    }
}

// ============================================================================
// 3-VECTOR HELPERS
// ============================================================================

#[inline]
pub fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn add(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn scale(a: [f32; 3], s: f32) -> [f32; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

#[inline]
pub fn length(a: [f32; 3]) -> f32 {
    (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt()
}

#[inline]
pub fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    length(sub(a, b))
}

/// Scale `a` down so its length does not exceed `max`
#[inline]
pub fn clamp_length(a: [f32; 3], max: f32) -> [f32; 3] {
    let len = length(a);
    if len > max && len > 0.0 {
        scale(a, max / len)
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texel_size() {
        // Must match one RGBA32F texel
        assert_eq!(std::mem::size_of::<Texel>(), 16);
    }

    #[test]
    fn test_texel_bytes() {
        let texels = [Texel::new(1.0, 2.0, 3.0, 4.0)];
        let floats: &[f32] = bytemuck::cast_slice(&texels);
        assert_eq!(floats, &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_clamp_length() {
        let v = clamp_length([3.0, 4.0, 0.0], 1.0);
        assert!((length(v) - 1.0).abs() < 1e-6);

        let short = clamp_length([0.1, 0.0, 0.0], 1.0);
        assert_eq!(short, [0.1, 0.0, 0.0]);
    }

    #[test]
    fn test_with_w_keeps_xyz() {
        let t = Texel::new(1.0, 2.0, 3.0, 0.0).with_w(0.6);
        assert_eq!(t.xyz(), [1.0, 2.0, 3.0]);
        assert_eq!(t.w, 0.6);
    }
}
