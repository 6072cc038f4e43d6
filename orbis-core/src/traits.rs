//! # Traits - The Kernel Abstraction
//!
//! A kernel is the per-slot update rule of one simulation variable, the
//! CPU equivalent of a fragment shader run once per texel. The compute
//! graph evaluates it for every slot, handing it the previous-step values
//! of the variables it declared as inputs plus a block of uniforms.
//!
//! Kernels must not depend on evaluation order between slots: every slot
//! may run in parallel.

use bytemuck::{Pod, Zeroable};

use crate::config::OrbisConfig;
use crate::texel::Texel;

/// Per-slot update rule of one variable
pub trait Kernel: Send + Sync {
    /// Name of this kernel (for logging and errors)
    fn name(&self) -> &'static str;

    /// Variables this kernel samples (besides its own previous value)
    ///
    /// The graph refuses to initialize if any of these is not a declared
    /// dependency of the variable, the way a shader fails to compile when
    /// it references an unbound texture.
    fn inputs(&self) -> &'static [&'static str];

    /// Compute the new value of `slot`
    fn evaluate(&self, slot: usize, inputs: &KernelInputs<'_>, uniforms: &Uniforms) -> Texel;
}

/// Read-only view of the previous-step textures a kernel may sample
pub struct KernelInputs<'a> {
    width: usize,
    own: &'a [Texel],
    inputs: Vec<(&'a str, &'a [Texel])>,
}

impl<'a> KernelInputs<'a> {
    pub fn new(width: usize, own: &'a [Texel], inputs: Vec<(&'a str, &'a [Texel])>) -> Self {
        Self { width, own, inputs }
    }

    /// Texture width (slots per row)
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of slots
    #[inline]
    pub fn len(&self) -> usize {
        self.own.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.own.is_empty()
    }

    /// Previous value of the variable being computed
    #[inline]
    pub fn own(&self, slot: usize) -> Texel {
        self.own.get(slot).copied().unwrap_or_default()
    }

    /// Previous value of input `name` at `slot`
    ///
    /// Graph initialization guarantees every declared input is present;
    /// out-of-range slots read as zero, like a clamped texture fetch.
    #[inline]
    pub fn sample(&self, name: &str, slot: usize) -> Texel {
        self.inputs
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, texels)| texels.get(slot).copied())
            .unwrap_or_default()
    }
}

/// Values broadcast to every slot for one tick (matches a uniform block)
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Uniforms {
    pub dt: f32,
    pub thrust: f32,
    pub max_speed: f32,
    pub arrival_radius: f32,
    pub difficulty: f32,
    pub width: u32,
    pub tick: u32,
    pub _pad: u32,
}

impl Uniforms {
    pub fn from_config(config: &OrbisConfig, dt: f32, tick: u64) -> Self {
        Self {
            dt,
            thrust: config.kernel.thrust,
            max_speed: config.kernel.max_speed,
            arrival_radius: config.kernel.arrival_radius,
            difficulty: config.kernel.difficulty,
            width: config.grid.width as u32,
            tick: tick as u32,
            _pad: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniforms_size() {
        // 8 scalars = 32 bytes, a multiple of 16 for uniform buffers
        assert_eq!(std::mem::size_of::<Uniforms>(), 32);
    }

    #[test]
    fn test_sample_missing_input_reads_zero() {
        let own = [Texel::new(1.0, 0.0, 0.0, 0.0)];
        let other = [Texel::new(2.0, 0.0, 0.0, 0.0)];
        let inputs = KernelInputs::new(1, &own, vec![("position", &other[..])]);

        assert_eq!(inputs.own(0).x, 1.0);
        assert_eq!(inputs.sample("position", 0).x, 2.0);
        assert_eq!(inputs.sample("mass", 0), Texel::ZERO);
        assert_eq!(inputs.sample("position", 5), Texel::ZERO);
    }
}
