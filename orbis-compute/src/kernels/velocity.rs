//! Velocity kernel
//!
//! Accelerates a travelling unit straight toward its target anchor and
//! clamps its speed. A unit already inside the arrival radius is docked:
//! its velocity drops to zero so it holds station until reclaimed.

use orbis_core::encoding::{is_anchor, is_free};
use orbis_core::texel::{add, clamp_length, scale};
use orbis_core::{Kernel, KernelInputs, Side, Texel, Uniforms};

use super::{heading, POSITION, VELOCITY};

/// Steering update for `velocity`
#[derive(Debug, Default, Clone, Copy)]
pub struct VelocityKernel;

impl Kernel for VelocityKernel {
    fn name(&self) -> &'static str {
        "velocity_steer"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &[VELOCITY, POSITION]
    }

    fn evaluate(&self, slot: usize, inputs: &KernelInputs<'_>, uniforms: &Uniforms) -> Texel {
        let velocity = inputs.own(slot);
        let position = inputs.sample(POSITION, slot);

        // Anchors are never integrated; free slots stay idle
        if is_anchor(&position) || is_free(&velocity) {
            return velocity;
        }
        let Some(heading) = heading(&position, &velocity, inputs) else {
            return velocity;
        };

        if heading.distance <= uniforms.arrival_radius {
            return Texel::from_xyz([0.0; 3], velocity.w);
        }

        let gain = match Side::from_tag(position.w) {
            Some(Side::Enemy) => uniforms.difficulty,
            _ => 1.0,
        };
        let push = scale(
            heading.offset,
            uniforms.thrust * gain * uniforms.dt / heading.distance,
        );
        let next = clamp_length(add(velocity.xyz(), push), uniforms.max_speed);

        Texel::from_xyz(next, velocity.w)
    }
}
