//! Position kernel: `xyz += velocity * dt`, tag passed through.
//!
//! Anchors keep their position (only `Simulation::relocate_place` moves
//! them). Docked units hold their position so they cannot drift back out
//! of the arrival radius before they are reclaimed.

use orbis_core::encoding::{is_anchor, is_free};
use orbis_core::texel::{add, scale};
use orbis_core::{Kernel, KernelInputs, Texel, Uniforms};

use super::{heading, POSITION, VELOCITY};

/// Integration update for `position`
#[derive(Debug, Default, Clone, Copy)]
pub struct PositionKernel;

impl Kernel for PositionKernel {
    fn name(&self) -> &'static str {
        "position_integrate"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &[POSITION, VELOCITY]
    }

    fn evaluate(&self, slot: usize, inputs: &KernelInputs<'_>, uniforms: &Uniforms) -> Texel {
        let position = inputs.own(slot);
        let velocity = inputs.sample(VELOCITY, slot);

        if is_anchor(&position) || is_free(&velocity) {
            return position;
        }
        if let Some(heading) = heading(&position, &velocity, inputs) {
            if heading.distance <= uniforms.arrival_radius {
                return position;
            }
        }

        Texel::from_xyz(
            add(position.xyz(), scale(velocity.xyz(), uniforms.dt)),
            position.w,
        )
    }
}
