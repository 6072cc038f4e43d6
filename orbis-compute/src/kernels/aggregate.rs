//! Aggregate kernel
//!
//! Summarizes every slot into one texel read back once per tick:
//!
//! | channel | meaning |
//! |---------|---------|
//! | x | distance to the target anchor |
//! | y | owner tag copied from `position.w` |
//! | z | unused (0) |
//! | w | arrival (negated target) / [`LIVE_SIGNAL`] / 0 |
//!
//! Anchors and free slots emit all zeros.

use orbis_core::encoding::{is_anchor, is_free};
use orbis_core::{Kernel, KernelInputs, Texel, Uniforms, LIVE_SIGNAL};

use super::{heading, POSITION, VELOCITY};

/// Arrival / liveness signal for `aggregate`
#[derive(Debug, Default, Clone, Copy)]
pub struct AggregateKernel;

impl Kernel for AggregateKernel {
    fn name(&self) -> &'static str {
        "aggregate_signal"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &[POSITION, VELOCITY]
    }

    fn evaluate(&self, slot: usize, inputs: &KernelInputs<'_>, uniforms: &Uniforms) -> Texel {
        let position = inputs.sample(POSITION, slot);
        let velocity = inputs.sample(VELOCITY, slot);

        if is_anchor(&position) || is_free(&velocity) {
            return Texel::ZERO;
        }
        let Some(heading) = heading(&position, &velocity, inputs) else {
            return Texel::ZERO;
        };

        // The arrival code is exactly the negated target, see encode_arrival
        let signal = if heading.distance <= uniforms.arrival_radius {
            -velocity.w
        } else {
            LIVE_SIGNAL
        };

        Texel::new(heading.distance, position.w, 0.0, signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbis_core::encoding::{decode_arrival, encode_target, parked_position};
    use orbis_core::{Side, ANCHOR_TAG, FIXED_MASS};

    const W: usize = 8;

    fn uniforms() -> Uniforms {
        Uniforms {
            arrival_radius: 0.35,
            ..Default::default()
        }
    }

    fn evaluate(unit_position: Texel, target: usize) -> Texel {
        let own = vec![Texel::ZERO; W * W];
        let mut positions = vec![parked_position(); W * W];
        let mut velocities = vec![Texel::ZERO; W * W];
        for place in 0..3 {
            positions[place] = Texel::new(place as f32 * 10.0, 0.0, 0.0, ANCHOR_TAG);
            velocities[place] = Texel::new(0.0, 0.0, 0.0, FIXED_MASS);
        }
        positions[9] = unit_position;
        velocities[9] = Texel::new(1.0, 0.0, 0.0, encode_target(target, W));

        let inputs = KernelInputs::new(
            W,
            &own,
            vec![(POSITION, &positions[..]), (VELOCITY, &velocities[..])],
        );
        AggregateKernel.evaluate(9, &inputs, &uniforms())
    }

    #[test]
    fn test_arrival_encodes_place_and_owner() {
        let out = evaluate(Texel::new(20.1, 0.0, 0.0, Side::Enemy.tag()), 2);
        assert!(out.w < 0.0);
        assert_eq!(decode_arrival(out.w, W), Some(2));
        assert_eq!(Side::from_tag(out.y), Some(Side::Enemy));
    }

    #[test]
    fn test_travelling_unit_is_live() {
        let out = evaluate(Texel::new(3.0, 0.0, 0.0, Side::Player.tag()), 2);
        assert_eq!(out.w, LIVE_SIGNAL);
        assert_eq!(Side::from_tag(out.y), Some(Side::Player));
        assert!((out.x - 17.0).abs() < 1e-4);
    }

    #[test]
    fn test_anchor_and_free_emit_zero() {
        let out = evaluate(Texel::new(3.0, 0.0, 0.0, Side::Player.tag()), 2);
        assert_ne!(out, Texel::ZERO);

        let own = vec![Texel::ZERO; W * W];
        let mut positions = vec![parked_position(); W * W];
        let mut velocities = vec![Texel::ZERO; W * W];
        positions[0] = Texel::new(0.0, 0.0, 0.0, ANCHOR_TAG);
        velocities[0] = Texel::new(0.0, 0.0, 0.0, FIXED_MASS);
        let inputs = KernelInputs::new(
            W,
            &own,
            vec![(POSITION, &positions[..]), (VELOCITY, &velocities[..])],
        );
        assert_eq!(AggregateKernel.evaluate(0, &inputs, &uniforms()), Texel::ZERO);
        assert_eq!(AggregateKernel.evaluate(5, &inputs, &uniforms()), Texel::ZERO);
    }
}
