//! # Float Encodings
//!
//! Slot state is packed into float channels so it can live in float
//! textures:
//!
//! - **target**: destination place `p` stored in velocity.w as
//!   `(p + 0.5) / W + 0.5`, always inside `(0.5, 1.5)`
//! - **arrival**: the negated target, written to aggregate.w when a unit
//!   reaches its place; decoded as `floor((-v - 0.5) * W)`
//!
//! The half-cell offset keeps `floor` a full half cell away from an integer
//! boundary, so decoding survives any rounding smaller than `0.5 / W`.

use crate::texel::Texel;
use crate::{ANCHOR_TAG, IDLE_TARGET, PARKING_COORD};

/// Encode a destination place into the velocity target channel
#[inline]
pub fn encode_target(place: usize, width: usize) -> f32 {
    (place as f32 + 0.5) / width as f32 + 0.5
}

/// Decode the velocity target channel; `None` for idle or anchor values
#[inline]
pub fn decode_target(value: f32, width: usize) -> Option<usize> {
    if !(value > 0.5 && value < 1.5) {
        return None;
    }
    let place = ((value - 0.5) * width as f32).floor();
    (place >= 0.0).then_some(place as usize)
}

/// Encode an arrival at `place` for the aggregate signal channel
#[inline]
pub fn encode_arrival(place: usize, width: usize) -> f32 {
    -encode_target(place, width)
}

/// Decode a negative aggregate signal into the place it names
#[inline]
pub fn decode_arrival(value: f32, width: usize) -> Option<usize> {
    if value >= 0.0 {
        return None;
    }
    decode_target(-value, width)
}

/// Largest number of places a grid of this width can address
#[inline]
pub fn max_places(width: usize) -> usize {
    width
}

/// A slot is free iff its velocity target channel is exactly zero
#[inline]
pub fn is_free(velocity: &Texel) -> bool {
    velocity.w == IDLE_TARGET
}

/// A slot is an anchor iff its position carries the anchor tag
#[inline]
pub fn is_anchor(position: &Texel) -> bool {
    position.w == ANCHOR_TAG
}

/// Position of a free slot: far out of play, untagged
#[inline]
pub const fn parked_position() -> Texel {
    Texel::new(PARKING_COORD, PARKING_COORD, PARKING_COORD, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_target_range() {
        let width = 64;
        for place in 0..max_places(width) {
            let v = encode_target(place, width);
            assert!(v > 0.5 && v < 1.5, "place {} encoded to {}", place, v);
        }
    }

    #[test]
    fn test_idle_and_fixed_mass_do_not_decode_as_arrival() {
        assert_eq!(decode_arrival(0.0, 64), None);
        assert_eq!(decode_arrival(crate::LIVE_SIGNAL, 64), None);
        assert_eq!(decode_target(IDLE_TARGET, 64), None);
    }

    #[test]
    fn test_free_and_anchor_predicates() {
        assert!(is_free(&Texel::ZERO));
        assert!(!is_free(&Texel::new(0.0, 0.0, 0.0, encode_target(0, 8))));
        assert!(is_anchor(&Texel::new(1.0, 2.0, 3.0, ANCHOR_TAG)));
        assert!(!is_anchor(&parked_position()));
    }

    proptest! {
        #[test]
        fn prop_arrival_decodes_exact_place(width in 1usize..=256, seed in 0usize..10_000) {
            let place = seed % max_places(width);
            let arrival = encode_arrival(place, width);
            prop_assert_eq!(decode_arrival(arrival, width), Some(place));
        }

        #[test]
        fn prop_target_survives_half_cell_noise(
            width in 1usize..=128,
            seed in 0usize..10_000,
            noise in -0.45f32..0.45,
        ) {
            let place = seed % max_places(width);
            let value = encode_target(place, width) + noise / width as f32;
            prop_assert_eq!(decode_target(value, width), Some(place));
        }
    }
}
