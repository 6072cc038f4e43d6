//! # Arrival Interpreter
//!
//! Turns the aggregate texture read back each tick into domain events:
//! one [`ArrivalEvent`] per unit that reached its place, plus per-side
//! counts of units still travelling.
//!
//! While a launch holds the lock the pool is mid-mutation, so the
//! interpreter refuses to look at it at all and reports a skip instead.
//! Docked units keep signalling their arrival, so nothing is lost by
//! skipping a tick.

use tracing::{debug, trace};

use orbis_core::encoding::{decode_arrival, parked_position};
use orbis_core::{PerSide, Side, Texel};

use crate::texture::{SlotPatch, Texture};

/// A unit reached a place
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArrivalEvent {
    pub place_index: usize,
    pub owner: Side,
    /// Slot the unit occupied; reclaimed after the event
    pub slot: usize,
}

/// Everything one aggregate texture says
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Interpretation {
    pub events: Vec<ArrivalEvent>,
    pub live_counts: PerSide<usize>,
    /// Slots to return to the free pool, ascending
    pub reclaim: Vec<usize>,
    /// True when the launch lock was held and nothing was read
    pub skipped: bool,
}

impl Interpretation {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Decode an aggregate texture
///
/// `num_places` leading slots are anchors and are not inspected.
pub fn interpret(aggregate: &Texture, num_places: usize, locked: bool) -> Interpretation {
    if locked {
        debug!("Launch lock held; skipping arrival interpretation");
        return Interpretation::skipped();
    }

    let width = aggregate.width();
    let mut result = Interpretation::default();

    for (slot, texel) in aggregate.texels().iter().enumerate().skip(num_places) {
        if texel.w < 0.0 {
            result.reclaim.push(slot);
            match (decode_arrival(texel.w, width), Side::from_tag(texel.y)) {
                (Some(place_index), Some(owner)) => result.events.push(ArrivalEvent {
                    place_index,
                    owner,
                    slot,
                }),
                _ => debug!("Slot {} signalled an undecodable arrival {:?}", slot, texel),
            }
        } else if texel.w > 0.0 {
            if let Some(owner) = Side::from_tag(texel.y) {
                result.live_counts[owner] += 1;
            }
        }
    }

    trace!(
        "Interpreted aggregate: {} arrivals, live {}/{}",
        result.events.len(),
        result.live_counts[Side::Player],
        result.live_counts[Side::Enemy]
    );
    result
}

/// Velocity and position patches that return `slots` to the free pool
pub fn reclaim_patches(slots: &[usize]) -> (Vec<SlotPatch>, Vec<SlotPatch>) {
    slots
        .iter()
        .map(|&slot| {
            (
                SlotPatch::new(slot, Texel::ZERO),
                SlotPatch::new(slot, parked_position()),
            )
        })
        .unzip()
}
