//! Per-slot update kernels
//!
//! Kernels are organized by the variable they write:
//! - `velocity`: steering toward the target place, docking, speed clamp
//! - `position`: integration of velocity, anchors held fixed
//! - `aggregate`: per-slot arrival / liveness signal for the interpreter
//!
//! Every kernel is a pure function of the previous step's textures, so
//! slots are evaluated independently (and in parallel by the graph).

pub mod aggregate;
pub mod position;
pub mod velocity;

pub use aggregate::AggregateKernel;
pub use position::PositionKernel;
pub use velocity::VelocityKernel;

use orbis_core::encoding::decode_target;
use orbis_core::texel::{distance, sub};
use orbis_core::{KernelInputs, Texel};

/// Variable holding `(vx, vy, vz, target)` per slot
pub const VELOCITY: &str = "velocity";

/// Variable holding `(x, y, z, tag)` per slot
pub const POSITION: &str = "position";

/// Variable holding `(distance, owner tag, 0, signal)` per slot
pub const AGGREGATE: &str = "aggregate";

/// Where a travelling unit is heading
struct Heading {
    /// Vector from the unit to the place's anchor
    offset: [f32; 3],
    /// Length of `offset`
    distance: f32,
}

/// Decode the target of a unit slot and locate its anchor
///
/// `None` for slots with no decodable target (free slots, anchors).
fn heading(position: &Texel, velocity: &Texel, inputs: &KernelInputs<'_>) -> Option<Heading> {
    let place = decode_target(velocity.w, inputs.width())?;
    let anchor = inputs.sample(POSITION, place).xyz();
    Some(Heading {
        offset: sub(anchor, position.xyz()),
        distance: distance(anchor, position.xyz()),
    })
}
