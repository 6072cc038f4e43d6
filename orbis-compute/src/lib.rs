//! # Orbis Compute
//!
//! The unit simulation behind Orbis: thousands of units flying between
//! fixed places, with all state kept in texel grids and updated by
//! per-slot kernels.
//!
//! This crate provides:
//! - **Texture**: double-buffered texel grids with slot-granular patches
//! - **ComputeGraph**: named variables evaluated in dependency order (Rayon)
//! - **Kernels**: velocity steering, position integration, arrival aggregate
//! - **Dispatcher**: the two-readback launch protocol and its single-flight lock
//! - **Interpreter**: aggregate texture → arrival events and live counts
//! - **Simulation**: the facade owning all of the above
//!
//! ## Slot Layout
//!
//! | texture  | anchor slot              | unit slot                    |
//! |----------|--------------------------|------------------------------|
//! | position | `(x, y, z, ANCHOR_TAG)`  | `(x, y, z, side tag)`        |
//! | velocity | `(0, 0, 0, FIXED_MASS)`  | `(vx, vy, vz, target)`       |
//! | aggregate| zero                     | `(dist, side tag, 0, signal)`|
//!
//! A unit slot with `target == 0` is free.

pub mod dispatch;
pub mod graph;
pub mod interpreter;
pub mod kernels;
pub mod readback;
pub mod simulation;
pub mod texture;

pub use dispatch::{AbortedLaunch, LaunchId, LaunchOutcome, LaunchPhase, LaunchRequest, LaunchStatus};
pub use graph::{ComputeGraph, VariableId};
pub use interpreter::{interpret, ArrivalEvent, Interpretation};
pub use readback::{Readback, ReadbackQueue};
pub use simulation::{ReclaimStatus, SimRequest, Simulation, SlotCensus, TickReport};
pub use texture::{PingPong, SlotPatch, Texture};
