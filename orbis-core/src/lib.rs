//! # Orbis Core
//!
//! Core types for Orbis, a real-time strategy simulation where two sides
//! send fleets of units between places scattered on a sphere.
//!
//! This crate provides the fundamental building blocks:
//! - **Texel**: the 4-channel float record every simulation variable is made of
//! - **Side**: the closed set of owners and their float tag encoding
//! - **Encoding**: packing of destination places and arrivals into floats
//! - **Kernel**: the per-slot update function evaluated by the compute graph
//!
//! ## Memory Layout
//!
//! A variable is a `W×W` grid of texels. Slots `[0, places)` are anchors
//! (one per place), slots `[places, W*W)` are the unit pool. All records
//! use `#[repr(C)]` so a renderer can upload them as raw floats via `bytemuck`.

pub mod config;
pub mod encoding;
pub mod error;
pub mod side;
pub mod texel;
pub mod traits;

// Re-export main types at crate root
pub use config::OrbisConfig;
pub use error::{OrbisError, OrbisResult};
pub use side::{PerSide, Side};
pub use texel::Texel;
pub use traits::{Kernel, KernelInputs, Uniforms};

/// Grid width used when no configuration overrides it
pub const DEFAULT_GRID_WIDTH: usize = 64;

/// Position tag (4th channel) marking a slot as a fixed anchor
pub const ANCHOR_TAG: f32 = 0.1;

/// Velocity 4th channel of an anchor: infinite mass, never integrated
pub const FIXED_MASS: f32 = 1.0;

/// Velocity 4th channel of a free slot
pub const IDLE_TARGET: f32 = 0.0;

/// Aggregate 4th channel emitted by a unit that is still travelling
pub const LIVE_SIGNAL: f32 = 1.0;

/// Coordinate used for every axis of a parked (free) slot, far outside play
pub const PARKING_COORD: f32 = 1.0e4;
