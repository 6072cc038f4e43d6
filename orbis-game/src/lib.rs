//! # Orbis Game
//!
//! Game rules on top of the unit simulation:
//! - **places**: layout of places on a sphere and who starts where
//! - **campaign**: troops, launches, arrivals, captures, match outcome
//! - **ai**: a rule-based strategist that can play either side

pub mod ai;
pub mod campaign;
pub mod places;

pub use ai::{Order, Strategist};
pub use campaign::{Campaign, MatchOutcome};
pub use places::{scatter, Place};
