//! # Error Types for Orbis
//!
//! Unified error handling across all Orbis crates.
//!
//! Only setup and contract violations are errors. Under-allocation, skipped
//! interpretation and stuck-lock recovery are expected at runtime and are
//! reported through logs and tick reports instead.

use thiserror::Error;

/// Main error type for Orbis operations
#[derive(Error, Debug)]
pub enum OrbisError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A variable with this name is already registered
    #[error("Variable '{0}' is already registered")]
    DuplicateVariable(String),

    /// No variable with this name or handle exists
    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),

    /// A declared dependency does not name a registered variable
    #[error("Variable '{variable}' depends on unregistered variable '{dependency}'")]
    MissingDependency { variable: String, dependency: String },

    /// A kernel samples a variable it did not declare as a dependency
    #[error("Kernel '{kernel}' of variable '{variable}' samples undeclared input '{input}'")]
    KernelInput {
        kernel: String,
        variable: String,
        input: String,
    },

    /// Texture dimensions are not usable
    #[error("Invalid texture dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    /// Slot index outside the texture
    #[error("Slot {slot} out of range (capacity {capacity})")]
    SlotOutOfRange { slot: usize, capacity: usize },

    /// Slot index names an anchor where a unit slot was expected
    #[error("Slot {0} is an anchor and cannot be reclaimed")]
    AnchorSlot(usize),

    /// Place index outside the initialized places
    #[error("Place {place} out of range ({count} places)")]
    PlaceOutOfRange { place: usize, count: usize },

    /// The compute graph was used before a successful `init()`
    #[error("Compute graph not initialized")]
    NotInitialized,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for Orbis operations
pub type OrbisResult<T> = Result<T, OrbisError>;

impl OrbisError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an unknown-variable error
    pub fn unknown_variable(name: impl Into<String>) -> Self {
        Self::UnknownVariable(name.into())
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Whether the error happened while setting up (graph or config)
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::DuplicateVariable(_)
                | Self::UnknownVariable(_)
                | Self::MissingDependency { .. }
                | Self::KernelInput { .. }
                | Self::InvalidDimensions { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = OrbisError::MissingDependency {
            variable: "velocity".into(),
            dependency: "mass".into(),
        };
        assert_eq!(
            err.to_string(),
            "Variable 'velocity' depends on unregistered variable 'mass'"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn test_runtime_errors_are_not_configuration() {
        assert!(!OrbisError::NotInitialized.is_configuration());
        assert!(!OrbisError::SlotOutOfRange { slot: 9, capacity: 4 }.is_configuration());
    }
}
