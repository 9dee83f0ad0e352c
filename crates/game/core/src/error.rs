//! Common error infrastructure for ability-core.
//!
//! Domain errors (`GraphError`, `PhaseError`, `ChainError`, ...) live next to the
//! code that raises them. This module holds the classification shared by all
//! of them and the capability errors raised when the environment is wired up
//! incompletely.
//!
//! # Taxonomy
//!
//! - **Configuration**: a required capability is missing. Always [`ErrorSeverity::Fatal`].
//! - **Capacity overflow**: never an error value. The operation returns `false`
//!   and a dropped counter is incremented.
//! - **Budget exhaustion**: chain drops are counted, the scheduler trips a fuse.

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Temporary condition; the same work may succeed later.
    Recoverable,

    /// Invalid input (bad program, unknown id) that should be rejected.
    Validation,

    /// Unexpected state inconsistency. Indicates a bug.
    Internal,

    /// Broken environment setup. The simulation cannot continue.
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }
}

/// Common trait for all ability-core errors.
///
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait CoreError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// A graph opcode or builtin needed a capability the caller did not provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    #[error("spatial query capability is not wired up")]
    SpatialNotAvailable,

    #[error("event bus capability is not wired up")]
    EventsNotAvailable,

    #[error("effect request queue capability is not wired up")]
    RequestsNotAvailable,
}

impl CoreError for CapabilityError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::SpatialNotAvailable => "CAPABILITY_SPATIAL",
            Self::EventsNotAvailable => "CAPABILITY_EVENTS",
            Self::RequestsNotAvailable => "CAPABILITY_REQUESTS",
        }
    }
}
