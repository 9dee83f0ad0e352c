//! Errors surfaced by the runtime.
//!
//! Wraps core failures and configuration problems so the driver can bubble
//! them up with `?` and still classify them via [`CoreError`].

use ability_core::chain::ChainError;
use ability_core::error::{CoreError, ErrorSeverity};
use ability_core::phase::PhaseError;
use ability_core::registry::RegistryError;
use ability_core::Tick;

use crate::config::ConfigError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("response chain failed")]
    Chain(#[from] ChainError),

    #[error("lifecycle phase failed")]
    Phase(#[from] PhaseError),

    #[error("{group} system failed at tick {tick}")]
    System {
        group: &'static str,
        tick: Tick,
        #[source]
        source: Box<RuntimeError>,
    },
}

impl RuntimeError {
    /// Attaches the failing group and tick.
    pub fn in_group(self, group: &'static str, tick: Tick) -> Self {
        Self::System {
            group,
            tick,
            source: Box::new(self),
        }
    }

    /// Innermost error below any [`RuntimeError::System`] wrapping.
    pub fn root_cause(&self) -> &RuntimeError {
        match self {
            Self::System { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl CoreError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config(error) => error.severity(),
            Self::Registry(error) => error.severity(),
            Self::Chain(error) => error.severity(),
            Self::Phase(error) => error.severity(),
            Self::System { source, .. } => source.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(error) => error.error_code(),
            Self::Registry(error) => error.error_code(),
            Self::Chain(error) => error.error_code(),
            Self::Phase(error) => error.error_code(),
            Self::System { source, .. } => source.error_code(),
        }
    }
}
