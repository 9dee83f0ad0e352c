use crate::error::{CoreError, ErrorSeverity};
use crate::phase::PhaseError;

/// Failures that abort response-chain processing.
///
/// Rejected, dropped and fizzled proposals are counted on
/// [`ChainBudget`](super::ChainBudget) and never surface here.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("phase dispatch failed: {0}")]
    Phase(#[from] PhaseError),
}

impl CoreError for ChainError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Phase(error) => error.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Phase(error) => error.error_code(),
        }
    }
}
