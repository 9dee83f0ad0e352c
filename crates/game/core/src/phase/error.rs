use crate::error::{CapabilityError, CoreError, ErrorSeverity};
use crate::graph::GraphError;
use crate::state::{BuiltinId, ProgramId};

/// Failure while dispatching one lifecycle phase.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("program {0} is not registered")]
    UnknownProgram(ProgramId),

    #[error("builtin {0} is not registered")]
    UnknownBuiltin(BuiltinId),
}

impl CoreError for PhaseError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Graph(error) => error.severity(),
            Self::Capability(error) => error.severity(),
            // Registration validates references, so a miss here is a bug.
            Self::UnknownProgram(_) | Self::UnknownBuiltin(_) => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Graph(error) => error.error_code(),
            Self::Capability(error) => error.error_code(),
            Self::UnknownProgram(_) => "PHASE_UNKNOWN_PROGRAM",
            Self::UnknownBuiltin(_) => "PHASE_UNKNOWN_BUILTIN",
        }
    }
}

impl PhaseError {
    /// Whether the root cause is a missing capability.
    pub fn is_capability(&self) -> bool {
        matches!(
            self,
            Self::Capability(_) | Self::Graph(GraphError::Capability(_))
        )
    }
}
