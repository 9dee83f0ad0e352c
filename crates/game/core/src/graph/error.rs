use crate::error::{CapabilityError, CoreError, ErrorSeverity};

use super::Opcode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterBank {
    Float,
    Int,
    Bool,
    Entity,
    Target,
}

/// Rejections raised while registering a program.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    #[error("program has {len} instructions, limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("jump at {pc} targets {target}, outside 0..={len}")]
    JumpOutOfRange { pc: usize, target: i64, len: usize },
}

impl CoreError for ProgramError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::TooLong { .. } => "PROGRAM_TOO_LONG",
            Self::JumpOutOfRange { .. } => "PROGRAM_JUMP_OUT_OF_RANGE",
        }
    }
}

/// Failures while executing a graph.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("{bank:?} register {index} out of range")]
    RegisterOutOfRange { bank: RegisterBank, index: usize },

    #[error("opcode {op:?} at {pc} mutates state in validation mode")]
    MutationInValidation { op: Opcode, pc: usize },

    #[error("graph exceeded {steps} steps")]
    StepBudgetExceeded { steps: u32 },

    #[error("jump at {pc} targets {target}")]
    JumpOutOfRange { pc: usize, target: i64 },
}

impl CoreError for GraphError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Capability(error) => error.severity(),
            Self::MutationInValidation { .. } => ErrorSeverity::Validation,
            Self::RegisterOutOfRange { .. }
            | Self::StepBudgetExceeded { .. }
            | Self::JumpOutOfRange { .. } => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Capability(error) => error.error_code(),
            Self::RegisterOutOfRange { .. } => "GRAPH_REGISTER_OUT_OF_RANGE",
            Self::MutationInValidation { .. } => "GRAPH_MUTATION_IN_VALIDATION",
            Self::StepBudgetExceeded { .. } => "GRAPH_STEP_BUDGET_EXCEEDED",
            Self::JumpOutOfRange { .. } => "GRAPH_JUMP_OUT_OF_RANGE",
        }
    }
}
