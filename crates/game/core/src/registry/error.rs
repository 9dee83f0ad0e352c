use crate::error::{CoreError, ErrorSeverity};
use crate::graph::ProgramError;
use crate::state::{PresetType, ProgramId, TemplateId};

/// Rejections raised while loading data into the [`Registries`](super::Registries).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("template {0} is already registered")]
    DuplicateTemplate(TemplateId),

    #[error("program {0} is already registered")]
    DuplicateProgram(ProgramId),

    #[error("template {template} references unregistered program {program}")]
    UnknownProgram {
        template: TemplateId,
        program: ProgramId,
    },

    #[error("template {template} uses unregistered preset {preset}")]
    UnknownPreset {
        template: TemplateId,
        preset: PresetType,
    },

    #[error("template {template} dropped {dropped} entries while building")]
    CapacityExceeded { template: TemplateId, dropped: u32 },

    #[error("name table is full ({limit} entries), cannot intern {name:?}")]
    NameTableFull { name: String, limit: usize },

    #[error(transparent)]
    Program(#[from] ProgramError),
}

impl CoreError for RegistryError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateTemplate(_) => "REGISTRY_DUPLICATE_TEMPLATE",
            Self::DuplicateProgram(_) => "REGISTRY_DUPLICATE_PROGRAM",
            Self::UnknownProgram { .. } => "REGISTRY_UNKNOWN_PROGRAM",
            Self::UnknownPreset { .. } => "REGISTRY_UNKNOWN_PRESET",
            Self::CapacityExceeded { .. } => "REGISTRY_CAPACITY_EXCEEDED",
            Self::NameTableFull { .. } => "REGISTRY_NAME_TABLE_FULL",
            Self::Program(error) => error.error_code(),
        }
    }
}
