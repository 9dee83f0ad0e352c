//! Deterministic gameplay-ability core.
//!
//! `ability-core` holds the rules half of the ability runtime: the entity
//! store, the effect data model, the phase-graph register VM, lifecycle
//! phase dispatch and the response-chain engine. It performs no I/O and
//! never reads a wall clock; every duration is an integer tick count of a
//! [`clock::ClockDomain`]. Scheduling, spatial indexing and configuration
//! loading live in `ability-runtime`.
pub mod chain;
pub mod clock;
pub mod config;
pub mod effect;
pub mod env;
pub mod error;
pub mod graph;
pub mod phase;
pub mod registry;
pub mod state;

#[cfg(test)]
mod test_support;

pub use chain::{
    ChainBudget, ChainEnv, ChainError, ResponseChainEngine, ResponseChainListener, ResponseKind,
    SliceStatus, TelemetryKind, WindowState,
};
pub use clock::{ClockDomain, ClockDomains, StepPolicy, Tick};
pub use config::{ChainConfig, CoreConfig, PromptTimeout, TimeoutFallback};
pub use effect::{
    EffectRequest, EffectTemplate, ExpireCondition, GameplayEffect, LifetimeEnv, LifetimeKind,
    ModifierOp, ParamValue,
};
pub use env::{
    Decision, DecisionOrder, EventBuffer, EventKind, GameplayEvent, OrderQueue, OrderRequest,
    QueryShape, RequestQueue, SpatialQuery, TargetList,
};
pub use error::{CapabilityError, CoreError, ErrorSeverity};
pub use graph::{GraphError, GraphInstruction, Opcode, OpcodeTable, Program, ProgramError};
pub use phase::{LifecyclePhase, PhaseError, PhaseExecutor, PhaseSlot};
pub use registry::{Registries, RegistryError};
pub use state::{
    AttributeId, EntityHandle, EventTag, PlayerId, PresetType, ProgramId, RootId, TagId, TagSense,
    TemplateId, Vec2, World,
};
