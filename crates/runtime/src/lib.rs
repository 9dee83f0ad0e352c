//! Frame-driven orchestration for the ability core.
//!
//! The core crate is a set of deterministic, slice-able operations with no
//! notion of wall time. This crate supplies the rest of a tick:
//!
//! - [`simulation`] owns the world, registries and every bounded buffer
//! - [`scheduler`] hosts the [`Pacemaker`] and the [`SystemGroup`] contract
//! - [`systems`] wraps the core's passes as standard groups
//! - [`spatial`] implements the core's spatial capability on a uniform grid
//! - [`events`] retains committed events across ticks
//! - [`config`] loads [`RuntimeConfig`] from RON
pub mod config;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod simulation;
pub mod spatial;
pub mod systems;

pub use config::{ConfigError, RuntimeConfig};
pub use error::{Result, RuntimeError};
pub use events::{EventHistory, HistoryEntry};
pub use scheduler::{
    FrameReport, FrameTimer, InstantTimer, ManualTimer, Pacemaker, PacemakerStats, SliceContext,
    SliceStatus, SystemGroup, TickProgress,
};
pub use simulation::{CommitReport, Simulation};
pub use spatial::SpatialGrid;
pub use systems::{DeferredTriggerSystem, LifetimeSystem, ProposalSystem, SpatialIndexSystem};
