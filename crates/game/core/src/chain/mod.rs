//! Response-chain engine.
//!
//! A committed proposal opens a [`ProposalWindow`]. Listeners on the
//! proposal's participants either chain nested responses (collected
//! breadth-first under a depth and capacity budget) or raise prompts that
//! hold the window open until decisions arrive on the
//! [`OrderQueue`](crate::env::OrderQueue). Resolution then applies every
//! live response newest-first and the root last.
mod budget;
mod engine;
mod error;
mod listener;
mod telemetry;
mod window;

pub use budget::ChainBudget;
pub use engine::{ChainEnv, ResponseChainEngine, SliceStatus};
pub use error::ChainError;
pub use listener::{ListenerTable, ResponseChainListener, ResponseKind};
pub use telemetry::{TelemetryBuffer, TelemetryKind, TelemetryRecord};
pub use window::{ChainEntry, MAX_WINDOW_ENTRIES, PromptSlot, ProposalWindow, WindowState};
