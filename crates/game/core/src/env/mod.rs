//! Capability surface between the core and the subsystems it leaves out.
//!
//! Spatial lookups are a trait implemented elsewhere. The event bus, request
//! queue and order channel are concrete bounded buffers owned by the caller
//! and lent to the core for the duration of a call. Attribute, tag and
//! blackboard storage live on [`crate::state::World`].
mod events;
mod orders;
mod requests;
mod spatial;

pub use events::{EventBuffer, EventKind, GameplayEvent};
pub use orders::{Decision, DecisionOrder, OrderQueue, OrderRequest};
pub use requests::RequestQueue;
pub use spatial::{
    QueryReport, QueryShape, SpatialQuery, TargetList, hex_cell, hex_distance, push_match,
};
