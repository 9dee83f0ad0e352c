//! Standard system groups, in pipeline order.
//!
//! 1. [`SpatialIndexSystem`] snapshots positions for the tick's queries.
//! 2. [`ProposalSystem`] drains the request queue through the response chain,
//!    yielding whenever its work-unit budget runs out.
//! 3. [`LifetimeSystem`] ticks cooldowns and effect lifetimes.
//! 4. [`DeferredTriggerSystem`] turns dirty state into change events and
//!    reports chain telemetry.
mod deferred;
mod lifetime;
mod proposal;
mod spatial_index;

pub use deferred::DeferredTriggerSystem;
pub use lifetime::LifetimeSystem;
pub use proposal::ProposalSystem;
pub use spatial_index::SpatialIndexSystem;
