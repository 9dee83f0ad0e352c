//! Cooperative fixed-timestep scheduler.
//!
//! The [`Pacemaker`] runs an ordered list of [`SystemGroup`]s once per
//! logical tick. A group may return [`SliceStatus::Yield`] to hand control
//! back to the caller mid-tick; the pacemaker then resumes the same group on
//! the next real frame. Clock domains advance only after every group has
//! returned [`SliceStatus::Done`] for the tick, so the sequence of committed
//! ticks does not depend on how many frames each one was spread across.
//!
//! # Group contract
//!
//! - `begin_tick` runs once per logical tick, before the group's first slice.
//! - `update_slice` processes at most `ctx.max_work_units` units of work.
//! - `reset_slice` runs before a yielded group is re-entered and must clear
//!   any scratch state the interrupted slice left behind.
mod pacemaker;
mod timer;

pub use ability_core::chain::SliceStatus;
pub use pacemaker::{FrameReport, Pacemaker, PacemakerStats, TickProgress};
pub use timer::{FrameTimer, InstantTimer, ManualTimer};

use ability_core::clock::Tick;

use crate::error::Result;
use crate::simulation::Simulation;

/// Per-slice inputs handed to a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SliceContext {
    /// FixedFrame tick being processed.
    pub tick: Tick,
    /// One-based slice count within the tick, across all groups.
    pub slice: u32,
    pub max_work_units: usize,
    /// Logical timestep in microseconds.
    pub dt_us: u64,
}

/// One stage of the per-tick pipeline.
pub trait SystemGroup {
    /// Name used in logs and error context.
    fn name(&self) -> &'static str;

    fn begin_tick(&mut self, _sim: &mut Simulation) -> Result<()> {
        Ok(())
    }

    fn update_slice(&mut self, sim: &mut Simulation, ctx: &SliceContext) -> Result<SliceStatus>;

    fn reset_slice(&mut self, _sim: &mut Simulation) {}
}
