use crate::error::Result;
use crate::scheduler::{SliceContext, SliceStatus, SystemGroup};
use crate::simulation::Simulation;

/// Rebuilds the spatial grid from current positions.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpatialIndexSystem;

impl SystemGroup for SpatialIndexSystem {
    fn name(&self) -> &'static str {
        "spatial_index"
    }

    fn update_slice(&mut self, sim: &mut Simulation, _ctx: &SliceContext) -> Result<SliceStatus> {
        sim.spatial.rebuild(&sim.world);
        Ok(SliceStatus::Done)
    }
}
