use crate::error::Result;
use crate::scheduler::{SliceContext, SliceStatus, SystemGroup};
use crate::simulation::Simulation;

/// Time-sliced response-chain processing.
///
/// The batch is fixed when the tick begins; requests published while it runs
/// wait for the next tick. A window waiting on prompt decisions ends the
/// group for this tick and is picked up again once orders arrive.
#[derive(Debug, Default)]
pub struct ProposalSystem {
    processed_at_begin: u64,
}

impl SystemGroup for ProposalSystem {
    fn name(&self) -> &'static str {
        "proposal"
    }

    fn begin_tick(&mut self, sim: &mut Simulation) -> Result<()> {
        sim.begin_chain_tick();
        self.processed_at_begin = sim.chain.processed();
        Ok(())
    }

    fn update_slice(&mut self, sim: &mut Simulation, ctx: &SliceContext) -> Result<SliceStatus> {
        let status = sim.run_chain_slice(ctx.max_work_units)?;
        if status.is_done() {
            tracing::trace!(
                target: "runtime::proposal",
                tick = %ctx.tick,
                processed = sim.chain.processed() - self.processed_at_begin,
                waiting = sim.chain.is_waiting(),
                "proposal batch finished"
            );
        } else {
            tracing::trace!(
                target: "runtime::proposal",
                tick = %ctx.tick,
                remaining = sim.chain.batch_remaining(),
                "proposal slice yielded"
            );
        }
        Ok(status)
    }

    fn reset_slice(&mut self, sim: &mut Simulation) {
        sim.chain.reset_slice();
    }
}
