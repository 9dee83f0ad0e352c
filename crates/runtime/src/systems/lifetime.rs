use ability_core::clock::ClockDomain;
use ability_core::effect::tick_cooldowns;
use ability_core::graph::RegisterBanks;

use crate::error::Result;
use crate::scheduler::{SliceContext, SliceStatus, SystemGroup};
use crate::simulation::Simulation;

/// Cooldown tick-down plus FixedFrame and Step lifetime updates.
///
/// Step-domain effects update only on ticks whose commit will advance Step.
#[derive(Debug, Default)]
pub struct LifetimeSystem {
    registers: RegisterBanks,
}

impl SystemGroup for LifetimeSystem {
    fn name(&self) -> &'static str {
        "lifetime"
    }

    fn update_slice(&mut self, sim: &mut Simulation, ctx: &SliceContext) -> Result<SliceStatus> {
        let cooling = tick_cooldowns(&mut sim.world, sim.registries.cooldown_attributes());

        let frame = sim.run_lifetimes(&mut self.registers, ClockDomain::FixedFrame)?;
        let mut removed = frame.removed();
        let mut visited = frame.visited;
        if sim.clock().step_due() {
            let step = sim.run_lifetimes(&mut self.registers, ClockDomain::Step)?;
            removed += step.removed();
            visited += step.visited;
        }

        if removed > 0 {
            tracing::debug!(
                target: "runtime::lifetime",
                tick = %ctx.tick,
                visited,
                removed,
                cooling,
                "effects expired"
            );
        }
        Ok(SliceStatus::Done)
    }
}
