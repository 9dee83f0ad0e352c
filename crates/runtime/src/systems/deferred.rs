use ability_core::chain::TelemetryKind;
use ability_core::state::collect_changes;

use crate::error::Result;
use crate::scheduler::{SliceContext, SliceStatus, SystemGroup};
use crate::simulation::Simulation;

/// End-of-tick bookkeeping: dirty diffs become change events, window
/// telemetry is logged and drained, and new capacity drops are reported.
#[derive(Debug, Default)]
pub struct DeferredTriggerSystem {
    change_events: u64,
    telemetry_records: u64,
    seen_chain_drops: u64,
    seen_event_drops: u64,
    seen_request_drops: u64,
}

impl DeferredTriggerSystem {
    /// Change events emitted since construction.
    pub fn change_events(&self) -> u64 {
        self.change_events
    }

    pub fn telemetry_records(&self) -> u64 {
        self.telemetry_records
    }
}

impl SystemGroup for DeferredTriggerSystem {
    fn name(&self) -> &'static str {
        "deferred_trigger"
    }

    fn update_slice(&mut self, sim: &mut Simulation, ctx: &SliceContext) -> Result<SliceStatus> {
        let changes = collect_changes(&mut sim.world, &mut sim.events);
        self.change_events += changes.events as u64;
        if changes.dropped > 0 {
            tracing::warn!(
                target: "runtime::telemetry",
                tick = %ctx.tick,
                dropped = changes.dropped,
                "event buffer full, change events dropped"
            );
        }

        for record in sim.chain.telemetry_mut().drain() {
            self.telemetry_records += 1;
            let kind: &'static str = record.kind.into();
            match record.kind {
                TelemetryKind::ResponseDropped | TelemetryKind::WindowTimedOut => {
                    tracing::warn!(
                        target: "runtime::telemetry",
                        tick = %record.tick,
                        root = %record.root,
                        template = %record.template,
                        depth = record.depth,
                        kind,
                        "response chain"
                    );
                }
                _ => {
                    tracing::debug!(
                        target: "runtime::telemetry",
                        tick = %record.tick,
                        root = %record.root,
                        template = %record.template,
                        depth = record.depth,
                        kind,
                        "response chain"
                    );
                }
            }
        }

        let chain_drops = sim.chain.budget().dropped + sim.chain.budget().prompts_dropped;
        if chain_drops > self.seen_chain_drops {
            tracing::warn!(
                target: "runtime::telemetry",
                tick = %ctx.tick,
                new = chain_drops - self.seen_chain_drops,
                "chain budget discarded responses"
            );
            self.seen_chain_drops = chain_drops;
        }
        let event_drops = sim.events.dropped();
        if event_drops > self.seen_event_drops {
            tracing::warn!(
                target: "runtime::telemetry",
                tick = %ctx.tick,
                new = event_drops - self.seen_event_drops,
                "event buffer rejected events"
            );
            self.seen_event_drops = event_drops;
        }
        let request_drops = sim.requests.dropped();
        if request_drops > self.seen_request_drops {
            tracing::warn!(
                target: "runtime::telemetry",
                tick = %ctx.tick,
                new = request_drops - self.seen_request_drops,
                "request queue rejected requests"
            );
            self.seen_request_drops = request_drops;
        }
        Ok(SliceStatus::Done)
    }
}
