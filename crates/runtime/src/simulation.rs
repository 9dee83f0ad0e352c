//! Authoritative simulation state.
//!
//! [`Simulation`] owns the world, the load-time registries and every bounded
//! buffer the core borrows during a tick. System groups mutate it one slice
//! at a time; [`Simulation::commit_tick`] is the only place a clock domain
//! advances.

use ability_core::chain::{ChainEnv, ChainError, ResponseChainEngine, SliceStatus};
use ability_core::clock::{ClockDomain, ClockDomains, StepPolicy, Tick};
use ability_core::effect::{EffectRequest, LifetimeEnv, LifetimeReport, update_lifetimes};
use ability_core::env::{DecisionOrder, EventBuffer, OrderQueue, RequestQueue};
use ability_core::graph::{OpcodeTable, RegisterBanks};
use ability_core::phase::PhaseError;
use ability_core::registry::Registries;
use ability_core::state::{RootId, World};

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::events::EventHistory;
use crate::spatial::SpatialGrid;

/// Clock values after a committed tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitReport {
    pub fixed_frame: Tick,
    pub step: Tick,
    /// Step ticks this commit advanced.
    pub steps: u64,
    pub events: usize,
}

#[derive(Debug)]
pub struct Simulation {
    config: RuntimeConfig,
    pub(crate) world: World,
    pub(crate) registries: Registries,
    pub(crate) opcodes: OpcodeTable,
    pub(crate) requests: RequestQueue,
    pub(crate) events: EventBuffer,
    pub(crate) orders: OrderQueue,
    pub(crate) spatial: SpatialGrid,
    pub(crate) chain: ResponseChainEngine,
    clock: ClockDomains,
    /// Policy waiting for the next tick to begin.
    pending_policy: Option<StepPolicy>,
    history: EventHistory,
}

impl Simulation {
    pub fn new(config: RuntimeConfig, registries: Registries) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            world: World::new(),
            registries,
            opcodes: OpcodeTable::standard(),
            requests: RequestQueue::with_capacity(config.request_capacity),
            events: EventBuffer::with_capacity(config.event_capacity),
            orders: OrderQueue::with_capacity(config.order_capacity),
            spatial: SpatialGrid::new(config.spatial_cell_size),
            chain: ResponseChainEngine::new(config.chain),
            clock: ClockDomains::new(config.step_policy()),
            pending_policy: None,
            history: EventHistory::with_capacity(config.event_history),
        })
    }

    /// Replaces the opcode table, e.g. with custom handlers registered.
    pub fn with_opcodes(mut self, opcodes: OpcodeTable) -> Self {
        self.opcodes = opcodes;
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn chain(&self) -> &ResponseChainEngine {
        &self.chain
    }

    pub fn spatial(&self) -> &SpatialGrid {
        &self.spatial
    }

    pub fn clock(&self) -> &ClockDomains {
        &self.clock
    }

    pub fn now(&self) -> Tick {
        self.clock.fixed_frame()
    }

    /// Queues a new step ratio for the next logical tick.
    ///
    /// A tick always checks and advances Step under one policy, so a change
    /// made while a tick is in flight (or suspended) waits for it to commit.
    /// Committed ticks are kept.
    pub fn set_step_policy(&mut self, policy: StepPolicy) {
        self.pending_policy = Some(policy);
    }

    pub fn pending_step_policy(&self) -> Option<StepPolicy> {
        self.pending_policy
    }

    /// Starts a logical tick, applying any queued step policy.
    pub fn begin_tick(&mut self) {
        if let Some(policy) = self.pending_policy.take() {
            tracing::debug!(
                target: "runtime::simulation",
                tick = %self.clock.fixed_frame(),
                frames_per_step = policy.frames_per_step(),
                "step policy applied"
            );
            self.clock.set_step_policy(policy);
        }
    }

    pub fn requests(&self) -> &RequestQueue {
        &self.requests
    }

    /// Events published during the tick in progress.
    pub fn pending_events(&self) -> &EventBuffer {
        &self.events
    }

    pub fn history(&self) -> &EventHistory {
        &self.history
    }

    pub fn orders(&self) -> &OrderQueue {
        &self.orders
    }

    pub fn orders_mut(&mut self) -> &mut OrderQueue {
        &mut self.orders
    }

    /// Queues a request for the next proposal pass. `None` when the queue is full.
    pub fn publish(&mut self, request: EffectRequest) -> Option<RootId> {
        self.requests.publish(request)
    }

    /// Delivers a prompt decision to the order channel.
    pub fn submit_order(&mut self, order: DecisionOrder) -> bool {
        let accepted = self.orders.submit(order);
        if !accepted {
            tracing::warn!(
                target: "runtime::simulation",
                root = %order.root,
                "order channel full, dropping decision"
            );
        }
        accepted
    }

    pub fn state_digest(&self) -> [u8; 32] {
        self.world.state_digest()
    }

    /// Archives the tick's events and advances FixedFrame by one.
    pub fn commit_tick(&mut self) -> CommitReport {
        let tick = self.clock.fixed_frame();
        let events = self.history.archive(tick, &mut self.events);
        let steps = self.clock.advance_fixed_frames(1);
        let report = CommitReport {
            fixed_frame: self.clock.fixed_frame(),
            step: self.clock.step(),
            steps,
            events,
        };
        tracing::trace!(
            target: "runtime::simulation",
            fixed_frame = %report.fixed_frame,
            step = %report.step,
            events,
            "tick committed"
        );
        report
    }

    pub(crate) fn begin_chain_tick(&mut self) {
        self.chain.begin_tick(&self.requests);
    }

    pub(crate) fn run_chain_slice(
        &mut self,
        max_units: usize,
    ) -> std::result::Result<SliceStatus, ChainError> {
        let mut env = ChainEnv {
            world: &mut self.world,
            registries: &self.registries,
            opcodes: &self.opcodes,
            spatial: Some(&self.spatial),
            requests: &mut self.requests,
            events: &mut self.events,
            orders: &mut self.orders,
            now: self.clock.fixed_frame(),
        };
        self.chain.update_slice(&mut env, max_units)
    }

    pub(crate) fn run_lifetimes(
        &mut self,
        registers: &mut RegisterBanks,
        domain: ClockDomain,
    ) -> std::result::Result<LifetimeReport, PhaseError> {
        let mut env = LifetimeEnv {
            world: &mut self.world,
            registries: &self.registries,
            opcodes: &self.opcodes,
            spatial: Some(&self.spatial),
            requests: &mut self.requests,
            events: &mut self.events,
        };
        update_lifetimes(&mut env, registers, domain)
    }
}
