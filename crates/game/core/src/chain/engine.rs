use arrayvec::ArrayVec;

use crate::clock::Tick;
use crate::config::{ChainConfig, CoreConfig, PromptTimeout, TimeoutFallback};
use crate::effect::cost::{can_afford, cooldown_ready, reset_cooldown, try_pay};
use crate::effect::{EffectRequest, EffectTemplate, GameplayEffect};
use crate::env::{
    Decision, DecisionOrder, EventBuffer, EventKind, GameplayEvent, OrderQueue, OrderRequest,
    RequestQueue, SpatialQuery,
};
use crate::graph::{GraphApi, OpcodeTable, RegisterBanks, TriggerContext};
use crate::phase::{LifecyclePhase, PhaseExecutor, PhaseInvocation};
use crate::registry::Registries;
use crate::state::{EntityHandle, EventTag, PlayerId, TemplateId, World};

use super::{
    ChainBudget, ChainEntry, ChainError, ProposalWindow, PromptSlot, ResponseChainListener,
    ResponseKind, TelemetryBuffer, TelemetryKind, TelemetryRecord, WindowState,
};

/// Everything the engine touches during one slice.
pub struct ChainEnv<'a> {
    pub world: &'a mut World,
    pub registries: &'a Registries,
    pub opcodes: &'a OpcodeTable,
    pub spatial: Option<&'a dyn SpatialQuery>,
    pub requests: &'a mut RequestQueue,
    pub events: &'a mut EventBuffer,
    pub orders: &'a mut OrderQueue,
    /// Current FixedFrame tick, used for prompt timeouts.
    pub now: Tick,
}

impl ChainEnv<'_> {
    fn api(&mut self) -> GraphApi<'_> {
        GraphApi {
            world: &mut *self.world,
            spatial: self.spatial,
            events: Some(&mut *self.events),
            requests: Some(&mut *self.requests),
        }
    }
}

/// Whether a slice finished the tick's batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliceStatus {
    Done,
    /// Work units ran out; call again to resume at the next request.
    Yield,
}

impl SliceStatus {
    pub fn is_done(self) -> bool {
        self == SliceStatus::Done
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
enum Rejection {
    UnknownTemplate,
    StaleHandle,
    Cooldown,
    Cost,
    Gate,
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    priority: i16,
    participant: usize,
    slot: usize,
    owner: EntityHandle,
    listener: ResponseChainListener,
}

/// Proposal window state machine: `Idle → Collect → Wait → Resolve → Idle`.
///
/// Each request popped from the [`RequestQueue`] is one work unit. A unit
/// runs to completion inside [`update_slice`](Self::update_slice) unless its
/// window has to wait for decisions, in which case the window stays open
/// across ticks and later requests stay queued until it closes.
#[derive(Debug)]
pub struct ResponseChainEngine {
    config: ChainConfig,
    window: ProposalWindow,
    budget: ChainBudget,
    telemetry: TelemetryBuffer,
    registers: RegisterBanks,
    batch_remaining: usize,
    processed: u64,
}

impl Default for ResponseChainEngine {
    fn default() -> Self {
        Self::new(ChainConfig::default())
    }
}

impl ResponseChainEngine {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            config: config.with_max_depth(config.max_depth),
            window: ProposalWindow::new(),
            budget: ChainBudget::default(),
            telemetry: TelemetryBuffer::new(),
            registers: RegisterBanks::new(),
            batch_remaining: 0,
            processed: 0,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn window(&self) -> &ProposalWindow {
        &self.window
    }

    pub fn budget(&self) -> &ChainBudget {
        &self.budget
    }

    pub fn telemetry(&self) -> &TelemetryBuffer {
        &self.telemetry
    }

    pub fn telemetry_mut(&mut self) -> &mut TelemetryBuffer {
        &mut self.telemetry
    }

    pub fn is_waiting(&self) -> bool {
        self.window.state() == WindowState::Wait
    }

    /// Requests of the current batch not yet consumed.
    pub fn batch_remaining(&self) -> usize {
        self.batch_remaining
    }

    /// Requests consumed since construction.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Fixes this tick's batch to the requests queued right now.
    ///
    /// Requests published while the batch is processed wait for the next tick.
    pub fn begin_tick(&mut self, requests: &RequestQueue) {
        self.batch_remaining = requests.len();
    }

    /// Discards scratch state before a resumed slice.
    ///
    /// Consumed requests are gone from the queue, so resuming re-enters at the
    /// first unconsumed one. A waiting window is kept.
    pub fn reset_slice(&mut self) {
        self.registers.reset();
    }

    /// Processes up to `max_units` requests of the current batch.
    pub fn update_slice(
        &mut self,
        env: &mut ChainEnv<'_>,
        max_units: usize,
    ) -> Result<SliceStatus, ChainError> {
        let max_units = max_units.max(1);
        let mut units = 0;
        loop {
            if self.window.state() == WindowState::Wait {
                self.poll_wait(env)?;
                if self.window.state() == WindowState::Wait {
                    return Ok(SliceStatus::Done);
                }
            }
            if self.batch_remaining == 0 {
                return Ok(SliceStatus::Done);
            }
            if units >= max_units {
                tracing::debug!(
                    target: "core::chain",
                    units,
                    remaining = self.batch_remaining,
                    "proposal slice yielded"
                );
                return Ok(SliceStatus::Yield);
            }
            let Some(request) = env.requests.pop() else {
                self.batch_remaining = 0;
                return Ok(SliceStatus::Done);
            };
            self.batch_remaining -= 1;
            self.processed += 1;
            units += 1;
            self.propose(env, request)?;
        }
    }

    // ===== collect =====

    fn propose(&mut self, env: &mut ChainEnv<'_>, request: EffectRequest) -> Result<(), ChainError> {
        let registries = env.registries;
        let Some(template) = registries.template(request.template) else {
            self.reject(&request, Rejection::UnknownTemplate);
            return Ok(());
        };
        let context = TriggerContext {
            source: request.source,
            target: request.target,
            target_context: request.target_context,
        };
        if !self.admit(env, template, &request, context)? {
            return Ok(());
        }

        let root = ChainEntry {
            request,
            context,
            depth: 0,
            negated: false,
        };
        self.window.open(root, env.now);
        self.budget.windows_opened += 1;
        self.record(env.now, TelemetryKind::WindowOpened, template.id, 0);
        tracing::debug!(
            target: "core::chain",
            root = %self.window.root(),
            template = %template.id,
            "proposal window opened"
        );

        self.run_entry_phase(env, 0, LifecyclePhase::OnPropose)?;
        self.collect(env)?;
        if self.window.is_satisfied() {
            self.resolve(env)
        } else {
            self.window.set_state(WindowState::Wait);
            tracing::debug!(
                target: "core::chain",
                root = %self.window.root(),
                expected = self.window.expected(),
                "proposal window waiting for decisions"
            );
            Ok(())
        }
    }

    /// Breadth-first listener collection over every uncollected entry.
    fn collect(&mut self, env: &mut ChainEnv<'_>) -> Result<(), ChainError> {
        let registries = env.registries;
        while let Some(index) = self.window.next_uncollected() {
            let entry = &self.window.entries()[index];
            let Some(template) = registries.template(entry.request.template) else {
                continue;
            };

            let mut candidates: ArrayVec<Candidate, { 3 * CoreConfig::MAX_LISTENERS }> =
                ArrayVec::new();
            for (participant, owner) in participants(&entry.request).into_iter().enumerate() {
                let Some(record) = env.world.get(owner) else {
                    continue;
                };
                for (slot, listener) in record.listeners.matching(template.tag) {
                    // Three participants of at most MAX_LISTENERS each always fit.
                    let _ = candidates.try_push(Candidate {
                        priority: listener.priority,
                        participant,
                        slot,
                        owner,
                        listener: *listener,
                    });
                }
            }
            candidates.sort_unstable_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then(a.participant.cmp(&b.participant))
                    .then(a.slot.cmp(&b.slot))
            });

            for candidate in candidates {
                match candidate.listener.response {
                    ResponseKind::Chain => {
                        self.add_response(env, index, candidate.owner, candidate.listener.payload)?;
                    }
                    ResponseKind::PromptInput => self.raise_prompt(env, index, candidate.owner),
                }
            }
        }
        Ok(())
    }

    /// Queues `payload` as a response to entry `trigger`, subject to the
    /// depth and capacity budget.
    fn add_response(
        &mut self,
        env: &mut ChainEnv<'_>,
        trigger: usize,
        owner: EntityHandle,
        payload: TemplateId,
    ) -> Result<(), ChainError> {
        let triggering = &self.window.entries()[trigger];
        let depth = triggering.depth + 1;
        let context = TriggerContext {
            source: triggering.request.source,
            target: triggering.request.target,
            target_context: triggering.request.target_context,
        };
        let request = EffectRequest::new(payload, owner, context.source)
            .with_root(self.window.root())
            .with_context(context.target);

        if depth > self.config.max_depth || !self.window.has_capacity() {
            self.budget.dropped += 1;
            self.record(env.now, TelemetryKind::ResponseDropped, payload, depth);
            tracing::warn!(
                target: "core::chain",
                root = %self.window.root(),
                template = %payload,
                depth,
                "chain response over budget, dropping"
            );
            return Ok(());
        }

        let registries = env.registries;
        let Some(template) = registries.template(payload) else {
            self.reject(&request, Rejection::UnknownTemplate);
            return Ok(());
        };
        if !self.admit(env, template, &request, context)? {
            return Ok(());
        }

        self.window.push_entry(ChainEntry {
            request,
            context,
            depth,
            negated: false,
        });
        self.budget.note_depth(depth);
        self.record(env.now, TelemetryKind::ResponseAdded, payload, depth);
        let index = self.window.entries().len() - 1;
        self.run_entry_phase(env, index, LifecyclePhase::OnPropose)
    }

    fn raise_prompt(&mut self, env: &mut ChainEnv<'_>, trigger: usize, owner: EntityHandle) {
        let entry = &self.window.entries()[trigger];
        let template = entry.request.template;
        let depth = entry.depth;
        let player = env
            .world
            .get(owner)
            .and_then(|record| record.player)
            .unwrap_or(PlayerId::AI);

        let delivered = self.window.has_prompt_capacity()
            && env.orders.request(OrderRequest {
                root: self.window.root(),
                player,
                responder: owner,
                prompt_tag: template,
                expected: self.window.expected() as u32 + 1,
            });
        if !delivered {
            self.budget.prompts_dropped += 1;
            tracing::warn!(
                target: "core::chain",
                root = %self.window.root(),
                %player,
                "prompt could not be raised, dropping"
            );
            return;
        }
        self.window.push_prompt(PromptSlot {
            player,
            responder: owner,
            entry: trigger as u8,
            answered: false,
        });
        self.record(env.now, TelemetryKind::PromptRaised, template, depth);
    }

    // ===== wait =====

    fn poll_wait(&mut self, env: &mut ChainEnv<'_>) -> Result<(), ChainError> {
        let root = self.window.root();
        while !self.window.is_satisfied() {
            let Some(order) = env.orders.take_for(root) else {
                break;
            };
            self.apply_decision(env, order)?;
        }

        if !self.window.is_satisfied() {
            let PromptTimeout::AfterTicks { ticks, fallback } = self.config.prompt_timeout else {
                return Ok(());
            };
            if env.now.since(self.window.opened_at()) < u64::from(ticks) {
                return Ok(());
            }
            let challenged = self.window.answer_all();
            let missing = challenged.len();
            if fallback == TimeoutFallback::Negate {
                for &index in &challenged {
                    if self.window.negate(index as usize) {
                        self.budget.negated += 1;
                    }
                }
            }
            self.budget.timeouts += 1;
            let template = self.window.entries()[0].request.template;
            self.record(env.now, TelemetryKind::WindowTimedOut, template, 0);
            tracing::debug!(
                target: "core::chain",
                %root,
                missing,
                ?fallback,
                "prompt window timed out"
            );
        }

        if self.window.is_satisfied() {
            self.resolve(env)?;
        }
        Ok(())
    }

    fn apply_decision(
        &mut self,
        env: &mut ChainEnv<'_>,
        order: DecisionOrder,
    ) -> Result<(), ChainError> {
        let Some(prompt) = self.window.answer(order.player) else {
            self.budget.orders_ignored += 1;
            tracing::debug!(
                target: "core::chain",
                root = %order.root,
                player = %order.player,
                "no open prompt for player, ignoring decision"
            );
            return Ok(());
        };
        match order.decision {
            Decision::Pass => {}
            Decision::Negate => {
                if self.window.negate(prompt.entry as usize) {
                    self.budget.negated += 1;
                }
            }
            Decision::ActivateEffect(template) => {
                self.add_response(env, prompt.entry as usize, prompt.responder, template)?;
                self.collect(env)?;
            }
        }
        Ok(())
    }

    // ===== resolve =====

    /// Applies live responses newest-first, then the root, and closes the window.
    fn resolve(&mut self, env: &mut ChainEnv<'_>) -> Result<(), ChainError> {
        self.window.set_state(WindowState::Resolve);
        for index in (0..self.window.entries().len()).rev() {
            let entry = self.window.entries()[index].clone();
            if entry.negated {
                continue;
            }
            self.commit(env, &entry)?;
        }

        let root = self.window.root();
        let template = self.window.entries()[0].request.template;
        let responses = self.window.responses();
        env.orders.discard_for(root);
        self.budget.windows_closed += 1;
        self.record(env.now, TelemetryKind::WindowClosed, template, 0);
        tracing::debug!(
            target: "core::chain",
            %root,
            responses,
            "proposal window closed"
        );
        self.window.clear();
        Ok(())
    }

    /// Runs one entry through `Pending → Trigger → Calculate → Apply → Committed`.
    ///
    /// Phases run in declaration order: OnCalculate, OnResolve and OnHit
    /// during Calculate, then OnApply once the effect is applied.
    fn commit(&mut self, env: &mut ChainEnv<'_>, entry: &ChainEntry) -> Result<(), ChainError> {
        let registries = env.registries;
        let request = &entry.request;
        let Some(template) = registries.template(request.template) else {
            self.budget.fizzled += 1;
            return Ok(());
        };
        let invocation = PhaseInvocation::from_request(template, request).with_context(entry.context);
        let mut effect = GameplayEffect::from_request(template, request);

        effect.advance_state();
        if !ready(env.world, template, request) {
            self.fizzle(request);
            return Ok(());
        }

        // Listeners already triggered when the window collected this entry.
        effect.advance_state();

        effect.advance_state();
        self.run_phase(env, &invocation, LifecyclePhase::OnCalculate)?;
        self.run_phase(env, &invocation, LifecyclePhase::OnResolve)?;
        self.run_phase(env, &invocation, LifecyclePhase::OnHit)?;

        effect.advance_state();
        if let Some(cost) = &template.cost {
            if !try_pay(env.world, request.source, cost) {
                self.fizzle(request);
                return Ok(());
            }
        }
        if let Some(cooldown) = &template.cooldown {
            reset_cooldown(env.world, request.source, cooldown);
        }

        effect.advance_state();
        if template.lifetime.is_durational() {
            if env.world.add_effect(effect).is_none() {
                self.budget.effects_dropped += 1;
                tracing::warn!(
                    target: "core::chain",
                    template = %template.id,
                    entity = %request.target,
                    "active effect container full, dropping effect"
                );
            }
        } else {
            env.world.apply_instant(request.target, &template.modifiers);
        }
        self.run_phase(env, &invocation, LifecyclePhase::OnApply)?;
        env.events.publish(GameplayEvent {
            tag: EventTag::EFFECT_APPLIED,
            kind: EventKind::EffectApplied(template.id),
            source: request.source,
            target: request.target,
            magnitude: 0.0,
        });

        self.budget.committed += 1;
        tracing::trace!(
            target: "core::chain",
            root = %request.root,
            template = %template.id,
            entity = %request.target,
            "effect committed"
        );
        Ok(())
    }

    // ===== helpers =====

    /// Pending-stage checks for a new proposal. Failures are counted.
    fn admit(
        &mut self,
        env: &mut ChainEnv<'_>,
        template: &EffectTemplate,
        request: &EffectRequest,
        context: TriggerContext,
    ) -> Result<bool, ChainError> {
        let rejection = if !handles_alive(env.world, request) {
            Some(Rejection::StaleHandle)
        } else if template
            .cooldown
            .is_some_and(|cooldown| !cooldown_ready(env.world, request.source, &cooldown))
        {
            Some(Rejection::Cooldown)
        } else if template
            .cost
            .is_some_and(|cost| !can_afford(env.world, request.source, &cost))
        {
            Some(Rejection::Cost)
        } else {
            None
        };
        if let Some(rejection) = rejection {
            self.reject(request, rejection);
            return Ok(false);
        }

        if template.gate.is_some() {
            let invocation = PhaseInvocation::from_request(template, request).with_context(context);
            let executor = PhaseExecutor::new(env.registries, env.opcodes);
            let mut api = env.api();
            if !executor.run_gate(&mut api, &mut self.registers, &invocation)? {
                self.reject(request, Rejection::Gate);
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn run_entry_phase(
        &mut self,
        env: &mut ChainEnv<'_>,
        index: usize,
        phase: LifecyclePhase,
    ) -> Result<(), ChainError> {
        let registries = env.registries;
        let entry = self.window.entries()[index].clone();
        let Some(template) = registries.template(entry.request.template) else {
            return Ok(());
        };
        let invocation =
            PhaseInvocation::from_request(template, &entry.request).with_context(entry.context);
        self.run_phase(env, &invocation, phase)
    }

    fn run_phase(
        &mut self,
        env: &mut ChainEnv<'_>,
        invocation: &PhaseInvocation<'_>,
        phase: LifecyclePhase,
    ) -> Result<(), ChainError> {
        let executor = PhaseExecutor::new(env.registries, env.opcodes);
        let mut api = env.api();
        executor.run_phase(&mut api, &mut self.registers, invocation, phase)?;
        Ok(())
    }

    fn reject(&mut self, request: &EffectRequest, rejection: Rejection) {
        self.budget.rejected += 1;
        let reason: &'static str = rejection.into();
        match rejection {
            Rejection::UnknownTemplate | Rejection::StaleHandle => tracing::warn!(
                target: "core::chain",
                template = %request.template,
                entity = %request.target,
                reason,
                "request rejected"
            ),
            Rejection::Cooldown | Rejection::Cost | Rejection::Gate => tracing::debug!(
                target: "core::chain",
                template = %request.template,
                entity = %request.target,
                reason,
                "request rejected"
            ),
        }
    }

    fn fizzle(&mut self, request: &EffectRequest) {
        self.budget.fizzled += 1;
        tracing::debug!(
            target: "core::chain",
            template = %request.template,
            entity = %request.target,
            "response fizzled at resolve"
        );
    }

    fn record(&mut self, tick: Tick, kind: TelemetryKind, template: TemplateId, depth: u8) {
        self.telemetry.record(TelemetryRecord {
            kind,
            tick,
            root: self.window.root(),
            template,
            depth,
        });
    }
}

/// Distinct, non-null participants in source, target, context order.
fn participants(request: &EffectRequest) -> ArrayVec<EntityHandle, 3> {
    let mut out = ArrayVec::new();
    for handle in [request.source, request.target, request.target_context] {
        if !handle.is_null() && !out.contains(&handle) {
            out.push(handle);
        }
    }
    out
}

/// The target must be alive; a non-null source must be too.
fn handles_alive(world: &World, request: &EffectRequest) -> bool {
    world.is_alive(request.target) && (request.source.is_null() || world.is_alive(request.source))
}

/// Resolve-time re-check of the Pending conditions, without the gate.
fn ready(world: &World, template: &EffectTemplate, request: &EffectRequest) -> bool {
    handles_alive(world, request)
        && template
            .cooldown
            .is_none_or(|cooldown| cooldown_ready(world, request.source, &cooldown))
        && template
            .cost
            .is_none_or(|cost| can_afford(world, request.source, &cost))
}
