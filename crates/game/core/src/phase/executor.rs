use crate::effect::{
    CallerParams, ConfigParams, EffectRequest, EffectTemplate, GameplayEffect, merged_view,
};
use crate::graph::{
    GraphApi, GraphExecutionState, OpcodeTable, RegisterBanks, TriggerContext, execute,
    execute_validation,
};
use crate::registry::Registries;
use crate::state::{BuiltinId, EntityHandle, ProgramId, RootId, Vec2};

use super::{BuiltinContext, Handler, LifecyclePhase, PhaseError, PhaseSlot};

/// One effect's participants and parameters for a phase dispatch.
#[derive(Clone, Copy, Debug)]
pub struct PhaseInvocation<'t> {
    pub template: &'t EffectTemplate,
    pub caller: &'t CallerParams,
    pub source: EntityHandle,
    pub target: EntityHandle,
    pub target_context: EntityHandle,
    pub context: TriggerContext,
    pub root: RootId,
}

impl<'t> PhaseInvocation<'t> {
    pub fn from_request(template: &'t EffectTemplate, request: &'t EffectRequest) -> Self {
        Self {
            template,
            caller: &request.params,
            source: request.source,
            target: request.target,
            target_context: request.target_context,
            context: TriggerContext {
                source: request.source,
                target: request.target,
                target_context: request.target_context,
            },
            root: request.root,
        }
    }

    pub fn from_effect(template: &'t EffectTemplate, effect: &'t GameplayEffect) -> Self {
        Self {
            template,
            caller: &effect.params,
            source: effect.source,
            target: effect.target,
            target_context: effect.target_context,
            context: TriggerContext {
                source: effect.source,
                target: effect.target,
                target_context: effect.target_context,
            },
            root: effect.root,
        }
    }

    /// Replaces the trigger context with the effect that caused this one.
    pub fn with_context(mut self, context: TriggerContext) -> Self {
        self.context = context;
        self
    }
}

/// Work done by one [`PhaseExecutor::run_phase`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhaseReport {
    pub graphs: u8,
    pub builtins: u8,
    pub steps: u32,
    /// Spatial matches that did not fit a target register.
    pub query_dropped: u32,
}

impl PhaseReport {
    pub fn is_empty(&self) -> bool {
        self.graphs == 0 && self.builtins == 0
    }
}

/// Dispatches the Pre/Main/Post triple of a lifecycle phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseExecutor<'r> {
    registries: &'r Registries,
    opcodes: &'r OpcodeTable,
}

impl<'r> PhaseExecutor<'r> {
    pub fn new(registries: &'r Registries, opcodes: &'r OpcodeTable) -> Self {
        Self {
            registries,
            opcodes,
        }
    }

    pub fn registries(&self) -> &'r Registries {
        self.registries
    }

    /// Runs Pre, then Main unless the phase skips it, then Post.
    ///
    /// Each slot is optional. Handlers see the template config merged with
    /// the invocation's caller params.
    pub fn run_phase(
        &self,
        api: &mut GraphApi<'_>,
        registers: &mut RegisterBanks,
        invocation: &PhaseInvocation<'_>,
        phase: LifecyclePhase,
    ) -> Result<PhaseReport, PhaseError> {
        let params = merged_view(&invocation.template.config, invocation.caller);
        let bindings = &invocation.template.bindings;
        let mut report = PhaseReport::default();

        if let Some(program) = bindings.get(phase, PhaseSlot::Pre) {
            self.run_graph(api, registers, &params, invocation, program, &mut report)?;
        }
        if !bindings.skips_main(phase) {
            match self.main_handler(invocation.template, phase) {
                Handler::Graph(program) => {
                    self.run_graph(api, registers, &params, invocation, program, &mut report)?;
                }
                Handler::Builtin(builtin) => {
                    self.run_builtin(api, &params, invocation, builtin)?;
                    report.builtins += 1;
                }
                Handler::None => {}
            }
        }
        if let Some(program) = bindings.get(phase, PhaseSlot::Post) {
            self.run_graph(api, registers, &params, invocation, program, &mut report)?;
        }

        if !report.is_empty() {
            tracing::trace!(
                target: "core::phase",
                phase = phase.as_str(),
                template = %invocation.template.id,
                graphs = report.graphs,
                builtins = report.builtins,
                steps = report.steps,
                "phase dispatched"
            );
        }
        Ok(report)
    }

    /// Main-slot handler: explicit binding, then preset entry, then none.
    pub fn main_handler(&self, template: &EffectTemplate, phase: LifecyclePhase) -> Handler {
        if let Some(program) = template.bindings.get(phase, PhaseSlot::Main) {
            return Handler::Graph(program);
        }
        template.preset.map_or(Handler::None, |preset| {
            self.registries.presets().resolve(preset, phase)
        })
    }

    /// Runs the template's gate program, if any. No gate always passes.
    pub fn run_gate(
        &self,
        api: &mut GraphApi<'_>,
        registers: &mut RegisterBanks,
        invocation: &PhaseInvocation<'_>,
    ) -> Result<bool, PhaseError> {
        let Some(gate) = invocation.template.gate else {
            return Ok(true);
        };
        let program = self
            .registries
            .program(gate)
            .ok_or(PhaseError::UnknownProgram(gate))?;
        let params = merged_view(&invocation.template.config, invocation.caller);
        registers.reset();
        let position = target_position(api, invocation.target);
        let mut state = GraphExecutionState::new(api.reborrow(), registers, &params)
            .with_participants(invocation.source, invocation.target, invocation.target_context)
            .with_context(invocation.context)
            .with_target_position(position)
            .with_root(invocation.root);
        Ok(execute_validation(&mut state, program, self.opcodes)?)
    }

    fn run_graph(
        &self,
        api: &mut GraphApi<'_>,
        registers: &mut RegisterBanks,
        params: &ConfigParams,
        invocation: &PhaseInvocation<'_>,
        id: ProgramId,
        report: &mut PhaseReport,
    ) -> Result<(), PhaseError> {
        let program = self
            .registries
            .program(id)
            .ok_or(PhaseError::UnknownProgram(id))?;
        registers.reset();
        let position = target_position(api, invocation.target);
        let mut state = GraphExecutionState::new(api.reborrow(), registers, params)
            .with_participants(invocation.source, invocation.target, invocation.target_context)
            .with_context(invocation.context)
            .with_target_position(position)
            .with_root(invocation.root);
        let executed = execute(&mut state, program, self.opcodes)?;
        report.graphs += 1;
        report.steps += executed.steps;
        report.query_dropped += state.query_dropped;
        Ok(())
    }

    fn run_builtin(
        &self,
        api: &mut GraphApi<'_>,
        params: &ConfigParams,
        invocation: &PhaseInvocation<'_>,
        id: BuiltinId,
    ) -> Result<(), PhaseError> {
        let handler = self
            .registries
            .builtins()
            .get(id)
            .ok_or(PhaseError::UnknownBuiltin(id))?;
        let mut ctx = BuiltinContext {
            api: api.reborrow(),
            params,
            source: invocation.source,
            target: invocation.target,
            target_context: invocation.target_context,
            root: invocation.root,
        };
        handler(&mut ctx)
    }
}

fn target_position(api: &GraphApi<'_>, target: EntityHandle) -> Vec2 {
    api.spatial
        .and_then(|spatial| spatial.position(target))
        .or_else(|| api.world.position(target))
        .unwrap_or(Vec2::ZERO)
}
