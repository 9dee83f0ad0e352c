//! Lifecycle phase dispatch.
//!
//! Every effect template binds up to three handlers per [`LifecyclePhase`].
//! Pre and Post are always graphs; Main is an explicit graph binding, or
//! else whatever the template's preset maps that phase to in the
//! [`PresetRegistry`], which may be a native builtin.
mod bindings;
mod builtins;
mod error;
mod executor;
mod handler;

pub use bindings::{LifecyclePhase, PhaseGraphBindings, PhaseMask, PhaseSlot};
pub use builtins::{
    BuiltinContext, BuiltinFn, BuiltinRegistry, add_attribute, apply_force_2d, send_event,
};
pub use error::PhaseError;
pub use executor::{PhaseExecutor, PhaseInvocation, PhaseReport};
pub use handler::{Handler, PresetRegistry};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{EffectRequest, EffectTemplate, ParamValue, keys};
    use crate::error::CapabilityError;
    use crate::graph::{GraphApi, GraphInstruction as I, Opcode, OpcodeTable, RegisterBanks};
    use crate::registry::Registries;
    use crate::state::{
        AttributeId, BuiltinId, EntityHandle, PresetType, ProgramId, TagId, TemplateId, World,
    };

    const TRACE: AttributeId = AttributeId(20);
    const PRE: ProgramId = ProgramId(1);
    const MAIN: ProgramId = ProgramId(2);
    const POST: ProgramId = ProgramId(3);

    /// `TRACE = TRACE * 10 + digit` on the explicit target.
    fn append_digit(digit: f32) -> Vec<I> {
        vec![
            I::new(Opcode::LoadExplicitTarget, 0, 0, 0),
            I::new(Opcode::LoadAttribute, 0, 0, 0).with_int(TRACE.0 as i32),
            I::const_float(1, 10.0),
            I::new(Opcode::Mul, 2, 0, 1),
            I::const_float(3, digit),
            I::new(Opcode::Add, 4, 2, 3),
            I::new(Opcode::WriteAttribute, 4, 0, 0).with_int(TRACE.0 as i32),
        ]
    }

    fn registries() -> Registries {
        let mut registries = Registries::new();
        for (id, digit) in [(PRE, 1.0), (MAIN, 2.0), (POST, 3.0)] {
            registries
                .register_instructions(id, append_digit(digit))
                .unwrap();
        }
        registries
    }

    fn triple(template: TemplateId) -> EffectTemplate {
        EffectTemplate::builder(template, TagId(1))
            .bind(LifecyclePhase::OnApply, PhaseSlot::Pre, PRE)
            .bind(LifecyclePhase::OnApply, PhaseSlot::Main, MAIN)
            .bind(LifecyclePhase::OnApply, PhaseSlot::Post, POST)
            .build()
    }

    fn dispatch(
        registries: &Registries,
        world: &mut World,
        template: &EffectTemplate,
        request: &EffectRequest,
        phase: LifecyclePhase,
    ) -> Result<PhaseReport, PhaseError> {
        let opcodes = OpcodeTable::standard();
        let executor = PhaseExecutor::new(registries, &opcodes);
        let mut registers = RegisterBanks::new();
        let mut api = GraphApi::new(world);
        let invocation = PhaseInvocation::from_request(template, request);
        executor.run_phase(&mut api, &mut registers, &invocation, phase)
    }

    fn setup() -> (World, EntityHandle, EntityHandle) {
        let mut world = World::new();
        let caster = world.spawn();
        let target = world.spawn();
        world.set_attribute(target, TRACE, 0.0);
        (world, caster, target)
    }

    #[test]
    fn slots_run_pre_main_post() {
        let registries = registries();
        let (mut world, caster, target) = setup();
        let template = triple(TemplateId(1));
        let request = EffectRequest::new(template.id, caster, target);

        let report = dispatch(&registries, &mut world, &template, &request, LifecyclePhase::OnApply)
            .unwrap();

        assert_eq!(world.attribute(target, TRACE), Some(123.0));
        assert_eq!(report.graphs, 3);
        assert_eq!(report.builtins, 0);
    }

    #[test]
    fn skipped_main_leaves_pre_and_post() {
        let registries = registries();
        let (mut world, caster, target) = setup();
        let mut template = triple(TemplateId(1));
        template
            .bindings
            .set_skip_main(LifecyclePhase::OnApply, true);
        let request = EffectRequest::new(template.id, caster, target);

        dispatch(&registries, &mut world, &template, &request, LifecyclePhase::OnApply).unwrap();

        assert_eq!(world.attribute(target, TRACE), Some(13.0));
    }

    #[test]
    fn unbound_phase_does_nothing() {
        let registries = registries();
        let (mut world, caster, target) = setup();
        let template = triple(TemplateId(1));
        let request = EffectRequest::new(template.id, caster, target);

        let report =
            dispatch(&registries, &mut world, &template, &request, LifecyclePhase::OnExpire)
                .unwrap();

        assert!(report.is_empty());
        assert_eq!(world.attribute(target, TRACE), Some(0.0));
    }

    #[test]
    fn preset_supplies_main_when_unbound() {
        let registries = registries();
        let (mut world, caster, target) = setup();
        let template = EffectTemplate::builder(TemplateId(2), TagId(1))
            .preset(PresetType::ADD_ATTRIBUTE)
            .param(keys::ATTRIBUTE, ParamValue::Attribute(TRACE))
            .param(keys::AMOUNT, ParamValue::Float(5.0))
            .build();
        let request = EffectRequest::new(template.id, caster, target);

        let report = dispatch(&registries, &mut world, &template, &request, LifecyclePhase::OnApply)
            .unwrap();

        assert_eq!(report.builtins, 1);
        assert_eq!(world.attribute(target, TRACE), Some(5.0));
    }

    #[test]
    fn explicit_main_overrides_the_preset() {
        let registries = registries();
        let (mut world, caster, target) = setup();
        let template = EffectTemplate::builder(TemplateId(3), TagId(1))
            .preset(PresetType::ADD_ATTRIBUTE)
            .param(keys::ATTRIBUTE, ParamValue::Attribute(TRACE))
            .param(keys::AMOUNT, ParamValue::Float(5.0))
            .bind(LifecyclePhase::OnApply, PhaseSlot::Main, MAIN)
            .build();
        let request = EffectRequest::new(template.id, caster, target);

        let opcodes = OpcodeTable::standard();
        let executor = PhaseExecutor::new(&registries, &opcodes);
        assert_eq!(
            executor.main_handler(&template, LifecyclePhase::OnApply),
            Handler::Graph(MAIN)
        );

        dispatch(&registries, &mut world, &template, &request, LifecyclePhase::OnApply).unwrap();
        assert_eq!(world.attribute(target, TRACE), Some(2.0));
    }

    #[test]
    fn caller_params_override_without_touching_the_template() {
        let registries = registries();
        let (mut world, caster, target) = setup();
        let template = EffectTemplate::builder(TemplateId(4), TagId(1))
            .preset(PresetType::ADD_ATTRIBUTE)
            .param(keys::ATTRIBUTE, ParamValue::Attribute(TRACE))
            .param(keys::AMOUNT, ParamValue::Float(5.0))
            .build();
        let request = EffectRequest::new(template.id, caster, target)
            .with_param(keys::AMOUNT, ParamValue::Float(-2.0));

        dispatch(&registries, &mut world, &template, &request, LifecyclePhase::OnApply).unwrap();

        assert_eq!(world.attribute(target, TRACE), Some(-2.0));
        assert_eq!(template.config.float(keys::AMOUNT), Some(5.0));
    }

    #[test]
    fn unregistered_builtin_is_reported() {
        let mut registries = registries();
        registries.presets_mut().set(
            PresetType(40),
            LifecyclePhase::OnHit,
            Handler::Builtin(BuiltinId(40)),
        );
        let (mut world, caster, target) = setup();
        let mut template = EffectTemplate::builder(TemplateId(5), TagId(1)).build();
        template.preset = Some(PresetType(40));
        let request = EffectRequest::new(template.id, caster, target);

        let error = dispatch(&registries, &mut world, &template, &request, LifecyclePhase::OnHit)
            .unwrap_err();

        assert_eq!(error, PhaseError::UnknownBuiltin(BuiltinId(40)));
    }

    #[test]
    fn event_builtin_without_event_bus_is_fatal() {
        let registries = registries();
        let (mut world, caster, target) = setup();
        let template = EffectTemplate::builder(TemplateId(6), TagId(1))
            .preset(PresetType::SEND_EVENT)
            .param(keys::EVENT_TAG, ParamValue::Int(7))
            .build();
        let request = EffectRequest::new(template.id, caster, target);

        let error = dispatch(&registries, &mut world, &template, &request, LifecyclePhase::OnApply)
            .unwrap_err();

        assert!(error.is_capability());
        assert_eq!(
            error,
            PhaseError::Capability(CapabilityError::EventsNotAvailable)
        );
    }
}
