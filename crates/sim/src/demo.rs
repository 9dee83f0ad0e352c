//! Demo arena: a grid of duelists trading strikes, wards and novas.

use ability_core::chain::ResponseChainListener;
use ability_core::clock::ClockDomain;
use ability_core::effect::{
    EffectRequest, EffectTemplate, ExpireCondition, ModifierOp, ParamValue, keys,
};
use ability_core::env::{Decision, DecisionOrder};
use ability_core::graph::{GraphInstruction as I, Opcode};
use ability_core::phase::{LifecyclePhase, PhaseSlot};
use ability_core::registry::{Registries, RegistryError};
use ability_core::state::{
    AttributeId, EntityHandle, PlayerId, PresetType, ProgramId, TagId, TemplateId, Vec2,
};
use ability_runtime::{
    Pacemaker, Result, RuntimeConfig, SliceContext, SliceStatus, Simulation, SystemGroup,
};

pub const HEALTH: AttributeId = AttributeId(10);
pub const WARD: AttributeId = AttributeId(11);
pub const NOVA_COOLDOWN: AttributeId = AttributeId(12);

const STRIKE: TagId = TagId(1);
const RALLY: TagId = TagId(7);

const HIT: TemplateId = TemplateId(1);
const RIPOSTE: TemplateId = TemplateId(2);
const WARDED: TemplateId = TemplateId(3);
const PUSH: TemplateId = TemplateId(4);
const NOVA: TemplateId = TemplateId(5);
const SCORCH: TemplateId = TemplateId(6);
const BANNER: TemplateId = TemplateId(7);

const SPACING: f32 = 3.0;

fn registries() -> std::result::Result<Registries, RegistryError> {
    let mut registries = Registries::new();
    registries.register_instructions(
        ProgramId(1),
        vec![
            I::new(Opcode::LoadExplicitTarget, 0, 0, 0),
            I::const_float(0, -1.0),
            I::new(Opcode::ModifyAttributeAdd, 0, 0, 0).with_int(HEALTH.0 as i32),
        ],
    )?;
    registries.register_instructions(
        ProgramId(2),
        vec![
            I::new(Opcode::LoadCaster, 0, 0, 0),
            I::const_float(0, SPACING * 1.5),
            I::new(Opcode::QueryRadius, 0, 0, 0),
            I::new(Opcode::QuerySortStable, 0, 0, 0),
            I::new(Opcode::QueryLimit, 0, 0, 0).with_int(6),
            I::const_int(0, SCORCH.0 as i32),
            I::new(Opcode::FanOutApplyEffectDynamic, 0, 0, 0),
        ],
    )?;

    let templates = [
        EffectTemplate::builder(HIT, STRIKE)
            .bind(LifecyclePhase::OnHit, PhaseSlot::Main, ProgramId(1))
            .build(),
        EffectTemplate::builder(RIPOSTE, TagId(2))
            .modifier(HEALTH, ModifierOp::Add, -2.0)
            .build(),
        EffectTemplate::builder(WARDED, TagId(3))
            .lasting(ClockDomain::Step, 2)
            .modifier(WARD, ModifierOp::Add, 1.0)
            .build(),
        EffectTemplate::builder(PUSH, TagId(4))
            .preset(PresetType::APPLY_FORCE_2D)
            .build(),
        EffectTemplate::builder(NOVA, TagId(5))
            .cooldown(NOVA_COOLDOWN, 12)
            .bind(LifecyclePhase::OnHit, PhaseSlot::Main, ProgramId(2))
            .build(),
        EffectTemplate::builder(SCORCH, TagId(6))
            .modifier(HEALTH, ModifierOp::Add, -0.5)
            .build(),
        EffectTemplate::builder(BANNER, TagId(8))
            .infinite(ClockDomain::FixedFrame)
            .expire_when(ExpireCondition::tag_present(RALLY))
            .modifier(WARD, ModifierOp::Multiply, 2.0)
            .build(),
    ];
    for template in templates {
        registries.register_template(template)?;
    }
    Ok(registries)
}

pub struct Demo {
    pub sim: Simulation,
    pub pacemaker: Pacemaker,
}

impl Demo {
    pub fn new(config: RuntimeConfig, count: usize) -> Result<Self> {
        let mut sim = Simulation::new(config, registries()?)?;
        let entities = spawn_arena(&mut sim, count);
        let pacemaker = Pacemaker::new(&config)
            .with_group(Director { entities })
            .with_group(AutoResponder)
            .with_standard_groups();
        Ok(Self { sim, pacemaker })
    }
}

/// Lays entities out on a square grid. Every third one ripostes strikes and
/// the first answers prompts as player 1.
fn spawn_arena(sim: &mut Simulation, count: usize) -> Vec<EntityHandle> {
    let side = (count as f32).sqrt().ceil().max(1.0) as usize;
    let world = sim.world_mut();
    let mut entities = Vec::with_capacity(count);
    for i in 0..count {
        let position = Vec2::new((i % side) as f32 * SPACING, (i / side) as f32 * SPACING);
        let entity = world.spawn_at(position);
        world.set_attribute(entity, HEALTH, 100.0);
        world.set_attribute(entity, WARD, 0.0);
        world.set_attribute(entity, NOVA_COOLDOWN, 0.0);
        world.set_attribute(entity, AttributeId::FORCE_REQUEST_X, 0.0);
        world.set_attribute(entity, AttributeId::FORCE_REQUEST_Y, 0.0);
        world.add_tag(entity, RALLY);
        if let Some(record) = world.get_mut(entity) {
            if i == 0 {
                record.player = Some(PlayerId(1));
                record.listeners.push(ResponseChainListener::prompt(STRIKE, 1));
            } else if i % 3 == 0 {
                record
                    .listeners
                    .push(ResponseChainListener::chain(STRIKE, RIPOSTE, 0));
            }
        }
        entities.push(entity);
    }
    entities
}

/// Publishes the scripted request pattern for each tick.
struct Director {
    entities: Vec<EntityHandle>,
}

impl SystemGroup for Director {
    fn name(&self) -> &'static str {
        "director"
    }

    fn begin_tick(&mut self, sim: &mut Simulation) -> Result<()> {
        let tick = sim.now().0;
        let count = self.entities.len();
        if count < 2 {
            return Ok(());
        }
        let attacker = self.entities[(tick as usize) % count];
        let defender = self.entities[(tick as usize * 7 + 1) % count];
        if attacker != defender {
            sim.publish(EffectRequest::new(HIT, attacker, defender));
            sim.publish(
                EffectRequest::new(PUSH, attacker, defender)
                    .with_param(keys::FORCE_X, ParamValue::Float(1.0))
                    .with_param(keys::FORCE_Y, ParamValue::Float(-0.5)),
            );
        }
        if tick % 5 == 0 {
            sim.publish(EffectRequest::new(WARDED, defender, defender));
        }
        if tick % 4 == 0 {
            sim.publish(EffectRequest::new(NOVA, attacker, attacker));
        }
        if tick == 8 {
            sim.publish(EffectRequest::new(BANNER, attacker, attacker));
        }
        if tick == 40 {
            sim.world_mut().remove_tag(attacker, RALLY);
        }
        Ok(())
    }

    fn update_slice(&mut self, _sim: &mut Simulation, _ctx: &SliceContext) -> Result<SliceStatus> {
        Ok(SliceStatus::Done)
    }
}

/// Answers every raised prompt with a pass.
struct AutoResponder;

impl SystemGroup for AutoResponder {
    fn name(&self) -> &'static str {
        "auto_responder"
    }

    fn update_slice(&mut self, sim: &mut Simulation, _ctx: &SliceContext) -> Result<SliceStatus> {
        let prompts: Vec<_> = sim.orders_mut().drain_requests().collect();
        for prompt in prompts {
            sim.submit_order(DecisionOrder {
                root: prompt.root,
                player: prompt.player,
                decision: Decision::Pass,
            });
        }
        Ok(SliceStatus::Done)
    }
}
