//! Scenario shared by the runtime integration tests.
#![allow(dead_code)]

use ability_core::chain::ResponseChainListener;
use ability_core::clock::{ClockDomain, StepPolicy, Tick};
use ability_core::effect::{EffectRequest, EffectTemplate, ModifierOp, ParamValue, keys};
use ability_core::graph::{GraphInstruction as I, Opcode};
use ability_core::phase::{LifecyclePhase, PhaseSlot};
use ability_core::registry::Registries;
use ability_core::state::{AttributeId, EntityHandle, PresetType, ProgramId, TagId, TemplateId, Vec2};
use ability_runtime::{
    ManualTimer, Pacemaker, Result, RuntimeConfig, SliceContext, SliceStatus, Simulation,
    SystemGroup,
};

pub const HEALTH: AttributeId = AttributeId(10);
pub const WARD: AttributeId = AttributeId(11);

pub const STRIKE: TagId = TagId(1);

pub const HIT: TemplateId = TemplateId(1);
pub const RIPOSTE: TemplateId = TemplateId(2);
pub const WARDED: TemplateId = TemplateId(3);
pub const PUSH: TemplateId = TemplateId(4);
pub const NOVA: TemplateId = TemplateId(5);
pub const SCORCH: TemplateId = TemplateId(6);

pub const ROW_SPACING: f32 = 2.0;
pub const NOVA_RADIUS: f32 = 4.5;

pub fn registries() -> Registries {
    let mut registries = Registries::new();
    // OnHit: HEALTH -= 1 on the explicit target.
    registries
        .register_instructions(
            ProgramId(1),
            vec![
                I::new(Opcode::LoadExplicitTarget, 0, 0, 0),
                I::const_float(0, -1.0),
                I::new(Opcode::ModifyAttributeAdd, 0, 0, 0).with_int(HEALTH.0 as i32),
            ],
        )
        .unwrap();
    // OnHit: SCORCH every entity within NOVA_RADIUS of the caster.
    registries
        .register_instructions(
            ProgramId(2),
            vec![
                I::new(Opcode::LoadCaster, 0, 0, 0),
                I::const_float(0, NOVA_RADIUS),
                I::new(Opcode::QueryRadius, 0, 0, 0),
                I::const_int(0, SCORCH.0 as i32),
                I::new(Opcode::FanOutApplyEffectDynamic, 0, 0, 0),
            ],
        )
        .unwrap();

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
            .bind(LifecyclePhase::OnHit, PhaseSlot::Main, ProgramId(2))
            .build(),
        EffectTemplate::builder(SCORCH, TagId(6))
            .modifier(HEALTH, ModifierOp::Add, -0.5)
            .build(),
    ];
    for template in templates {
        registries.register_template(template).unwrap();
    }
    registries
}

/// Spawns `count` entities along +x; odd ones riposte when struck.
pub fn populate(sim: &mut Simulation, count: usize) -> Vec<EntityHandle> {
    let world = sim.world_mut();
    let mut entities = Vec::with_capacity(count);
    for i in 0..count {
        let entity = world.spawn_at(Vec2::new(i as f32 * ROW_SPACING, 0.0));
        world.set_attribute(entity, HEALTH, 1_000.0);
        world.set_attribute(entity, WARD, 0.0);
        world.set_attribute(entity, AttributeId::FORCE_REQUEST_X, 0.0);
        world.set_attribute(entity, AttributeId::FORCE_REQUEST_Y, 0.0);
        if i % 2 == 1 {
            world
                .get_mut(entity)
                .unwrap()
                .listeners
                .push(ResponseChainListener::chain(STRIKE, RIPOSTE, 0));
        }
        entities.push(entity);
    }
    entities
}

/// Publishes a fixed request pattern at the start of every tick.
pub struct Script {
    pub entities: Vec<EntityHandle>,
    /// Requests a step policy change when this tick begins.
    pub policy_change: Option<(Tick, StepPolicy)>,
}

impl SystemGroup for Script {
    fn name(&self) -> &'static str {
        "script"
    }

    fn begin_tick(&mut self, sim: &mut Simulation) -> Result<()> {
        let tick = sim.now();
        if let Some((at, policy)) = self.policy_change {
            if at == tick {
                sim.set_step_policy(policy);
            }
        }
        for (i, pair) in self.entities.windows(2).enumerate() {
            let (a, b) = (pair[0], pair[1]);
            sim.publish(EffectRequest::new(HIT, a, b));
            if (tick.0 + i as u64) % 2 == 0 {
                sim.publish(EffectRequest::new(WARDED, a, b));
            }
            sim.publish(
                EffectRequest::new(PUSH, a, b)
                    .with_param(keys::FORCE_X, ParamValue::Float(tick.0 as f32))
                    .with_param(keys::FORCE_Y, ParamValue::Float(i as f32)),
            );
        }
        if tick.0 % 3 == 0 {
            let caster = self.entities[0];
            sim.publish(EffectRequest::new(NOVA, caster, caster));
        }
        Ok(())
    }

    fn update_slice(&mut self, _sim: &mut Simulation, _ctx: &SliceContext) -> Result<SliceStatus> {
        Ok(SliceStatus::Done)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub digest: [u8; 32],
    pub fixed_frame: Tick,
    pub step: Tick,
    pub events: u64,
    pub committed: u64,
}

pub struct Run {
    pub sim: Simulation,
    pub pacemaker: Pacemaker,
    pub entities: Vec<EntityHandle>,
}

impl Run {
    pub fn new(config: RuntimeConfig, count: usize, policy_change: Option<(Tick, StepPolicy)>) -> Self {
        let mut sim = Simulation::new(config, registries()).unwrap();
        let entities = populate(&mut sim, count);
        let pacemaker = Pacemaker::new(&config)
            .with_group(Script {
                entities: entities.clone(),
                policy_change,
            })
            .with_standard_groups();
        Self {
            sim,
            pacemaker,
            entities,
        }
    }

    /// Feeds one timestep per frame until `ticks` ticks have committed.
    pub fn run_until(&mut self, ticks: u64, timer: &mut ManualTimer) -> u32 {
        let timestep = self.sim.config().fixed_timestep_us;
        let mut frames = 0;
        while self.sim.now() < Tick(ticks) {
            frames += 1;
            assert!(frames < 100_000, "pacemaker made no progress");
            let report = self
                .pacemaker
                .frame(&mut self.sim, timestep, timer)
                .unwrap();
            assert!(!report.fused, "fuse tripped at {}", self.sim.now());
        }
        frames
    }

    pub fn outcome(&self) -> Outcome {
        Outcome {
            digest: self.sim.state_digest(),
            fixed_frame: self.sim.clock().fixed_frame(),
            step: self.sim.clock().step(),
            events: self.sim.history().total(),
            committed: self.sim.chain().budget().committed,
        }
    }
}
