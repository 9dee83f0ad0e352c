//! Full pipeline scenarios driven through the pacemaker.
mod common;

use ability_core::clock::{ClockDomain, Tick};
use ability_core::effect::{EffectRequest, EffectTemplate, ExpireCondition, ModifierOp, ParamValue, keys};
use ability_core::env::{Decision, DecisionOrder, EventKind};
use ability_core::error::CoreError;
use ability_core::chain::ResponseChainListener;
use ability_core::registry::Registries;
use ability_core::state::{AttributeId, PlayerId, TagId, TemplateId, mark_clean};
use ability_runtime::{
    ConfigError, ManualTimer, Pacemaker, Result, RuntimeConfig, RuntimeError, SliceContext,
    SliceStatus, Simulation, SystemGroup,
};

use common::{HEALTH, HIT, NOVA, PUSH, STRIKE, WARD, WARDED, populate, registries};

const KEEP: TagId = TagId(20);
const AURA: TemplateId = TemplateId(20);
const ZAP: TemplateId = TemplateId(21);
const ZAP_COOLDOWN: AttributeId = AttributeId(20);

fn config() -> RuntimeConfig {
    RuntimeConfig {
        fixed_timestep_us: 1_000,
        max_ticks_per_frame: 1,
        ..RuntimeConfig::default()
    }
}

fn standard(sim_registries: Registries) -> (Simulation, Pacemaker) {
    let config = config();
    let sim = Simulation::new(config, sim_registries).unwrap();
    (sim, Pacemaker::new(&config).with_standard_groups())
}

/// Runs frames until `ticks` more ticks have committed.
fn advance(sim: &mut Simulation, pacemaker: &mut Pacemaker, ticks: u64) {
    let target = sim.now() + ticks;
    let mut timer = ManualTimer::new(0);
    for _ in 0..1_000 {
        if sim.now() >= target {
            return;
        }
        pacemaker.frame(sim, 1_000, &mut timer).unwrap();
    }
    panic!("stalled at tick {}", sim.now());
}

#[test]
fn nova_scorches_only_entities_inside_its_radius() {
    let (mut sim, mut pacemaker) = standard(registries());
    let entities = populate(&mut sim, 6);
    sim.publish(EffectRequest::new(NOVA, entities[0], entities[0]));

    // The nova fans out on tick 0; the scorches resolve on tick 1.
    advance(&mut sim, &mut pacemaker, 2);

    assert_eq!(sim.spatial().len(), 6);
    let health: Vec<_> = entities
        .iter()
        .map(|&entity| sim.world().attribute(entity, HEALTH))
        .collect();
    assert_eq!(
        health,
        [
            Some(999.5),
            Some(999.5),
            Some(999.5),
            Some(1_000.0),
            Some(1_000.0),
            Some(1_000.0)
        ]
    );
}

#[test]
fn push_lands_in_force_request_attributes() {
    let (mut sim, mut pacemaker) = standard(registries());
    let entities = populate(&mut sim, 2);
    mark_clean(sim.world_mut());
    sim.publish(
        EffectRequest::new(PUSH, entities[0], entities[1])
            .with_param(keys::FORCE_X, ParamValue::Float(3.0))
            .with_param(keys::FORCE_Y, ParamValue::Float(-1.5)),
    );

    advance(&mut sim, &mut pacemaker, 1);

    let world = sim.world();
    assert_eq!(world.attribute(entities[1], AttributeId::FORCE_REQUEST_X), Some(3.0));
    assert_eq!(world.attribute(entities[1], AttributeId::FORCE_REQUEST_Y), Some(-1.5));
    assert_eq!(world.attribute(entities[0], AttributeId::FORCE_REQUEST_X), Some(0.0));

    let changed = sim.history().count_where(|kind| {
        matches!(
            kind,
            EventKind::AttributeChanged { attribute, new, .. }
                if *attribute == AttributeId::FORCE_REQUEST_X && *new == 3.0
        )
    });
    assert_eq!(changed, 1);
}

#[test]
fn keep_alive_tag_holds_the_effect() {
    let mut registries = registries();
    registries
        .register_template(
            EffectTemplate::builder(AURA, TagId(21))
                .infinite(ClockDomain::FixedFrame)
                .expire_when(ExpireCondition::tag_present(KEEP))
                .modifier(WARD, ModifierOp::Add, 5.0)
                .build(),
        )
        .unwrap();
    let (mut sim, mut pacemaker) = standard(registries);
    let entities = populate(&mut sim, 1);
    let bearer = entities[0];
    sim.world_mut().add_tag(bearer, KEEP);
    sim.publish(EffectRequest::new(AURA, bearer, bearer));

    advance(&mut sim, &mut pacemaker, 5);
    assert_eq!(sim.world().attribute(bearer, WARD), Some(5.0));

    sim.world_mut().remove_tag(bearer, KEEP);
    advance(&mut sim, &mut pacemaker, 1);

    assert_eq!(sim.world().attribute(bearer, WARD), Some(0.0));
    let removed = sim
        .history()
        .count_where(|kind| *kind == EventKind::EffectRemoved(AURA));
    assert_eq!(removed, 1);
}

#[test]
fn prompt_window_holds_the_queue_until_answered() {
    let (mut sim, mut pacemaker) = standard(registries());
    let entities = populate(&mut sim, 2);
    let (caster, defender) = (entities[0], entities[1]);
    let record = sim.world_mut().get_mut(defender).unwrap();
    record.listeners.clear();
    record.player = Some(PlayerId(2));
    record.listeners.push(ResponseChainListener::prompt(STRIKE, 0));

    let root = sim.publish(EffectRequest::new(HIT, caster, defender)).unwrap();
    sim.publish(EffectRequest::new(WARDED, caster, caster));
    advance(&mut sim, &mut pacemaker, 1);

    assert!(sim.chain().is_waiting());
    assert_eq!(sim.orders().requests().len(), 1);
    assert_eq!(sim.orders().requests()[0].player, PlayerId(2));
    assert_eq!(sim.requests().len(), 1);

    // Ticks keep committing while the window waits.
    advance(&mut sim, &mut pacemaker, 1);
    assert_eq!(sim.now(), Tick(2));
    assert!(sim.chain().is_waiting());
    assert_eq!(sim.world().attribute(defender, HEALTH), Some(1_000.0));

    assert!(sim.submit_order(DecisionOrder {
        root,
        player: PlayerId(2),
        decision: Decision::Pass,
    }));
    advance(&mut sim, &mut pacemaker, 1);

    assert!(!sim.chain().is_waiting());
    assert_eq!(sim.world().attribute(defender, HEALTH), Some(999.0));
    assert_eq!(sim.world().attribute(caster, WARD), Some(1.0));
    assert!(sim.requests().is_empty());
}

#[test]
fn cooldown_rejects_until_it_runs_out() {
    let mut registries = registries();
    registries
        .register_template(
            EffectTemplate::builder(ZAP, TagId(22))
                .cooldown(ZAP_COOLDOWN, 3)
                .modifier(HEALTH, ModifierOp::Add, -1.0)
                .build(),
        )
        .unwrap();
    let (mut sim, mut pacemaker) = standard(registries);
    let entities = populate(&mut sim, 2);
    sim.world_mut().set_attribute(entities[0], ZAP_COOLDOWN, 0.0);

    for _ in 0..4 {
        sim.publish(EffectRequest::new(ZAP, entities[0], entities[1]));
        advance(&mut sim, &mut pacemaker, 1);
    }

    // Applied on ticks 0 and 3; the cooldown counts 3, 2, 1 in between.
    assert_eq!(sim.world().attribute(entities[1], HEALTH), Some(998.0));
    assert_eq!(sim.chain().budget().rejected, 2);
}

/// Yields forever.
struct Runaway;

impl SystemGroup for Runaway {
    fn name(&self) -> &'static str {
        "runaway"
    }

    fn update_slice(&mut self, _sim: &mut Simulation, _ctx: &SliceContext) -> Result<SliceStatus> {
        Ok(SliceStatus::Yield)
    }
}

#[test]
fn runaway_group_trips_the_fuse() {
    let config = RuntimeConfig {
        max_slices_per_logic_frame: 8,
        ..config()
    };
    let mut sim = Simulation::new(config, Registries::new()).unwrap();
    let mut pacemaker = Pacemaker::new(&config)
        .with_standard_groups()
        .with_group(Runaway);
    let mut timer = ManualTimer::new(0);

    let mut fused_frames = 0;
    for _ in 0..20 {
        let report = pacemaker.frame(&mut sim, 1_000, &mut timer).unwrap();
        if report.fused {
            fused_frames += 1;
        }
    }

    assert!(pacemaker.is_fused());
    assert_eq!(pacemaker.stats().fuse_trips, 1);
    assert_eq!(sim.now(), Tick(0));
    assert_eq!(sim.clock().step(), Tick(0));
    assert!(fused_frames > 10);
}

/// Fails on its first slice.
struct Broken;

impl SystemGroup for Broken {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn update_slice(&mut self, _sim: &mut Simulation, _ctx: &SliceContext) -> Result<SliceStatus> {
        Err(ConfigError::Invalid {
            field: "broken_group",
            reason: "always fails",
        }
        .into())
    }
}

#[test]
fn group_errors_carry_the_group_and_tick() {
    let (mut sim, pacemaker) = standard(Registries::new());
    let mut pacemaker = pacemaker.with_group(Broken);
    let mut timer = ManualTimer::new(0);

    let error = pacemaker.frame(&mut sim, 1_000, &mut timer).unwrap_err();

    match &error {
        RuntimeError::System { group, tick, .. } => {
            assert_eq!(*group, "broken");
            assert_eq!(*tick, Tick(0));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(matches!(error.root_cause(), RuntimeError::Config(_)));
    assert_eq!(error.error_code(), "CONFIG_INVALID");
    assert_eq!(sim.now(), Tick(0));
}
