//! Per-domain lifetime update for stored effects.
//!
//! Each call advances every stored effect of one clock domain by one tick:
//! the expire condition is checked first, then the period counter, then the
//! remaining duration. Expiry runs `OnExpire`, removes the instance, runs
//! `OnRemove` and publishes an [`EventKind::EffectRemoved`] event.

use arrayvec::ArrayVec;

use crate::clock::ClockDomain;
use crate::config::CoreConfig;
use crate::env::{EventBuffer, EventKind, GameplayEvent, RequestQueue, SpatialQuery};
use crate::graph::{GraphApi, OpcodeTable, RegisterBanks};
use crate::phase::{LifecyclePhase, PhaseError, PhaseExecutor, PhaseInvocation};
use crate::registry::Registries;
use crate::state::{AttributeId, EffectInstanceId, EntityHandle, EventTag, World};

use super::cost::tick_cooldown;
use super::{GameplayEffect, LifetimeKind};

/// Everything a lifetime update touches.
pub struct LifetimeEnv<'a> {
    pub world: &'a mut World,
    pub registries: &'a Registries,
    pub opcodes: &'a OpcodeTable,
    pub spatial: Option<&'a dyn SpatialQuery>,
    pub requests: &'a mut RequestQueue,
    pub events: &'a mut EventBuffer,
}

impl LifetimeEnv<'_> {
    fn api(&mut self) -> GraphApi<'_> {
        GraphApi {
            world: &mut *self.world,
            spatial: self.spatial,
            events: Some(&mut *self.events),
            requests: Some(&mut *self.requests),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LifetimeReport {
    pub visited: u32,
    pub periods: u32,
    /// Instances whose duration ran out.
    pub elapsed: u32,
    /// Instances whose expire condition stopped holding.
    pub condition_failed: u32,
}

impl LifetimeReport {
    pub fn removed(&self) -> u32 {
        self.elapsed + self.condition_failed
    }
}

enum Outcome {
    Keep,
    Expire,
}

/// Advances every stored effect measured in `domain` by one tick.
pub fn update_lifetimes(
    env: &mut LifetimeEnv<'_>,
    registers: &mut RegisterBanks,
    domain: ClockDomain,
) -> Result<LifetimeReport, PhaseError> {
    let mut report = LifetimeReport::default();
    for index in 0..env.world.slot_count() {
        let Some(handle) = env.world.handle_at(index) else {
            continue;
        };
        let Some(record) = env.world.get(handle) else {
            continue;
        };
        let ids: ArrayVec<EffectInstanceId, { CoreConfig::MAX_ACTIVE_EFFECTS }> = record
            .effects()
            .iter()
            .filter(|effect| effect.domain == domain)
            .map(|effect| effect.id)
            .collect();

        for id in ids {
            report.visited += 1;
            update_one(env, registers, handle, id, &mut report)?;
        }
    }
    Ok(report)
}

fn update_one(
    env: &mut LifetimeEnv<'_>,
    registers: &mut RegisterBanks,
    handle: EntityHandle,
    id: EffectInstanceId,
    report: &mut LifetimeReport,
) -> Result<(), PhaseError> {
    let Some(effect) = env.world.effect(handle, id) else {
        return Ok(());
    };
    if let Some(condition) = effect.expire {
        if !env.world.has_tag(handle, condition.tag, condition.sense) {
            report.condition_failed += 1;
            return expire(env, registers, handle, id);
        }
    }

    let Some(effect) = env.world.effect_mut(handle, id) else {
        return Ok(());
    };
    let mut period_due = false;
    if effect.period > 0 {
        effect.period_elapsed += 1;
        if effect.period_elapsed >= effect.period {
            effect.period_elapsed = 0;
            period_due = true;
        }
    }
    let mut outcome = Outcome::Keep;
    if effect.lifetime == LifetimeKind::After {
        effect.remaining_ticks = effect.remaining_ticks.saturating_sub(1);
        if effect.remaining_ticks == 0 {
            outcome = Outcome::Expire;
        }
    }

    if period_due {
        let snapshot = effect.clone();
        report.periods += 1;
        run_phase(env, registers, &snapshot, LifecyclePhase::OnPeriod)?;
    }
    match outcome {
        Outcome::Keep => Ok(()),
        Outcome::Expire => {
            report.elapsed += 1;
            expire(env, registers, handle, id)
        }
    }
}

fn expire(
    env: &mut LifetimeEnv<'_>,
    registers: &mut RegisterBanks,
    handle: EntityHandle,
    id: EffectInstanceId,
) -> Result<(), PhaseError> {
    let Some(snapshot) = env.world.effect(handle, id).cloned() else {
        return Ok(());
    };
    run_phase(env, registers, &snapshot, LifecyclePhase::OnExpire)?;
    let Some(removed) = env.world.remove_effect(handle, id) else {
        return Ok(());
    };
    run_phase(env, registers, &removed, LifecyclePhase::OnRemove)?;
    env.events.publish(GameplayEvent {
        tag: EventTag::EFFECT_REMOVED,
        kind: EventKind::EffectRemoved(removed.template),
        source: removed.source,
        target: removed.target,
        magnitude: 0.0,
    });
    tracing::trace!(
        target: "core::lifetime",
        template = %removed.template,
        entity = %removed.target,
        "effect removed"
    );
    Ok(())
}

fn run_phase(
    env: &mut LifetimeEnv<'_>,
    registers: &mut RegisterBanks,
    effect: &GameplayEffect,
    phase: LifecyclePhase,
) -> Result<(), PhaseError> {
    // Templates cleared from the registry still expire, without handlers.
    let Some(template) = env.registries.template(effect.template) else {
        return Ok(());
    };
    let executor = PhaseExecutor::new(env.registries, env.opcodes);
    let invocation = PhaseInvocation::from_effect(template, effect);
    let mut api = env.api();
    executor.run_phase(&mut api, registers, &invocation, phase)?;
    Ok(())
}

/// Counts every registered cooldown attribute down by one on every entity.
///
/// Returns how many attributes were still running before the tick.
pub fn tick_cooldowns(world: &mut World, attributes: &[AttributeId]) -> u32 {
    let mut running = 0;
    for index in 0..world.slot_count() {
        let Some(handle) = world.handle_at(index) else {
            continue;
        };
        for &attribute in attributes {
            if world
                .base_attribute(handle, attribute)
                .is_some_and(|value| value > 0.0)
            {
                running += 1;
                tick_cooldown(world, handle, attribute);
            }
        }
    }
    running
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{EffectRequest, EffectTemplate, ExpireCondition, ModifierOp};
    use crate::graph::{GraphInstruction as I, Opcode};
    use crate::phase::PhaseSlot;
    use crate::state::{ProgramId, TagId, TemplateId};

    const ARMOR: AttributeId = AttributeId(12);
    const PULSES: AttributeId = AttributeId(13);
    const COOLDOWN: AttributeId = AttributeId(14);
    const KEEP_ALIVE: TagId = TagId(5);

    const TIMED: TemplateId = TemplateId(1);
    const TETHERED: TemplateId = TemplateId(2);
    const PULSING: TemplateId = TemplateId(3);
    const SLOW: TemplateId = TemplateId(4);
    const GUARDED: TemplateId = TemplateId(5);

    struct Fixture {
        world: World,
        registries: Registries,
        opcodes: OpcodeTable,
        requests: RequestQueue,
        events: EventBuffer,
        registers: RegisterBanks,
    }

    impl Fixture {
        fn new() -> Self {
            let mut registries = Registries::new();
            // OnPeriod: PULSES += 1 on the target.
            registries
                .register_instructions(
                    ProgramId(1),
                    vec![
                        I::new(Opcode::LoadExplicitTarget, 0, 0, 0),
                        I::const_float(0, 1.0),
                        I::new(Opcode::ModifyAttributeAdd, 0, 0, 0).with_int(PULSES.0 as i32),
                    ],
                )
                .unwrap();
            let templates = [
                EffectTemplate::builder(TIMED, TagId(1))
                    .lasting(ClockDomain::FixedFrame, 3)
                    .modifier(ARMOR, ModifierOp::Add, 5.0)
                    .build(),
                EffectTemplate::builder(TETHERED, TagId(1))
                    .infinite(ClockDomain::FixedFrame)
                    .expire_when(ExpireCondition::tag_present(KEEP_ALIVE))
                    .build(),
                EffectTemplate::builder(PULSING, TagId(1))
                    .lasting(ClockDomain::FixedFrame, 6)
                    .period(2)
                    .bind(LifecyclePhase::OnPeriod, PhaseSlot::Main, ProgramId(1))
                    .build(),
                EffectTemplate::builder(SLOW, TagId(1))
                    .lasting(ClockDomain::Step, 1)
                    .build(),
                EffectTemplate::builder(GUARDED, TagId(1))
                    .lasting(ClockDomain::FixedFrame, 10)
                    .expire_when(ExpireCondition::tag_present(KEEP_ALIVE))
                    .modifier(ARMOR, ModifierOp::Add, 3.0)
                    .build(),
            ];
            for template in templates {
                registries.register_template(template).unwrap();
            }
            Self {
                world: World::new(),
                registries,
                opcodes: OpcodeTable::standard(),
                requests: RequestQueue::default(),
                events: EventBuffer::default(),
                registers: RegisterBanks::new(),
            }
        }

        fn apply(&mut self, template: TemplateId, target: EntityHandle) -> EffectInstanceId {
            let template = self.registries.template(template).unwrap();
            let request = EffectRequest::new(template.id, target, target);
            self.world
                .add_effect(GameplayEffect::from_request(template, &request))
                .unwrap()
        }

        fn update(&mut self, domain: ClockDomain) -> LifetimeReport {
            let mut env = LifetimeEnv {
                world: &mut self.world,
                registries: &self.registries,
                opcodes: &self.opcodes,
                spatial: None,
                requests: &mut self.requests,
                events: &mut self.events,
            };
            update_lifetimes(&mut env, &mut self.registers, domain).unwrap()
        }

        fn removed_events(&self) -> usize {
            self.events
                .iter()
                .filter(|event| matches!(event.kind, EventKind::EffectRemoved(_)))
                .count()
        }
    }

    #[test]
    fn finite_effect_expires_after_its_duration() {
        let mut fx = Fixture::new();
        let target = fx.world.spawn();
        let id = fx.apply(TIMED, target);
        assert_eq!(fx.world.attribute(target, ARMOR), Some(5.0));

        fx.update(ClockDomain::FixedFrame);
        fx.update(ClockDomain::FixedFrame);
        assert!(fx.world.effect(target, id).is_some());

        let report = fx.update(ClockDomain::FixedFrame);
        assert_eq!(report.elapsed, 1);
        assert!(fx.world.effect(target, id).is_none());
        assert_eq!(fx.world.attribute(target, ARMOR), Some(0.0));
        assert_eq!(fx.removed_events(), 1);
    }

    #[test]
    fn keep_alive_tag_holds_the_effect_until_the_next_update() {
        let mut fx = Fixture::new();
        let target = fx.world.spawn();
        fx.world.add_tag(target, KEEP_ALIVE);
        let id = fx.apply(TETHERED, target);

        for _ in 0..10 {
            fx.update(ClockDomain::FixedFrame);
        }
        assert!(fx.world.effect(target, id).is_some());

        fx.world.remove_tag(target, KEEP_ALIVE);
        // Still stored until the lifetime update observes the change.
        assert!(fx.world.effect(target, id).is_some());

        let report = fx.update(ClockDomain::FixedFrame);
        assert_eq!(report.condition_failed, 1);
        assert!(fx.world.effect(target, id).is_none());
    }

    #[test]
    fn finite_effect_ends_early_when_its_keep_alive_tag_goes() {
        let mut fx = Fixture::new();
        let target = fx.world.spawn();
        fx.world.add_tag(target, KEEP_ALIVE);
        let id = fx.apply(GUARDED, target);

        for _ in 0..4 {
            assert_eq!(fx.update(ClockDomain::FixedFrame).removed(), 0);
        }
        assert_eq!(fx.world.attribute(target, ARMOR), Some(3.0));

        fx.world.remove_tag(target, KEEP_ALIVE);
        let report = fx.update(ClockDomain::FixedFrame);

        // Six ticks of duration were left.
        assert_eq!(report.condition_failed, 1);
        assert_eq!(report.elapsed, 0);
        assert!(fx.world.effect(target, id).is_none());
        assert_eq!(fx.world.attribute(target, ARMOR), Some(0.0));
        assert_eq!(fx.removed_events(), 1);
    }

    #[test]
    fn period_fires_every_period_ticks() {
        let mut fx = Fixture::new();
        let target = fx.world.spawn();
        fx.apply(PULSING, target);

        let mut periods = 0;
        for _ in 0..6 {
            periods += fx.update(ClockDomain::FixedFrame).periods;
        }

        assert_eq!(periods, 3);
        assert_eq!(fx.world.attribute(target, PULSES), Some(3.0));
        assert!(fx.world.get(target).unwrap().effects().is_empty());
    }

    #[test]
    fn other_domains_are_untouched() {
        let mut fx = Fixture::new();
        let target = fx.world.spawn();
        let id = fx.apply(SLOW, target);

        for _ in 0..4 {
            assert_eq!(fx.update(ClockDomain::FixedFrame).visited, 0);
        }
        assert!(fx.world.effect(target, id).is_some());

        fx.update(ClockDomain::Step);
        assert!(fx.world.effect(target, id).is_none());
    }

    #[test]
    fn cooldowns_tick_down_on_every_entity() {
        let mut world = World::new();
        let a = world.spawn();
        let b = world.spawn();
        world.set_attribute(a, COOLDOWN, 2.0);
        world.set_attribute(b, COOLDOWN, 0.0);

        assert_eq!(tick_cooldowns(&mut world, &[COOLDOWN]), 1);
        assert_eq!(tick_cooldowns(&mut world, &[COOLDOWN]), 1);
        assert_eq!(tick_cooldowns(&mut world, &[COOLDOWN]), 0);
        assert_eq!(world.attribute(a, COOLDOWN), Some(0.0));
        assert_eq!(world.attribute(b, COOLDOWN), Some(0.0));
    }
}
