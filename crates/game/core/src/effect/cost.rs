//! Resource costs and cooldowns.
//!
//! Both are plain attributes on the paying entity. Checks are boolean queries
//! the caller branches on; a failed check never touches the attribute.
//!
//! A cooldown counts whole ticks in the attribute's base value. Modifiers on
//! the attribute change what is observed but never how fast it runs down or
//! when it is ready.

use crate::state::{AttributeId, AttributeStore, EntityHandle};

use super::{CooldownSpec, CostSpec};

/// Whether `entity` can pay `cost`. Zero (or negative) cost always passes.
pub fn can_afford<S>(store: &S, entity: EntityHandle, cost: &CostSpec) -> bool
where
    S: AttributeStore + ?Sized,
{
    if cost.amount <= 0.0 {
        return true;
    }
    store
        .attribute(entity, cost.attribute)
        .is_some_and(|value| value >= cost.amount)
}

/// Deducts `cost` if affordable. Returns whether payment happened.
pub fn try_pay<S>(store: &mut S, entity: EntityHandle, cost: &CostSpec) -> bool
where
    S: AttributeStore + ?Sized,
{
    if !can_afford(store, entity, cost) {
        return false;
    }
    if cost.amount > 0.0 {
        store.add_attribute(entity, cost.attribute, -cost.amount);
    }
    true
}

/// Whether the cooldown counter has run down.
pub fn cooldown_ready<S>(store: &S, entity: EntityHandle, cooldown: &CooldownSpec) -> bool
where
    S: AttributeStore + ?Sized,
{
    store
        .base_attribute(entity, cooldown.attribute)
        .is_none_or(|value| value <= 0.0)
}

/// Sets the cooldown counter to its full value.
pub fn reset_cooldown<S>(store: &mut S, entity: EntityHandle, cooldown: &CooldownSpec) -> bool
where
    S: AttributeStore + ?Sized,
{
    store.set_attribute(entity, cooldown.attribute, cooldown.ticks as f32)
}

/// Counts a cooldown counter down by one tick, saturating at zero.
///
/// Returns the remaining ticks, or `None` when the attribute is absent.
pub fn tick_cooldown<S>(store: &mut S, entity: EntityHandle, attribute: AttributeId) -> Option<f32>
where
    S: AttributeStore + ?Sized,
{
    let value = store.base_attribute(entity, attribute)?;
    if value <= 0.0 {
        return Some(value.max(0.0));
    }
    let next = (value - 1.0).max(0.0);
    store.set_attribute(entity, attribute, next);
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockDomain;
    use crate::effect::{EffectRequest, EffectTemplate, GameplayEffect, ModifierOp};
    use crate::state::{TagId, TemplateId, World};

    const MANA: AttributeId = AttributeId(10);
    const COOLDOWN: AttributeId = AttributeId(11);

    fn world_with_mana(mana: f32) -> (World, EntityHandle) {
        let mut world = World::new();
        let entity = world.spawn();
        world.set_attribute(entity, MANA, mana);
        (world, entity)
    }

    #[test]
    fn failed_cost_check_does_not_mutate() {
        let (mut world, entity) = world_with_mana(3.0);
        let cost = CostSpec {
            attribute: MANA,
            amount: 5.0,
        };

        assert!(!can_afford(&world, entity, &cost));
        assert!(!try_pay(&mut world, entity, &cost));
        assert_eq!(world.attribute(entity, MANA), Some(3.0));
    }

    #[test]
    fn zero_cost_always_passes() {
        let (mut world, entity) = world_with_mana(-10.0);
        let cost = CostSpec {
            attribute: MANA,
            amount: 0.0,
        };
        assert!(try_pay(&mut world, entity, &cost));
        assert_eq!(world.attribute(entity, MANA), Some(-10.0));

        let missing = CostSpec {
            attribute: AttributeId(99),
            amount: 0.0,
        };
        assert!(can_afford(&world, entity, &missing));
    }

    #[test]
    fn paying_deducts_exactly_once() {
        let (mut world, entity) = world_with_mana(8.0);
        let cost = CostSpec {
            attribute: MANA,
            amount: 5.0,
        };
        assert!(try_pay(&mut world, entity, &cost));
        assert!(!try_pay(&mut world, entity, &cost));
        assert_eq!(world.attribute(entity, MANA), Some(3.0));
    }

    #[test]
    fn cooldown_never_goes_below_zero() {
        let (mut world, entity) = world_with_mana(0.0);
        let cooldown = CooldownSpec {
            attribute: COOLDOWN,
            ticks: 2,
        };
        reset_cooldown(&mut world, entity, &cooldown);
        assert!(!cooldown_ready(&world, entity, &cooldown));

        for _ in 0..5 {
            tick_cooldown(&mut world, entity, COOLDOWN);
        }
        assert_eq!(world.attribute(entity, COOLDOWN), Some(0.0));
        assert!(cooldown_ready(&world, entity, &cooldown));
    }

    #[test]
    fn reset_sets_full_value_regardless_of_prior() {
        let (mut world, entity) = world_with_mana(0.0);
        let cooldown = CooldownSpec {
            attribute: COOLDOWN,
            ticks: 4,
        };
        world.set_attribute(entity, COOLDOWN, 1.0);
        reset_cooldown(&mut world, entity, &cooldown);
        assert_eq!(world.attribute(entity, COOLDOWN), Some(4.0));

        world.set_attribute(entity, COOLDOWN, 17.0);
        reset_cooldown(&mut world, entity, &cooldown);
        assert_eq!(world.attribute(entity, COOLDOWN), Some(4.0));
    }

    #[test]
    fn modifiers_on_the_cooldown_do_not_change_the_countdown() {
        let (mut world, entity) = world_with_mana(0.0);
        let cooldown = CooldownSpec {
            attribute: COOLDOWN,
            ticks: 8,
        };
        reset_cooldown(&mut world, entity, &cooldown);
        let halved = EffectTemplate::builder(TemplateId(1), TagId(1))
            .infinite(ClockDomain::FixedFrame)
            .modifier(COOLDOWN, ModifierOp::Multiply, 0.5)
            .build();
        let request = EffectRequest::new(TemplateId(1), entity, entity);
        world
            .add_effect(GameplayEffect::from_request(&halved, &request))
            .unwrap();

        let mut observed = vec![world.attribute(entity, COOLDOWN).unwrap()];
        for _ in 0..3 {
            tick_cooldown(&mut world, entity, COOLDOWN);
            observed.push(world.attribute(entity, COOLDOWN).unwrap());
        }
        assert_eq!(observed, [4.0, 3.5, 3.0, 2.5]);
        assert_eq!(world.base_attribute(entity, COOLDOWN), Some(5.0));

        for _ in 0..4 {
            tick_cooldown(&mut world, entity, COOLDOWN);
        }
        // One tick left even though the observed value is below one.
        assert_eq!(world.attribute(entity, COOLDOWN), Some(0.5));
        assert!(!cooldown_ready(&world, entity, &cooldown));

        assert_eq!(tick_cooldown(&mut world, entity, COOLDOWN), Some(0.0));
        assert!(cooldown_ready(&world, entity, &cooldown));
    }
}
