//! Effect data model.
//!
//! Templates are registered once and never mutated. A [`EffectRequest`]
//! proposes one; once the response chain commits it, instant templates fold
//! into base values and durational ones become a [`GameplayEffect`] stored
//! on the target until [`lifetime`] removes it.
mod aggregate;
pub mod cost;
mod instance;
pub mod lifetime;
mod params;
mod request;
mod template;

pub use aggregate::ModifierAggregate;
pub use instance::{ActiveEffects, EffectState, GameplayEffect};
pub use lifetime::{LifetimeEnv, LifetimeReport, tick_cooldowns, update_lifetimes};
pub use params::{CallerParams, ConfigParams, ParamTable, ParamValue, keys, merged_view};
pub use request::EffectRequest;
pub use template::{
    AttributeModifier, CooldownSpec, CostSpec, EffectTemplate, EffectTemplateBuilder,
    ExpireCondition, GrantedTags, LifetimeKind, ModifierList, ModifierOp,
};
