//! Native phase handlers.
//!
//! A builtin sees the same merged parameter view a graph would, plus the
//! invocation participants. Builtins are addressed by [`BuiltinId`] and
//! selected through presets or explicit [`Handler::Builtin`](super::Handler)
//! entries.

use crate::effect::{ConfigParams, keys};
use crate::env::GameplayEvent;
use crate::graph::GraphApi;
use crate::state::{AttributeId, BuiltinId, EntityHandle, EventTag, RootId};

use super::PhaseError;

pub struct BuiltinContext<'a> {
    pub api: GraphApi<'a>,
    pub params: &'a ConfigParams,
    pub source: EntityHandle,
    pub target: EntityHandle,
    pub target_context: EntityHandle,
    pub root: RootId,
}

pub type BuiltinFn = fn(&mut BuiltinContext<'_>) -> Result<(), PhaseError>;

/// Flat [`BuiltinId`] → handler table.
#[derive(Clone, Default)]
pub struct BuiltinRegistry {
    handlers: Vec<Option<BuiltinFn>>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(BuiltinId::APPLY_FORCE_2D, apply_force_2d);
        registry.register(BuiltinId::ADD_ATTRIBUTE, add_attribute);
        registry.register(BuiltinId::SEND_EVENT, send_event);
        registry
    }

    /// Installs `handler`, returning the one it replaced.
    pub fn register(&mut self, id: BuiltinId, handler: BuiltinFn) -> Option<BuiltinFn> {
        let index = id.0 as usize;
        if self.handlers.len() <= index {
            self.handlers.resize(index + 1, None);
        }
        self.handlers[index].replace(handler)
    }

    pub fn get(&self, id: BuiltinId) -> Option<BuiltinFn> {
        self.handlers.get(id.0 as usize).copied().flatten()
    }

    pub fn contains(&self, id: BuiltinId) -> bool {
        self.get(id).is_some()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl core::fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let registered = self.handlers.iter().filter(|h| h.is_some()).count();
        f.debug_struct("BuiltinRegistry")
            .field("registered", &registered)
            .finish()
    }
}

/// Writes the requested force into the target's force-request attributes.
/// Missing force params count as zero.
pub fn apply_force_2d(ctx: &mut BuiltinContext<'_>) -> Result<(), PhaseError> {
    let x = ctx.params.float(keys::FORCE_X).unwrap_or(0.0);
    let y = ctx.params.float(keys::FORCE_Y).unwrap_or(0.0);
    let world = &mut *ctx.api.world;
    world.set_attribute(ctx.target, AttributeId::FORCE_REQUEST_X, x);
    world.set_attribute(ctx.target, AttributeId::FORCE_REQUEST_Y, y);
    Ok(())
}

/// Adds `AMOUNT` to the target's `ATTRIBUTE` base value.
pub fn add_attribute(ctx: &mut BuiltinContext<'_>) -> Result<(), PhaseError> {
    let Some(attribute) = ctx.params.attribute(keys::ATTRIBUTE) else {
        return Ok(());
    };
    let amount = ctx.params.float(keys::AMOUNT).unwrap_or(0.0);
    ctx.api.world.add_attribute(ctx.target, attribute, amount);
    Ok(())
}

/// Publishes a gameplay event tagged `EVENT_TAG` with magnitude `AMOUNT`.
pub fn send_event(ctx: &mut BuiltinContext<'_>) -> Result<(), PhaseError> {
    let tag = ctx.params.int(keys::EVENT_TAG).unwrap_or(0);
    let magnitude = ctx.params.float(keys::AMOUNT).unwrap_or(0.0);
    let event = GameplayEvent::gameplay(EventTag(tag as u16), ctx.source, ctx.target, magnitude);
    ctx.api.events()?.publish(event);
    Ok(())
}
