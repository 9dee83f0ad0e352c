use crate::effect::{CallerParams, ConfigParams};
use crate::env::{EventBuffer, RequestQueue, SpatialQuery};
use crate::error::CapabilityError;
use crate::state::{EntityHandle, RootId, Vec2, World};

use super::RegisterBanks;

/// Capability handles lent to one graph invocation.
///
/// Any of the optional capabilities may be absent; opcodes that need a
/// missing one fail with a [`CapabilityError`].
pub struct GraphApi<'a> {
    pub world: &'a mut World,
    pub spatial: Option<&'a dyn SpatialQuery>,
    pub events: Option<&'a mut EventBuffer>,
    pub requests: Option<&'a mut RequestQueue>,
}

impl<'a> GraphApi<'a> {
    pub fn new(world: &'a mut World) -> Self {
        Self {
            world,
            spatial: None,
            events: None,
            requests: None,
        }
    }

    pub fn with_spatial(mut self, spatial: &'a dyn SpatialQuery) -> Self {
        self.spatial = Some(spatial);
        self
    }

    pub fn with_events(mut self, events: &'a mut EventBuffer) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_requests(mut self, requests: &'a mut RequestQueue) -> Self {
        self.requests = Some(requests);
        self
    }

    pub fn spatial(&self) -> Result<&'a dyn SpatialQuery, CapabilityError> {
        self.spatial.ok_or(CapabilityError::SpatialNotAvailable)
    }

    pub fn events(&mut self) -> Result<&mut EventBuffer, CapabilityError> {
        self.events
            .as_deref_mut()
            .ok_or(CapabilityError::EventsNotAvailable)
    }

    pub fn requests(&mut self) -> Result<&mut RequestQueue, CapabilityError> {
        self.requests
            .as_deref_mut()
            .ok_or(CapabilityError::RequestsNotAvailable)
    }

    /// Reborrows the handles for a nested call.
    pub fn reborrow(&mut self) -> GraphApi<'_> {
        GraphApi {
            world: &mut *self.world,
            spatial: self.spatial,
            events: self.events.as_deref_mut(),
            requests: self.requests.as_deref_mut(),
        }
    }
}

/// Participants of the effect that caused the running effect.
///
/// For a root proposal the context is the effect itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TriggerContext {
    pub source: EntityHandle,
    pub target: EntityHandle,
    pub target_context: EntityHandle,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    #[default]
    Normal,
    /// Mutating opcodes are refused; bool register 0 is the verdict.
    Validation,
}

/// Effect of one instruction on the program counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Next,
    /// Relative to the following instruction.
    Jump(i32),
    Halt,
}

/// Everything an opcode handler can see.
pub struct GraphExecutionState<'a> {
    pub api: GraphApi<'a>,
    pub registers: &'a mut RegisterBanks,
    /// Merged template and caller parameters for this invocation.
    pub params: &'a ConfigParams,
    pub caster: EntityHandle,
    pub explicit_target: EntityHandle,
    pub target_context: EntityHandle,
    pub context: TriggerContext,
    pub target_position: Vec2,
    pub root: RootId,
    /// Arguments staged by `PushArg*` for the next dispatch.
    pub args: CallerParams,
    pub mode: ExecutionMode,
    /// Matches spatial queries could not store.
    pub query_dropped: u32,
}

impl<'a> GraphExecutionState<'a> {
    pub fn new(
        api: GraphApi<'a>,
        registers: &'a mut RegisterBanks,
        params: &'a ConfigParams,
    ) -> Self {
        Self {
            api,
            registers,
            params,
            caster: EntityHandle::NULL,
            explicit_target: EntityHandle::NULL,
            target_context: EntityHandle::NULL,
            context: TriggerContext::default(),
            target_position: Vec2::ZERO,
            root: RootId::NONE,
            args: CallerParams::new(),
            mode: ExecutionMode::Normal,
            query_dropped: 0,
        }
    }

    pub fn with_participants(
        mut self,
        caster: EntityHandle,
        explicit_target: EntityHandle,
        target_context: EntityHandle,
    ) -> Self {
        self.caster = caster;
        self.explicit_target = explicit_target;
        self.target_context = target_context;
        self.context = TriggerContext {
            source: caster,
            target: explicit_target,
            target_context,
        };
        self
    }

    pub fn with_context(mut self, context: TriggerContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_target_position(mut self, position: Vec2) -> Self {
        self.target_position = position;
        self
    }

    pub fn with_root(mut self, root: RootId) -> Self {
        self.root = root;
        self
    }

    /// Position of `entity`, or the target position for the null handle.
    pub fn origin_of(&self, entity: EntityHandle) -> Option<Vec2> {
        if entity.is_null() {
            return Some(self.target_position);
        }
        self.api
            .spatial
            .and_then(|spatial| spatial.position(entity))
            .or_else(|| self.api.world.position(entity))
    }
}
