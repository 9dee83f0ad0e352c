use crate::state::{EntityHandle, ParamKey, RootId, TemplateId};

use super::{CallerParams, ParamValue};

/// One proposal to apply an effect template, consumed within the tick it is
/// processed in.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectRequest {
    /// Response-chain correlation key. [`RootId::NONE`] is replaced on publish.
    pub root: RootId,
    pub source: EntityHandle,
    pub target: EntityHandle,
    pub target_context: EntityHandle,
    pub template: TemplateId,
    /// Overrides for the template's config keys, this invocation only.
    pub params: CallerParams,
}

impl EffectRequest {
    pub fn new(template: TemplateId, source: EntityHandle, target: EntityHandle) -> Self {
        Self {
            root: RootId::NONE,
            source,
            target,
            target_context: EntityHandle::NULL,
            template,
            params: CallerParams::new(),
        }
    }

    pub fn with_root(mut self, root: RootId) -> Self {
        self.root = root;
        self
    }

    pub fn with_context(mut self, target_context: EntityHandle) -> Self {
        self.target_context = target_context;
        self
    }

    pub fn with_params(mut self, params: CallerParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_param(mut self, key: ParamKey, value: ParamValue) -> Self {
        self.params.set(key, value);
        self
    }
}
