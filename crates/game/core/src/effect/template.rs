use arrayvec::ArrayVec;

use crate::clock::ClockDomain;
use crate::config::CoreConfig;
use crate::phase::{LifecyclePhase, PhaseGraphBindings, PhaseSlot};
use crate::state::{AttributeId, ParamKey, PresetType, ProgramId, TagId, TagSense, TemplateId};

use super::{ConfigParams, ParamValue};

/// How long a committed effect stays on its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LifetimeKind {
    /// Applied once to base values, never stored.
    #[default]
    Instant,
    /// Stored for a finite number of ticks.
    After,
    /// Stored until removed or its expire condition fails.
    Infinite,
}

impl LifetimeKind {
    pub fn is_durational(self) -> bool {
        !matches!(self, LifetimeKind::Instant)
    }
}

/// Tag predicate a stored effect re-evaluates every tick of its domain.
///
/// The effect stays alive while the predicate holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpireCondition {
    pub tag: TagId,
    pub sense: TagSense,
}

impl ExpireCondition {
    pub fn tag_present(tag: TagId) -> Self {
        Self {
            tag,
            sense: TagSense::Present,
        }
    }

    pub fn tag_effective(tag: TagId) -> Self {
        Self {
            tag,
            sense: TagSense::Effective,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModifierOp {
    Add,
    Multiply,
    Override,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeModifier {
    pub attribute: AttributeId,
    pub op: ModifierOp,
    pub value: f32,
}

impl AttributeModifier {
    pub const fn new(attribute: AttributeId, op: ModifierOp, value: f32) -> Self {
        Self {
            attribute,
            op,
            value,
        }
    }

    /// Folds this modifier permanently into a base value.
    pub fn apply_to(&self, base: f32) -> f32 {
        match self.op {
            ModifierOp::Add => base + self.value,
            ModifierOp::Multiply => base * self.value,
            ModifierOp::Override => self.value,
        }
    }
}

/// Resource paid when the effect applies.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostSpec {
    pub attribute: AttributeId,
    pub amount: f32,
}

/// Cooldown attribute reset when the effect applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CooldownSpec {
    pub attribute: AttributeId,
    pub ticks: u32,
}

pub type ModifierList = ArrayVec<AttributeModifier, { CoreConfig::MAX_MODIFIERS }>;
pub type GrantedTags = ArrayVec<TagId, { CoreConfig::MAX_GRANTED_TAGS }>;

/// Immutable effect definition, registered once at load time.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectTemplate {
    pub id: TemplateId,
    /// Tag listeners match against.
    pub tag: TagId,
    pub lifetime: LifetimeKind,
    pub domain: ClockDomain,
    /// Total ticks for [`LifetimeKind::After`].
    pub duration: u32,
    /// Ticks between `OnPeriod` invocations; zero disables periodic execution.
    pub period: u32,
    pub expire: Option<ExpireCondition>,
    pub modifiers: ModifierList,
    pub preset: Option<PresetType>,
    pub config: ConfigParams,
    pub bindings: PhaseGraphBindings,
    /// Validation graph run before the effect is accepted.
    pub gate: Option<ProgramId>,
    pub cost: Option<CostSpec>,
    pub cooldown: Option<CooldownSpec>,
    /// Tags held on the target while the effect is active.
    pub granted_tags: GrantedTags,
    /// Modifiers and granted tags that did not fit while building.
    pub dropped: u32,
}

impl EffectTemplate {
    pub fn builder(id: TemplateId, tag: TagId) -> EffectTemplateBuilder {
        EffectTemplateBuilder::new(id, tag)
    }
}

/// Builder for [`EffectTemplate`].
///
/// Capacity overflow is counted on the template's `dropped` field; the
/// registry rejects templates with a non-zero count.
#[derive(Clone, Debug)]
pub struct EffectTemplateBuilder {
    template: EffectTemplate,
}

impl EffectTemplateBuilder {
    pub fn new(id: TemplateId, tag: TagId) -> Self {
        Self {
            template: EffectTemplate {
                id,
                tag,
                lifetime: LifetimeKind::Instant,
                domain: ClockDomain::FixedFrame,
                duration: 0,
                period: 0,
                expire: None,
                modifiers: ArrayVec::new(),
                preset: None,
                config: ConfigParams::new(),
                bindings: PhaseGraphBindings::new(),
                gate: None,
                cost: None,
                cooldown: None,
                granted_tags: ArrayVec::new(),
                dropped: 0,
            },
        }
    }

    pub fn instant(mut self) -> Self {
        self.template.lifetime = LifetimeKind::Instant;
        self.template.duration = 0;
        self
    }

    pub fn lasting(mut self, domain: ClockDomain, duration: u32) -> Self {
        self.template.lifetime = LifetimeKind::After;
        self.template.domain = domain;
        self.template.duration = duration;
        self
    }

    pub fn infinite(mut self, domain: ClockDomain) -> Self {
        self.template.lifetime = LifetimeKind::Infinite;
        self.template.domain = domain;
        self
    }

    pub fn period(mut self, period: u32) -> Self {
        self.template.period = period;
        self
    }

    pub fn expire_when(mut self, condition: ExpireCondition) -> Self {
        self.template.expire = Some(condition);
        self
    }

    pub fn modifier(mut self, attribute: AttributeId, op: ModifierOp, value: f32) -> Self {
        if self
            .template
            .modifiers
            .try_push(AttributeModifier::new(attribute, op, value))
            .is_err()
        {
            self.template.dropped += 1;
        }
        self
    }

    pub fn preset(mut self, preset: PresetType) -> Self {
        self.template.preset = Some(preset);
        self
    }

    pub fn param(mut self, key: ParamKey, value: ParamValue) -> Self {
        if !self.template.config.set(key, value) {
            self.template.dropped += 1;
        }
        self
    }

    pub fn bind(mut self, phase: LifecyclePhase, slot: PhaseSlot, program: ProgramId) -> Self {
        self.template.bindings.bind(phase, slot, program);
        self
    }

    pub fn skip_main(mut self, phase: LifecyclePhase) -> Self {
        self.template.bindings.set_skip_main(phase, true);
        self
    }

    pub fn gate(mut self, program: ProgramId) -> Self {
        self.template.gate = Some(program);
        self
    }

    pub fn cost(mut self, attribute: AttributeId, amount: f32) -> Self {
        self.template.cost = Some(CostSpec { attribute, amount });
        self
    }

    pub fn cooldown(mut self, attribute: AttributeId, ticks: u32) -> Self {
        self.template.cooldown = Some(CooldownSpec { attribute, ticks });
        self
    }

    pub fn grant_tag(mut self, tag: TagId) -> Self {
        if self.template.granted_tags.try_push(tag).is_err() {
            self.template.dropped += 1;
        }
        self
    }

    pub fn build(self) -> EffectTemplate {
        self.template
    }
}
