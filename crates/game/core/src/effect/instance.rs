use arrayvec::ArrayVec;

use crate::clock::ClockDomain;
use crate::config::CoreConfig;
use crate::state::{EffectInstanceId, EntityHandle, RootId, TemplateId};

use super::{
    AttributeModifier, CallerParams, EffectRequest, EffectTemplate, ExpireCondition, GrantedTags,
    LifetimeKind, ModifierList,
};

/// Resolution stage of a committed effect. Only ever moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum EffectState {
    Created,
    Pending,
    Trigger,
    Calculate,
    Apply,
    Committed,
}

impl EffectState {
    pub fn next(self) -> Option<Self> {
        match self {
            EffectState::Created => Some(EffectState::Pending),
            EffectState::Pending => Some(EffectState::Trigger),
            EffectState::Trigger => Some(EffectState::Calculate),
            EffectState::Calculate => Some(EffectState::Apply),
            EffectState::Apply => Some(EffectState::Committed),
            EffectState::Committed => None,
        }
    }
}

/// Live instance of an effect template on one target.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameplayEffect {
    pub id: EffectInstanceId,
    pub template: TemplateId,
    pub root: RootId,
    pub source: EntityHandle,
    pub target: EntityHandle,
    pub target_context: EntityHandle,
    pub lifetime: LifetimeKind,
    pub domain: ClockDomain,
    pub total_ticks: u32,
    pub remaining_ticks: u32,
    pub period: u32,
    pub period_elapsed: u32,
    pub expire: Option<ExpireCondition>,
    pub modifiers: ModifierList,
    pub granted_tags: GrantedTags,
    /// Caller overrides, replayed for every later phase of this instance.
    pub params: CallerParams,
    state: EffectState,
}

impl GameplayEffect {
    pub fn from_request(template: &EffectTemplate, request: &EffectRequest) -> Self {
        Self {
            id: EffectInstanceId::default(),
            template: template.id,
            root: request.root,
            source: request.source,
            target: request.target,
            target_context: request.target_context,
            lifetime: template.lifetime,
            domain: template.domain,
            total_ticks: template.duration,
            remaining_ticks: template.duration,
            period: template.period,
            period_elapsed: 0,
            expire: template.expire,
            modifiers: template.modifiers.clone(),
            granted_tags: template.granted_tags.clone(),
            params: request.params.clone(),
            state: EffectState::Created,
        }
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    /// Moves to the next resolution stage. Committed is terminal.
    pub fn advance_state(&mut self) -> EffectState {
        if let Some(next) = self.state.next() {
            self.state = next;
        }
        self.state
    }

    pub fn is_committed(&self) -> bool {
        self.state == EffectState::Committed
    }
}

/// Active-effect container owned by the target entity.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActiveEffects {
    effects: ArrayVec<GameplayEffect, { CoreConfig::MAX_ACTIVE_EFFECTS }>,
    dropped: u32,
}

impl ActiveEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an instance. Returns `false` and counts the drop when full.
    pub fn push(&mut self, effect: GameplayEffect) -> bool {
        let inserted = self.effects.try_push(effect).is_ok();
        if !inserted {
            self.dropped += 1;
        }
        inserted
    }

    pub fn remove(&mut self, id: EffectInstanceId) -> Option<GameplayEffect> {
        let position = self.effects.iter().position(|effect| effect.id == id)?;
        Some(self.effects.remove(position))
    }

    pub fn get(&self, id: EffectInstanceId) -> Option<&GameplayEffect> {
        self.effects.iter().find(|effect| effect.id == id)
    }

    pub fn get_mut(&mut self, id: EffectInstanceId) -> Option<&mut GameplayEffect> {
        self.effects.iter_mut().find(|effect| effect.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameplayEffect> {
        self.effects.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = EffectInstanceId> + '_ {
        self.effects.iter().map(|effect| effect.id)
    }

    /// Every modifier contributed by the stored instances, in insertion order.
    pub fn modifiers(&self) -> impl Iterator<Item = &AttributeModifier> {
        self.effects.iter().flat_map(|effect| effect.modifiers.iter())
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TagId;

    fn instance() -> GameplayEffect {
        let template = EffectTemplate::builder(TemplateId(9), TagId(1))
            .lasting(ClockDomain::FixedFrame, 3)
            .build();
        let request = EffectRequest::new(
            TemplateId(9),
            EntityHandle::new(0, 0),
            EntityHandle::new(1, 0),
        );
        GameplayEffect::from_request(&template, &request)
    }

    #[test]
    fn state_machine_is_monotonic_and_terminal() {
        let mut effect = instance();
        assert_eq!(effect.state(), EffectState::Created);
        let mut previous = effect.state();
        for _ in 0..10 {
            let next = effect.advance_state();
            assert!(next >= previous);
            previous = next;
        }
        assert!(effect.is_committed());
    }

    #[test]
    fn container_overflow_is_counted() {
        let mut effects = ActiveEffects::new();
        for i in 0..CoreConfig::MAX_ACTIVE_EFFECTS as u32 {
            let mut effect = instance();
            effect.id = EffectInstanceId(i);
            assert!(effects.push(effect));
        }
        assert!(!effects.push(instance()));
        assert_eq!(effects.dropped(), 1);

        assert!(effects.remove(EffectInstanceId(3)).is_some());
        assert!(effects.get(EffectInstanceId(3)).is_none());
        assert_eq!(effects.len(), CoreConfig::MAX_ACTIVE_EFFECTS - 1);
    }
}
