use std::collections::HashMap;

use strum::EnumCount;

use crate::state::{BuiltinId, PresetType, ProgramId};

use super::LifecyclePhase;

/// What runs in a Main slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Handler {
    Graph(ProgramId),
    Builtin(BuiltinId),
    #[default]
    None,
}

type HandlerRow = [Handler; LifecyclePhase::COUNT];

/// Default Main handlers per (preset type, phase).
#[derive(Clone, Debug, Default)]
pub struct PresetRegistry {
    presets: HashMap<PresetType, HandlerRow>,
}

impl PresetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Presets backing every standard builtin, each on `OnApply`.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.set(
            PresetType::APPLY_FORCE_2D,
            LifecyclePhase::OnApply,
            Handler::Builtin(BuiltinId::APPLY_FORCE_2D),
        );
        registry.set(
            PresetType::ADD_ATTRIBUTE,
            LifecyclePhase::OnApply,
            Handler::Builtin(BuiltinId::ADD_ATTRIBUTE),
        );
        registry.set(
            PresetType::SEND_EVENT,
            LifecyclePhase::OnApply,
            Handler::Builtin(BuiltinId::SEND_EVENT),
        );
        registry
    }

    pub fn set(&mut self, preset: PresetType, phase: LifecyclePhase, handler: Handler) {
        let row = self
            .presets
            .entry(preset)
            .or_insert([Handler::None; LifecyclePhase::COUNT]);
        row[phase.index()] = handler;
    }

    pub fn contains(&self, preset: PresetType) -> bool {
        self.presets.contains_key(&preset)
    }

    /// Handler for `(preset, phase)`, or [`Handler::None`] when unregistered.
    pub fn resolve(&self, preset: PresetType, phase: LifecyclePhase) -> Handler {
        self.presets
            .get(&preset)
            .map_or(Handler::None, |row| row[phase.index()])
    }

    pub fn clear(&mut self) {
        self.presets.clear();
    }
}

impl PresetType {
    pub const APPLY_FORCE_2D: Self = Self(1);
    pub const ADD_ATTRIBUTE: Self = Self(2);
    pub const SEND_EVENT: Self = Self(3);
}

impl BuiltinId {
    pub const APPLY_FORCE_2D: Self = Self(1);
    pub const ADD_ATTRIBUTE: Self = Self(2);
    pub const SEND_EVENT: Self = Self(3);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_preset_or_phase_resolves_to_none() {
        let registry = PresetRegistry::standard();
        assert_eq!(
            registry.resolve(PresetType::APPLY_FORCE_2D, LifecyclePhase::OnApply),
            Handler::Builtin(BuiltinId::APPLY_FORCE_2D)
        );
        assert_eq!(
            registry.resolve(PresetType::APPLY_FORCE_2D, LifecyclePhase::OnHit),
            Handler::None
        );
        assert_eq!(
            registry.resolve(PresetType(999), LifecyclePhase::OnApply),
            Handler::None
        );
    }
}
