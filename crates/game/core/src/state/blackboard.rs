//! Per-entity keyed scratch storage that persists across ticks.

use arrayvec::ArrayVec;

use crate::config::CoreConfig;
use crate::state::{BlackboardKey, EntityHandle};

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlackboardValue {
    Float(f32),
    Int(i32),
    Entity(EntityHandle),
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Blackboard {
    entries: ArrayVec<(BlackboardKey, BlackboardValue), { CoreConfig::MAX_BLACKBOARD_ENTRIES }>,
    dropped: u32,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: BlackboardKey) -> Option<BlackboardValue> {
        self.entries
            .iter()
            .find(|(entry_key, _)| *entry_key == key)
            .map(|(_, value)| *value)
    }

    /// Reads a float, reinterpreting an int entry. Missing keys read as zero.
    pub fn float(&self, key: BlackboardKey) -> f32 {
        match self.get(key) {
            Some(BlackboardValue::Float(value)) => value,
            Some(BlackboardValue::Int(value)) => value as f32,
            _ => 0.0,
        }
    }

    /// Reads an int, truncating a float entry. Missing keys read as zero.
    pub fn int(&self, key: BlackboardKey) -> i32 {
        match self.get(key) {
            Some(BlackboardValue::Int(value)) => value,
            Some(BlackboardValue::Float(value)) => value as i32,
            _ => 0,
        }
    }

    pub fn entity(&self, key: BlackboardKey) -> EntityHandle {
        match self.get(key) {
            Some(BlackboardValue::Entity(value)) => value,
            _ => EntityHandle::NULL,
        }
    }

    /// Writes a value, overwriting any previous entry of any type.
    pub fn set(&mut self, key: BlackboardKey, value: BlackboardValue) -> bool {
        if let Some((_, slot)) = self.entries.iter_mut().find(|(entry_key, _)| *entry_key == key) {
            *slot = value;
            return true;
        }
        let inserted = self.entries.try_push((key, value)).is_ok();
        if !inserted {
            self.dropped += 1;
        }
        inserted
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}
