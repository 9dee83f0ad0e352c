//! Typed key→value parameter tables.
//!
//! Templates carry a [`ConfigParams`] table; requests may carry a smaller
//! [`CallerParams`] table whose keys override the template's for one
//! invocation. Merging copies into a stack-allocated view and never touches
//! the template.

use arrayvec::ArrayVec;

use crate::config::CoreConfig;
use crate::state::{AttributeId, ParamKey, TemplateId};

/// Well-known parameter keys read by builtin handlers.
pub mod keys {
    use crate::state::ParamKey;

    pub const FORCE_X: ParamKey = ParamKey(1);
    pub const FORCE_Y: ParamKey = ParamKey(2);
    /// Attribute an `ADD_ATTRIBUTE` builtin modifies.
    pub const ATTRIBUTE: ParamKey = ParamKey(3);
    pub const AMOUNT: ParamKey = ParamKey(4);
    /// Event tag published by the `SEND_EVENT` builtin.
    pub const EVENT_TAG: ParamKey = ParamKey(5);
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParamValue {
    Float(f32),
    Int(i32),
    Attribute(AttributeId),
    Template(TemplateId),
}

/// Fixed-capacity parameter table.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParamTable<const N: usize> {
    entries: ArrayVec<(ParamKey, ParamValue), N>,
    dropped: u32,
}

pub type ConfigParams = ParamTable<{ CoreConfig::MAX_CONFIG_PARAMS }>;
pub type CallerParams = ParamTable<{ CoreConfig::MAX_CALLER_PARAMS }>;

impl<const N: usize> ParamTable<N> {
    pub fn new() -> Self {
        Self {
            entries: ArrayVec::new(),
            dropped: 0,
        }
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: ParamKey, value: ParamValue) -> Self {
        self.set(key, value);
        self
    }

    /// Inserts or overwrites `key`. Returns `false` and counts the drop when full.
    pub fn set(&mut self, key: ParamKey, value: ParamValue) -> bool {
        if let Some((_, slot)) = self.entries.iter_mut().find(|(entry, _)| *entry == key) {
            *slot = value;
            return true;
        }
        let inserted = self.entries.try_push((key, value)).is_ok();
        if !inserted {
            self.dropped += 1;
        }
        inserted
    }

    pub fn get(&self, key: ParamKey) -> Option<ParamValue> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == key)
            .map(|(_, value)| *value)
    }

    pub fn contains(&self, key: ParamKey) -> bool {
        self.get(key).is_some()
    }

    /// Float view of a value; ints are widened.
    pub fn float(&self, key: ParamKey) -> Option<f32> {
        match self.get(key)? {
            ParamValue::Float(value) => Some(value),
            ParamValue::Int(value) => Some(value as f32),
            _ => None,
        }
    }

    pub fn int(&self, key: ParamKey) -> Option<i32> {
        match self.get(key)? {
            ParamValue::Int(value) => Some(value),
            _ => None,
        }
    }

    pub fn attribute(&self, key: ParamKey) -> Option<AttributeId> {
        match self.get(key)? {
            ParamValue::Attribute(value) => Some(value),
            _ => None,
        }
    }

    pub fn template(&self, key: ParamKey) -> Option<TemplateId> {
        match self.get(key)? {
            ParamValue::Template(value) => Some(value),
            _ => None,
        }
    }

    /// Overwrites exactly the keys present in `overrides`; all other keys keep
    /// their current value. Keys that no longer fit are counted as dropped.
    pub fn merge_from<const M: usize>(&mut self, overrides: &ParamTable<M>) {
        for (key, value) in overrides.iter() {
            self.set(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamKey, ParamValue)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Sets that failed because the table was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

/// Builds the parameter view handlers see for one invocation.
pub fn merged_view<const M: usize>(base: &ConfigParams, caller: &ParamTable<M>) -> ConfigParams {
    let mut view = base.clone();
    view.merge_from(caller);
    view
}
