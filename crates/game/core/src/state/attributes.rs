//! Per-entity float attributes with a base and an aggregated current value.

use arrayvec::ArrayVec;

use crate::config::CoreConfig;
use crate::effect::{AttributeModifier, ModifierAggregate};
use crate::state::AttributeId;

/// One attribute slot. `current` is `base` with active modifiers applied.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeValue {
    pub id: AttributeId,
    pub base: f32,
    pub current: f32,
}

/// Fixed-capacity attribute buffer of a single entity.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeSet {
    values: ArrayVec<AttributeValue, { CoreConfig::MAX_ATTRIBUTES }>,
    dropped: u32,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: AttributeId) -> Option<f32> {
        self.slot(id).map(|value| value.current)
    }

    pub fn base(&self, id: AttributeId) -> Option<f32> {
        self.slot(id).map(|value| value.base)
    }

    /// Sets the base value, inserting the attribute if absent.
    ///
    /// Returns `false` (and counts the drop) when the buffer is full.
    /// The current value equals the base until [`recompute`](Self::recompute).
    pub fn set_base(&mut self, id: AttributeId, value: f32) -> bool {
        if let Some(slot) = self.slot_mut(id) {
            slot.base = value;
            slot.current = value;
            return true;
        }
        let inserted = self
            .values
            .try_push(AttributeValue {
                id,
                base: value,
                current: value,
            })
            .is_ok();
        if !inserted {
            self.dropped += 1;
        }
        inserted
    }

    /// Recomputes `current` for `id` from its base and the given modifiers.
    ///
    /// Returns the new current value, or `None` if the attribute is absent.
    pub fn recompute<'m>(
        &mut self,
        id: AttributeId,
        modifiers: impl IntoIterator<Item = &'m AttributeModifier>,
    ) -> Option<f32> {
        let slot = self.slot_mut(id)?;
        let mut aggregate = ModifierAggregate::new();
        for modifier in modifiers {
            if modifier.attribute == id {
                aggregate.push(modifier.op, modifier.value);
            }
        }
        slot.current = aggregate.evaluate(slot.base);
        Some(slot.current)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeValue> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Inserts that failed because the buffer was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    fn slot(&self, id: AttributeId) -> Option<&AttributeValue> {
        self.values.iter().find(|value| value.id == id)
    }

    fn slot_mut(&mut self, id: AttributeId) -> Option<&mut AttributeValue> {
        self.values.iter_mut().find(|value| value.id == id)
    }
}
