//! Generational entity store.
//!
//! Entities live in a slot map: a handle carries the slot index and the
//! generation it was issued with, so a handle to a despawned entity fails
//! [`World::is_alive`] even after the slot is reused.

use crate::chain::ListenerTable;
use crate::effect::{ActiveEffects, AttributeModifier, GameplayEffect};
use crate::state::dirty::{DirtyFlags, EntitySnapshot};
use crate::state::{
    AttributeId, AttributeSet, Blackboard, EffectInstanceId, EntityHandle, PlayerId, TagContainer,
    TagId, TagRuleTable, TagSense, Vec2,
};

/// Attribute half of the capability surface.
pub trait AttributeStore {
    fn attribute(&self, entity: EntityHandle, id: AttributeId) -> Option<f32>;

    /// Base value before modifiers.
    fn base_attribute(&self, entity: EntityHandle, id: AttributeId) -> Option<f32>;

    /// Sets the base value and recomputes the current value.
    fn set_attribute(&mut self, entity: EntityHandle, id: AttributeId, value: f32) -> bool;

    /// Adds `delta` to the base value, inserting the attribute at zero if absent.
    fn add_attribute(&mut self, entity: EntityHandle, id: AttributeId, delta: f32) -> Option<f32>;
}

/// Tag half of the capability surface.
pub trait TagStore {
    fn has_tag(&self, entity: EntityHandle, tag: TagId, sense: TagSense) -> bool;
    fn add_tag(&mut self, entity: EntityHandle, tag: TagId) -> bool;
    fn remove_tag(&mut self, entity: EntityHandle, tag: TagId) -> bool;
}

/// Components of one live entity.
#[derive(Clone, Debug, Default)]
pub struct EntityRecord {
    attributes: AttributeSet,
    tags: TagContainer,
    effects: ActiveEffects,
    pub blackboard: Blackboard,
    pub listeners: ListenerTable,
    pub position: Vec2,
    /// Seat answering prompts raised for this entity.
    pub player: Option<PlayerId>,
    pub(crate) dirty: DirtyFlags,
    pub(crate) snapshot: EntitySnapshot,
}

impl EntityRecord {
    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn tags(&self) -> &TagContainer {
        &self.tags
    }

    pub fn effects(&self) -> &ActiveEffects {
        &self.effects
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    fn recompute(&mut self, id: AttributeId) {
        self.attributes.recompute(id, self.effects.modifiers());
        self.dirty |= DirtyFlags::ATTRIBUTES;
    }
}

#[derive(Clone, Debug, Default)]
struct Slot {
    generation: u32,
    record: Option<EntityRecord>,
}

#[derive(Clone, Debug)]
pub struct World {
    slots: Vec<Slot>,
    free: Vec<u32>,
    tag_rules: TagRuleTable,
    next_effect_id: u32,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            tag_rules: TagRuleTable::new(),
            next_effect_id: 1,
        }
    }

    pub fn with_capacity(entities: usize) -> Self {
        Self {
            slots: Vec::with_capacity(entities),
            free: Vec::with_capacity(entities),
            ..Self::new()
        }
    }

    pub fn tag_rules(&self) -> &TagRuleTable {
        &self.tag_rules
    }

    pub fn tag_rules_mut(&mut self) -> &mut TagRuleTable {
        &mut self.tag_rules
    }

    pub fn spawn(&mut self) -> EntityHandle {
        self.spawn_at(Vec2::ZERO)
    }

    pub fn spawn_at(&mut self, position: Vec2) -> EntityHandle {
        let record = EntityRecord {
            position,
            ..EntityRecord::default()
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.record = Some(record);
            return EntityHandle::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            record: Some(record),
        });
        EntityHandle::new(index, 0)
    }

    /// Removes the entity and everything it owns, including active effects.
    pub fn despawn(&mut self, handle: EntityHandle) -> Option<EntityRecord> {
        if !self.is_alive(handle) {
            return None;
        }
        let slot = &mut self.slots[handle.index() as usize];
        let record = slot.record.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index());
        record
    }

    pub fn is_alive(&self, handle: EntityHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: EntityHandle) -> Option<&EntityRecord> {
        if handle.is_null() {
            return None;
        }
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.record.as_ref()
    }

    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut EntityRecord> {
        record_mut(&mut self.slots, handle)
    }

    /// Live handles in slot order.
    pub fn handles(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.record
                .as_ref()
                .map(|_| EntityHandle::new(index as u32, slot.generation))
        })
    }

    /// Handle of the live entity occupying `index`, if any.
    pub fn handle_at(&self, index: usize) -> Option<EntityHandle> {
        let slot = self.slots.get(index)?;
        slot.record
            .as_ref()
            .map(|_| EntityHandle::new(index as u32, slot.generation))
    }

    /// Number of slots ever allocated; bounds [`handle_at`](Self::handle_at).
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn position(&self, handle: EntityHandle) -> Option<Vec2> {
        self.get(handle).map(|record| record.position)
    }

    pub fn set_position(&mut self, handle: EntityHandle, position: Vec2) -> bool {
        match self.get_mut(handle) {
            Some(record) => {
                record.position = position;
                true
            }
            None => false,
        }
    }

    // ===== attributes =====

    pub fn attribute(&self, handle: EntityHandle, id: AttributeId) -> Option<f32> {
        self.get(handle)?.attributes.get(id)
    }

    pub fn base_attribute(&self, handle: EntityHandle, id: AttributeId) -> Option<f32> {
        self.get(handle)?.attributes.base(id)
    }

    pub fn set_attribute(&mut self, handle: EntityHandle, id: AttributeId, value: f32) -> bool {
        let Some(record) = self.get_mut(handle) else {
            return false;
        };
        if !record.attributes.set_base(id, value) {
            return false;
        }
        record.recompute(id);
        true
    }

    pub fn add_attribute(
        &mut self,
        handle: EntityHandle,
        id: AttributeId,
        delta: f32,
    ) -> Option<f32> {
        let record = self.get_mut(handle)?;
        let base = record.attributes.base(id).unwrap_or(0.0);
        if !record.attributes.set_base(id, base + delta) {
            return None;
        }
        record.recompute(id);
        record.attributes.get(id)
    }

    /// Folds instant modifiers permanently into base values.
    pub fn apply_instant(&mut self, handle: EntityHandle, modifiers: &[AttributeModifier]) -> bool {
        let Some(record) = self.get_mut(handle) else {
            return false;
        };
        for modifier in modifiers {
            let base = record.attributes.base(modifier.attribute).unwrap_or(0.0);
            if record
                .attributes
                .set_base(modifier.attribute, modifier.apply_to(base))
            {
                record.recompute(modifier.attribute);
            }
        }
        true
    }

    // ===== tags =====

    pub fn has_tag(&self, handle: EntityHandle, tag: TagId, sense: TagSense) -> bool {
        self.get(handle)
            .is_some_and(|record| self.tag_rules.query(&record.tags, tag, sense))
    }

    pub fn tag_count(&self, handle: EntityHandle, tag: TagId) -> u16 {
        self.get(handle).map_or(0, |record| record.tags.count(tag))
    }

    pub fn add_tag(&mut self, handle: EntityHandle, tag: TagId) -> bool {
        let Some(record) = record_mut(&mut self.slots, handle) else {
            return false;
        };
        let added = record.tags.add(tag);
        if added {
            self.tag_rules.propagate(&mut record.tags);
            record.dirty |= DirtyFlags::TAGS;
        }
        added
    }

    pub fn remove_tag(&mut self, handle: EntityHandle, tag: TagId) -> bool {
        let Some(record) = record_mut(&mut self.slots, handle) else {
            return false;
        };
        let removed = record.tags.remove(tag);
        if removed {
            self.tag_rules.propagate(&mut record.tags);
            record.dirty |= DirtyFlags::TAGS;
        }
        removed
    }

    // ===== blackboard =====

    pub fn blackboard(&self, handle: EntityHandle) -> Option<&Blackboard> {
        self.get(handle).map(|record| &record.blackboard)
    }

    pub fn blackboard_mut(&mut self, handle: EntityHandle) -> Option<&mut Blackboard> {
        self.get_mut(handle).map(|record| &mut record.blackboard)
    }

    // ===== active effects =====

    /// Stores a durational effect on its target, granting its tags and
    /// re-aggregating the attributes its modifiers touch.
    ///
    /// Returns `None` when the target is dead or its container is full.
    pub fn add_effect(&mut self, mut effect: GameplayEffect) -> Option<EffectInstanceId> {
        let id = EffectInstanceId(self.next_effect_id);
        let record = record_mut(&mut self.slots, effect.target)?;
        effect.id = id;
        let modifiers = effect.modifiers.clone();
        let granted = effect.granted_tags.clone();
        if !record.effects.push(effect) {
            return None;
        }
        self.next_effect_id = self.next_effect_id.wrapping_add(1);

        for tag in &granted {
            record.tags.add(*tag);
        }
        if !granted.is_empty() {
            self.tag_rules.propagate(&mut record.tags);
            record.dirty |= DirtyFlags::TAGS;
        }
        for modifier in &modifiers {
            // Modifiers on an absent attribute aggregate over a zero base.
            if record.attributes.base(modifier.attribute).is_none() {
                record.attributes.set_base(modifier.attribute, 0.0);
            }
            record.recompute(modifier.attribute);
        }
        record.dirty |= DirtyFlags::EFFECTS;
        Some(id)
    }

    pub fn effect(&self, handle: EntityHandle, id: EffectInstanceId) -> Option<&GameplayEffect> {
        self.get(handle)?.effects.get(id)
    }

    pub fn effect_mut(
        &mut self,
        handle: EntityHandle,
        id: EffectInstanceId,
    ) -> Option<&mut GameplayEffect> {
        self.get_mut(handle)?.effects.get_mut(id)
    }

    /// Removes a stored effect and undoes its granted tags and modifiers.
    pub fn remove_effect(
        &mut self,
        handle: EntityHandle,
        id: EffectInstanceId,
    ) -> Option<GameplayEffect> {
        let record = record_mut(&mut self.slots, handle)?;
        let effect = record.effects.remove(id)?;
        for tag in &effect.granted_tags {
            record.tags.remove(*tag);
        }
        if !effect.granted_tags.is_empty() {
            self.tag_rules.propagate(&mut record.tags);
            record.dirty |= DirtyFlags::TAGS;
        }
        for modifier in &effect.modifiers {
            record.recompute(modifier.attribute);
        }
        record.dirty |= DirtyFlags::EFFECTS;
        Some(effect)
    }

    /// SHA-256 over every slot's deterministic state.
    ///
    /// Two worlds driven through the same tick sequence produce the same
    /// digest bit for bit.
    pub fn state_digest(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        for slot in &self.slots {
            hasher.update(slot.generation.to_le_bytes());
            let Some(record) = &slot.record else {
                hasher.update([0u8]);
                continue;
            };
            hasher.update([1u8]);
            hasher.update(record.position.x.to_bits().to_le_bytes());
            hasher.update(record.position.y.to_bits().to_le_bytes());
            for value in record.attributes.iter() {
                hasher.update(value.id.0.to_le_bytes());
                hasher.update(value.base.to_bits().to_le_bytes());
                hasher.update(value.current.to_bits().to_le_bytes());
            }
            for tag in record.tags.iter() {
                hasher.update(tag.tag.0.to_le_bytes());
                hasher.update(tag.count.to_le_bytes());
            }
            for effect in record.effects.iter() {
                hasher.update(effect.id.0.to_le_bytes());
                hasher.update(effect.template.0.to_le_bytes());
                hasher.update(effect.remaining_ticks.to_le_bytes());
                hasher.update(effect.period_elapsed.to_le_bytes());
            }
        }
        hasher.finalize().into()
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = (EntityHandle, &mut EntityRecord)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| {
                let generation = slot.generation;
                slot.record
                    .as_mut()
                    .map(|record| (EntityHandle::new(index as u32, generation), record))
            })
    }
}

fn record_mut(slots: &mut [Slot], handle: EntityHandle) -> Option<&mut EntityRecord> {
    if handle.is_null() {
        return None;
    }
    let slot = slots.get_mut(handle.index() as usize)?;
    if slot.generation != handle.generation() {
        return None;
    }
    slot.record.as_mut()
}

impl AttributeStore for World {
    fn attribute(&self, entity: EntityHandle, id: AttributeId) -> Option<f32> {
        World::attribute(self, entity, id)
    }

    fn base_attribute(&self, entity: EntityHandle, id: AttributeId) -> Option<f32> {
        World::base_attribute(self, entity, id)
    }

    fn set_attribute(&mut self, entity: EntityHandle, id: AttributeId, value: f32) -> bool {
        World::set_attribute(self, entity, id, value)
    }

    fn add_attribute(&mut self, entity: EntityHandle, id: AttributeId, delta: f32) -> Option<f32> {
        World::add_attribute(self, entity, id, delta)
    }
}

impl TagStore for World {
    fn has_tag(&self, entity: EntityHandle, tag: TagId, sense: TagSense) -> bool {
        World::has_tag(self, entity, tag, sense)
    }

    fn add_tag(&mut self, entity: EntityHandle, tag: TagId) -> bool {
        World::add_tag(self, entity, tag)
    }

    fn remove_tag(&mut self, entity: EntityHandle, tag: TagId) -> bool {
        World::remove_tag(self, entity, tag)
    }
}
