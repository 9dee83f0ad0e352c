use crate::state::{AttributeId, EntityHandle, EventTag, TagId, TemplateId};

/// Payload of a published gameplay event.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// Raised by a graph or builtin.
    Gameplay,
    AttributeChanged {
        attribute: AttributeId,
        old: f32,
        new: f32,
    },
    TagAdded(TagId),
    TagRemoved(TagId),
    EffectApplied(TemplateId),
    EffectRemoved(TemplateId),
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameplayEvent {
    pub tag: EventTag,
    pub kind: EventKind,
    pub source: EntityHandle,
    pub target: EntityHandle,
    pub magnitude: f32,
}

impl GameplayEvent {
    pub fn gameplay(
        tag: EventTag,
        source: EntityHandle,
        target: EntityHandle,
        magnitude: f32,
    ) -> Self {
        Self {
            tag,
            kind: EventKind::Gameplay,
            source,
            target,
            magnitude,
        }
    }
}

/// Bounded per-tick event bus.
///
/// Storage is reserved up front; publishing past capacity rejects the event
/// and increments [`dropped`](Self::dropped).
#[derive(Clone, Debug)]
pub struct EventBuffer {
    events: Vec<GameplayEvent>,
    capacity: usize,
    dropped: u64,
}

impl EventBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    pub fn publish(&mut self, event: GameplayEvent) -> bool {
        if self.events.len() >= self.capacity {
            self.dropped += 1;
            tracing::warn!(
                target: "core::events",
                tag = %event.tag,
                capacity = self.capacity,
                "event buffer full, dropping event"
            );
            return false;
        }
        self.events.push(event);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameplayEvent> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[GameplayEvent] {
        &self.events
    }

    /// Moves every buffered event out, keeping the reserved storage.
    pub fn drain(&mut self) -> impl Iterator<Item = GameplayEvent> + '_ {
        self.events.drain(..)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events rejected since construction.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::with_capacity(crate::config::CoreConfig::DEFAULT_EVENT_CAPACITY)
    }
}
