//! Dirty flags and last-known snapshots.
//!
//! Mutations through [`World`] set per-entity flags. Once per tick
//! [`collect_changes`] diffs each flagged entity against its snapshot, emits
//! change events, and refreshes the snapshot. Diffing only reads gameplay
//! state.

use arrayvec::ArrayVec;
use bitflags::bitflags;

use crate::config::CoreConfig;
use crate::env::{EventBuffer, EventKind, GameplayEvent};
use crate::state::{AttributeId, EntityHandle, EventTag, TagCount, World};

bitflags! {
    /// Which components of an entity changed since the last diff.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u8 {
        const ATTRIBUTES = 1 << 0;
        const TAGS       = 1 << 1;
        const EFFECTS    = 1 << 2;
    }
}

/// Last values reported for one entity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntitySnapshot {
    attributes: ArrayVec<(AttributeId, f32), { CoreConfig::MAX_ATTRIBUTES }>,
    tags: ArrayVec<TagCount, { CoreConfig::MAX_TAGS }>,
}

impl EntitySnapshot {
    pub fn attribute(&self, id: AttributeId) -> Option<f32> {
        self.attributes
            .iter()
            .find(|(entry, _)| *entry == id)
            .map(|(_, value)| *value)
    }
}

/// Totals of one [`collect_changes`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeReport {
    pub entities: u32,
    pub events: u32,
    pub dropped: u32,
}

/// Emits attribute and tag change events for every dirty entity and clears
/// the flags.
pub fn collect_changes(world: &mut World, events: &mut EventBuffer) -> ChangeReport {
    let mut report = ChangeReport::default();
    for (handle, record) in world.records_mut() {
        if record.dirty.is_empty() {
            continue;
        }
        report.entities += 1;

        if record.dirty.contains(DirtyFlags::ATTRIBUTES) {
            for value in record.attributes().iter() {
                let old = record.snapshot.attribute(value.id);
                if old.is_some_and(|old| old.to_bits() == value.current.to_bits()) {
                    continue;
                }
                let event = GameplayEvent {
                    tag: EventTag::ATTRIBUTE_CHANGED,
                    kind: EventKind::AttributeChanged {
                        attribute: value.id,
                        old: old.unwrap_or(0.0),
                        new: value.current,
                    },
                    source: handle,
                    target: handle,
                    magnitude: value.current - old.unwrap_or(0.0),
                };
                publish(events, event, &mut report);
            }
        }

        if record.dirty.contains(DirtyFlags::TAGS) {
            for entry in record.tags().iter() {
                if !record.snapshot.tags.iter().any(|old| old.tag == entry.tag) {
                    publish(events, tag_event(handle, entry, true), &mut report);
                }
            }
            for old in record.snapshot.tags.iter() {
                if !record.tags().has(old.tag) {
                    publish(events, tag_event(handle, old, false), &mut report);
                }
            }
        }

        record.snapshot = snapshot_of(
            record.attributes().iter().map(|v| (v.id, v.current)),
            record.tags().iter(),
        );
        record.dirty = DirtyFlags::empty();
    }
    report
}

/// Refreshes every snapshot without emitting events.
pub fn mark_clean(world: &mut World) {
    for (_, record) in world.records_mut() {
        record.snapshot = snapshot_of(
            record.attributes().iter().map(|v| (v.id, v.current)),
            record.tags().iter(),
        );
        record.dirty = DirtyFlags::empty();
    }
}

fn snapshot_of<'a>(
    attributes: impl Iterator<Item = (AttributeId, f32)>,
    tags: impl Iterator<Item = &'a TagCount>,
) -> EntitySnapshot {
    EntitySnapshot {
        attributes: attributes.collect(),
        tags: tags.copied().collect(),
    }
}

fn tag_event(handle: EntityHandle, entry: &TagCount, added: bool) -> GameplayEvent {
    let (tag, kind) = if added {
        (EventTag::TAG_ADDED, EventKind::TagAdded(entry.tag))
    } else {
        (EventTag::TAG_REMOVED, EventKind::TagRemoved(entry.tag))
    };
    GameplayEvent {
        tag,
        kind,
        source: handle,
        target: handle,
        magnitude: 0.0,
    }
}

fn publish(events: &mut EventBuffer, event: GameplayEvent, report: &mut ChangeReport) {
    if events.publish(event) {
        report.events += 1;
    } else {
        report.dropped += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TagId;

    const HEALTH: AttributeId = AttributeId(7);

    #[test]
    fn diff_reports_only_changed_values() {
        let mut world = World::new();
        let entity = world.spawn();
        world.set_attribute(entity, HEALTH, 10.0);
        world.set_attribute(entity, AttributeId(8), 1.0);
        mark_clean(&mut world);

        world.set_attribute(entity, HEALTH, 7.0);
        world.set_attribute(entity, AttributeId(8), 1.0);
        let mut events = EventBuffer::with_capacity(8);
        let report = collect_changes(&mut world, &mut events);

        assert_eq!(report.entities, 1);
        assert_eq!(report.events, 1);
        let event = events.iter().next().unwrap();
        assert_eq!(
            event.kind,
            EventKind::AttributeChanged {
                attribute: HEALTH,
                old: 10.0,
                new: 7.0
            }
        );
        assert_eq!(event.magnitude, -3.0);
    }

    #[test]
    fn tag_presence_changes_emit_once() {
        let mut world = World::new();
        let entity = world.spawn();
        mark_clean(&mut world);

        world.add_tag(entity, TagId(3));
        world.add_tag(entity, TagId(3));
        let mut events = EventBuffer::with_capacity(8);
        collect_changes(&mut world, &mut events);
        assert_eq!(events.len(), 1);

        events.clear();
        world.remove_tag(entity, TagId(3));
        collect_changes(&mut world, &mut events);
        // Count dropped from two to one: still present.
        assert!(events.is_empty());

        world.remove_tag(entity, TagId(3));
        collect_changes(&mut world, &mut events);
        assert_eq!(
            events.iter().next().map(|event| event.kind),
            Some(EventKind::TagRemoved(TagId(3)))
        );
    }

    #[test]
    fn clean_world_emits_nothing() {
        let mut world = World::new();
        let entity = world.spawn();
        world.set_attribute(entity, HEALTH, 10.0);
        mark_clean(&mut world);

        let mut events = EventBuffer::with_capacity(4);
        let report = collect_changes(&mut world, &mut events);
        assert_eq!(report, ChangeReport::default());
    }
}
