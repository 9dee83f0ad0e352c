//! Committed event history.
//!
//! The core's [`EventBuffer`] only lives for one tick. When a tick commits,
//! its events move here, stamped with the tick they happened on. The history
//! is a bounded ring; the oldest entries are evicted first and counted.

use std::collections::VecDeque;

use ability_core::clock::Tick;
use ability_core::env::{EventBuffer, EventKind, GameplayEvent};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistoryEntry {
    pub tick: Tick,
    pub event: GameplayEvent,
}

#[derive(Clone, Debug)]
pub struct EventHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    total: u64,
    evicted: u64,
}

impl EventHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
            evicted: 0,
        }
    }

    /// Moves every buffered event into the history.
    pub fn archive(&mut self, tick: Tick, buffer: &mut EventBuffer) -> usize {
        let mut archived = 0;
        for event in buffer.drain() {
            archived += 1;
            self.total += 1;
            if self.capacity == 0 {
                self.evicted += 1;
                continue;
            }
            if self.entries.len() == self.capacity {
                self.entries.pop_front();
                self.evicted += 1;
            }
            self.entries.push_back(HistoryEntry { tick, event });
        }
        archived
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Retained events of `tick`.
    pub fn at(&self, tick: Tick) -> impl Iterator<Item = &GameplayEvent> {
        self.entries
            .iter()
            .filter(move |entry| entry.tick == tick)
            .map(|entry| &entry.event)
    }

    pub fn count_where(&self, predicate: impl Fn(&EventKind) -> bool) -> usize {
        self.entries
            .iter()
            .filter(|entry| predicate(&entry.event.kind))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Events ever archived, retained or not.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ability_core::state::{EntityHandle, EventTag};

    fn event(magnitude: f32) -> GameplayEvent {
        GameplayEvent::gameplay(EventTag(9), EntityHandle::NULL, EntityHandle::NULL, magnitude)
    }

    #[test]
    fn oldest_entries_are_evicted_first() {
        let mut history = EventHistory::with_capacity(3);
        let mut buffer = EventBuffer::with_capacity(8);
        for i in 0..5 {
            buffer.publish(event(i as f32));
        }

        assert_eq!(history.archive(Tick(7), &mut buffer), 5);

        assert!(buffer.is_empty());
        assert_eq!(history.total(), 5);
        assert_eq!(history.evicted(), 2);
        let magnitudes: Vec<f32> = history.iter().map(|e| e.event.magnitude).collect();
        assert_eq!(magnitudes, vec![2.0, 3.0, 4.0]);
        assert_eq!(history.at(Tick(7)).count(), 3);
        assert_eq!(history.at(Tick(8)).count(), 0);
    }
}
