use arrayvec::ArrayVec;

use crate::config::CoreConfig;
use crate::state::{TagId, TemplateId};

/// How a listener reacts to a matching proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResponseKind {
    /// Propose the payload template as a nested response.
    Chain,
    /// Ask the owning player to decide, holding the window open.
    PromptInput,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResponseChainListener {
    pub trigger: TagId,
    pub response: ResponseKind,
    /// Higher priorities are processed first.
    pub priority: i16,
    pub payload: TemplateId,
}

impl ResponseChainListener {
    pub fn chain(trigger: TagId, payload: TemplateId, priority: i16) -> Self {
        Self {
            trigger,
            response: ResponseKind::Chain,
            priority,
            payload,
        }
    }

    pub fn prompt(trigger: TagId, priority: i16) -> Self {
        Self {
            trigger,
            response: ResponseKind::PromptInput,
            priority,
            payload: TemplateId::default(),
        }
    }
}

/// Per-entity listener table, populated from game data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListenerTable {
    entries: ArrayVec<ResponseChainListener, { CoreConfig::MAX_LISTENERS }>,
    dropped: u32,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener. Returns `false` and counts the drop when full.
    pub fn push(&mut self, listener: ResponseChainListener) -> bool {
        if self.entries.try_push(listener).is_err() {
            self.dropped += 1;
            return false;
        }
        true
    }

    /// Listeners triggered by `tag`, with their table index, in table order.
    pub fn matching(&self, tag: TagId) -> impl Iterator<Item = (usize, &ResponseChainListener)> {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, listener)| listener.trigger == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResponseChainListener> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_is_counted_and_existing_entries_survive() {
        let mut table = ListenerTable::new();
        for i in 0..CoreConfig::MAX_LISTENERS + 3 {
            table.push(ResponseChainListener::chain(TagId(1), TemplateId(i as u32), 0));
        }
        assert_eq!(table.len(), CoreConfig::MAX_LISTENERS);
        assert_eq!(table.dropped(), 3);
        assert_eq!(table.iter().next().map(|l| l.payload), Some(TemplateId(0)));
    }

    #[test]
    fn matching_filters_by_trigger_tag() {
        let mut table = ListenerTable::new();
        table.push(ResponseChainListener::chain(TagId(1), TemplateId(10), 0));
        table.push(ResponseChainListener::prompt(TagId(2), 5));
        table.push(ResponseChainListener::chain(TagId(1), TemplateId(11), 3));

        let matched: Vec<_> = table.matching(TagId(1)).map(|(i, _)| i).collect();
        assert_eq!(matched, vec![0, 2]);
    }
}
