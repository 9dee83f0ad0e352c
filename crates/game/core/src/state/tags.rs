//! Gameplay tags and tag rules.
//!
//! Tags are reference counted: two effects granting the same tag keep it
//! present until both are gone. Tag rules propagate attach/remove reactions
//! and suppress tags (`Disable`) for the [`TagSense::Effective`] query.

use arrayvec::ArrayVec;

use crate::config::CoreConfig;
use crate::state::TagId;

/// How a tag query is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TagSense {
    /// The tag has a non-zero count.
    #[default]
    Present,
    /// The tag is present and no present tag disables it.
    Effective,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagCount {
    pub tag: TagId,
    pub count: u16,
}

/// Reference-counted tag set of one entity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagContainer {
    tags: ArrayVec<TagCount, { CoreConfig::MAX_TAGS }>,
    dropped: u32,
}

impl TagContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, tag: TagId) -> bool {
        self.count(tag) > 0
    }

    pub fn count(&self, tag: TagId) -> u16 {
        self.tags
            .iter()
            .find(|entry| entry.tag == tag)
            .map_or(0, |entry| entry.count)
    }

    /// Increments the tag count. Returns `false` and counts the drop when full.
    pub fn add(&mut self, tag: TagId) -> bool {
        if let Some(entry) = self.tags.iter_mut().find(|entry| entry.tag == tag) {
            entry.count = entry.count.saturating_add(1);
            return true;
        }
        let inserted = self.tags.try_push(TagCount { tag, count: 1 }).is_ok();
        if !inserted {
            self.dropped += 1;
        }
        inserted
    }

    /// Decrements the tag count. Returns `false` if the tag was absent.
    pub fn remove(&mut self, tag: TagId) -> bool {
        let Some(position) = self.tags.iter().position(|entry| entry.tag == tag) else {
            return false;
        };
        let entry = &mut self.tags[position];
        entry.count -= 1;
        if entry.count == 0 {
            self.tags.remove(position);
        }
        true
    }

    /// Removes the tag regardless of its count.
    pub fn clear(&mut self, tag: TagId) -> bool {
        let before = self.tags.len();
        self.tags.retain(|entry| entry.tag != tag);
        self.tags.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagCount> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

/// Reactive relation between tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TagRule {
    /// While `when` is present, `attach` is added once.
    Attach { when: TagId, attach: TagId },
    /// While `when` is present, `remove` is cleared.
    Remove { when: TagId, remove: TagId },
    /// While `when` is present, `disables` is not effective.
    Disable { when: TagId, disables: TagId },
}

/// Outcome of one rule propagation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Propagation {
    pub changes: u32,
    pub dropped: u32,
}

/// Fixed-capacity tag rule table shared by every entity of a world.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagRuleTable {
    rules: ArrayVec<TagRule, { CoreConfig::MAX_TAG_RULES }>,
    dropped: u32,
}

impl TagRuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: TagRule) -> bool {
        let inserted = self.rules.try_push(rule).is_ok();
        if !inserted {
            self.dropped += 1;
        }
        inserted
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Evaluates `tag` under `sense` against `tags`.
    pub fn query(&self, tags: &TagContainer, tag: TagId, sense: TagSense) -> bool {
        if !tags.has(tag) {
            return false;
        }
        match sense {
            TagSense::Present => true,
            TagSense::Effective => !self.rules.iter().any(|rule| {
                matches!(rule, TagRule::Disable { when, disables } if *disables == tag && tags.has(*when))
            }),
        }
    }

    /// Applies attach/remove rules until nothing changes.
    ///
    /// Every rule fires at most once per call, so cycles (A attaches B, B
    /// removes A) terminate after at most `len() + 1` sweeps.
    pub fn propagate(&self, tags: &mut TagContainer) -> Propagation {
        let mut processed = [false; CoreConfig::MAX_TAG_RULES];
        let mut outcome = Propagation::default();

        loop {
            let mut progressed = false;
            for (index, rule) in self.rules.iter().enumerate() {
                if processed[index] {
                    continue;
                }
                match *rule {
                    TagRule::Attach { when, attach } => {
                        if !tags.has(when) {
                            continue;
                        }
                        processed[index] = true;
                        if tags.has(attach) {
                            continue;
                        }
                        if tags.add(attach) {
                            outcome.changes += 1;
                            progressed = true;
                        } else {
                            outcome.dropped += 1;
                        }
                    }
                    TagRule::Remove { when, remove } => {
                        if !tags.has(when) {
                            continue;
                        }
                        processed[index] = true;
                        if tags.clear(remove) {
                            outcome.changes += 1;
                            progressed = true;
                        }
                    }
                    TagRule::Disable { .. } => processed[index] = true,
                }
            }
            if !progressed {
                return outcome;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BURNING: TagId = TagId(10);
    const WET: TagId = TagId(11);
    const STEAM: TagId = TagId(12);
    const SILENCED: TagId = TagId(13);
    const CASTING: TagId = TagId(14);

    #[test]
    fn counts_are_reference_counted() {
        let mut tags = TagContainer::new();
        tags.add(BURNING);
        tags.add(BURNING);
        assert!(tags.remove(BURNING));
        assert!(tags.has(BURNING));
        assert!(tags.remove(BURNING));
        assert!(!tags.has(BURNING));
        assert!(!tags.remove(BURNING));
    }

    #[test]
    fn disable_rule_suppresses_effective_sense_only() {
        let mut rules = TagRuleTable::new();
        rules.push(TagRule::Disable {
            when: SILENCED,
            disables: CASTING,
        });
        let mut tags = TagContainer::new();
        tags.add(CASTING);
        tags.add(SILENCED);

        assert!(rules.query(&tags, CASTING, TagSense::Present));
        assert!(!rules.query(&tags, CASTING, TagSense::Effective));

        tags.remove(SILENCED);
        assert!(rules.query(&tags, CASTING, TagSense::Effective));
    }

    #[test]
    fn cyclic_rules_terminate() {
        let mut rules = TagRuleTable::new();
        rules.push(TagRule::Attach {
            when: BURNING,
            attach: STEAM,
        });
        rules.push(TagRule::Remove {
            when: STEAM,
            remove: BURNING,
        });
        rules.push(TagRule::Attach {
            when: STEAM,
            attach: BURNING,
        });
        let mut tags = TagContainer::new();
        tags.add(BURNING);

        let outcome = rules.propagate(&mut tags);

        // Burning attaches steam, steam clears burning, steam re-attaches burning once.
        assert_eq!(outcome.changes, 3);
        assert!(tags.has(STEAM));
        assert!(tags.has(BURNING));
    }

    #[test]
    fn remove_rule_fires_when_trigger_present() {
        let mut rules = TagRuleTable::new();
        rules.push(TagRule::Remove {
            when: WET,
            remove: BURNING,
        });
        let mut tags = TagContainer::new();
        tags.add(BURNING);
        tags.add(BURNING);
        tags.add(WET);

        rules.propagate(&mut tags);
        assert!(!tags.has(BURNING));
        assert!(tags.has(WET));
    }
}
