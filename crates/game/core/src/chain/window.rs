use arrayvec::ArrayVec;

use crate::clock::Tick;
use crate::config::CoreConfig;
use crate::effect::EffectRequest;
use crate::graph::TriggerContext;
use crate::state::{EntityHandle, PlayerId, RootId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum WindowState {
    #[default]
    Idle,
    Collect,
    Wait,
    Resolve,
}

/// One proposal held by a window. Entry 0 is the root.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainEntry {
    pub request: EffectRequest,
    /// Participants of the entry that triggered this one.
    pub context: TriggerContext,
    pub depth: u8,
    pub negated: bool,
}

/// A raised prompt awaiting its decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PromptSlot {
    pub player: PlayerId,
    pub responder: EntityHandle,
    /// Entry whose proposal the prompt challenges.
    pub entry: u8,
    pub answered: bool,
}

pub const MAX_WINDOW_ENTRIES: usize = CoreConfig::MAX_CHAIN_RESPONSES + 1;

/// The open proposal and everything it has collected so far.
#[derive(Clone, Debug, Default)]
pub struct ProposalWindow {
    state: WindowState,
    root: RootId,
    opened_at: Tick,
    entries: ArrayVec<ChainEntry, MAX_WINDOW_ENTRIES>,
    prompts: ArrayVec<PromptSlot, { CoreConfig::MAX_PROMPTS }>,
    /// Next entry whose listeners have not been collected.
    collect_cursor: usize,
}

impl ProposalWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != WindowState::Idle
    }

    pub fn root(&self) -> RootId {
        self.root
    }

    pub fn opened_at(&self) -> Tick {
        self.opened_at
    }

    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    pub fn prompts(&self) -> &[PromptSlot] {
        &self.prompts
    }

    /// Responses held besides the root.
    pub fn responses(&self) -> usize {
        self.entries.len().saturating_sub(1)
    }

    pub fn has_capacity(&self) -> bool {
        !self.entries.is_full()
    }

    pub fn has_prompt_capacity(&self) -> bool {
        !self.prompts.is_full()
    }

    pub fn expected(&self) -> usize {
        self.prompts.len()
    }

    pub fn received(&self) -> usize {
        self.prompts.iter().filter(|prompt| prompt.answered).count()
    }

    pub fn is_satisfied(&self) -> bool {
        self.prompts.iter().all(|prompt| prompt.answered)
    }

    pub(crate) fn open(&mut self, root: ChainEntry, now: Tick) {
        self.clear();
        self.root = root.request.root;
        self.opened_at = now;
        self.state = WindowState::Collect;
        // Capacity is at least one, so the root always fits.
        let _ = self.entries.try_push(root);
    }

    pub(crate) fn set_state(&mut self, state: WindowState) {
        self.state = state;
    }

    pub(crate) fn push_entry(&mut self, entry: ChainEntry) -> bool {
        self.entries.try_push(entry).is_ok()
    }

    pub(crate) fn push_prompt(&mut self, prompt: PromptSlot) -> bool {
        self.prompts.try_push(prompt).is_ok()
    }

    /// Index of the next entry to collect listeners for.
    pub(crate) fn next_uncollected(&mut self) -> Option<usize> {
        if self.collect_cursor >= self.entries.len() {
            return None;
        }
        let index = self.collect_cursor;
        self.collect_cursor += 1;
        Some(index)
    }

    /// Marks the first unanswered prompt of `player` answered and returns it.
    /// `None` when that player holds no open prompt.
    pub(crate) fn answer(&mut self, player: PlayerId) -> Option<PromptSlot> {
        let index = self
            .prompts
            .iter()
            .position(|prompt| !prompt.answered && prompt.player == player)?;
        self.prompts[index].answered = true;
        Some(self.prompts[index])
    }

    /// Negates one entry. False when it was already negated or is absent.
    pub(crate) fn negate(&mut self, index: usize) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) if !entry.negated => {
                entry.negated = true;
                true
            }
            _ => false,
        }
    }

    /// Marks every unanswered prompt answered and returns the entries they
    /// challenged.
    pub(crate) fn answer_all(&mut self) -> ArrayVec<u8, { CoreConfig::MAX_PROMPTS }> {
        let mut challenged = ArrayVec::new();
        for prompt in self.prompts.iter_mut().filter(|prompt| !prompt.answered) {
            prompt.answered = true;
            challenged.push(prompt.entry);
        }
        challenged
    }

    pub(crate) fn clear(&mut self) {
        self.state = WindowState::Idle;
        self.root = RootId::NONE;
        self.opened_at = Tick::ZERO;
        self.entries.clear();
        self.prompts.clear();
        self.collect_cursor = 0;
    }
}
