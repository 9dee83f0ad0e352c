/// Running counters kept by the response-chain engine.
///
/// Nothing the engine discards goes unaccounted: every request either
/// commits or lands in exactly one of the other counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainBudget {
    /// Chain responses discarded by the depth or window-capacity budget.
    pub dropped: u64,
    /// Prompts that did not fit the window or the order channel.
    pub prompts_dropped: u64,
    /// Requests refused before entering a window (unknown template, stale
    /// handle, cooldown, cost, failed gate).
    pub rejected: u64,
    /// Window entries that no longer passed their checks at resolve time.
    pub fizzled: u64,
    pub negated: u64,
    /// Decisions from a player holding no open prompt in the window.
    pub orders_ignored: u64,
    pub committed: u64,
    /// Durational effects refused by a full active-effect container.
    pub effects_dropped: u64,
    pub windows_opened: u64,
    pub windows_closed: u64,
    pub timeouts: u64,
    /// Deepest chain level reached so far.
    pub max_depth_seen: u8,
}

impl ChainBudget {
    pub fn note_depth(&mut self, depth: u8) {
        self.max_depth_seen = self.max_depth_seen.max(depth);
    }
}
