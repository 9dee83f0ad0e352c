/// Capacity constants and runtime-tunable parameters for the ability core.
///
/// The `const` items size every fixed-capacity container in the crate and are
/// used directly as const generic arguments. Values that may change between
/// runs live on [`ChainConfig`] and [`crate::clock::StepPolicy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoreConfig;

impl CoreConfig {
    // ===== effect data model =====
    pub const MAX_MODIFIERS: usize = 8;
    pub const MAX_CONFIG_PARAMS: usize = 16;
    pub const MAX_CALLER_PARAMS: usize = 8;
    pub const MAX_GRANTED_TAGS: usize = 4;
    pub const MAX_ACTIVE_EFFECTS: usize = 16;

    // ===== entity store =====
    pub const MAX_ATTRIBUTES: usize = 32;
    pub const MAX_TAGS: usize = 32;
    pub const MAX_TAG_RULES: usize = 32;
    pub const MAX_BLACKBOARD_ENTRIES: usize = 16;

    // ===== response chain =====
    pub const MAX_LISTENERS: usize = 8;
    /// Responses a single proposal window can hold. Bounded by listener capacity.
    pub const MAX_CHAIN_RESPONSES: usize = Self::MAX_LISTENERS;
    pub const MAX_PROMPTS: usize = Self::MAX_LISTENERS;
    /// Hard ceiling for [`ChainConfig::max_depth`].
    pub const MAX_CHAIN_DEPTH: u8 = 4;
    pub const MAX_TELEMETRY_RECORDS: usize = 128;

    // ===== register VM =====
    pub const REGISTER_COUNT: usize = 16;
    pub const TARGET_REGISTER_COUNT: usize = 4;
    pub const TARGET_LIST_CAPACITY: usize = 32;
    pub const MAX_PROGRAM_LEN: usize = 256;
    /// Instructions a single graph invocation may retire before it is aborted.
    pub const MAX_GRAPH_STEPS: u32 = 1024;

    // ===== queues =====
    pub const DEFAULT_REQUEST_CAPACITY: usize = 256;
    pub const DEFAULT_EVENT_CAPACITY: usize = 256;
    pub const DEFAULT_ORDER_CAPACITY: usize = 64;
}

/// What happens to a prompt window nobody answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PromptTimeout {
    /// The window waits until every expected decision arrives.
    #[default]
    Never,
    /// After `ticks` ticks in Wait, missing decisions are filled with `fallback`.
    AfterTicks { ticks: u32, fallback: TimeoutFallback },
}

/// Decision substituted for a missing response when a prompt times out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeoutFallback {
    Pass,
    Negate,
}

/// Runtime-tunable response-chain parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ChainConfig {
    /// Levels of nested chaining a single root proposal may reach.
    pub max_depth: u8,
    pub prompt_timeout: PromptTimeout,
}

impl ChainConfig {
    pub const DEFAULT_MAX_DEPTH: u8 = CoreConfig::MAX_CHAIN_DEPTH;

    pub fn new() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            prompt_timeout: PromptTimeout::Never,
        }
    }

    /// Returns a copy with `max_depth` clamped to [`CoreConfig::MAX_CHAIN_DEPTH`].
    pub fn with_max_depth(mut self, max_depth: u8) -> Self {
        self.max_depth = max_depth.min(CoreConfig::MAX_CHAIN_DEPTH);
        self
    }

    pub fn with_prompt_timeout(mut self, prompt_timeout: PromptTimeout) -> Self {
        self.prompt_timeout = prompt_timeout;
        self
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::new()
    }
}
