//! Discrete clock domains.
//!
//! Two counters advance only through explicit calls from the scheduler:
//! `FixedFrame` once per committed logical tick, and `Step` once every
//! [`StepPolicy::frames_per_step`] fixed frames. Every duration in the crate is
//! an integer count of one of these ticks.

use core::fmt;

/// Discrete time unit of a clock domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Self = Self(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Ticks elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl core::ops::Add<u64> for Tick {
    type Output = Tick;
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Clock domain an effect's durations are measured in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum ClockDomain {
    #[default]
    FixedFrame,
    Step,
}

/// Ratio of FixedFrame advances per Step advance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepPolicy {
    frames_per_step: u32,
}

impl StepPolicy {
    pub const DEFAULT_FRAMES_PER_STEP: u32 = 4;

    /// Creates a policy; a ratio of zero is treated as one.
    pub fn new(frames_per_step: u32) -> Self {
        Self {
            frames_per_step: frames_per_step.max(1),
        }
    }

    pub fn frames_per_step(&self) -> u32 {
        self.frames_per_step
    }
}

impl Default for StepPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FRAMES_PER_STEP)
    }
}

/// Both clock domains plus the partial-step accumulator.
///
/// Changing the policy keeps every committed tick and the frames already
/// accumulated toward the next step; only future advances use the new ratio.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockDomains {
    fixed_frame: Tick,
    step: Tick,
    frames_into_step: u32,
    policy: StepPolicy,
}

impl ClockDomains {
    pub fn new(policy: StepPolicy) -> Self {
        Self {
            fixed_frame: Tick::ZERO,
            step: Tick::ZERO,
            frames_into_step: 0,
            policy,
        }
    }

    pub fn now(&self, domain: ClockDomain) -> Tick {
        match domain {
            ClockDomain::FixedFrame => self.fixed_frame,
            ClockDomain::Step => self.step,
        }
    }

    pub fn fixed_frame(&self) -> Tick {
        self.fixed_frame
    }

    pub fn step(&self) -> Tick {
        self.step
    }

    pub fn policy(&self) -> StepPolicy {
        self.policy
    }

    pub fn set_step_policy(&mut self, policy: StepPolicy) {
        self.policy = policy;
    }

    /// Advances one domain directly by `n` ticks.
    ///
    /// Advancing `FixedFrame` this way feeds the step accumulator exactly like
    /// [`advance_fixed_frames`](Self::advance_fixed_frames).
    pub fn advance(&mut self, domain: ClockDomain, n: u64) {
        match domain {
            ClockDomain::FixedFrame => {
                self.advance_fixed_frames(n);
            }
            ClockDomain::Step => self.step = self.step + n,
        }
    }

    /// Advances FixedFrame by `n` and returns how many Step ticks that caused.
    pub fn advance_fixed_frames(&mut self, n: u64) -> u64 {
        let mut steps = 0;
        for _ in 0..n {
            self.fixed_frame = self.fixed_frame + 1;
            self.frames_into_step += 1;
            if self.frames_into_step >= self.policy.frames_per_step() {
                self.frames_into_step = 0;
                self.step = self.step + 1;
                steps += 1;
            }
        }
        steps
    }

    /// True when the next FixedFrame advance will also advance Step.
    pub fn step_due(&self) -> bool {
        self.frames_into_step + 1 >= self.policy.frames_per_step()
    }

    /// Whether `domain` ticks during the next FixedFrame advance.
    pub fn ticks_next_frame(&self, domain: ClockDomain) -> bool {
        match domain {
            ClockDomain::FixedFrame => true,
            ClockDomain::Step => self.step_due(),
        }
    }
}
