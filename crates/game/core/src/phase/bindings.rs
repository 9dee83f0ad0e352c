use bitflags::bitflags;
use strum::{EnumCount, EnumIter, IntoStaticStr};

use crate::state::ProgramId;

/// Lifecycle phase of an effect. Each phase dispatches independently.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, EnumCount, EnumIter, IntoStaticStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum LifecyclePhase {
    OnPropose,
    OnCalculate,
    OnResolve,
    OnHit,
    OnApply,
    OnPeriod,
    OnExpire,
    OnRemove,
}

impl LifecyclePhase {
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumCount, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PhaseSlot {
    Pre,
    Main,
    Post,
}

bitflags! {
    /// One bit per [`LifecyclePhase`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct PhaseMask: u8 {
        const ON_PROPOSE   = 1 << 0;
        const ON_CALCULATE = 1 << 1;
        const ON_RESOLVE   = 1 << 2;
        const ON_HIT       = 1 << 3;
        const ON_APPLY     = 1 << 4;
        const ON_PERIOD    = 1 << 5;
        const ON_EXPIRE    = 1 << 6;
        const ON_REMOVE    = 1 << 7;
    }
}

impl PhaseMask {
    pub const fn of(phase: LifecyclePhase) -> Self {
        Self::from_bits_retain(1 << phase as u8)
    }
}

type SlotRow = [Option<ProgramId>; PhaseSlot::COUNT];

/// Program bound to each (phase, slot) of a template, plus skip-main bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseGraphBindings {
    slots: [SlotRow; LifecyclePhase::COUNT],
    skip_main: PhaseMask,
}

impl PhaseGraphBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, phase: LifecyclePhase, slot: PhaseSlot, program: ProgramId) {
        self.slots[phase.index()][slot as usize] = Some(program);
    }

    pub fn unbind(&mut self, phase: LifecyclePhase, slot: PhaseSlot) {
        self.slots[phase.index()][slot as usize] = None;
    }

    pub fn get(&self, phase: LifecyclePhase, slot: PhaseSlot) -> Option<ProgramId> {
        self.slots[phase.index()][slot as usize]
    }

    pub fn set_skip_main(&mut self, phase: LifecyclePhase, skip: bool) {
        self.skip_main.set(PhaseMask::of(phase), skip);
    }

    pub fn skips_main(&self, phase: LifecyclePhase) -> bool {
        self.skip_main.contains(PhaseMask::of(phase))
    }

    /// Every bound program id, in phase then slot order.
    pub fn programs(&self) -> impl Iterator<Item = ProgramId> + '_ {
        self.slots.iter().flatten().flatten().copied()
    }
}
