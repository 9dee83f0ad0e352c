use std::fmt;

use ability_core::clock::Tick;
use ability_core::error::CoreError;

use super::{FrameTimer, SliceContext, SliceStatus, SystemGroup};
use crate::config::RuntimeConfig;
use crate::error::{Result, RuntimeError};
use crate::simulation::{CommitReport, Simulation};
use crate::systems::{DeferredTriggerSystem, LifetimeSystem, ProposalSystem, SpatialIndexSystem};

/// Where the logical tick in flight stopped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TickProgress {
    #[default]
    Idle,
    Running {
        /// Index of the group to resume.
        group: usize,
        /// Whether that group's `begin_tick` already ran.
        begun: bool,
        /// Slices spent on this tick so far.
        slices: u32,
        /// The group yielded and must be reset before re-entry.
        yielded: bool,
    },
}

/// What one real frame accomplished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub ticks: u32,
    pub steps: u64,
    pub slices: u32,
    pub yields: u32,
    /// A tick is left in progress for the next frame.
    pub suspended: bool,
    pub budget_exhausted: bool,
    pub fused: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PacemakerStats {
    pub frames: u64,
    pub ticks: u64,
    pub slices: u64,
    pub yields: u64,
    /// Frames cut short by the wall-clock budget.
    pub budget_exhausted: u64,
    /// Elapsed time discarded by the accumulator ceiling.
    pub clamped_us: u64,
    pub fuse_trips: u64,
}

/// Fixed-timestep driver for an ordered list of system groups.
///
/// Elapsed wall time feeds an integer microsecond accumulator capped at
/// `max_ticks_per_frame` timesteps. Each frame starts logical ticks while a
/// full timestep is banked, resumes a suspended tick first, and stops early
/// when a group yields or the frame budget runs out between slices. At least
/// one slice runs per frame so a tiny budget still makes progress.
///
/// A tick that needs more than `max_slices_per_logic_frame` slices trips the
/// fuse: the pacemaker stops advancing until [`reset_fuse`](Self::reset_fuse).
pub struct Pacemaker {
    groups: Vec<Box<dyn SystemGroup>>,
    timestep_us: u64,
    frame_budget_us: u64,
    max_slices: u32,
    max_ticks: u32,
    work_units: usize,
    accumulator_us: u64,
    progress: TickProgress,
    fused: bool,
    stats: PacemakerStats,
}

impl Pacemaker {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            groups: Vec::new(),
            timestep_us: config.fixed_timestep_us.max(1),
            frame_budget_us: config.frame_budget_us,
            max_slices: config.max_slices_per_logic_frame,
            max_ticks: config.max_ticks_per_frame.max(1),
            work_units: config.max_work_units_per_slice as usize,
            accumulator_us: 0,
            progress: TickProgress::Idle,
            fused: false,
            stats: PacemakerStats::default(),
        }
    }

    pub fn with_group(mut self, group: impl SystemGroup + 'static) -> Self {
        self.groups.push(Box::new(group));
        self
    }

    /// Appends spatial indexing, proposals, lifetimes and deferred triggers.
    pub fn with_standard_groups(self) -> Self {
        self.with_group(SpatialIndexSystem)
            .with_group(ProposalSystem::default())
            .with_group(LifetimeSystem::default())
            .with_group(DeferredTriggerSystem::default())
    }

    pub fn push_group(&mut self, group: Box<dyn SystemGroup>) {
        self.groups.push(group);
    }

    pub fn group_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.groups.iter().map(|group| group.name())
    }

    pub fn progress(&self) -> TickProgress {
        self.progress
    }

    pub fn accumulator_us(&self) -> u64 {
        self.accumulator_us
    }

    pub fn stats(&self) -> &PacemakerStats {
        &self.stats
    }

    pub fn is_fused(&self) -> bool {
        self.fused
    }

    /// Clears the fuse and the slice count of the suspended tick.
    pub fn reset_fuse(&mut self) {
        self.fused = false;
        if let TickProgress::Running { slices, .. } = &mut self.progress {
            *slices = 0;
        }
    }

    /// Runs one real frame that took `elapsed_us` of wall time.
    pub fn frame(
        &mut self,
        sim: &mut Simulation,
        elapsed_us: u64,
        timer: &mut dyn FrameTimer,
    ) -> Result<FrameReport> {
        let mut report = FrameReport::default();
        self.stats.frames += 1;
        if self.fused {
            report.fused = true;
            report.suspended = self.progress != TickProgress::Idle;
            return Ok(report);
        }

        let ceiling = self.timestep_us.saturating_mul(self.max_ticks as u64);
        let banked = self.accumulator_us.saturating_add(elapsed_us);
        if banked > ceiling {
            self.stats.clamped_us += banked - ceiling;
        }
        self.accumulator_us = banked.min(ceiling);
        timer.start();

        loop {
            if self.progress == TickProgress::Idle {
                if self.accumulator_us < self.timestep_us || report.ticks >= self.max_ticks {
                    break;
                }
                if report.slices > 0 && timer.elapsed_us() >= self.frame_budget_us {
                    report.budget_exhausted = true;
                    break;
                }
                sim.begin_tick();
                self.progress = TickProgress::Running {
                    group: 0,
                    begun: false,
                    slices: 0,
                    yielded: false,
                };
            }
            let Some(commit) = self.run_tick(sim, timer, &mut report)? else {
                break;
            };
            self.accumulator_us = self.accumulator_us.saturating_sub(self.timestep_us);
            report.ticks += 1;
            report.steps += commit.steps;
            self.stats.ticks += 1;
        }

        if report.budget_exhausted {
            self.stats.budget_exhausted += 1;
        }
        report.suspended = self.progress != TickProgress::Idle;
        report.fused = self.fused;
        Ok(report)
    }

    /// Drives the tick in flight. `None` when it was suspended.
    fn run_tick(
        &mut self,
        sim: &mut Simulation,
        timer: &mut dyn FrameTimer,
        report: &mut FrameReport,
    ) -> Result<Option<CommitReport>> {
        let TickProgress::Running {
            mut group,
            mut begun,
            mut slices,
            mut yielded,
        } = self.progress
        else {
            return Ok(None);
        };
        let tick = sim.now();

        while group < self.groups.len() {
            let system = &mut self.groups[group];
            let name = system.name();
            if !begun {
                if let Err(error) = system.begin_tick(sim) {
                    return Err(group_failure(error, name, tick));
                }
                begun = true;
            }
            if yielded {
                system.reset_slice(sim);
                yielded = false;
            }

            loop {
                if slices >= self.max_slices {
                    self.fused = true;
                    self.stats.fuse_trips += 1;
                    tracing::error!(
                        target: "runtime::pacemaker",
                        tick = %tick,
                        group = name,
                        slices,
                        "slice budget fuse tripped, halting advancement"
                    );
                    self.progress = TickProgress::Running {
                        group,
                        begun,
                        slices,
                        yielded,
                    };
                    return Ok(None);
                }
                if report.slices > 0 && timer.elapsed_us() >= self.frame_budget_us {
                    report.budget_exhausted = true;
                    tracing::debug!(
                        target: "runtime::pacemaker",
                        tick = %tick,
                        group = name,
                        "frame budget exhausted"
                    );
                    self.progress = TickProgress::Running {
                        group,
                        begun,
                        slices,
                        yielded,
                    };
                    return Ok(None);
                }

                slices += 1;
                report.slices += 1;
                self.stats.slices += 1;
                let ctx = SliceContext {
                    tick,
                    slice: slices,
                    max_work_units: self.work_units,
                    dt_us: self.timestep_us,
                };
                match system.update_slice(sim, &ctx) {
                    Ok(SliceStatus::Done) => break,
                    Ok(SliceStatus::Yield) => {
                        report.yields += 1;
                        self.stats.yields += 1;
                        tracing::debug!(
                            target: "runtime::pacemaker",
                            tick = %tick,
                            group = name,
                            slice = slices,
                            "group yielded"
                        );
                        self.progress = TickProgress::Running {
                            group,
                            begun,
                            slices,
                            yielded: true,
                        };
                        return Ok(None);
                    }
                    Err(error) => {
                        self.progress = TickProgress::Running {
                            group,
                            begun,
                            slices,
                            yielded: true,
                        };
                        return Err(group_failure(error, name, tick));
                    }
                }
            }

            group += 1;
            begun = false;
        }

        self.progress = TickProgress::Idle;
        Ok(Some(sim.commit_tick()))
    }
}

fn group_failure(error: RuntimeError, group: &'static str, tick: Tick) -> RuntimeError {
    tracing::error!(
        target: "runtime::pacemaker",
        group,
        tick = %tick,
        code = error.error_code(),
        error = %error,
        "system group failed"
    );
    error.in_group(group, tick)
}

impl fmt::Debug for Pacemaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pacemaker")
            .field("groups", &self.group_names().collect::<Vec<_>>())
            .field("timestep_us", &self.timestep_us)
            .field("accumulator_us", &self.accumulator_us)
            .field("progress", &self.progress)
            .field("fused", &self.fused)
            .finish()
    }
}
