use std::time::Instant;

/// Wall-clock source the pacemaker checks between slices.
pub trait FrameTimer {
    /// Marks the start of a real frame.
    fn start(&mut self);

    /// Microseconds since the last [`start`](Self::start).
    fn elapsed_us(&mut self) -> u64;
}

#[derive(Debug, Default)]
pub struct InstantTimer {
    started: Option<Instant>,
}

impl InstantTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameTimer for InstantTimer {
    fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    fn elapsed_us(&mut self) -> u64 {
        self.started
            .map(|started| started.elapsed().as_micros() as u64)
            .unwrap_or(0)
    }
}

/// Deterministic timer: every check costs a fixed number of microseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualTimer {
    cost_per_check_us: u64,
    elapsed_us: u64,
}

impl ManualTimer {
    pub fn new(cost_per_check_us: u64) -> Self {
        Self {
            cost_per_check_us,
            elapsed_us: 0,
        }
    }

    /// Simulates work outside the pacemaker.
    pub fn advance(&mut self, us: u64) {
        self.elapsed_us += us;
    }
}

impl FrameTimer for ManualTimer {
    fn start(&mut self) {
        self.elapsed_us = 0;
    }

    fn elapsed_us(&mut self) -> u64 {
        self.elapsed_us += self.cost_per_check_us;
        self.elapsed_us
    }
}
