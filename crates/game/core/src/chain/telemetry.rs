use arrayvec::ArrayVec;

use crate::clock::Tick;
use crate::config::CoreConfig;
use crate::state::{RootId, TemplateId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum TelemetryKind {
    WindowOpened,
    ResponseAdded,
    /// A response was discarded by the depth or capacity budget.
    ResponseDropped,
    PromptRaised,
    WindowTimedOut,
    WindowClosed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryRecord {
    pub kind: TelemetryKind,
    pub tick: Tick,
    pub root: RootId,
    pub template: TemplateId,
    pub depth: u8,
}

/// Append-only window telemetry, drained by the caller.
///
/// Records past capacity are counted, never written over earlier ones.
#[derive(Clone, Debug, Default)]
pub struct TelemetryBuffer {
    records: ArrayVec<TelemetryRecord, { CoreConfig::MAX_TELEMETRY_RECORDS }>,
    dropped: u64,
}

impl TelemetryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: TelemetryRecord) -> bool {
        if self.records.try_push(record).is_err() {
            self.dropped += 1;
            return false;
        }
        true
    }

    pub fn records(&self) -> &[TelemetryRecord] {
        &self.records
    }

    pub fn count(&self, kind: TelemetryKind) -> usize {
        self.records.iter().filter(|record| record.kind == kind).count()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = TelemetryRecord> + '_ {
        self.records.drain(..)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
