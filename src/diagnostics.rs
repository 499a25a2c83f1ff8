// SPDX-License-Identifier: Apache-2.0

//! Observation points of the tail loop.
//!
//! The loop reports what it sees and decides through a [`Diagnostics`]
//! implementation. Implementations only observe; nothing they do affects
//! which records are emitted.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::checkpoint::{Checkpoint, format_time};
use crate::error::Error;
use crate::input::Candidate;
use crate::persistence::CheckpointKey;
use crate::selector::SelectionOutcome;

/// Receives the tail loop's observations. Every method defaults to a no-op.
pub trait Diagnostics {
    /// The checkpoint the loop starts from. `restored` is false when the
    /// store had no usable record.
    fn checkpoint_loaded(
        &mut self,
        _key: &CheckpointKey,
        _checkpoint: &Checkpoint,
        _restored: bool,
    ) {
    }

    fn candidate_evaluated(&mut self, _candidate: &Candidate) {}

    /// A glob match could not be evaluated this cycle
    fn candidate_skipped(&mut self, _path: &Path, _error: &Error) {}

    /// Ordered outcomes of one selection, possibly empty
    fn selected(&mut self, _checkpoint: &Checkpoint, _outcomes: &[SelectionOutcome]) {}

    fn drain_started(&mut self, _outcome: &SelectionOutcome) {}

    /// A record was read; `checkpoint` is the position after it
    fn record_read(&mut self, _path: &Path, _checkpoint: &Checkpoint, _record: &[u8]) {}

    fn drain_finished(&mut self, _path: &Path, _checkpoint: &Checkpoint, _records: u64) {}

    fn checkpoint_saved(&mut self, _key: &CheckpointKey, _checkpoint: &Checkpoint) {}

    fn sleeping(&mut self, _interval: Duration) {}
}

/// Discards every observation
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {}

/// Emits observations as `debug` tracing events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn checkpoint_loaded(&mut self, key: &CheckpointKey, checkpoint: &Checkpoint, restored: bool) {
        debug!(key = %key, checkpoint = %checkpoint, restored, "Loaded checkpoint");
    }

    fn candidate_evaluated(&mut self, candidate: &Candidate) {
        debug!(
            path = ?candidate.path,
            signature = %candidate.signature,
            mtime = %format_time(candidate.mtime),
            ctime = %format_time(candidate.ctime),
            size = candidate.size,
            "Evaluated candidate"
        );
    }

    fn candidate_skipped(&mut self, path: &Path, error: &Error) {
        debug!("Skipping candidate {:?} this cycle: {}", path, error);
    }

    fn selected(&mut self, checkpoint: &Checkpoint, outcomes: &[SelectionOutcome]) {
        debug!(
            checkpoint = %checkpoint,
            selected = outcomes.len(),
            "Selected files to drain"
        );
        for (position, outcome) in outcomes.iter().enumerate() {
            debug!(
                position,
                path = ?outcome.path,
                checkpoint = %outcome.checkpoint,
                "Selection outcome"
            );
        }
    }

    fn drain_started(&mut self, outcome: &SelectionOutcome) {
        debug!(
            path = ?outcome.path,
            offset = outcome.checkpoint.offset,
            "Draining file"
        );
    }

    fn record_read(&mut self, path: &Path, checkpoint: &Checkpoint, record: &[u8]) {
        debug!(
            path = ?path,
            offset = checkpoint.offset,
            len = record.len(),
            record = %String::from_utf8_lossy(record).trim_end(),
            "Read record"
        );
    }

    fn drain_finished(&mut self, path: &Path, checkpoint: &Checkpoint, records: u64) {
        debug!(
            path = ?path,
            offset = checkpoint.offset,
            records,
            "Reached end of available records"
        );
    }

    fn checkpoint_saved(&mut self, key: &CheckpointKey, checkpoint: &Checkpoint) {
        debug!(key = %key, checkpoint = %checkpoint, "Saved checkpoint");
    }

    fn sleeping(&mut self, interval: Duration) {
        debug!(interval = ?interval, "Waiting before next poll");
    }
}

