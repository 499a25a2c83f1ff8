// SPDX-License-Identifier: Apache-2.0

//! The tail loop.
//!
//! A single thread polls the source pattern, selects the next file to drain,
//! hands its records to the sink and persists the checkpoint after every
//! record. Faults during a cycle are contained: the checkpoint is saved, the
//! loop backs off and tries again. Only cancellation (or, when not
//! following, catching up) ends it.

use std::fs::File;
use std::io;
use std::thread;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::checkpoint::Checkpoint;
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::input::{Candidate, FileFinder, RecordReader, Signature};
use crate::persistence::{CheckpointKey, CheckpointStore};
use crate::selector::{self, SelectionOutcome};
use crate::sink::Sink;

/// Longest uninterrupted sleep; bounds how long cancellation takes to notice
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// States of the tail loop
#[derive(Debug)]
enum TailState {
    Init,
    Polling,
    Draining(SelectionOutcome),
    Idle,
    Backoff,
    Terminated,
}

/// How a drain ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrainEnd {
    /// No further complete records right now
    Exhausted,
    /// The file changed identity between selection and open
    Skipped,
    Cancelled,
}

/// Counters for one call to [`Tailer::run`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Poll cycles started
    pub polls: u64,
    /// Records read (and handed off unless in dry run)
    pub records: u64,
    /// Cycles that failed and backed off
    pub errors: u64,
}

/// Follows one source pattern.
pub struct Tailer<F, S, K, D> {
    config: Config,
    key: CheckpointKey,
    finder: F,
    store: S,
    sink: K,
    diagnostics: D,
    /// The only durable state; written to the store, never read back after
    /// startup
    checkpoint: Checkpoint,
    summary: RunSummary,
}

impl<F, S, K, D> Tailer<F, S, K, D>
where
    F: FileFinder,
    S: CheckpointStore,
    K: Sink,
    D: Diagnostics,
{
    pub fn new(config: Config, finder: F, store: S, sink: K, diagnostics: D) -> Result<Self> {
        config.validate().map_err(Error::Config)?;
        let key = CheckpointKey::for_pattern(config.source_pattern.clone());

        Ok(Self {
            config,
            key,
            finder,
            store,
            sink,
            diagnostics,
            checkpoint: Checkpoint::default(),
            summary: RunSummary::default(),
        })
    }

    pub fn key(&self) -> &CheckpointKey {
        &self.key
    }

    /// The in-memory checkpoint
    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    /// Run until `cancel` fires, or until caught up when not following.
    ///
    /// Never fails: errors inside a cycle are logged and retried after the
    /// backoff interval.
    pub fn run(&mut self, cancel: &CancellationToken) -> RunSummary {
        self.summary = RunSummary::default();
        let mut state = TailState::Init;
        // Outcomes of the current selection still waiting to be drained
        let mut pending: Vec<SelectionOutcome> = Vec::new();

        loop {
            state = match state {
                TailState::Init => {
                    self.load_checkpoint();
                    TailState::Polling
                }
                TailState::Polling => {
                    if cancel.is_cancelled() {
                        TailState::Terminated
                    } else {
                        self.summary.polls += 1;
                        match self.poll() {
                            Ok(outcomes) if outcomes.is_empty() => {
                                if self.config.follow {
                                    TailState::Idle
                                } else {
                                    TailState::Terminated
                                }
                            }
                            Ok(mut outcomes) => {
                                let head = outcomes.remove(0);
                                pending = outcomes;
                                TailState::Draining(head)
                            }
                            Err(e) => {
                                self.summary.errors += 1;
                                error!("Poll of {:?} failed: {}", self.config.source_pattern, e);
                                TailState::Backoff
                            }
                        }
                    }
                }
                TailState::Draining(target) => {
                    let drained = self.drain(&target, cancel);
                    // Saved whatever happened during the drain
                    self.persist();

                    match drained {
                        Ok(DrainEnd::Cancelled) => TailState::Terminated,
                        Ok(DrainEnd::Exhausted | DrainEnd::Skipped) => {
                            if !pending.is_empty() {
                                // Reselect rather than trust outcomes resolved
                                // against the previous checkpoint
                                pending.clear();
                                TailState::Polling
                            } else if self.config.follow {
                                TailState::Idle
                            } else {
                                TailState::Terminated
                            }
                        }
                        Err(e) => {
                            self.summary.errors += 1;
                            pending.clear();
                            error!(
                                path = ?target.path,
                                checkpoint = %self.checkpoint,
                                "Failed while draining: {:?}",
                                e
                            );
                            TailState::Backoff
                        }
                    }
                }
                TailState::Idle => {
                    if self.wait(self.config.idle_interval, cancel) {
                        TailState::Polling
                    } else {
                        TailState::Terminated
                    }
                }
                TailState::Backoff => {
                    self.persist();
                    if self.wait(self.config.backoff_interval, cancel) {
                        TailState::Polling
                    } else {
                        TailState::Terminated
                    }
                }
                TailState::Terminated => {
                    self.persist();
                    info!(
                        pattern = %self.config.source_pattern,
                        checkpoint = %self.checkpoint,
                        records = self.summary.records,
                        "Tail loop stopped"
                    );
                    return self.summary;
                }
            };
        }
    }

    fn load_checkpoint(&mut self) {
        let (checkpoint, restored) = match self.store.load(&self.key) {
            Ok(Some(checkpoint)) => (checkpoint, true),
            Ok(None) => (Checkpoint::default(), false),
            Err(e) => {
                warn!(
                    "Failed to load checkpoint {}, starting without one: {}",
                    self.key, e
                );
                (Checkpoint::default(), false)
            }
        };

        self.diagnostics
            .checkpoint_loaded(&self.key, &checkpoint, restored);
        info!(
            pattern = %self.config.source_pattern,
            key = %self.key,
            checkpoint = %checkpoint,
            restored,
            "Starting tail loop"
        );
        self.checkpoint = checkpoint;
    }

    /// Evaluate every current match and select what to drain
    fn poll(&mut self) -> Result<Vec<SelectionOutcome>> {
        let paths = self.finder.find_files()?;

        let mut candidates = Vec::with_capacity(paths.len());
        for path in paths {
            match Candidate::evaluate(&path) {
                Ok(candidate) => {
                    self.diagnostics.candidate_evaluated(&candidate);
                    candidates.push(candidate);
                }
                Err(e) => self.diagnostics.candidate_skipped(&path, &e),
            }
        }

        let outcomes = selector::select(&candidates, &self.checkpoint, self.config.backfill);
        self.diagnostics.selected(&self.checkpoint, &outcomes);
        Ok(outcomes)
    }

    /// Emit every complete record of `target` past its resolved offset
    fn drain(&mut self, target: &SelectionOutcome, cancel: &CancellationToken) -> Result<DrainEnd> {
        let Some(file) = self.open_target(target)? else {
            return Ok(DrainEnd::Skipped);
        };

        self.diagnostics.drain_started(target);
        self.checkpoint = target.checkpoint.clone();

        // The handle lives only as long as the reader, on every return path
        let mut reader = RecordReader::from_file(file, self.checkpoint.offset)?;
        let mut records = 0u64;

        loop {
            if cancel.is_cancelled() {
                debug!("Cancellation received while draining {:?}", target.path);
                return Ok(DrainEnd::Cancelled);
            }

            let Some(record) = reader.next() else {
                break;
            };
            let record = record?;

            if !self.config.dryrun {
                self.sink
                    .handoff(&target.path, &self.checkpoint, &record.data)?;
            }

            self.checkpoint = self.checkpoint.advanced_to(record.next_offset);
            self.diagnostics
                .record_read(&target.path, &self.checkpoint, &record.data);
            self.summary.records += 1;
            records += 1;

            if !self.config.dryrun {
                self.store.save(&self.key, &self.checkpoint)?;
                self.diagnostics
                    .checkpoint_saved(&self.key, &self.checkpoint);
            }
        }

        self.diagnostics
            .drain_finished(&target.path, &self.checkpoint, records);
        Ok(DrainEnd::Exhausted)
    }

    /// Open the selected file, making sure it is still the file that was
    /// selected. `None` if it has since been removed or replaced.
    fn open_target(&mut self, target: &SelectionOutcome) -> Result<Option<File>> {
        let mut file = match File::open(&target.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let e = Error::FileNotFound(target.path.clone());
                self.diagnostics.candidate_skipped(&target.path, &e);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let expected = &target.checkpoint.signature;
        let actual = Signature::new(&mut file, expected.len())?;
        if actual != *expected {
            let e = Error::Io(io::Error::other("file replaced since selection"));
            self.diagnostics.candidate_skipped(&target.path, &e);
            return Ok(None);
        }

        Ok(Some(file))
    }

    /// Save the in-memory checkpoint. Failures are logged; the next save
    /// tries again.
    fn persist(&mut self) {
        if self.config.dryrun {
            return;
        }

        match self.store.save(&self.key, &self.checkpoint) {
            Ok(()) => self
                .diagnostics
                .checkpoint_saved(&self.key, &self.checkpoint),
            Err(e) => warn!("Failed to save checkpoint {}: {}", self.key, e),
        }
    }

    /// Sleep for `interval`. Returns false if cancelled first.
    fn wait(&mut self, interval: Duration, cancel: &CancellationToken) -> bool {
        self.diagnostics.sleeping(interval);
        sleep_unless_cancelled(interval, cancel)
    }
}

fn sleep_unless_cancelled(interval: Duration, cancel: &CancellationToken) -> bool {
    let deadline = Instant::now() + interval;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(CANCEL_CHECK_INTERVAL));
    }
}
