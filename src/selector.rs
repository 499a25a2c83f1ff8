// SPDX-License-Identifier: Apache-2.0

//! Candidate selection: decides which matched files still have records to
//! emit and in which order to drain them.

use std::path::PathBuf;

use crate::checkpoint::Checkpoint;
use crate::input::Candidate;

/// A file chosen for draining, with the checkpoint to read it from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionOutcome {
    pub path: PathBuf,
    pub checkpoint: Checkpoint,
}

/// How a single candidate relates to the current checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The checkpoint's file with unread data past the checkpoint offset
    Resume(Checkpoint),
    /// A file to read from the start
    Fresh(Checkpoint),
    /// Fully consumed or older than the checkpoint
    Stale,
}

/// Classify one candidate against the checkpoint.
pub fn classify(candidate: &Candidate, checkpoint: &Checkpoint) -> Classification {
    if checkpoint.is_empty() {
        return Classification::Fresh(Checkpoint::fresh(
            candidate.signature.clone(),
            candidate.mtime,
        ));
    }

    let same_file = candidate.is_same_file(&checkpoint.signature);

    if same_file && checkpoint.offset < candidate.size {
        return Classification::Resume(checkpoint.clone());
    }

    // A touched but fully read file is still fully read
    let fully_consumed = same_file && checkpoint.offset == candidate.size;

    if !fully_consumed && candidate.mtime > checkpoint.reference_time {
        return Classification::Fresh(Checkpoint::fresh(
            candidate.signature.clone(),
            candidate.mtime,
        ));
    }

    Classification::Stale
}

/// Select the candidates to drain, oldest reference time first.
///
/// Equal reference times keep the order of `candidates`. With `backfill`
/// disabled only the most recent outcome is returned.
pub fn select(
    candidates: &[Candidate],
    checkpoint: &Checkpoint,
    backfill: bool,
) -> Vec<SelectionOutcome> {
    let mut outcomes: Vec<SelectionOutcome> = candidates
        .iter()
        .filter_map(|candidate| match classify(candidate, checkpoint) {
            Classification::Resume(checkpoint) | Classification::Fresh(checkpoint) => {
                Some(SelectionOutcome {
                    path: candidate.path.clone(),
                    checkpoint,
                })
            }
            Classification::Stale => None,
        })
        .collect();

    // sort_by_key is stable
    outcomes.sort_by_key(|outcome| outcome.checkpoint.reference_time);

    if !backfill && outcomes.len() > 1 {
        outcomes = outcomes.split_off(outcomes.len() - 1);
    }

    outcomes
}
