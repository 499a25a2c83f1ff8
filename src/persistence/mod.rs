// SPDX-License-Identifier: Apache-2.0

//! Checkpoint persistence.
//!
//! Uses one JSON file per source pattern with atomic writes for reliable
//! resume after restarts.

mod json_file;
mod key;
mod schema;
mod store;

pub use json_file::JsonFileCheckpointStore;
pub use key::CheckpointKey;
pub use schema::{CHECKPOINT_VERSION, PersistedCheckpointV1};
pub use store::{CheckpointStore, MemoryCheckpointStore};
