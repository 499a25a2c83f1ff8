// SPDX-License-Identifier: Apache-2.0

//! Persisted checkpoint format.
//!
//! The checkpoint is stored as a small versioned JSON document. The source
//! pattern is written alongside the position so a record can be checked
//! against the key it was loaded for; anything that fails these checks is
//! treated as absent by the store.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::checkpoint::Checkpoint;
use crate::input::{SIG_SZ, Signature};

/// Current schema version for persisted checkpoints
pub const CHECKPOINT_VERSION: u8 = 1;

/// Length of a SHA-224 digest
const DIGEST_LEN: usize = 28;

/// Persisted checkpoint (v1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCheckpointV1 {
    /// Schema version (always 1 for this format)
    pub version: u8,
    /// Source pattern the checkpoint belongs to
    pub pattern: String,
    /// Hex digest of the file prefix, empty before the first file is selected
    pub signature: String,
    /// Number of prefix bytes the signature covers
    pub signed_len: usize,
    /// Reference time as nanoseconds since the Unix epoch
    pub reference_time_unix_nanos: u64,
    /// Byte offset just past the last emitted record
    pub offset: u64,
}

impl PersistedCheckpointV1 {
    pub fn new(pattern: &str, checkpoint: &Checkpoint) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            pattern: pattern.to_string(),
            signature: checkpoint.signature.to_hex(),
            signed_len: checkpoint.signature.len(),
            reference_time_unix_nanos: to_unix_nanos(checkpoint.reference_time),
            offset: checkpoint.offset,
        }
    }

    /// Validate and convert back into a checkpoint
    pub fn into_checkpoint(self) -> Result<Checkpoint, String> {
        if self.version != CHECKPOINT_VERSION {
            return Err(format!("unsupported checkpoint version {}", self.version));
        }

        let digest = hex::decode(&self.signature)
            .map_err(|e| format!("invalid signature encoding: {}", e))?;
        if !digest.is_empty() && digest.len() != DIGEST_LEN {
            return Err(format!("invalid signature length {}", digest.len()));
        }
        if self.signed_len > SIG_SZ {
            return Err(format!("invalid signed length {}", self.signed_len));
        }

        Ok(Checkpoint::new(
            Signature::from_parts(digest, self.signed_len),
            SystemTime::UNIX_EPOCH + Duration::from_nanos(self.reference_time_unix_nanos),
            self.offset,
        ))
    }
}

fn to_unix_nanos(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Checkpoint {
        Checkpoint::new(
            Signature::from_prefix(b"first line\n"),
            SystemTime::UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789),
            42,
        )
    }

    #[test]
    fn test_conversion_preserves_checkpoint() {
        let persisted = PersistedCheckpointV1::new("/var/log/app.log*", &sample());

        assert_eq!(persisted.version, CHECKPOINT_VERSION);
        assert_eq!(persisted.signed_len, 11);
        assert_eq!(persisted.reference_time_unix_nanos, 1_700_000_000_123_456_789);
        assert_eq!(persisted.into_checkpoint().unwrap(), sample());
    }

    #[test]
    fn test_zero_value_converts() {
        let persisted = PersistedCheckpointV1::new("p", &Checkpoint::default());
        assert_eq!(persisted.signature, "");

        let cp = persisted.into_checkpoint().unwrap();
        assert!(cp.is_empty());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut persisted = PersistedCheckpointV1::new("p", &sample());
        persisted.version = 7;
        assert!(persisted.into_checkpoint().is_err());
    }

    #[test]
    fn test_rejects_bad_signature() {
        let mut persisted = PersistedCheckpointV1::new("p", &sample());
        persisted.signature = "not hex".to_string();
        assert!(persisted.clone().into_checkpoint().is_err());

        persisted.signature = "abcd".to_string();
        assert!(persisted.clone().into_checkpoint().is_err());

        persisted.signature = sample().signature.to_hex();
        persisted.signed_len = SIG_SZ + 1;
        assert!(persisted.into_checkpoint().is_err());
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(PersistedCheckpointV1::new("p", &sample())).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["pattern"], "p");
        assert_eq!(json["offset"], 42);
        assert_eq!(json["signed_len"], 11);
    }
}
