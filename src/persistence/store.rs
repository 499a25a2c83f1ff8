// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use super::key::CheckpointKey;
use crate::checkpoint::Checkpoint;
use crate::error::Result;

/// Durable storage for the checkpoint of each source pattern.
///
/// `load` returns `Ok(None)` for a missing or corrupt record; only failures
/// to reach the backing storage are errors.
pub trait CheckpointStore {
    fn load(&self, key: &CheckpointKey) -> Result<Option<Checkpoint>>;

    fn save(&mut self, key: &CheckpointKey, checkpoint: &Checkpoint) -> Result<()>;
}

/// Checkpoint store kept in memory, lost when dropped
#[derive(Debug, Default, Clone)]
pub struct MemoryCheckpointStore {
    checkpoints: HashMap<CheckpointKey, Checkpoint>,
    saves: usize,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self, key: &CheckpointKey) -> Result<Option<Checkpoint>> {
        Ok(self.checkpoints.get(key).cloned())
    }

    fn save(&mut self, key: &CheckpointKey, checkpoint: &Checkpoint) -> Result<()> {
        self.checkpoints.insert(key.clone(), checkpoint.clone());
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Signature;
    use std::time::SystemTime;

    #[test]
    fn test_memory_store_roundtrip() {
        let key = CheckpointKey::for_pattern("/var/log/app.log*");
        let other = CheckpointKey::for_pattern("/var/log/db.log*");
        let mut store = MemoryCheckpointStore::new();
        assert_eq!(store.load(&key).unwrap(), None);

        let cp = Checkpoint::new(Signature::from_prefix(b"x\n"), SystemTime::now(), 2);
        store.save(&key, &cp).unwrap();

        assert_eq!(store.load(&key).unwrap(), Some(cp));
        assert_eq!(store.load(&other).unwrap(), None);
        assert_eq!(store.saves(), 1);
    }
}
