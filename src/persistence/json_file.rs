//! JSON file-based checkpoint store with atomic writes.
//!
//! Each source pattern gets its own `<key>.checkpoint` file under the store
//! directory. Writes go to a temp file which is synced and then renamed over
//! the previous record, so a crash leaves either the old or the new
//! checkpoint, never a torn one.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::key::CheckpointKey;
use super::schema::PersistedCheckpointV1;
use super::store::CheckpointStore;
use crate::checkpoint::Checkpoint;
use crate::error::{Error, Result};

/// Extension of checkpoint files
const CHECKPOINT_EXTENSION: &str = "checkpoint";

/// Stores checkpoints as JSON documents in a directory
#[derive(Debug, Clone)]
pub struct JsonFileCheckpointStore {
    dir: PathBuf,
}

impl JsonFileCheckpointStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| {
                Error::Persistence(format!(
                    "failed to create checkpoint directory {:?}: {}",
                    dir, e
                ))
            })?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the checkpoint record for `key`
    pub fn path_for(&self, key: &CheckpointKey) -> PathBuf {
        self.dir
            .join(format!("{}.{}", key.name(), CHECKPOINT_EXTENSION))
    }
}

impl CheckpointStore for JsonFileCheckpointStore {
    fn load(&self, key: &CheckpointKey) -> Result<Option<Checkpoint>> {
        let path = self.path_for(key);

        let contents = match fs::read(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No checkpoint at {:?}, starting fresh", path);
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::Persistence(format!(
                    "failed to read checkpoint {:?}: {}",
                    path, e
                )));
            }
        };

        let persisted: PersistedCheckpointV1 = match serde_json::from_slice(&contents) {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!("Ignoring corrupt checkpoint {:?}: {}", path, e);
                return Ok(None);
            }
        };

        if persisted.pattern != key.pattern() {
            warn!(
                "Ignoring checkpoint {:?} written for pattern {:?}, expected {:?}",
                path,
                persisted.pattern,
                key.pattern()
            );
            return Ok(None);
        }

        match persisted.into_checkpoint() {
            Ok(checkpoint) => Ok(Some(checkpoint)),
            Err(e) => {
                warn!("Ignoring invalid checkpoint {:?}: {}", path, e);
                Ok(None)
            }
        }
    }

    fn save(&mut self, key: &CheckpointKey, checkpoint: &Checkpoint) -> Result<()> {
        let persisted = PersistedCheckpointV1::new(key.pattern(), checkpoint);
        atomic_write(&self.path_for(key), &persisted)
    }
}

/// Write the record to file atomically (write to temp, sync, then rename)
fn atomic_write(path: &Path, persisted: &PersistedCheckpointV1) -> Result<()> {
    use portable_atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    // Ensure parent directory exists, it may have been removed under us
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Persistence(format!("failed to create parent directory: {}", e))
            })?;
        }
    }

    // Instances for different patterns may share the directory
    let unique_id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let temp_path = path.with_extension(format!("tmp.{}.{}", std::process::id(), unique_id));

    let file = File::create(&temp_path)
        .map_err(|e| Error::Persistence(format!("failed to create temp file: {}", e)))?;
    let mut writer = BufWriter::new(file);
    let written = serde_json::to_writer_pretty(&mut writer, persisted)
        .map_err(|e| Error::Persistence(format!("failed to write checkpoint: {}", e)))
        .and_then(|_| {
            writer
                .flush()
                .map_err(|e| Error::Persistence(format!("failed to flush checkpoint: {}", e)))
        })
        .and_then(|_| {
            writer
                .get_ref()
                .sync_all()
                .map_err(|e| Error::Persistence(format!("failed to sync checkpoint: {}", e)))
        });

    // Drop the writer to close the file handle before rename
    drop(writer);

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::Persistence(format!("failed to rename checkpoint file: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Signature;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn sample() -> Checkpoint {
        Checkpoint::new(
            Signature::from_prefix(b"a\nb\n"),
            SystemTime::UNIX_EPOCH + Duration::new(1_700_000_000, 42),
            4,
        )
    }

    #[test]
    fn test_missing_record_is_absent() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileCheckpointStore::open(dir.path()).unwrap();
        let key = CheckpointKey::for_pattern("/var/log/app.log*");

        assert_eq!(store.load(&key).unwrap(), None);
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = TempDir::new().unwrap();
        let key = CheckpointKey::for_pattern("/var/log/app.log*");

        {
            let mut store = JsonFileCheckpointStore::open(dir.path()).unwrap();
            store.save(&key, &sample()).unwrap();
        }

        let store = JsonFileCheckpointStore::open(dir.path()).unwrap();
        assert_eq!(store.load(&key).unwrap(), Some(sample()));
    }

    #[test]
    fn test_save_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let key = CheckpointKey::for_pattern("/var/log/app.log*");
        let mut store = JsonFileCheckpointStore::open(dir.path()).unwrap();

        store.save(&key, &sample()).unwrap();
        let first = fs::read(store.path_for(&key)).unwrap();
        store.save(&key, &sample()).unwrap();
        let second = fs::read(store.path_for(&key)).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.load(&key).unwrap(), Some(sample()));

        // No temp files left behind
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_corrupt_record_is_absent() {
        let dir = TempDir::new().unwrap();
        let key = CheckpointKey::for_pattern("/var/log/app.log*");
        let store = JsonFileCheckpointStore::open(dir.path()).unwrap();

        fs::write(store.path_for(&key), b"\x80\x03(X\x00\x00garbage").unwrap();
        assert_eq!(store.load(&key).unwrap(), None);

        fs::write(store.path_for(&key), b"").unwrap();
        assert_eq!(store.load(&key).unwrap(), None);

        fs::write(store.path_for(&key), br#"{"version": 1}"#).unwrap();
        assert_eq!(store.load(&key).unwrap(), None);
    }

    #[test]
    fn test_invalid_fields_are_absent() {
        let dir = TempDir::new().unwrap();
        let key = CheckpointKey::for_pattern("/var/log/app.log*");
        let mut store = JsonFileCheckpointStore::open(dir.path()).unwrap();
        store.save(&key, &sample()).unwrap();

        let path = store.path_for(&key);
        let mut json: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        json["signature"] = serde_json::Value::String("zz".to_string());
        fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();

        assert_eq!(store.load(&key).unwrap(), None);
    }

    #[test]
    fn test_record_for_other_pattern_is_absent() {
        let dir = TempDir::new().unwrap();
        let key = CheckpointKey::for_pattern("/var/log/app.log*");
        let mut store = JsonFileCheckpointStore::open(dir.path()).unwrap();
        store.save(&key, &sample()).unwrap();

        // Copy the record to where another pattern's checkpoint lives
        let other = CheckpointKey::for_pattern("/var/log/db.log*");
        fs::copy(store.path_for(&key), store.path_for(&other)).unwrap();

        assert_eq!(store.load(&other).unwrap(), None);
        assert_eq!(store.load(&key).unwrap(), Some(sample()));
    }

    #[test]
    fn test_patterns_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileCheckpointStore::open(dir.path()).unwrap();
        let a = CheckpointKey::for_pattern("/var/log/app*");
        let b = CheckpointKey::for_pattern("/var/log/app?");

        store.save(&a, &sample()).unwrap();
        store.save(&b, &Checkpoint::default()).unwrap();

        assert_eq!(store.load(&a).unwrap(), Some(sample()));
        assert!(store.load(&b).unwrap().unwrap().is_empty());
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");

        let store = JsonFileCheckpointStore::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.dir(), nested.as_path());
    }
}
