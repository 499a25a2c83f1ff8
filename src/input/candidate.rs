// SPDX-License-Identifier: Apache-2.0

use std::fs::{File, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::signature::{SIG_SZ, Signature};
use crate::error::{Error, Result};

/// A glob match evaluated for one poll cycle. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub signature: Signature,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    pub size: u64,
}

impl Candidate {
    /// Stat and fingerprint `path`.
    ///
    /// Errors here are transient: the file may have been rotated away or
    /// removed since it was enumerated.
    pub fn evaluate(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;

        // Stat the open handle so size and prefix describe the same file
        let metadata = file.metadata()?;
        let signature = Signature::new(&mut file, SIG_SZ)?;

        let mtime = metadata.modified()?;
        Ok(Self {
            path: path.to_path_buf(),
            signature,
            mtime,
            ctime: change_time(&metadata).unwrap_or(mtime),
            size: metadata.len(),
        })
    }

    /// Whether this candidate is the file `signature` was taken from.
    ///
    /// A file shorter than [`SIG_SZ`] changes signature as it grows, so it
    /// no longer matches a checkpoint taken before the growth.
    pub fn is_same_file(&self, signature: &Signature) -> bool {
        self.signature.matches(signature)
    }
}

#[cfg(unix)]
fn change_time(metadata: &Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::Duration;

    let secs = u64::try_from(metadata.ctime()).ok()?;
    let nanos = u32::try_from(metadata.ctime_nsec()).ok()?;
    Some(SystemTime::UNIX_EPOCH + Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn change_time(metadata: &Metadata) -> Option<SystemTime> {
    metadata.created().ok()
}
