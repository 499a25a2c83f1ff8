// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::input::Signature;

/// Which physical file (by signature), as of which moment, has been read up to
/// which byte.
///
/// The default value (empty signature, epoch, offset 0) means no file has been
/// selected yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub signature: Signature,
    /// mtime of the file when it was first selected
    pub reference_time: SystemTime,
    /// Byte offset just past the last emitted record
    pub offset: u64,
}

impl Checkpoint {
    pub fn new(signature: Signature, reference_time: SystemTime, offset: u64) -> Self {
        Self {
            signature,
            reference_time,
            offset,
        }
    }

    /// Checkpoint for reading a file from its first byte
    pub fn fresh(signature: Signature, reference_time: SystemTime) -> Self {
        Self::new(signature, reference_time, 0)
    }

    /// Whether this is the zero value
    pub fn is_empty(&self) -> bool {
        self.signature.digest().is_empty()
    }

    /// Same file and reference time, advanced to `offset`
    pub fn advanced_to(&self, offset: u64) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::new(Signature::default(), SystemTime::UNIX_EPOCH, 0)
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.signature,
            format_time(self.reference_time),
            self.offset
        )
    }
}

/// RFC 3339 rendering used in diagnostics and verbose output
pub fn format_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_is_empty() {
        let cp = Checkpoint::default();
        assert!(cp.is_empty());
        assert_eq!(cp.offset, 0);
        assert_eq!(cp.reference_time, SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn test_advanced_to_keeps_identity() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let cp = Checkpoint::fresh(Signature::from_prefix(b"a\n"), t);
        let next = cp.advanced_to(2);

        assert!(!next.is_empty());
        assert_eq!(next.signature, cp.signature);
        assert_eq!(next.reference_time, t);
        assert_eq!(next.offset, 2);
    }

    #[test]
    fn test_format_time() {
        let t = SystemTime::UNIX_EPOCH + Duration::new(1_700_000_000, 5);
        assert_eq!(format_time(t), "2023-11-14T22:13:20.000000005Z");
    }
}
