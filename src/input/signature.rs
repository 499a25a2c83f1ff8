use sha2::{Digest, Sha224};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Number of leading bytes that identify a file.
pub const SIG_SZ: usize = 256;

/// A signature identifies a file by a digest of its first bytes rather than
/// its path or inode, so a renamed file keeps its identity while a file
/// replaced at the same path gets a new one.
///
/// Two different files whose first [`SIG_SZ`] bytes are identical (a shared
/// header, for example) cannot be told apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Signature {
    /// SHA-224 of the covered prefix, empty for the zero value
    digest: Vec<u8>,
    /// Number of prefix bytes the digest covers
    len: usize,
}

impl Signature {
    /// Compute the signature of the file at `path`
    pub fn of_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let mut file = File::open(path)?;
        Self::new(&mut file, SIG_SZ)
    }

    /// Digest up to `size` bytes from the start of `file`
    pub fn new(file: &mut File, size: usize) -> io::Result<Self> {
        file.seek(SeekFrom::Start(0))?;

        let mut buf = Vec::with_capacity(size);
        file.take(size as u64).read_to_end(&mut buf)?;

        Ok(Self::from_prefix(&buf))
    }

    /// Signature of an in-memory prefix
    pub fn from_prefix(prefix: &[u8]) -> Self {
        Self {
            digest: Sha224::digest(prefix).to_vec(),
            len: prefix.len(),
        }
    }

    /// Rebuild a signature from persisted parts
    pub fn from_parts(digest: Vec<u8>, len: usize) -> Self {
        Self { digest, len }
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Number of bytes covered by the digest
    pub fn len(&self) -> usize {
        self.len
    }

    /// The zero value, or a signature of an empty file. Neither identifies
    /// anything.
    pub fn is_empty(&self) -> bool {
        self.digest.is_empty() || self.len == 0
    }

    /// Whether the signature covers the full identifying prefix
    pub fn is_complete(&self) -> bool {
        self.len >= SIG_SZ
    }

    /// Whether `self` and `other` identify the same file. Empty signatures
    /// never match.
    pub fn matches(&self, other: &Signature) -> bool {
        !self.is_empty() && self == other
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.digest)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.digest.is_empty() {
            return f.write_str("-");
        }
        // Short form is enough to tell files apart in logs
        let hex = self.to_hex();
        write!(f, "{}/{}", &hex[..12.min(hex.len())], self.len)
    }
}
