// SPDX-License-Identifier: Apache-2.0

//! Filesystem side of tailing: finding the rotated files, fingerprinting
//! them, and reading records.

mod candidate;
mod finder;
mod reader;
mod signature;

pub use candidate::Candidate;
#[cfg(test)]
pub use finder::MockFileFinder;
pub use finder::{FileFinder, GlobFileFinder};
pub use reader::{Record, RecordReader};
pub use signature::{SIG_SZ, Signature};
