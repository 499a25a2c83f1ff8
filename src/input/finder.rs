use glob::glob;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{Error, Result};

/// Enumerates the files currently matching the source pattern.
pub trait FileFinder {
    fn find_files(&self) -> Result<Vec<PathBuf>>;
}

/// Finds the live log file and its rotated siblings with a glob pattern
#[derive(Debug, Clone)]
pub struct GlobFileFinder {
    pattern: String,
}

impl GlobFileFinder {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl FileFinder for GlobFileFinder {
    /// Matches come back in glob's (alphabetical) order, which is the input
    /// order the selector keeps for equal timestamps.
    fn find_files(&self) -> Result<Vec<PathBuf>> {
        let matches = glob(&self.pattern).map_err(|e| Error::InvalidGlob(e.to_string()))?;

        let mut paths = Vec::new();
        for entry in matches {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    // Unreadable directory entry, try again next poll
                    debug!("Skipping unreadable glob match {:?}: {}", e.path(), e.error());
                    continue;
                }
            };

            if path.is_dir() {
                continue;
            }
            paths.push(path);
        }

        Ok(paths)
    }
}

/// Finder returning a fixed list of paths, failing once `fail_after` calls
/// have succeeded
#[cfg(test)]
pub struct MockFileFinder {
    paths: Vec<PathBuf>,
    fail_after: Option<usize>,
    calls: std::cell::Cell<usize>,
}

#[cfg(test)]
impl MockFileFinder {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            fail_after: None,
            calls: std::cell::Cell::new(0),
        }
    }

    pub fn fail_after(successes: usize) -> Self {
        Self {
            paths: Vec::new(),
            fail_after: Some(successes),
            calls: std::cell::Cell::new(0),
        }
    }
}

#[cfg(test)]
impl FileFinder for MockFileFinder {
    fn find_files(&self) -> Result<Vec<PathBuf>> {
        let call = self.calls.get();
        self.calls.set(call + 1);

        match self.fail_after {
            Some(successes) if call >= successes => Err(Error::Io(std::io::Error::other(
                "mock finder failure",
            ))),
            _ => Ok(self.paths.clone()),
        }
    }
}
