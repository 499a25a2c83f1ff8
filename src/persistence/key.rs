// SPDX-License-Identifier: Apache-2.0

use sha2::{Digest, Sha224};
use std::fmt;

/// Longest slug kept before the pattern digest
const MAX_SLUG_LEN: usize = 64;

/// Hex characters of the pattern digest appended to the slug
const DIGEST_HEX_LEN: usize = 16;

/// Identifies the checkpoint of one source pattern.
///
/// The key is a filesystem-safe slug of the pattern followed by a digest of
/// the exact pattern, so patterns that slugify identically
/// (`/var/log/app*` and `/var/log/app?`) still get distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckpointKey {
    pattern: String,
    name: String,
}

impl CheckpointKey {
    pub fn for_pattern(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let digest = hex::encode(Sha224::digest(pattern.as_bytes()));

        let mut slug = slugify(&pattern);
        if slug.is_empty() {
            slug.push_str("pattern");
        }
        let name = format!("{}-{}", slug, &digest[..DIGEST_HEX_LEN]);

        Self { pattern, name }
    }

    /// The source pattern this key was derived from
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Filesystem-safe name, stable across runs
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Lowercase alphanumerics and `_`, with every run of other characters
/// collapsed to a single `-`
fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for c in value.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    slug.truncate(MAX_SLUG_LEN);
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("/var/log/app.log*"), "var-log-app-log");
        assert_eq!(slugify("  My Logs/**/*.LOG "), "my-logs-log");
        assert_eq!(slugify("a__b"), "a__b");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = CheckpointKey::for_pattern("/var/log/app.log*");
        let b = CheckpointKey::for_pattern("/var/log/app.log*");

        assert_eq!(a, b);
        assert!(a.name().starts_with("var-log-app-log-"));
        assert_eq!(a.name().len(), "var-log-app-log-".len() + DIGEST_HEX_LEN);
        assert_eq!(a.pattern(), "/var/log/app.log*");
    }

    #[test]
    fn test_same_slug_different_keys() {
        let a = CheckpointKey::for_pattern("/var/log/app*");
        let b = CheckpointKey::for_pattern("/var/log/app?");

        assert_eq!(slugify(a.pattern()), slugify(b.pattern()));
        assert_ne!(a.name(), b.name());
    }

    #[test]
    fn test_key_without_alphanumerics() {
        let key = CheckpointKey::for_pattern("*");
        assert!(key.name().starts_with("pattern-"));
    }

    #[test]
    fn test_long_pattern_is_bounded() {
        let pattern = format!("/{}/app.log*", "x".repeat(500));
        let key = CheckpointKey::for_pattern(pattern);
        assert!(key.name().len() <= MAX_SLUG_LEN + 1 + DIGEST_HEX_LEN);
    }
}
