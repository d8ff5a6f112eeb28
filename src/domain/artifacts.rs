//! Generated artifact sets.

use std::collections::BTreeMap;

use bytes::Bytes;

/// Index file served when a request names no file.
pub const INDEX_FILE: &str = "index.html";
/// Single-page index produced by older revisions of the generator.
pub const LEGACY_INDEX_FILE: &str = "specification.html";

/// Every file produced by one generation, keyed by `/`-separated relative path.
///
/// Immutable once built; shared read-only behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    files: BTreeMap<String, Bytes>,
}

impl ArtifactSet {
    pub fn new(files: BTreeMap<String, Bytes>) -> Self {
        Self { files }
    }

    pub fn get(&self, path: &str) -> Option<&Bytes> {
        self.files.get(path)
    }

    /// Look up a requested file, falling back to the legacy single-page index
    /// when the modern index is missing.
    pub fn lookup(&self, path: &str) -> Option<(&str, &Bytes)> {
        if let Some((name, bytes)) = self.files.get_key_value(path) {
            return Some((name.as_str(), bytes));
        }
        if path == INDEX_FILE {
            return self
                .files
                .get_key_value(LEGACY_INDEX_FILE)
                .map(|(name, bytes)| (name.as_str(), bytes));
        }
        None
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.files.values().map(Bytes::len).sum()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

impl FromIterator<(String, Bytes)> for ArtifactSet {
    fn from_iter<T: IntoIterator<Item = (String, Bytes)>>(iter: T) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}
