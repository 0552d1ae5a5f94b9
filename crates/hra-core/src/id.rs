//! Identifiers for stored layers.

use std::fmt;

/// Names one stored layer (raster or statistics table) within a run.
///
/// Keys play the role output paths play in a file-backed workflow: every
/// task declares the keys it reads and writes, and each key is written
/// at most once per run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RasterKey(String);

impl RasterKey {
    /// Create a key from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RasterKey {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

impl From<String> for RasterKey {
    fn from(v: String) -> Self {
        Self(v)
    }
}

impl AsRef<str> for RasterKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
