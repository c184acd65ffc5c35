use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an image in the store, e.g. `"7.jpg"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageKey(String);

impl ImageKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key for the `index`-th image of the pool.
    pub fn from_index(index: u32) -> Self {
        Self(format!("{index}.jpg"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}
