//! Store name type.
//!
//! `StoreName` is a newtype wrapper around `SmolStr` that gives type safety
//! to the names of response stores (`afz-cache-v2`, `afz-runtime-v2`, ...).

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// The name of a response store.
///
/// Used for:
/// - Opening and deleting stores in a cache storage
/// - Response source tracking in [`ResponseSource::Store`](crate::ResponseSource::Store)
/// - Metrics and tracing labels
///
/// # Example
/// ```
/// use afz_core::StoreName;
///
/// let name = StoreName::new("afz-cache-v2");
/// assert!(name.has_prefix("afz"));
/// assert!(!name.has_prefix("af"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreName(SmolStr);

impl StoreName {
    /// Creates a new store name.
    #[inline]
    pub fn new(s: impl Into<SmolStr>) -> Self {
        Self(s.into())
    }

    /// Creates a store name from a static string (no allocation).
    #[inline]
    pub const fn new_static(s: &'static str) -> Self {
        Self(SmolStr::new_static(s))
    }

    /// Returns the name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when the name belongs to the `prefix` family,
    /// i.e. it starts with `"{prefix}-"`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('-'))
    }
}

impl fmt::Display for StoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for StoreName {
    #[inline]
    fn from(s: &str) -> Self {
        Self(SmolStr::new(s))
    }
}

impl From<String> for StoreName {
    #[inline]
    fn from(s: String) -> Self {
        Self(SmolStr::from(s))
    }
}

impl From<SmolStr> for StoreName {
    #[inline]
    fn from(s: SmolStr) -> Self {
        Self(s)
    }
}

impl AsRef<str> for StoreName {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_static() {
        let name = StoreName::new_static("afz-cache-v1");
        assert_eq!(name.as_str(), "afz-cache-v1");
    }

    #[test]
    fn test_has_prefix_requires_separator() {
        let name = StoreName::new("afzx-cache-v1");
        assert!(!name.has_prefix("afz"));
        assert!(StoreName::new("afz-runtime-v1").has_prefix("afz"));
        assert!(!StoreName::new("unrelated-store").has_prefix("afz"));
    }

    #[test]
    fn test_display() {
        let name = StoreName::new("display_test");
        assert_eq!(format!("{}", name), "display_test");
    }

    #[test]
    fn test_ordering() {
        let mut names = vec![StoreName::new("b"), StoreName::new("a")];
        names.sort();
        assert_eq!(names, vec![StoreName::new("a"), StoreName::new("b")]);
    }
}
