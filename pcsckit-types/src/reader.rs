//! Reader identifiers

use std::fmt;

/// Name of a physical or virtual reader slot
///
/// Two readers are the same reader iff their names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReaderName(String);

impl ReaderName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ReaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ReaderName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for ReaderName {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for ReaderName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Reader group used to filter reader enumeration
///
/// pcsc-lite ignores groups entirely; Winscard honours them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReaderGroup {
    /// Every reader known to the resource manager
    All,

    /// Readers not assigned to any other group
    Default,

    /// A vendor or administrator defined group
    Custom(String),
}

impl ReaderGroup {
    /// Raw group name for `SCARD_ALL_READERS`
    pub const ALL_READERS: &'static str = "SCard$AllReaders";

    /// Raw group name for `SCARD_DEFAULT_READERS`
    pub const DEFAULT_READERS: &'static str = "SCard$DefaultReaders";

    pub fn from_raw(raw: &str) -> Self {
        match raw {
            Self::ALL_READERS => Self::All,
            Self::DEFAULT_READERS => Self::Default,
            other => Self::Custom(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => Self::ALL_READERS,
            Self::Default => Self::DEFAULT_READERS,
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for ReaderGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PC/SC Reader Group: {}", self.as_str())
    }
}
