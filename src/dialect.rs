//! GnuPG command-line dialects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which argument convention the installed GnuPG speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// GnuPG 1.x, invoked as `gpg`
    V1,
    /// GnuPG 2.x, invoked as `gpg2`
    V2,
    /// Neither binary answered `--version`
    Undetermined,
}

impl Dialect {
    /// Parse a selector from config or user input.
    ///
    /// Only `v1` and `v2` are recognized; anything else means "detect".
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "v1" => Some(Self::V1),
            "v2" => Some(Self::V2),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
            Self::Undetermined => "undetermined",
        }
    }

    pub fn supported_values() -> &'static [&'static str] {
        &["v1", "v2"]
    }

    pub fn is_determined(&self) -> bool {
        !matches!(self, Self::Undetermined)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
