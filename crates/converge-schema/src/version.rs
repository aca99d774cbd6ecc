//! Product version parsing and comparison.
//!
//! Remote configuration services report four-component versions such as
//! `9.2.0.0`. Shorter inputs are padded with zeros, so `9.2` parses as
//! `9.2.0.0`, mirroring how two-part versions are normalized elsewhere.
//!
//! # Examples
//!
//! ```
//! use converge_schema::ProductVersion;
//!
//! let negotiated: ProductVersion = "9.1.0.0".parse().unwrap();
//! let required: ProductVersion = "9.2".parse().unwrap();
//! assert!(!negotiated.satisfies(&required));
//! assert_eq!(required.to_string(), "9.2.0.0");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const COMPONENTS: usize = 4;

/// A dotted product version with exactly four numeric components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductVersion {
    parts: [u32; COMPONENTS],
}

impl ProductVersion {
    /// Create a version from its four components.
    pub const fn new(major: u32, minor: u32, maintenance: u32, patch: u32) -> Self {
        Self {
            parts: [major, minor, maintenance, patch],
        }
    }

    /// Parse a version string of one to four dot-separated components.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = |reason: String| Error::InvalidVersion {
            version: s.to_string(),
            reason,
        };

        if trimmed.is_empty() {
            return Err(invalid("empty version".to_string()));
        }

        let segments: Vec<&str> = trimmed.split('.').collect();
        if segments.len() > COMPONENTS {
            return Err(invalid(format!(
                "expected at most {COMPONENTS} components, found {}",
                segments.len()
            )));
        }

        let mut parts = [0u32; COMPONENTS];
        for (slot, segment) in parts.iter_mut().zip(&segments) {
            *slot = segment
                .parse()
                .map_err(|_| invalid(format!("'{segment}' is not a number")))?;
        }

        Ok(Self { parts })
    }

    /// True when this version is at least `minimum`.
    pub fn satisfies(&self, minimum: &ProductVersion) -> bool {
        self >= minimum
    }

    pub fn major(&self) -> u32 {
        self.parts[0]
    }

    pub fn minor(&self) -> u32 {
        self.parts[1]
    }
}

impl fmt::Display for ProductVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.parts;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

impl FromStr for ProductVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProductVersion {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ProductVersion> for String {
    fn from(version: ProductVersion) -> Self {
        version.to_string()
    }
}
