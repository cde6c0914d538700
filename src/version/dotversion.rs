//! Dotted version numbers

use crate::{Error, Result};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Add;
use std::str::FromStr;

/// A dotted integer version such as `1.0` or `2.3.1`.
///
/// Missing components count as zero, so `1.0 == 1.0.0` and `1.0 < 1.0.1`.
/// Addition is component-wise: `1.2 + 2.1 == 3.3`.
#[derive(Debug, Clone)]
pub struct DotVersion {
    parts: Vec<u64>,
}

impl DotVersion {
    pub fn new(parts: impl Into<Vec<u64>>) -> Self {
        Self { parts: parts.into() }
    }

    pub fn parts(&self) -> &[u64] {
        &self.parts
    }

    /// Components with trailing zeros removed.
    fn significant(&self) -> &[u64] {
        let len = self.parts.iter().rposition(|&p| p != 0).map_or(0, |i| i + 1);
        &self.parts[..len]
    }
}

impl FromStr for DotVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts = s
            .trim()
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| Error::Version(format!("invalid version `{}`", s)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { parts })
    }
}

impl fmt::Display for DotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.parts.iter().map(u64::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

impl Serialize for DotVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Add for &DotVersion {
    type Output = DotVersion;

    fn add(self, rhs: &DotVersion) -> DotVersion {
        let len = self.parts.len().max(rhs.parts.len());
        let parts = (0..len)
            .map(|i| self.parts.get(i).copied().unwrap_or(0) + rhs.parts.get(i).copied().unwrap_or(0))
            .collect();
        DotVersion { parts }
    }
}

impl Add for DotVersion {
    type Output = DotVersion;

    fn add(self, rhs: DotVersion) -> DotVersion {
        &self + &rhs
    }
}

impl PartialEq for DotVersion {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for DotVersion {}

impl PartialEq<&str> for DotVersion {
    fn eq(&self, other: &&str) -> bool {
        other.parse::<DotVersion>().is_ok_and(|v| *self == v)
    }
}

impl Hash for DotVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl Ord for DotVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| {
                let a = self.parts.get(i).copied().unwrap_or(0);
                let b = other.parts.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for DotVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
