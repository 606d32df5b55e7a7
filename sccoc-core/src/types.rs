//! Core type definitions with strong typing and validation

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Container identifier as handed out by the container engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct ContainerId(String);

impl ContainerId {
    /// Maximum length for container IDs
    pub const MAX_LENGTH: usize = 64;

    /// Create a new `ContainerId` with validation
    ///
    /// # Errors
    /// Returns error if ID is invalid (empty, too long, or contains invalid characters)
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    fn validate(id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(Error::invalid("Container ID cannot be empty"));
        }

        if id.len() > Self::MAX_LENGTH {
            return Err(Error::invalid(format!(
                "Container ID too long (max {} chars)",
                Self::MAX_LENGTH
            )));
        }

        if !id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::invalid(
                "Container ID can only contain alphanumeric, dash, and underscore",
            ));
        }

        Ok(())
    }

    /// Get the container ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form (first 12 characters), as engines print it
    #[must_use]
    pub fn short(&self) -> &str {
        self.0
            .char_indices()
            .nth(12)
            .map_or(self.0.as_str(), |(end, _)| &self.0[..end])
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContainerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ContainerId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<ContainerId> for String {
    fn from(id: ContainerId) -> Self {
        id.0
    }
}

/// Inclusive range of user or group IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawIdRange")]
pub struct IdRange {
    /// Lowest allowed ID
    pub min: i64,
    /// Highest allowed ID
    pub max: i64,
}

impl IdRange {
    /// Create a range, rejecting `min > max`
    ///
    /// # Errors
    /// Returns error if the bounds are inverted
    pub fn new(min: i64, max: i64) -> Result<Self> {
        if min > max {
            return Err(Error::invalid(format!(
                "range minimum {min} is greater than maximum {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Range holding exactly one ID
    #[must_use]
    pub const fn single(id: i64) -> Self {
        Self { min: id, max: id }
    }

    /// Check whether `id` lies within the range
    #[must_use]
    pub const fn contains(&self, id: i64) -> bool {
        id >= self.min && id <= self.max
    }
}

#[derive(Deserialize)]
struct RawIdRange {
    min: i64,
    max: i64,
}

impl TryFrom<RawIdRange> for IdRange {
    type Error = Error;

    fn try_from(raw: RawIdRange) -> Result<Self> {
        Self::new(raw.min, raw.max)
    }
}

impl fmt::Display for IdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Block of IDs allocated to a namespace
///
/// Parsed from either `start/size` or `start-end` (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UidBlock {
    start: i64,
    size: i64,
}

impl UidBlock {
    /// Create a block from start and size
    ///
    /// # Errors
    /// Returns error if start is negative, size is not positive, or the end overflows
    pub fn new(start: i64, size: i64) -> Result<Self> {
        if start < 0 {
            return Err(Error::invalid(format!("block start {start} is negative")));
        }
        if size <= 0 {
            return Err(Error::invalid(format!("block size {size} must be positive")));
        }
        if start.checked_add(size - 1).is_none() {
            return Err(Error::invalid(format!(
                "block {start}/{size} exceeds the ID space"
            )));
        }
        Ok(Self { start, size })
    }

    /// First ID in the block
    #[must_use]
    pub const fn start(&self) -> i64 {
        self.start
    }

    /// Number of IDs in the block
    #[must_use]
    pub const fn size(&self) -> i64 {
        self.size
    }

    /// Last ID in the block
    #[must_use]
    pub const fn end(&self) -> i64 {
        self.start + self.size - 1
    }

    /// The block as an inclusive range
    #[must_use]
    pub const fn range(&self) -> IdRange {
        IdRange {
            min: self.start,
            max: self.end(),
        }
    }
}

impl FromStr for UidBlock {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let parse = |part: &str| {
            part.trim()
                .parse::<i64>()
                .map_err(|e| Error::invalid(format!("unable to parse {s:?} as a block: {e}")))
        };

        if let Some((start, size)) = s.split_once('/') {
            return Self::new(parse(start)?, parse(size)?);
        }
        if let Some((start, end)) = s.split_once('-') {
            let (start, end) = (parse(start)?, parse(end)?);
            if end < start {
                return Err(Error::invalid(format!(
                    "block {s:?} ends before it starts"
                )));
            }
            let size = end
                .checked_sub(start)
                .and_then(|d| d.checked_add(1))
                .ok_or_else(|| Error::invalid(format!("block {s:?} exceeds the ID space")))?;
            return Self::new(start, size);
        }

        Err(Error::invalid(format!(
            "{s:?} is not a block (expected start/size or start-end)"
        )))
    }
}

impl fmt::Display for UidBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.size)
    }
}

impl TryFrom<String> for UidBlock {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<UidBlock> for String {
    fn from(block: UidBlock) -> Self {
        block.to_string()
    }
}

/// Multi-category security label such as `s0:c1,c2`
///
/// Equality ignores the order of categories.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct McsLabel {
    sensitivity: String,
    categories: Vec<String>,
}

impl McsLabel {
    /// Sensitivity part (before the colon)
    #[must_use]
    pub fn sensitivity(&self) -> &str {
        &self.sensitivity
    }

    /// Category list in the order it was written
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    fn category_set(&self) -> BTreeSet<&str> {
        self.categories.iter().map(String::as_str).collect()
    }
}

impl PartialEq for McsLabel {
    fn eq(&self, other: &Self) -> bool {
        self.sensitivity == other.sensitivity && self.category_set() == other.category_set()
    }
}

impl FromStr for McsLabel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::invalid("MCS label cannot be empty"));
        }

        let (sensitivity, categories) = match s.split_once(':') {
            Some((sens, cats)) => {
                let categories: Vec<String> = cats
                    .split(',')
                    .map(str::trim)
                    .map(ToOwned::to_owned)
                    .collect();
                if categories.iter().any(String::is_empty) {
                    return Err(Error::invalid(format!(
                        "MCS label {s:?} has an empty category"
                    )));
                }
                (sens, categories)
            }
            None => (s, Vec::new()),
        };

        if sensitivity.is_empty() {
            return Err(Error::invalid(format!(
                "MCS label {s:?} has no sensitivity"
            )));
        }

        Ok(Self {
            sensitivity: sensitivity.to_owned(),
            categories,
        })
    }
}

impl fmt::Display for McsLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.categories.is_empty() {
            write!(f, "{}", self.sensitivity)
        } else {
            write!(f, "{}:{}", self.sensitivity, self.categories.join(","))
        }
    }
}

impl TryFrom<String> for McsLabel {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<McsLabel> for String {
    fn from(label: McsLabel) -> Self {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_id_validation() {
        assert!(ContainerId::new("valid-id_123").is_ok());
        assert!(ContainerId::new("").is_err());
        assert!(ContainerId::new("a".repeat(65)).is_err());
        assert!(ContainerId::new("invalid id").is_err());
        assert!(ContainerId::new("invalid/id").is_err());
    }

    #[test]
    fn test_container_id_short() {
        let id = ContainerId::new("0123456789abcdef0123").unwrap();
        assert_eq!(id.short(), "0123456789ab");

        let id = ContainerId::new("abc").unwrap();
        assert_eq!(id.short(), "abc");
    }

    #[test]
    fn test_uid_block_forms() {
        let block: UidBlock = "1000100000/10000".parse().unwrap();
        assert_eq!(block.start(), 1_000_100_000);
        assert_eq!(block.end(), 1_000_109_999);

        let block: UidBlock = "1000-1999".parse().unwrap();
        assert_eq!(block.size(), 1000);
        assert_eq!(block.to_string(), "1000/1000");
    }

    #[test]
    fn test_uid_block_rejects_garbage() {
        assert!("".parse::<UidBlock>().is_err());
        assert!("1000".parse::<UidBlock>().is_err());
        assert!("1000/0".parse::<UidBlock>().is_err());
        assert!("2000-1000".parse::<UidBlock>().is_err());
        assert!("abc/10".parse::<UidBlock>().is_err());
    }

    #[test]
    fn test_uid_block_range_overflow() {
        let err = "0-9223372036854775807".parse::<UidBlock>().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_mcs_label_order_insensitive() {
        let a: McsLabel = "s0:c1,c2".parse().unwrap();
        let b: McsLabel = "s0:c2,c1".parse().unwrap();
        let c: McsLabel = "s0:c1,c3".parse().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(b.to_string(), "s0:c2,c1");
    }

    #[test]
    fn test_id_range() {
        assert!(IdRange::new(5, 1).is_err());
        let range = IdRange::new(1, 5).unwrap();
        assert!(range.contains(1));
        assert!(range.contains(5));
        assert!(!range.contains(6));
        assert_eq!(IdRange::single(7), IdRange { min: 7, max: 7 });
    }

    #[test]
    fn test_id_range_deserialize_validates() {
        let range: IdRange = serde_json::from_str(r#"{"min":1,"max":5}"#).unwrap();
        assert_eq!(range, IdRange { min: 1, max: 5 });
        assert!(serde_json::from_str::<IdRange>(r#"{"min":5,"max":1}"#).is_err());
    }
}
