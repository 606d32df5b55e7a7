//! Test namespace configuration

use sccoc_core::{McsLabel, Namespace, Result, UidBlock};
use serde::{Deserialize, Serialize};

use crate::annotations::{MCS_ANNOTATION, SUPPLEMENTAL_GROUPS_ANNOTATION, UID_RANGE_ANNOTATION};

/// Allocation values stamped onto a test namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Prefix for the generated namespace name
    pub prefix: String,

    /// UID block, `start/size` or `start-end`
    pub uid_range: String,

    /// MCS label for the namespace
    pub mcs: String,

    /// Supplemental group blocks
    pub supplemental_groups: String,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            prefix: "tmp".to_string(),
            uid_range: "1000100000/10000".to_string(),
            mcs: "s9:z0,z1".to_string(),
            supplemental_groups: "1000100000/10000".to_string(),
        }
    }
}

impl NamespaceConfig {
    /// Create a configuration with the default allocations
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name prefix
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the UID block
    #[must_use]
    pub fn with_uid_range(mut self, uid_range: impl Into<String>) -> Self {
        self.uid_range = uid_range.into();
        self
    }

    /// Set the MCS label
    #[must_use]
    pub fn with_mcs(mut self, mcs: impl Into<String>) -> Self {
        self.mcs = mcs.into();
        self
    }

    /// Set the supplemental group blocks
    #[must_use]
    pub fn with_supplemental_groups(mut self, groups: impl Into<String>) -> Self {
        self.supplemental_groups = groups.into();
        self
    }

    /// Check that every allocation parses
    pub fn validate(&self) -> Result<()> {
        self.uid_range.parse::<UidBlock>()?;
        self.mcs.parse::<McsLabel>()?;
        for block in self.supplemental_groups.split(',') {
            block.parse::<UidBlock>()?;
        }
        Ok(())
    }
}

/// Generate a unique namespace name from a prefix
#[must_use]
pub fn random_name(prefix: &str) -> String {
    format!("{prefix}{}", uuid::Uuid::new_v4())
}

/// Build a fresh test namespace with allocation annotations
///
/// # Errors
/// Returns error if any configured allocation is malformed
pub fn create_for_test(config: &NamespaceConfig) -> Result<Namespace> {
    config.validate()?;

    let namespace = Namespace::new(random_name(&config.prefix))
        .with_annotation(UID_RANGE_ANNOTATION, &config.uid_range)
        .with_annotation(MCS_ANNOTATION, &config.mcs)
        .with_annotation(SUPPLEMENTAL_GROUPS_ANNOTATION, &config.supplemental_groups);

    tracing::debug!(
        namespace = %namespace.name,
        uid_range = %config.uid_range,
        mcs = %config.mcs,
        supplemental_groups = %config.supplemental_groups,
        "Created test namespace"
    );

    Ok(namespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NamespaceConfig::default();
        assert_eq!(config.prefix, "tmp");
        assert_eq!(config.uid_range, "1000100000/10000");
        assert_eq!(config.mcs, "s9:z0,z1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = NamespaceConfig::new()
            .with_prefix("demo")
            .with_uid_range("2000-2999")
            .with_mcs("s0:c1,c2")
            .with_supplemental_groups("5000/10,6000/10");

        assert_eq!(config.prefix, "demo");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_allocations() {
        assert!(NamespaceConfig::new().with_uid_range("oops").validate().is_err());
        assert!(NamespaceConfig::new().with_mcs("").validate().is_err());
        assert!(
            NamespaceConfig::new()
                .with_supplemental_groups("5000/10,")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_random_names_differ() {
        let a = random_name("tmp");
        let b = random_name("tmp");
        assert!(a.starts_with("tmp"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_create_for_test_annotations() {
        let ns = create_for_test(&NamespaceConfig::default()).unwrap();
        assert!(ns.name.starts_with("tmp"));
        assert_eq!(ns.annotation(UID_RANGE_ANNOTATION), Some("1000100000/10000"));
        assert_eq!(ns.annotation(MCS_ANNOTATION), Some("s9:z0,z1"));
        assert_eq!(
            ns.annotation(SUPPLEMENTAL_GROUPS_ANNOTATION),
            Some("1000100000/10000")
        );
    }
}
