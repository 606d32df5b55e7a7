//! Seccomp profile strategy

use sccoc_core::Pod;

use crate::constraints::ALLOW_ALL;
use crate::validation::FieldError;

/// Pod annotation holding the seccomp profile
pub const SECCOMP_POD_ANNOTATION: &str = "seccomp.security.alpha.kubernetes.io/pod";

/// Chooses and checks the pod seccomp profile
#[derive(Debug, Clone, Default)]
pub struct SeccompStrategy {
    profiles: Vec<String>,
}

impl SeccompStrategy {
    /// Strategy over an allowed-profile list; the first entry is the default
    #[must_use]
    pub fn new(profiles: &[String]) -> Self {
        Self {
            profiles: profiles.to_vec(),
        }
    }

    fn allows_any(&self) -> bool {
        self.profiles.iter().any(|p| p == ALLOW_ALL)
    }

    /// Profile to annotate the pod with, if any
    #[must_use]
    pub fn generate(&self, pod: &Pod) -> Option<String> {
        if let Some(existing) = pod.annotation(SECCOMP_POD_ANNOTATION) {
            return Some(existing.to_string());
        }
        self.profiles
            .first()
            .filter(|p| p.as_str() != ALLOW_ALL)
            .cloned()
    }

    /// Check the pod's seccomp annotation
    #[must_use]
    pub fn validate(&self, path: &str, pod: &Pod) -> Vec<FieldError> {
        let profile = pod.annotation(SECCOMP_POD_ANNOTATION).unwrap_or("");
        let field = format!("{path}[{SECCOMP_POD_ANNOTATION}]");

        if self.profiles.is_empty() {
            if profile.is_empty() {
                return Vec::new();
            }
            return vec![FieldError::invalid(field, profile, "seccomp may not be set")];
        }

        if self.allows_any() || self.profiles.iter().any(|p| p == profile) {
            return Vec::new();
        }

        vec![FieldError::invalid(
            field,
            profile,
            format!(
                "{profile} is not an allowed seccomp profile. Valid values are {}",
                self.profiles.join(",")
            ),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotated(profile: &str) -> Pod {
        let mut pod = Pod::default();
        pod.annotations
            .insert(SECCOMP_POD_ANNOTATION.to_string(), profile.to_string());
        pod
    }

    #[test]
    fn test_no_profiles() {
        let strategy = SeccompStrategy::default();
        assert_eq!(strategy.generate(&Pod::default()), None);
        assert!(strategy.validate("annotations", &Pod::default()).is_empty());
        assert_eq!(
            strategy
                .validate("annotations", &annotated("unconfined"))
                .len(),
            1
        );
    }

    #[test]
    fn test_wildcard() {
        let strategy = SeccompStrategy::new(&["*".to_string()]);
        assert_eq!(strategy.generate(&Pod::default()), None);
        assert!(strategy.validate("annotations", &annotated("unconfined")).is_empty());
    }

    #[test]
    fn test_default_profile() {
        let strategy = SeccompStrategy::new(&["docker/default".to_string()]);
        assert_eq!(
            strategy.generate(&Pod::default()).as_deref(),
            Some("docker/default")
        );
        assert!(strategy.validate("annotations", &annotated("docker/default")).is_empty());
        assert_eq!(strategy.validate("annotations", &Pod::default()).len(), 1);
    }
}
