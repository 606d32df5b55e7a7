//! Capability strategy

use sccoc_core::{Capabilities, Container};
use std::collections::BTreeSet;

use crate::constraints::{ALLOW_ALL, SecurityContextConstraints};
use crate::validation::{FieldError, child};

/// Adds defaults, forces required drops, and limits requested additions
#[derive(Debug, Clone, Default)]
pub struct CapabilitiesStrategy {
    default_add: BTreeSet<String>,
    required_drop: BTreeSet<String>,
    allowed: BTreeSet<String>,
}

fn set(values: &[String]) -> BTreeSet<String> {
    values.iter().cloned().collect()
}

fn requested(container: &Container) -> Option<&Capabilities> {
    container
        .security_context
        .as_ref()
        .and_then(|sc| sc.capabilities.as_ref())
}

impl CapabilitiesStrategy {
    /// Strategy from explicit lists
    #[must_use]
    pub fn new(default_add: &[String], required_drop: &[String], allowed: &[String]) -> Self {
        Self {
            default_add: set(default_add),
            required_drop: set(required_drop),
            allowed: set(allowed),
        }
    }

    /// Strategy from a constraint's capability lists
    #[must_use]
    pub fn from_constraint(scc: &SecurityContextConstraints) -> Self {
        Self::new(
            &scc.default_add_capabilities,
            &scc.required_drop_capabilities,
            &scc.allowed_capabilities,
        )
    }

    /// Capabilities to set on the container
    ///
    /// Defaults the container explicitly drops are not added. Returns
    /// `None` when there is nothing to add or drop.
    #[must_use]
    pub fn generate(&self, container: &Container) -> Option<Capabilities> {
        let (container_add, container_drop) = requested(container)
            .map(|caps| (set(&caps.add), set(&caps.drop)))
            .unwrap_or_default();

        let add: BTreeSet<String> = self
            .default_add
            .difference(&container_drop)
            .cloned()
            .chain(container_add)
            .collect();
        let drop: BTreeSet<String> = self
            .required_drop
            .iter()
            .cloned()
            .chain(container_drop)
            .collect();

        if add.is_empty() && drop.is_empty() {
            return None;
        }

        Some(Capabilities {
            add: add.into_iter().collect(),
            drop: drop.into_iter().collect(),
        })
    }

    /// Check a container's capabilities; `path` points at `capabilities`
    #[must_use]
    pub fn validate(&self, path: &str, container: &Container) -> Vec<FieldError> {
        let Some(caps) = requested(container) else {
            if self.required_drop.is_empty() {
                return Vec::new();
            }
            return vec![FieldError::required(
                path,
                "required capabilities are not set on the securityContext",
            )];
        };

        let mut errors = Vec::new();
        let allow_all = self.allowed.contains(ALLOW_ALL);

        for cap in &caps.add {
            if !allow_all && !self.default_add.contains(cap) && !self.allowed.contains(cap) {
                errors.push(FieldError::invalid(
                    child(path, "add"),
                    cap,
                    "capability may not be added",
                ));
            }
        }

        for cap in &self.required_drop {
            if !caps.drop.contains(cap) {
                errors.push(FieldError::invalid(
                    child(path, "drop"),
                    caps.drop.join(","),
                    format!("{cap} is required to be dropped but was not found"),
                ));
            }
        }

        errors
    }
}
