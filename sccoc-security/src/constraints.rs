//! Security context constraint model

use sccoc_core::{IdRange, SELinuxOptions};
use serde::{Deserialize, Serialize};

/// Wildcard accepted in capability, volume, and seccomp lists
pub const ALLOW_ALL: &str = "*";

/// Volume types every bootstrap constraint permits
pub const TRIVIAL_VOLUMES: [&str; 6] = [
    "configMap",
    "downwardAPI",
    "emptyDir",
    "persistentVolumeClaim",
    "projected",
    "secret",
];

/// A named policy governing the security attributes of a pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityContextConstraints {
    /// Constraint name
    pub name: String,

    /// Human readable description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Higher priority constraints are tried first during admission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    /// Permit privileged containers
    pub allow_privileged_container: bool,

    /// Capabilities added to every container
    #[serde(default)]
    pub default_add_capabilities: Vec<String>,

    /// Capabilities every container must drop
    #[serde(default)]
    pub required_drop_capabilities: Vec<String>,

    /// Capabilities a container may request
    #[serde(default)]
    pub allowed_capabilities: Vec<String>,

    /// Permit host path volumes
    pub allow_host_dir_volume_plugin: bool,

    /// Permitted volume types
    #[serde(default)]
    pub volumes: Vec<String>,

    /// Permit the host network namespace
    pub allow_host_network: bool,

    /// Permit host ports
    pub allow_host_ports: bool,

    /// Permit the host PID namespace
    #[serde(rename = "allowHostPID")]
    pub allow_host_pid: bool,

    /// Permit the host IPC namespace
    #[serde(rename = "allowHostIPC")]
    pub allow_host_ipc: bool,

    /// How the run-as user is chosen and checked
    pub run_as_user: RunAsUserStrategyOptions,

    /// How the SELinux label is chosen and checked
    #[serde(rename = "seLinuxContext")]
    pub selinux_context: SELinuxContextStrategyOptions,

    /// How supplemental groups are chosen and checked
    pub supplemental_groups: GroupStrategyOptions,

    /// How the fsGroup is chosen and checked
    pub fs_group: GroupStrategyOptions,

    /// Force a read-only root filesystem
    #[serde(default)]
    pub read_only_root_filesystem: bool,

    /// Permitted seccomp profiles; the first one is the default
    #[serde(default)]
    pub seccomp_profiles: Vec<String>,

    /// Users granted this constraint
    #[serde(default)]
    pub users: Vec<String>,

    /// Groups granted this constraint
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Run-as-user strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum RunAsUserStrategyOptions {
    /// Exactly one UID
    MustRunAs {
        /// Required UID
        uid: Option<i64>,
    },
    /// A UID within a range, defaulting to its minimum
    MustRunAsRange {
        /// Lowest UID
        uid_range_min: Option<i64>,
        /// Highest UID
        uid_range_max: Option<i64>,
    },
    /// Any UID except root
    MustRunAsNonRoot,
    /// Any UID
    RunAsAny,
}

impl RunAsUserStrategyOptions {
    /// Range strategy awaiting namespace allocation
    #[must_use]
    pub const fn unallocated_range() -> Self {
        Self::MustRunAsRange {
            uid_range_min: None,
            uid_range_max: None,
        }
    }

    /// Strategy type name
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::MustRunAs { .. } => "MustRunAs",
            Self::MustRunAsRange { .. } => "MustRunAsRange",
            Self::MustRunAsNonRoot => "MustRunAsNonRoot",
            Self::RunAsAny => "RunAsAny",
        }
    }
}

/// SELinux context strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum SELinuxContextStrategyOptions {
    /// A fixed label; a missing level is filled from the namespace
    MustRunAs {
        /// Required label
        #[serde(rename = "seLinuxOptions")]
        selinux_options: Option<SELinuxOptions>,
    },
    /// Any label
    RunAsAny,
}

impl SELinuxContextStrategyOptions {
    /// Label strategy awaiting namespace allocation
    #[must_use]
    pub const fn unallocated() -> Self {
        Self::MustRunAs {
            selinux_options: None,
        }
    }

    /// Strategy type name
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::MustRunAs { .. } => "MustRunAs",
            Self::RunAsAny => "RunAsAny",
        }
    }
}

/// Group strategy, shared by fsGroup and supplemental groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GroupStrategyOptions {
    /// Group IDs must fall within one of the ranges
    MustRunAs {
        /// Allowed ranges; empty until allocated
        ranges: Vec<IdRange>,
    },
    /// Any group
    RunAsAny,
}

impl GroupStrategyOptions {
    /// Group strategy awaiting namespace allocation
    #[must_use]
    pub const fn unallocated() -> Self {
        Self::MustRunAs { ranges: Vec::new() }
    }

    /// Strategy type name
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::MustRunAs { .. } => "MustRunAs",
            Self::RunAsAny => "RunAsAny",
        }
    }
}

/// Points awarded per permitted feature, used to order constraints
mod points {
    pub const PRIVILEGED: u32 = 20;
    pub const HOST_VOLUME: u32 = 10;
    pub const NON_TRIVIAL_VOLUME: u32 = 5;
    pub const RUN_AS_ANY_USER: u32 = 4;
    pub const RUN_AS_NON_ROOT: u32 = 3;
    pub const RUN_AS_RANGE: u32 = 2;
    pub const RUN_AS_USER: u32 = 1;
}

impl SecurityContextConstraints {
    /// Check if the constraint grants access to a user or any of the groups
    #[must_use]
    pub fn grants(&self, user: &str, groups: &[String]) -> bool {
        self.users.iter().any(|u| u == user) || self.groups.iter().any(|g| groups.contains(g))
    }

    /// Check whether a volume type is permitted
    #[must_use]
    pub fn allows_volume(&self, volume: &str) -> bool {
        self.volumes.iter().any(|v| v == ALLOW_ALL || v == volume)
    }

    /// Restrictiveness score: lower means fewer permitted features
    #[must_use]
    pub fn restriction_points(&self) -> u32 {
        let mut total = 0;

        if self.allow_privileged_container {
            total += points::PRIVILEGED;
        }

        if self.allow_host_dir_volume_plugin || self.allows_volume("hostPath") {
            total += points::HOST_VOLUME;
        } else if self
            .volumes
            .iter()
            .any(|v| !TRIVIAL_VOLUMES.contains(&v.as_str()))
        {
            total += points::NON_TRIVIAL_VOLUME;
        }

        total += match self.selinux_context {
            SELinuxContextStrategyOptions::RunAsAny => points::RUN_AS_ANY_USER,
            SELinuxContextStrategyOptions::MustRunAs { .. } => points::RUN_AS_USER,
        };

        total += match self.run_as_user {
            RunAsUserStrategyOptions::RunAsAny => points::RUN_AS_ANY_USER,
            RunAsUserStrategyOptions::MustRunAsNonRoot => points::RUN_AS_NON_ROOT,
            RunAsUserStrategyOptions::MustRunAsRange { .. } => points::RUN_AS_RANGE,
            RunAsUserStrategyOptions::MustRunAs { .. } => points::RUN_AS_USER,
        };

        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::{bootstrap_constraints, find};

    #[test]
    fn test_grants() {
        let constraints = bootstrap_constraints("openshift-infra");
        let restricted = find(&constraints, "restricted").unwrap();

        assert!(restricted.grants("alice", &["system:authenticated".to_string()]));
        assert!(!restricted.grants("alice", &[]));
    }

    #[test]
    fn test_restriction_points_order() {
        let constraints = bootstrap_constraints("openshift-infra");
        let score = |name| find(&constraints, name).unwrap().restriction_points();

        assert!(score("restricted") < score("anyuid"));
        assert!(score("anyuid") < score("hostmount-anyuid"));
        assert!(score("hostmount-anyuid") < score("privileged"));
        assert_eq!(score("restricted"), score("hostnetwork"));
    }

    #[test]
    fn test_strategy_serde_shape() {
        let opts = RunAsUserStrategyOptions::MustRunAsRange {
            uid_range_min: Some(1),
            uid_range_max: Some(2),
        };
        let json = serde_json::to_value(&opts).unwrap();
        assert_eq!(json["type"], "MustRunAsRange");
        assert_eq!(json["uidRangeMin"], 1);
    }
}
