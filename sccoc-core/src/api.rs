//! Orchestration API objects
//!
//! Only the fields that security context constraints read or write are
//! modelled. Field names serialize in the orchestrator's camelCase form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A namespace and its annotations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Namespace {
    /// Namespace name
    pub name: String,

    /// Annotations, including the security allocation annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Namespace {
    /// Create an empty namespace
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: BTreeMap::new(),
        }
    }

    /// Set an annotation
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Look up an annotation value
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}

/// A pod: one or more containers scheduled together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    /// Pod name
    pub name: String,

    /// Namespace the pod lives in
    pub namespace: String,

    /// Pod annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Pod spec
    pub spec: PodSpec,
}

impl Pod {
    /// Look up an annotation value
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}

/// Pod specification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Containers in the pod
    pub containers: Vec<Container>,

    /// Pod-level security attributes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<PodSecurityContext>,

    /// Use the host's network namespace
    #[serde(default)]
    pub host_network: bool,

    /// Use the host's PID namespace
    #[serde(default)]
    pub host_pid: bool,

    /// Use the host's IPC namespace
    #[serde(default)]
    pub host_ipc: bool,

    /// Restart policy (`Always`, `OnFailure`, `Never`)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub restart_policy: String,
}

/// A single container within a pod
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Container name
    pub name: String,

    /// Image reference
    pub image: String,

    /// Entrypoint override
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    /// Exposed ports
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ContainerPort>,

    /// Container-level security attributes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<SecurityContext>,
}

/// A port exposed by a container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    /// Port inside the container
    pub container_port: u16,

    /// Port bound on the host, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,

    /// `TCP` or `UDP`
    pub protocol: String,
}

/// Container security context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityContext {
    /// Capabilities to add and drop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Capabilities>,

    /// Run in privileged mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privileged: Option<bool>,

    /// SELinux label
    #[serde(default, rename = "seLinuxOptions", skip_serializing_if = "Option::is_none")]
    pub selinux_options: Option<SELinuxOptions>,

    /// UID to run the entrypoint as
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_user: Option<i64>,

    /// Require a non-zero UID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_non_root: Option<bool>,

    /// Mount the root filesystem read-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_root_filesystem: Option<bool>,
}

/// Pod security context, applied to every container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSecurityContext {
    /// SELinux label
    #[serde(default, rename = "seLinuxOptions", skip_serializing_if = "Option::is_none")]
    pub selinux_options: Option<SELinuxOptions>,

    /// UID to run the entrypoint as
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_user: Option<i64>,

    /// Require a non-zero UID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_non_root: Option<bool>,

    /// Additional groups for the first process
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supplemental_groups: Vec<i64>,

    /// Group owning the pod's volumes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs_group: Option<i64>,
}

/// Linux capabilities to add and drop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Added capabilities
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add: Vec<String>,

    /// Dropped capabilities
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drop: Vec<String>,
}

/// SELinux label fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SELinuxOptions {
    /// SELinux user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// SELinux role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// SELinux type
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// SELinux level (MCS label)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl SELinuxOptions {
    /// Options that set only the level
    #[must_use]
    pub fn with_level(level: impl Into<String>) -> Self {
        Self {
            level: Some(level.into()),
            ..Self::default()
        }
    }
}
