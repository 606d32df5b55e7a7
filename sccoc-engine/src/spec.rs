//! Translating security contexts into engine settings

use sccoc_core::{Container, Pod, SELinuxOptions};
use sccoc_security::strategy::seccomp::SECCOMP_POD_ANNOTATION;
use serde::Serialize;

const HOST_MODE: &str = "host";
const UNCONFINED: &str = "unconfined";

/// Everything the engine needs to run one container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSpec {
    /// Image reference
    pub image: String,
    /// Command and arguments; empty runs the image default
    pub command: Vec<String>,
    /// Numeric user ID
    pub user: Option<String>,
    /// Additional groups
    pub group_add: Vec<String>,
    /// Capabilities to add
    pub cap_add: Vec<String>,
    /// Capabilities to drop
    pub cap_drop: Vec<String>,
    /// Run privileged
    pub privileged: bool,
    /// Mount the root filesystem read-only
    pub readonly_rootfs: bool,
    /// Engine security options (`label=...`, `seccomp=...`)
    pub security_opt: Vec<String>,
    /// Network namespace mode
    pub network_mode: Option<String>,
    /// PID namespace mode
    pub pid_mode: Option<String>,
    /// IPC namespace mode
    pub ipc_mode: Option<String>,
}

impl RunSpec {
    /// Build the run settings for a container of an admitted pod
    ///
    /// Container security context values win over pod values. The fsGroup
    /// joins the supplemental groups; the primary group stays the image
    /// default.
    #[must_use]
    pub fn from_container(container: &Container, pod: &Pod) -> Self {
        let sc = container.security_context.clone().unwrap_or_default();
        let psc = pod.spec.security_context.clone().unwrap_or_default();

        let user = sc
            .run_as_user
            .or(psc.run_as_user)
            .map(|uid| uid.to_string());

        let mut group_add: Vec<String> = psc
            .supplemental_groups
            .iter()
            .map(ToString::to_string)
            .collect();
        if let Some(gid) = psc.fs_group {
            group_add.push(gid.to_string());
        }
        group_add.sort();
        group_add.dedup();

        let caps = sc.capabilities.unwrap_or_default();

        let mut security_opt = sc
            .selinux_options
            .as_ref()
            .or(psc.selinux_options.as_ref())
            .map(selinux_labels)
            .unwrap_or_default();
        match pod.annotation(SECCOMP_POD_ANNOTATION) {
            Some(UNCONFINED) => security_opt.push(format!("seccomp={UNCONFINED}")),
            Some(profile) if !profile.is_empty() => {
                tracing::warn!(profile, "Seccomp profile not applied, using engine default");
            }
            _ => {}
        }

        let host = |enabled: bool| enabled.then(|| HOST_MODE.to_string());

        Self {
            image: container.image.clone(),
            command: container.command.clone(),
            user,
            group_add,
            cap_add: caps.add,
            cap_drop: caps.drop,
            privileged: sc.privileged.unwrap_or(false),
            readonly_rootfs: sc.read_only_root_filesystem.unwrap_or(false),
            security_opt,
            network_mode: host(pod.spec.host_network),
            pid_mode: host(pod.spec.host_pid),
            ipc_mode: host(pod.spec.host_ipc),
        }
    }

    /// Replace the command
    #[must_use]
    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }
}

fn selinux_labels(options: &SELinuxOptions) -> Vec<String> {
    [
        ("user", &options.user),
        ("role", &options.role),
        ("type", &options.type_),
        ("level", &options.level),
    ]
    .into_iter()
    .filter_map(|(key, value)| {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(|v| format!("label={key}:{v}"))
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sccoc_core::{Capabilities, PodSecurityContext, PodSpec, SecurityContext};

    fn pod_with(container: Container, psc: PodSecurityContext) -> Pod {
        Pod {
            name: "tmp".to_string(),
            spec: PodSpec {
                containers: vec![container],
                security_context: Some(psc),
                ..PodSpec::default()
            },
            ..Pod::default()
        }
    }

    #[test]
    fn test_restricted_translation() {
        let container = Container {
            name: "tmp".to_string(),
            image: "centos".to_string(),
            command: vec!["echo".to_string(), "hi".to_string()],
            security_context: Some(SecurityContext {
                run_as_user: Some(1_000_100_000),
                privileged: Some(false),
                capabilities: Some(Capabilities {
                    add: Vec::new(),
                    drop: vec!["KILL".to_string(), "MKNOD".to_string()],
                }),
                ..SecurityContext::default()
            }),
            ..Container::default()
        };
        let psc = PodSecurityContext {
            fs_group: Some(1_000_100_000),
            selinux_options: Some(SELinuxOptions::with_level("s9:z0,z1")),
            ..PodSecurityContext::default()
        };
        let pod = pod_with(container.clone(), psc);

        let spec = RunSpec::from_container(&container, &pod);
        assert_eq!(spec.image, "centos");
        assert_eq!(spec.command, ["echo", "hi"]);
        assert_eq!(spec.user.as_deref(), Some("1000100000"));
        assert_eq!(spec.group_add, ["1000100000"]);
        assert_eq!(spec.cap_drop, ["KILL", "MKNOD"]);
        assert!(!spec.privileged);
        assert_eq!(spec.security_opt, ["label=level:s9:z0,z1"]);
        assert_eq!(spec.network_mode, None);
    }

    #[test]
    fn test_fs_group_without_uid() {
        let container = Container::default();
        let psc = PodSecurityContext {
            fs_group: Some(5000),
            supplemental_groups: vec![6000, 5000],
            ..PodSecurityContext::default()
        };
        let pod = pod_with(container.clone(), psc);

        let spec = RunSpec::from_container(&container, &pod);
        assert_eq!(spec.user, None);
        assert_eq!(spec.group_add, ["5000", "6000"]);
    }

    #[test]
    fn test_host_namespaces_and_seccomp() {
        let container = Container {
            security_context: Some(SecurityContext {
                privileged: Some(true),
                read_only_root_filesystem: Some(true),
                selinux_options: Some(SELinuxOptions {
                    type_: Some("spc_t".to_string()),
                    ..SELinuxOptions::default()
                }),
                ..SecurityContext::default()
            }),
            ..Container::default()
        };
        let mut pod = pod_with(container.clone(), PodSecurityContext::default());
        pod.spec.host_network = true;
        pod.spec.host_pid = true;
        pod.spec.host_ipc = true;
        pod.annotations
            .insert(SECCOMP_POD_ANNOTATION.to_string(), "unconfined".to_string());

        let spec = RunSpec::from_container(&container, &pod);
        assert!(spec.privileged);
        assert!(spec.readonly_rootfs);
        assert_eq!(spec.security_opt, ["label=type:spc_t", "seccomp=unconfined"]);
        assert_eq!(spec.network_mode.as_deref(), Some("host"));
        assert_eq!(spec.pid_mode.as_deref(), Some("host"));
        assert_eq!(spec.ipc_mode.as_deref(), Some("host"));
    }

    #[test]
    fn test_uid_with_fs_group_and_supplemental() {
        let container = Container {
            security_context: Some(SecurityContext {
                run_as_user: Some(1000),
                ..SecurityContext::default()
            }),
            ..Container::default()
        };
        let psc = PodSecurityContext {
            run_as_user: Some(2000),
            fs_group: Some(3000),
            supplemental_groups: vec![4000],
            ..PodSecurityContext::default()
        };
        let pod = pod_with(container.clone(), psc);

        let spec = RunSpec::from_container(&container, &pod);
        assert_eq!(spec.user.as_deref(), Some("1000"));
        assert_eq!(spec.group_add, ["3000", "4000"]);
    }

    #[test]
    fn test_serializes_for_report() {
        let spec = RunSpec {
            image: "centos".to_string(),
            user: Some("1000".to_string()),
            group_add: vec!["1000".to_string()],
            network_mode: Some("host".to_string()),
            ..RunSpec::default()
        };

        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["image"], "centos");
        assert_eq!(value["user"], "1000");
        assert_eq!(value["group_add"], serde_json::json!(["1000"]));
        assert_eq!(value["network_mode"], "host");
        assert_eq!(value["pid_mode"], serde_json::Value::Null);
        assert_eq!(value["privileged"], false);
    }

    #[test]
    fn test_with_command() {
        let spec = RunSpec::default().with_command(vec!["id".to_string()]);
        assert_eq!(spec.command, ["id"]);
    }
}
