//! The constraint set a freshly bootstrapped cluster ships with

use sccoc_core::{Error, Result};
use std::collections::BTreeMap;

use crate::constraints::{
    ALLOW_ALL, GroupStrategyOptions, RunAsUserStrategyOptions, SELinuxContextStrategyOptions,
    SecurityContextConstraints, TRIVIAL_VOLUMES,
};

/// Most permissive constraint
pub const PRIVILEGED: &str = "privileged";
/// Restricted, but any non-root UID
pub const NON_ROOT: &str = "nonroot";
/// Restricted, but host mounts and any UID
pub const HOST_MOUNT_ANY_UID: &str = "hostmount-anyuid";
/// Host namespaces with namespace-allocated UID and label
pub const HOST_ACCESS: &str = "hostaccess";
/// Default for authenticated users
pub const RESTRICTED: &str = "restricted";
/// Restricted, but any UID
pub const ANY_UID: &str = "anyuid";
/// Host network and ports with namespace-allocated UID and label
pub const HOST_NETWORK: &str = "hostnetwork";

const CLUSTER_ADMIN_GROUP: &str = "system:cluster-admins";
const NODES_GROUP: &str = "system:nodes";
const MASTERS_GROUP: &str = "system:masters";
const AUTHENTICATED_GROUP: &str = "system:authenticated";
const SYSTEM_ADMIN_USER: &str = "system:admin";
const BUILD_CONTROLLER_SA: &str = "build-controller";
const PV_RECYCLER_USER: &str = "system:serviceaccount:openshift-infra:pv-recycler-controller";

/// Service account pods run as when they name none
pub const DEFAULT_SERVICE_ACCOUNT: &str = "default";
/// Priority given to a constraint preferred for a service account
pub const PREFERRED_PRIORITY: i32 = 1;

const DROP_RESTRICTED: [&str; 4] = ["KILL", "MKNOD", "SETUID", "SETGID"];
const DROP_ANY_UID: [&str; 1] = ["MKNOD"];

/// Bootstrap access: constraint name to granted groups and users
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapAccess {
    /// Groups per constraint
    pub groups: BTreeMap<String, Vec<String>>,
    /// Users per constraint
    pub users: BTreeMap<String, Vec<String>>,
}

/// Default access grants for the bootstrap constraints
///
/// `infra_namespace` is the namespace the build controller service
/// account lives in.
#[must_use]
pub fn bootstrap_access(infra_namespace: &str) -> BootstrapAccess {
    let mut access = BootstrapAccess::default();

    access.groups.insert(
        PRIVILEGED.to_string(),
        strings(&[CLUSTER_ADMIN_GROUP, NODES_GROUP, MASTERS_GROUP]),
    );
    access
        .groups
        .insert(RESTRICTED.to_string(), strings(&[AUTHENTICATED_GROUP]));
    access
        .groups
        .insert(ANY_UID.to_string(), strings(&[CLUSTER_ADMIN_GROUP]));

    access.users.insert(
        PRIVILEGED.to_string(),
        vec![
            SYSTEM_ADMIN_USER.to_string(),
            service_account_user(infra_namespace, BUILD_CONTROLLER_SA),
        ],
    );
    access
        .users
        .insert(HOST_MOUNT_ANY_UID.to_string(), strings(&[PV_RECYCLER_USER]));

    access
}

/// The seven bootstrap constraints, in bootstrap order
#[must_use]
pub fn bootstrap_constraints(infra_namespace: &str) -> Vec<SecurityContextConstraints> {
    bootstrap_constraints_with_access(&bootstrap_access(infra_namespace))
}

/// The bootstrap constraints with explicit access grants
#[must_use]
pub fn bootstrap_constraints_with_access(
    access: &BootstrapAccess,
) -> Vec<SecurityContextConstraints> {
    let mut constraints = vec![
        SecurityContextConstraints {
            description: "privileged allows access to all privileged and host features and \
                the ability to run as any user, any group, any fsGroup, and with any SELinux \
                context.  WARNING: this is the most relaxed SCC and should be used only for \
                cluster administration. Grant with caution."
                .to_string(),
            allow_privileged_container: true,
            required_drop_capabilities: Vec::new(),
            allowed_capabilities: strings(&[ALLOW_ALL]),
            allow_host_dir_volume_plugin: true,
            volumes: strings(&[ALLOW_ALL]),
            allow_host_network: true,
            allow_host_ports: true,
            allow_host_pid: true,
            allow_host_ipc: true,
            run_as_user: RunAsUserStrategyOptions::RunAsAny,
            selinux_context: SELinuxContextStrategyOptions::RunAsAny,
            fs_group: GroupStrategyOptions::RunAsAny,
            supplemental_groups: GroupStrategyOptions::RunAsAny,
            seccomp_profiles: strings(&[ALLOW_ALL]),
            ..restricted_base(PRIVILEGED)
        },
        SecurityContextConstraints {
            description: "nonroot provides all features of the restricted SCC but allows \
                users to run with any non-root UID.  The user must specify the UID or it must \
                be specified on the by the manifest of the container runtime."
                .to_string(),
            run_as_user: RunAsUserStrategyOptions::MustRunAsNonRoot,
            fs_group: GroupStrategyOptions::RunAsAny,
            ..restricted_base(NON_ROOT)
        },
        SecurityContextConstraints {
            description: "hostmount-anyuid provides all the features of the restricted SCC \
                but allows host mounts and any UID by a pod.  This is primarily used by the \
                persistent volume recycler. WARNING: this SCC allows host file system access \
                as any UID, including UID 0.  Grant with caution."
                .to_string(),
            allow_host_dir_volume_plugin: true,
            volumes: with_host_path(&["nfs"]),
            run_as_user: RunAsUserStrategyOptions::RunAsAny,
            fs_group: GroupStrategyOptions::RunAsAny,
            required_drop_capabilities: strings(&DROP_ANY_UID),
            ..restricted_base(HOST_MOUNT_ANY_UID)
        },
        SecurityContextConstraints {
            description: "hostaccess allows access to all host namespaces but still requires \
                pods to be run with a UID and SELinux context that are allocated to the \
                namespace. WARNING: this SCC allows host access to namespaces, file systems, \
                and PIDS.  It should only be used by trusted pods.  Grant with caution."
                .to_string(),
            allow_host_dir_volume_plugin: true,
            volumes: with_host_path(&[]),
            allow_host_network: true,
            allow_host_ports: true,
            allow_host_pid: true,
            allow_host_ipc: true,
            ..restricted_base(HOST_ACCESS)
        },
        SecurityContextConstraints {
            description: "restricted denies access to all host features and requires pods to \
                be run with a UID, and SELinux context that are allocated to the namespace.  \
                This is the most restrictive SCC."
                .to_string(),
            ..restricted_base(RESTRICTED)
        },
        SecurityContextConstraints {
            description: "anyuid provides all features of the restricted SCC but allows users \
                to run with any UID and any GID."
                .to_string(),
            priority: Some(10),
            run_as_user: RunAsUserStrategyOptions::RunAsAny,
            fs_group: GroupStrategyOptions::RunAsAny,
            required_drop_capabilities: strings(&DROP_ANY_UID),
            ..restricted_base(ANY_UID)
        },
        SecurityContextConstraints {
            description: "hostnetwork allows using host networking and host ports but still \
                requires pods to be run with a UID and SELinux context that are allocated to \
                the namespace."
                .to_string(),
            allow_host_network: true,
            allow_host_ports: true,
            supplemental_groups: GroupStrategyOptions::unallocated(),
            ..restricted_base(HOST_NETWORK)
        },
    ];

    for constraint in &mut constraints {
        if let Some(groups) = access.groups.get(&constraint.name) {
            constraint.groups.clone_from(groups);
        }
        if let Some(users) = access.users.get(&constraint.name) {
            constraint.users.clone_from(users);
        }
    }

    constraints
}

/// Names of the constraints, in order
#[must_use]
pub fn constraint_names(constraints: &[SecurityContextConstraints]) -> Vec<&str> {
    constraints.iter().map(|c| c.name.as_str()).collect()
}

/// Find a constraint by name
#[must_use]
pub fn find<'a>(
    constraints: &'a [SecurityContextConstraints],
    name: &str,
) -> Option<&'a SecurityContextConstraints> {
    constraints.iter().find(|c| c.name == name)
}

/// User name of a namespace's default service account
#[must_use]
pub fn default_service_account(namespace: &str) -> String {
    service_account_user(namespace, DEFAULT_SERVICE_ACCOUNT)
}

/// Make `name` the constraint pods of `namespace` are admitted under
///
/// Grants it to the namespace's default service account and raises its
/// priority to [`PREFERRED_PRIORITY`]. `restricted` and `anyuid` are left
/// untouched. Returns whether anything changed.
///
/// # Errors
/// Returns [`Error::NotFound`] if no constraint has that name
pub fn prefer_for_service_account(
    constraints: &mut [SecurityContextConstraints],
    name: &str,
    namespace: &str,
) -> Result<bool> {
    let scc = constraints
        .iter_mut()
        .find(|c| c.name == name)
        .ok_or_else(|| Error::NotFound {
            kind: "securitycontextconstraints",
            name: name.to_string(),
        })?;
    if name == RESTRICTED || name == ANY_UID {
        return Ok(false);
    }

    scc.priority = Some(PREFERRED_PRIORITY);
    let user = default_service_account(namespace);
    if !scc.users.contains(&user) {
        tracing::debug!(scc = %name, user = %user, "Granting constraint");
        scc.users.push(user);
    }
    Ok(true)
}

/// Take `anyuid` away from cluster admins unless it is the `chosen` one
///
/// Returns whether the grant was removed.
pub fn revoke_cluster_admin_anyuid(
    constraints: &mut [SecurityContextConstraints],
    chosen: &str,
) -> bool {
    if chosen == ANY_UID {
        return false;
    }
    let Some(anyuid) = constraints.iter_mut().find(|c| c.name == ANY_UID) else {
        return false;
    };

    let before = anyuid.groups.len();
    anyuid.groups.retain(|g| g != CLUSTER_ADMIN_GROUP);
    let removed = anyuid.groups.len() != before;
    if removed {
        tracing::debug!(group = CLUSTER_ADMIN_GROUP, "Revoked anyuid");
    }
    removed
}

fn restricted_base(name: &str) -> SecurityContextConstraints {
    SecurityContextConstraints {
        name: name.to_string(),
        description: String::new(),
        priority: None,
        allow_privileged_container: false,
        default_add_capabilities: Vec::new(),
        required_drop_capabilities: strings(&DROP_RESTRICTED),
        allowed_capabilities: Vec::new(),
        allow_host_dir_volume_plugin: false,
        volumes: strings(&TRIVIAL_VOLUMES),
        allow_host_network: false,
        allow_host_ports: false,
        allow_host_pid: false,
        allow_host_ipc: false,
        run_as_user: RunAsUserStrategyOptions::unallocated_range(),
        selinux_context: SELinuxContextStrategyOptions::unallocated(),
        supplemental_groups: GroupStrategyOptions::RunAsAny,
        fs_group: GroupStrategyOptions::unallocated(),
        read_only_root_filesystem: false,
        seccomp_profiles: Vec::new(),
        users: Vec::new(),
        groups: Vec::new(),
    }
}

fn with_host_path(extra: &[&str]) -> Vec<String> {
    let mut volumes = strings(&TRIVIAL_VOLUMES);
    volumes.push("hostPath".to_string());
    volumes.extend(strings(extra));
    volumes.sort();
    volumes
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

fn service_account_user(namespace: &str, name: &str) -> String {
    format!("system:serviceaccount:{namespace}:{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_order() {
        let constraints = bootstrap_constraints("openshift-infra");
        assert_eq!(
            constraint_names(&constraints),
            [
                "privileged",
                "nonroot",
                "hostmount-anyuid",
                "hostaccess",
                "restricted",
                "anyuid",
                "hostnetwork"
            ]
        );
    }

    #[test]
    fn test_prefer_for_service_account() {
        let mut constraints = bootstrap_constraints("infra");

        assert!(prefer_for_service_account(&mut constraints, HOST_NETWORK, "tmpabc").unwrap());
        let hostnetwork = find(&constraints, HOST_NETWORK).unwrap();
        assert_eq!(hostnetwork.priority, Some(1));
        assert_eq!(hostnetwork.users, ["system:serviceaccount:tmpabc:default"]);

        // granting twice does not duplicate the user
        prefer_for_service_account(&mut constraints, HOST_NETWORK, "tmpabc").unwrap();
        assert_eq!(find(&constraints, HOST_NETWORK).unwrap().users.len(), 1);
    }

    #[test]
    fn test_prefer_skips_defaults() {
        let mut constraints = bootstrap_constraints("infra");
        let before = constraints.clone();

        assert!(!prefer_for_service_account(&mut constraints, RESTRICTED, "ns").unwrap());
        assert!(!prefer_for_service_account(&mut constraints, ANY_UID, "ns").unwrap());
        assert_eq!(constraints, before);

        let err = prefer_for_service_account(&mut constraints, "bogus", "ns").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_revoke_cluster_admin_anyuid() {
        let mut constraints = bootstrap_constraints("infra");

        assert!(!revoke_cluster_admin_anyuid(&mut constraints, ANY_UID));
        assert_eq!(find(&constraints, ANY_UID).unwrap().groups, [CLUSTER_ADMIN_GROUP]);

        assert!(revoke_cluster_admin_anyuid(&mut constraints, PRIVILEGED));
        assert!(find(&constraints, ANY_UID).unwrap().groups.is_empty());
        assert!(!revoke_cluster_admin_anyuid(&mut constraints, PRIVILEGED));
    }

    #[test]
    fn test_find() {
        let constraints = bootstrap_constraints("openshift-infra");
        assert_eq!(find(&constraints, "anyuid").unwrap().priority, Some(10));
        assert!(find(&constraints, "bogus").is_none());
    }

    #[test]
    fn test_restricted_shape() {
        let constraints = bootstrap_constraints("openshift-infra");
        let restricted = find(&constraints, RESTRICTED).unwrap();

        assert!(!restricted.allow_privileged_container);
        assert_eq!(
            restricted.required_drop_capabilities,
            ["KILL", "MKNOD", "SETUID", "SETGID"]
        );
        assert_eq!(restricted.run_as_user, RunAsUserStrategyOptions::unallocated_range());
        assert_eq!(restricted.fs_group, GroupStrategyOptions::unallocated());
        assert_eq!(restricted.supplemental_groups, GroupStrategyOptions::RunAsAny);
        assert_eq!(restricted.groups, ["system:authenticated"]);
        assert!(!restricted.allows_volume("hostPath"));
    }

    #[test]
    fn test_privileged_access() {
        let constraints = bootstrap_constraints("infra");
        let privileged = find(&constraints, PRIVILEGED).unwrap();

        assert!(privileged.allow_privileged_container);
        assert!(privileged.allows_volume("hostPath"));
        assert!(privileged.users.contains(&"system:admin".to_string()));
        assert!(
            privileged
                .users
                .contains(&"system:serviceaccount:infra:build-controller".to_string())
        );
        assert_eq!(privileged.seccomp_profiles, ["*"]);
    }

    #[test]
    fn test_host_features() {
        let constraints = bootstrap_constraints("openshift-infra");

        let hostnetwork = find(&constraints, HOST_NETWORK).unwrap();
        assert!(hostnetwork.allow_host_network && hostnetwork.allow_host_ports);
        assert!(!hostnetwork.allow_host_pid);
        assert_eq!(
            hostnetwork.supplemental_groups,
            GroupStrategyOptions::unallocated()
        );

        let hostaccess = find(&constraints, HOST_ACCESS).unwrap();
        assert!(hostaccess.allow_host_pid && hostaccess.allow_host_ipc);
        assert!(hostaccess.allows_volume("hostPath"));

        let hostmount = find(&constraints, HOST_MOUNT_ANY_UID).unwrap();
        assert!(hostmount.allows_volume("nfs"));
        assert_eq!(hostmount.users, [PV_RECYCLER_USER]);
    }

    #[test]
    fn test_constraints_without_access() {
        let constraints = bootstrap_constraints_with_access(&BootstrapAccess::default());
        assert!(constraints.iter().all(|c| c.users.is_empty() && c.groups.is_empty()));
    }
}
