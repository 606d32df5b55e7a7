//! Security context provider for a single constraint

use sccoc_core::{Container, Pod, PodSecurityContext, Result, SecurityContext};
use std::collections::BTreeMap;

use crate::constraints::{RunAsUserStrategyOptions, SecurityContextConstraints};
use crate::strategy::seccomp::SECCOMP_POD_ANNOTATION;
use crate::strategy::{
    CapabilitiesStrategy, GroupStrategy, RunAsUserStrategy, SELinuxStrategy, SeccompStrategy,
    group, selinux, user,
};
use crate::validation::{FieldError, child};

/// Applies one constraint to pods and containers
///
/// The constraint must already carry its namespace allocations; see
/// [`create_provider_from_constraint`](crate::create_provider_from_constraint).
#[derive(Debug)]
pub struct SimpleProvider {
    scc: SecurityContextConstraints,
    run_as_user: Box<dyn RunAsUserStrategy>,
    selinux: Box<dyn SELinuxStrategy>,
    fs_group: Box<dyn GroupStrategy>,
    supplemental_groups: Box<dyn GroupStrategy>,
    capabilities: CapabilitiesStrategy,
    seccomp: SeccompStrategy,
}

impl SimpleProvider {
    /// Build a provider and its strategies
    ///
    /// # Errors
    /// Returns error if a strategy cannot be built from the constraint
    pub fn new(scc: SecurityContextConstraints) -> Result<Self> {
        Ok(Self {
            run_as_user: user::from_options(&scc.run_as_user)?,
            selinux: selinux::from_options(&scc.selinux_context)?,
            fs_group: group::from_options(&scc.fs_group, "fsGroup")?,
            supplemental_groups: group::from_options(
                &scc.supplemental_groups,
                "supplementalGroups",
            )?,
            capabilities: CapabilitiesStrategy::from_constraint(&scc),
            seccomp: SeccompStrategy::new(&scc.seccomp_profiles),
            scc,
        })
    }

    /// Name of the constraint
    #[must_use]
    pub fn scc_name(&self) -> &str {
        &self.scc.name
    }

    /// The constraint with its allocations filled in
    #[must_use]
    pub const fn constraint(&self) -> &SecurityContextConstraints {
        &self.scc
    }

    /// Pod security context and annotations the constraint assigns
    ///
    /// Values the pod already sets are kept.
    #[must_use]
    pub fn create_pod_security_context(
        &self,
        pod: &Pod,
    ) -> (PodSecurityContext, BTreeMap<String, String>) {
        let mut psc = pod.spec.security_context.clone().unwrap_or_default();
        let mut annotations = pod.annotations.clone();

        if psc.supplemental_groups.is_empty() {
            psc.supplemental_groups = self.supplemental_groups.generate();
        }
        if psc.fs_group.is_none() {
            psc.fs_group = self.fs_group.generate_single();
        }
        if psc.selinux_options.is_none() {
            psc.selinux_options = self.selinux.generate();
        }
        if let Some(profile) = self.seccomp.generate(pod) {
            annotations.insert(SECCOMP_POD_ANNOTATION.to_string(), profile);
        }

        (psc, annotations)
    }

    /// Container security context the constraint assigns
    ///
    /// Container values take precedence, then pod values; only attributes
    /// unset in both are generated.
    #[must_use]
    pub fn create_container_security_context(
        &self,
        pod: &Pod,
        container: &Container,
    ) -> SecurityContext {
        let psc = pod.spec.security_context.as_ref();
        let mut sc = container.security_context.clone().unwrap_or_default();

        let effective_user = sc.run_as_user.or_else(|| psc.and_then(|p| p.run_as_user));
        if effective_user.is_none() {
            sc.run_as_user = self.run_as_user.generate();
        }

        let has_selinux = sc.selinux_options.is_some()
            || psc.is_some_and(|p| p.selinux_options.is_some());
        if !has_selinux {
            sc.selinux_options = self.selinux.generate();
        }

        if sc.privileged.is_none() {
            sc.privileged = Some(false);
        }

        // an explicitly requested UID is checked by validation instead
        let requested_user = sc.run_as_user.or_else(|| psc.and_then(|p| p.run_as_user));
        if matches!(self.scc.run_as_user, RunAsUserStrategyOptions::MustRunAsNonRoot)
            && requested_user.is_none()
        {
            sc.run_as_non_root = Some(true);
        }

        sc.capabilities = self.capabilities.generate(container);

        if self.scc.read_only_root_filesystem && sc.read_only_root_filesystem.is_none() {
            sc.read_only_root_filesystem = Some(true);
        }

        tracing::debug!(
            scc = %self.scc.name,
            container = %container.name,
            run_as_user = sc.run_as_user,
            "Generated container security context"
        );

        sc
    }

    /// Check a pod's own security context, host namespaces, and annotations
    #[must_use]
    pub fn validate_pod_security_context(&self, pod: &Pod, path: &str) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let sc_path = child(path, "securityContext");
        let psc = pod.spec.security_context.clone().unwrap_or_default();

        errors.extend(
            self.fs_group
                .validate_single(&child(&sc_path, "fsGroup"), psc.fs_group),
        );
        errors.extend(self.supplemental_groups.validate(
            &child(&sc_path, "supplementalGroups"),
            &psc.supplemental_groups,
        ));
        if let Some(options) = psc.selinux_options.as_ref() {
            errors.extend(
                self.selinux
                    .validate(&child(&sc_path, "seLinuxOptions"), Some(options)),
            );
        }
        errors.extend(self.seccomp.validate("metadata.annotations", pod));

        if !self.scc.allow_host_network && pod.spec.host_network {
            errors.push(FieldError::invalid(
                child(&sc_path, "hostNetwork"),
                true,
                "Host network is not allowed to be used",
            ));
        }
        if !self.scc.allow_host_pid && pod.spec.host_pid {
            errors.push(FieldError::invalid(
                child(&sc_path, "hostPID"),
                true,
                "Host PID is not allowed to be used",
            ));
        }
        if !self.scc.allow_host_ipc && pod.spec.host_ipc {
            errors.push(FieldError::invalid(
                child(&sc_path, "hostIPC"),
                true,
                "Host IPC is not allowed to be used",
            ));
        }

        errors
    }

    /// Check a container's effective security context
    #[must_use]
    pub fn validate_container_security_context(
        &self,
        pod: &Pod,
        container: &Container,
        path: &str,
    ) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let psc = pod.spec.security_context.as_ref();
        let sc = container.security_context.clone().unwrap_or_default();
        let sc_path = child(path, "securityContext");

        let run_as_user = sc.run_as_user.or_else(|| psc.and_then(|p| p.run_as_user));
        let run_as_non_root = sc
            .run_as_non_root
            .or_else(|| psc.and_then(|p| p.run_as_non_root));
        errors.extend(self.run_as_user.validate(
            &sc_path,
            &container.name,
            run_as_non_root,
            run_as_user,
        ));

        let selinux_options = sc
            .selinux_options
            .as_ref()
            .or_else(|| psc.and_then(|p| p.selinux_options.as_ref()));
        errors.extend(
            self.selinux
                .validate(&child(&sc_path, "seLinuxOptions"), selinux_options),
        );

        if !self.scc.allow_privileged_container && sc.privileged == Some(true) {
            errors.push(FieldError::invalid(
                child(&sc_path, "privileged"),
                true,
                "Privileged containers are not allowed",
            ));
        }

        errors.extend(
            self.capabilities
                .validate(&child(&sc_path, "capabilities"), container),
        );

        if !self.scc.allow_host_ports {
            for (i, port) in container.ports.iter().enumerate() {
                if let Some(host_port) = port.host_port.filter(|p| *p != 0) {
                    errors.push(FieldError::invalid(
                        format!("{path}.ports[{i}].hostPort"),
                        host_port,
                        "Host ports are not allowed to be used",
                    ));
                }
            }
        }

        if self.scc.read_only_root_filesystem {
            let field = child(&sc_path, "readOnlyRootFilesystem");
            match sc.read_only_root_filesystem {
                None => errors.push(FieldError::required(
                    field,
                    "ReadOnlyRootFilesystem may not be nil and must be set to true",
                )),
                Some(false) => errors.push(FieldError::invalid(
                    field,
                    false,
                    "ReadOnlyRootFilesystem must be set to true",
                )),
                Some(true) => {}
            }
        }

        errors
    }
}
