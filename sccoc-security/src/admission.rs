//! Choosing the constraint a pod runs under

use sccoc_core::{Error, Namespace, Pod, Result};
use sccoc_namespace::NamespaceStore;
use std::cmp::Reverse;

use crate::allocation::create_provider_from_constraint;
use crate::constraints::SecurityContextConstraints;
use crate::provider::SimpleProvider;
use crate::validation::{FieldError, child, index, join};

/// Pod annotation naming the constraint that admitted it
pub const SCC_ANNOTATION: &str = "openshift.io/scc";

/// Identity a pod is admitted for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfo {
    /// User name
    pub name: String,
    /// Groups the user belongs to
    pub groups: Vec<String>,
}

impl UserInfo {
    /// Create a user with no groups
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    /// Add a group
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }
}

/// A pod with its security contexts filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admitted {
    /// The mutated pod
    pub pod: Pod,
    /// Name of the constraint it validated against
    pub scc: String,
}

/// Order constraints: higher priority first (unset counts as zero), then
/// fewer permitted features, then name
pub fn sort_constraints(constraints: &mut [SecurityContextConstraints]) {
    constraints.sort_by(|a, b| {
        let key = |c: &SecurityContextConstraints| {
            (Reverse(c.priority.unwrap_or(0)), c.restriction_points())
        };
        key(a).cmp(&key(b)).then_with(|| a.name.cmp(&b.name))
    });
}

/// Apply a provider to a copy of the pod and validate the result
#[must_use]
pub fn apply(provider: &SimpleProvider, pod: &Pod) -> (Pod, Vec<FieldError>) {
    let mut pod = pod.clone();

    let (psc, annotations) = provider.create_pod_security_context(&pod);
    pod.spec.security_context = Some(psc);
    pod.annotations = annotations;

    let contexts: Vec<_> = pod
        .spec
        .containers
        .iter()
        .map(|c| provider.create_container_security_context(&pod, c))
        .collect();
    for (container, sc) in pod.spec.containers.iter_mut().zip(contexts) {
        container.security_context = Some(sc);
    }

    let mut errors = provider.validate_pod_security_context(&pod, "spec");
    let containers_path = child("spec", "containers");
    for (i, container) in pod.spec.containers.iter().enumerate() {
        errors.extend(provider.validate_container_security_context(
            &pod,
            container,
            &index(&containers_path, i),
        ));
    }

    (pod, errors)
}

/// Admit a pod against the first constraint it validates under
///
/// Only constraints granted to `user` are tried; `None` tries them all.
/// The namespace is taken from `namespace` or fetched from `store` by the
/// pod's namespace name.
///
/// # Errors
/// Returns [`Error::Forbidden`] if no constraint applies or none validates
pub async fn admit(
    pod: &Pod,
    namespace: Option<&Namespace>,
    constraints: &[SecurityContextConstraints],
    user: Option<&UserInfo>,
    store: &dyn NamespaceStore,
) -> Result<Admitted> {
    let mut candidates: Vec<_> = constraints
        .iter()
        .filter(|c| user.is_none_or(|u| c.grants(&u.name, &u.groups)))
        .cloned()
        .collect();

    if candidates.is_empty() {
        return Err(Error::Forbidden {
            message: "no providers available to validate pod request".to_string(),
        });
    }
    sort_constraints(&mut candidates);

    let mut failures = Vec::new();
    for scc in &candidates {
        let provider =
            match create_provider_from_constraint(&pod.namespace, namespace, scc, store).await {
                Ok((provider, _)) => provider,
                Err(e) => {
                    tracing::warn!(scc = %scc.name, error = %e, "Unable to create provider");
                    failures.push(format!("provider {}: {e}", scc.name));
                    continue;
                }
            };

        let (mut admitted, errors) = apply(&provider, pod);
        if errors.is_empty() {
            tracing::info!(pod = %pod.name, scc = %scc.name, "Pod validated");
            admitted
                .annotations
                .insert(SCC_ANNOTATION.to_string(), scc.name.clone());
            return Ok(Admitted {
                pod: admitted,
                scc: scc.name.clone(),
            });
        }

        tracing::debug!(
            pod = %pod.name,
            scc = %scc.name,
            errors = errors.len(),
            "Pod rejected"
        );
        failures.push(format!("provider {}: {}", scc.name, join(&errors)));
    }

    Err(Error::Forbidden {
        message: format!("[{}]", failures.join("; ")),
    })
}
