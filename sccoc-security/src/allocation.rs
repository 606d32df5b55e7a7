//! Filling constraint strategies from namespace allocations

use sccoc_core::{Error, IdRange, McsLabel, Namespace, Result, SELinuxOptions, UidBlock};
use sccoc_namespace::{
    MCS_ANNOTATION, NamespaceStore, SUPPLEMENTAL_GROUPS_ANNOTATION, UID_RANGE_ANNOTATION,
};

use crate::constraints::{
    GroupStrategyOptions, RunAsUserStrategyOptions, SELinuxContextStrategyOptions,
    SecurityContextConstraints,
};
use crate::provider::SimpleProvider;

fn needs_user(scc: &SecurityContextConstraints) -> bool {
    matches!(
        scc.run_as_user,
        RunAsUserStrategyOptions::MustRunAs { uid: None }
            | RunAsUserStrategyOptions::MustRunAsRange {
                uid_range_min: None,
                ..
            }
    )
}

fn needs_level(scc: &SecurityContextConstraints) -> bool {
    match &scc.selinux_context {
        SELinuxContextStrategyOptions::MustRunAs { selinux_options } => selinux_options
            .as_ref()
            .is_none_or(|o| o.level.as_deref().unwrap_or_default().is_empty()),
        SELinuxContextStrategyOptions::RunAsAny => false,
    }
}

fn needs_ranges(opts: &GroupStrategyOptions) -> bool {
    matches!(opts, GroupStrategyOptions::MustRunAs { ranges } if ranges.is_empty())
}

fn annotation<'a>(namespace: &'a Namespace, key: &str) -> Result<&'a str> {
    namespace
        .annotation(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Allocation {
            annotation: key.to_string(),
            message: format!("namespace {:?} has no value", namespace.name),
        })
}

fn parse_block(key: &str, value: &str) -> Result<UidBlock> {
    value.trim().parse().map_err(|e: Error| Error::Allocation {
        annotation: key.to_string(),
        message: e.to_string(),
    })
}

/// UID block pre-allocated to the namespace
///
/// # Errors
/// Returns [`Error::Allocation`] if the annotation is missing or malformed
pub fn preallocated_uid_block(namespace: &Namespace) -> Result<UidBlock> {
    let value = annotation(namespace, UID_RANGE_ANNOTATION)?;
    parse_block(UID_RANGE_ANNOTATION, value)
}

/// MCS level pre-allocated to the namespace
///
/// # Errors
/// Returns [`Error::Allocation`] if the annotation is missing or malformed
pub fn preallocated_level(namespace: &Namespace) -> Result<String> {
    let value = annotation(namespace, MCS_ANNOTATION)?;
    value
        .parse::<McsLabel>()
        .map_err(|e| Error::Allocation {
            annotation: MCS_ANNOTATION.to_string(),
            message: e.to_string(),
        })?;
    Ok(value.to_string())
}

/// Group blocks pre-allocated to the namespace
///
/// Falls back to the UID range when the namespace has no
/// supplemental-groups annotation.
///
/// # Errors
/// Returns [`Error::Allocation`] if neither annotation is usable
pub fn preallocated_group_blocks(namespace: &Namespace) -> Result<Vec<UidBlock>> {
    let (key, value) = match annotation(namespace, SUPPLEMENTAL_GROUPS_ANNOTATION) {
        Ok(value) => (SUPPLEMENTAL_GROUPS_ANNOTATION, value),
        Err(_) => {
            tracing::debug!(
                namespace = %namespace.name,
                "No supplemental groups annotation, falling back to UID range"
            );
            (UID_RANGE_ANNOTATION, annotation(namespace, UID_RANGE_ANNOTATION)?)
        }
    };

    let blocks = value
        .split(',')
        .filter(|b| !b.trim().is_empty())
        .map(|b| parse_block(key, b))
        .collect::<Result<Vec<_>>>()?;

    if blocks.is_empty() {
        return Err(Error::Allocation {
            annotation: key.to_string(),
            message: "no blocks defined".to_string(),
        });
    }
    Ok(blocks)
}

/// fsGroup range: the first ID of the first group block
///
/// # Errors
/// Returns [`Error::Allocation`] if no group block is allocated
pub fn preallocated_fs_group(namespace: &Namespace) -> Result<Vec<IdRange>> {
    let blocks = preallocated_group_blocks(namespace)?;
    Ok(blocks
        .first()
        .map(|b| IdRange::single(b.start()))
        .into_iter()
        .collect())
}

/// Supplemental group ranges: every allocated group block
///
/// # Errors
/// Returns [`Error::Allocation`] if no group block is allocated
pub fn preallocated_supplemental_groups(namespace: &Namespace) -> Result<Vec<IdRange>> {
    Ok(preallocated_group_blocks(namespace)?
        .iter()
        .map(UidBlock::range)
        .collect())
}

/// Build a provider for a constraint, filling any strategy that needs
/// namespace allocations
///
/// `namespace` is used when given; otherwise it is fetched from `store` by
/// `namespace_name`, and only when some strategy needs it. The constraint
/// itself is left untouched. Returns the provider and the namespace that
/// was consulted, if any.
///
/// # Errors
/// Returns error if the namespace cannot be fetched, an allocation is
/// missing or malformed, or a strategy cannot be built
pub async fn create_provider_from_constraint(
    namespace_name: &str,
    namespace: Option<&Namespace>,
    scc: &SecurityContextConstraints,
    store: &dyn NamespaceStore,
) -> Result<(SimpleProvider, Option<Namespace>)> {
    let needs_allocation = needs_user(scc)
        || needs_level(scc)
        || needs_ranges(&scc.fs_group)
        || needs_ranges(&scc.supplemental_groups);

    let mut scc = scc.clone();
    let mut used = namespace.cloned();

    if needs_allocation {
        let ns = match used.take() {
            Some(ns) => ns,
            None => store.get(namespace_name).await?,
        };

        if needs_user(&scc) {
            let block = preallocated_uid_block(&ns)?;
            scc.run_as_user = match scc.run_as_user {
                RunAsUserStrategyOptions::MustRunAs { .. } => RunAsUserStrategyOptions::MustRunAs {
                    uid: Some(block.start()),
                },
                _ => RunAsUserStrategyOptions::MustRunAsRange {
                    uid_range_min: Some(block.start()),
                    uid_range_max: Some(block.end()),
                },
            };
        }

        if needs_level(&scc) {
            let level = preallocated_level(&ns)?;
            let options = match scc.selinux_context {
                SELinuxContextStrategyOptions::MustRunAs {
                    selinux_options: Some(options),
                } => SELinuxOptions {
                    level: Some(level),
                    ..options
                },
                _ => SELinuxOptions::with_level(level),
            };
            scc.selinux_context = SELinuxContextStrategyOptions::MustRunAs {
                selinux_options: Some(options),
            };
        }

        if needs_ranges(&scc.fs_group) {
            scc.fs_group = GroupStrategyOptions::MustRunAs {
                ranges: preallocated_fs_group(&ns)?,
            };
        }

        if needs_ranges(&scc.supplemental_groups) {
            scc.supplemental_groups = GroupStrategyOptions::MustRunAs {
                ranges: preallocated_supplemental_groups(&ns)?,
            };
        }

        tracing::debug!(scc = %scc.name, namespace = %ns.name, "Applied namespace allocations");
        used = Some(ns);
    }

    Ok((SimpleProvider::new(scc)?, used))
}
