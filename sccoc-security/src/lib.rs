//! Security context constraints
//!
//! This crate provides:
//! - The bootstrap constraint set and its access grants
//! - Per-attribute strategies (user, SELinux, groups, capabilities, seccomp)
//! - Namespace pre-allocation of UID ranges, MCS levels, and groups
//! - A provider that generates and validates pod and container contexts
//! - Admission: picking the first constraint a pod validates under

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod admission;
pub mod allocation;
pub mod bootstrap;
pub mod constraints;
pub mod provider;
pub mod strategy;
pub mod validation;

pub use admission::{Admitted, SCC_ANNOTATION, UserInfo, admit, sort_constraints};
pub use allocation::create_provider_from_constraint;
pub use bootstrap::{
    BootstrapAccess, bootstrap_access, bootstrap_constraints, constraint_names,
    default_service_account, prefer_for_service_account, revoke_cluster_admin_anyuid,
};
pub use constraints::{
    GroupStrategyOptions, RunAsUserStrategyOptions, SELinuxContextStrategyOptions,
    SecurityContextConstraints,
};
pub use provider::SimpleProvider;
pub use validation::FieldError;
