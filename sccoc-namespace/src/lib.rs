//! Ephemeral test namespaces for constraint evaluation
//!
//! This crate provides what a throwaway cluster would: a namespace with
//! security allocation annotations, a store the policy provider can fetch
//! it from, and the test pod that gets admitted into it.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod annotations;
pub mod config;
pub mod fixtures;
pub mod store;

pub use annotations::{MCS_ANNOTATION, SUPPLEMENTAL_GROUPS_ANNOTATION, UID_RANGE_ANNOTATION};
pub use config::{NamespaceConfig, create_for_test, random_name};
pub use fixtures::test_pod;
pub use store::{InMemoryStore, NamespaceStore};
