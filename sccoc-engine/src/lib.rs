//! Container engines for running admitted pods
//!
//! This crate provides:
//! - [`ContainerEngine`] with a Docker and a mock implementation
//! - [`RunSpec`], the engine settings derived from a security context
//! - [`ContainerRunner`], which runs a container to completion with events

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod backend;
pub mod docker;
pub mod run;
pub mod spec;

pub use backend::{ContainerEngine, MockEngine};
pub use docker::DockerEngine;
pub use run::{ContainerRunner, RunOutcome};
pub use spec::RunSpec;
