//! sccoc Core - API objects, identifiers, and errors
//!
//! This crate provides the types shared by the namespace, security, and
//! engine crates.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod error;
pub mod events;
pub mod types;

pub use api::{
    Capabilities, Container, ContainerPort, Namespace, Pod, PodSecurityContext, PodSpec,
    SELinuxOptions, SecurityContext,
};
pub use error::{Error, Result};
pub use events::RunEvent;
pub use types::{ContainerId, IdRange, McsLabel, UidBlock};
