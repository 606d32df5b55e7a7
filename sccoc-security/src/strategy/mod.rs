//! Per-attribute strategies a provider combines
//!
//! Each strategy generates a default value for an unset attribute and
//! validates a value that is set.

pub mod capabilities;
pub mod group;
pub mod seccomp;
pub mod selinux;
pub mod user;

pub use capabilities::CapabilitiesStrategy;
pub use group::GroupStrategy;
pub use seccomp::SeccompStrategy;
pub use selinux::SELinuxStrategy;
pub use user::RunAsUserStrategy;
