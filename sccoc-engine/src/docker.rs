//! Docker engine over the local control socket

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, LogsOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use bytes::Bytes;
use nix::errno::Errno;
use nix::unistd::{AccessFlags, access};
use sccoc_core::{ContainerId, Error, Result};
use tokio_stream::StreamExt;

use crate::{ContainerEngine, RunSpec};

/// Socket used when `DOCKER_HOST` is unset
pub const DEFAULT_SOCKET: &str = "/var/run/docker.sock";

const UNIX_SCHEME: &str = "unix://";

fn engine_error(operation: &str, e: &BollardError) -> Error {
    Error::Engine {
        message: format!("failed to {operation}: {e}"),
    }
}

fn some_if_any(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

/// Unix socket the engine will be reached on, if it is a unix socket
#[must_use]
pub fn socket_path(docker_host: Option<&str>) -> Option<String> {
    match docker_host {
        None => Some(DEFAULT_SOCKET.to_string()),
        Some(host) => host.strip_prefix(UNIX_SCHEME).map(ToString::to_string),
    }
}

/// Check that the current user may talk to the engine socket
///
/// # Errors
/// Returns [`Error::PermissionDenied`] if the socket is not readable and
/// writable, or [`Error::Engine`] if it does not exist
pub fn check_socket(path: &str) -> Result<()> {
    access(path, AccessFlags::R_OK | AccessFlags::W_OK).map_err(|errno| match errno {
        Errno::EACCES | Errno::EPERM => Error::PermissionDenied {
            operation: format!("connect to {path}"),
        },
        Errno::ENOENT => Error::Engine {
            message: format!("container engine socket {path} not found"),
        },
        other => Error::System(other),
    })
}

/// Docker engine client
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect using `DOCKER_HOST` or the default socket
    ///
    /// # Errors
    /// Returns error if the socket is not accessible or the client cannot
    /// be configured
    pub fn connect() -> Result<Self> {
        let docker_host = std::env::var("DOCKER_HOST").ok();
        if let Some(path) = socket_path(docker_host.as_deref()) {
            check_socket(&path)?;
        }

        let docker =
            Docker::connect_with_local_defaults().map_err(|e| engine_error("connect", &e))?;

        tracing::debug!(
            host = docker_host.as_deref().unwrap_or(DEFAULT_SOCKET),
            "Connected to container engine"
        );

        Ok(Self { docker })
    }

    fn host_config(spec: &RunSpec) -> HostConfig {
        HostConfig {
            cap_add: some_if_any(&spec.cap_add),
            cap_drop: some_if_any(&spec.cap_drop),
            group_add: some_if_any(&spec.group_add),
            security_opt: some_if_any(&spec.security_opt),
            privileged: Some(spec.privileged),
            readonly_rootfs: Some(spec.readonly_rootfs),
            network_mode: spec.network_mode.clone(),
            pid_mode: spec.pid_mode.clone(),
            ipc_mode: spec.ipc_mode.clone(),
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for DockerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerEngine").finish_non_exhaustive()
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn pull_image(&self, image: &str) -> Result<()> {
        let options = Some(CreateImageOptions {
            from_image: image,
            ..Default::default()
        });

        let mut stream = self.docker.create_image(options, None, None);
        while let Some(chunk) = stream.next().await {
            let info = chunk.map_err(|e| engine_error("pull image", &e))?;
            if let Some(status) = info.status {
                tracing::trace!(image, status = %status, "Pull progress");
            }
        }

        Ok(())
    }

    async fn create_container(&self, spec: &RunSpec) -> Result<ContainerId> {
        let config = Config {
            image: Some(spec.image.clone()),
            cmd: some_if_any(&spec.command),
            user: spec.user.clone(),
            host_config: Some(Self::host_config(spec)),
            ..Default::default()
        };

        let created = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await
            .map_err(|e| engine_error("create container", &e))?;

        for warning in &created.warnings {
            tracing::warn!(warning = %warning, "Engine warning");
        }

        ContainerId::new(created.id)
    }

    async fn start_container(&self, id: &ContainerId) -> Result<()> {
        self.docker
            .start_container(id.as_str(), None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| engine_error("start container", &e))
    }

    async fn wait_container(&self, id: &ContainerId) -> Result<i64> {
        let options = Some(WaitContainerOptions {
            condition: "not-running",
        });

        let mut exit_code = 0;
        let mut stream = self.docker.wait_container(id.as_str(), options);
        while let Some(item) = stream.next().await {
            match item {
                Ok(response) => exit_code = response.status_code,
                Err(BollardError::DockerContainerWaitError { code, .. }) => exit_code = code,
                Err(e) => return Err(engine_error("wait for container", &e)),
            }
        }

        Ok(exit_code)
    }

    async fn container_logs(&self, id: &ContainerId) -> Result<Vec<Bytes>> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            ..Default::default()
        };

        let mut chunks = Vec::new();
        let mut stream = self.docker.logs(id.as_str(), Some(options));
        while let Some(chunk) = stream.next().await {
            let output = chunk.map_err(|e| engine_error("read logs", &e))?;
            chunks.push(output.into_bytes());
        }

        Ok(chunks)
    }
}
