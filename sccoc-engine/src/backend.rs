//! Container engine trait for pluggable implementations

use async_trait::async_trait;
use bytes::Bytes;
use sccoc_core::{ContainerId, Error, Result};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::RunSpec;

/// Trait for container engines
///
/// This allows for different implementations:
/// - [`DockerEngine`](crate::DockerEngine) - Docker over its local socket
/// - [`MockEngine`] - Testing without a daemon
///
/// # Thread Safety
/// All implementations must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Make an image available locally
    ///
    /// # Errors
    /// Returns error if the image cannot be pulled
    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Create a container without starting it
    ///
    /// # Errors
    /// Returns error if the engine rejects the settings
    async fn create_container(&self, spec: &RunSpec) -> Result<ContainerId>;

    /// Start a created container
    ///
    /// # Errors
    /// Returns error if the container cannot be started
    async fn start_container(&self, id: &ContainerId) -> Result<()>;

    /// Block until the container stops; returns its exit code
    ///
    /// # Errors
    /// Returns error if the engine cannot report the exit
    async fn wait_container(&self, id: &ContainerId) -> Result<i64>;

    /// Everything the container wrote to stdout and stderr
    ///
    /// # Errors
    /// Returns error if logs cannot be read
    async fn container_logs(&self, id: &ContainerId) -> Result<Vec<Bytes>>;
}

/// Mock engine for testing (doesn't talk to a daemon)
///
/// # Example
/// ```
/// use sccoc_engine::{ContainerEngine, MockEngine, RunSpec};
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let engine = MockEngine::new();
/// engine.set_logs(vec!["hello world\n".into()]).await;
///
/// let id = engine.create_container(&RunSpec::default()).await.unwrap();
/// engine.start_container(&id).await.unwrap();
/// assert_eq!(engine.wait_container(&id).await.unwrap(), 0);
/// assert_eq!(engine.container_logs(&id).await.unwrap().len(), 1);
/// # });
/// ```
#[derive(Clone)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    pulled: Vec<String>,
    created: Vec<RunSpec>,
    started: Vec<ContainerId>,
    logs: Vec<Bytes>,
    exit_code: i64,
    fail_pull: bool,
    call_count: usize,
}

impl MockState {
    fn known(&self, id: &ContainerId) -> Result<()> {
        let index = id
            .as_str()
            .strip_prefix("mock")
            .and_then(|n| n.parse::<usize>().ok());
        match index {
            Some(i) if i < self.created.len() => Ok(()),
            _ => Err(Error::NotFound {
                kind: "container",
                name: id.to_string(),
            }),
        }
    }
}

impl MockEngine {
    /// Create a new mock engine
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Set the logs every container returns (for testing)
    pub async fn set_logs(&self, logs: Vec<Bytes>) {
        self.state.lock().await.logs = logs;
    }

    /// Set the exit code every container returns (for testing)
    pub async fn set_exit_code(&self, code: i64) {
        self.state.lock().await.exit_code = code;
    }

    /// Make image pulls fail (for testing)
    pub async fn fail_pull(&self) {
        self.state.lock().await.fail_pull = true;
    }

    /// Get the number of engine calls made (for testing)
    pub async fn call_count(&self) -> usize {
        self.state.lock().await.call_count
    }

    /// Images pulled so far
    pub async fn pulled_images(&self) -> Vec<String> {
        self.state.lock().await.pulled.clone()
    }

    /// Settings of every created container
    pub async fn created_specs(&self) -> Vec<RunSpec> {
        self.state.lock().await.created.clone()
    }

    /// Check if a container has been started
    pub async fn is_started(&self, id: &ContainerId) -> bool {
        self.state.lock().await.started.contains(id)
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEngine").finish_non_exhaustive()
    }
}

#[async_trait]
impl ContainerEngine for MockEngine {
    async fn pull_image(&self, image: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.call_count += 1;

        if state.fail_pull {
            return Err(Error::Engine {
                message: format!("failed to pull {image}: mock failure"),
            });
        }
        state.pulled.push(image.to_string());

        tracing::debug!(image, "Mock: Pulled image");

        Ok(())
    }

    async fn create_container(&self, spec: &RunSpec) -> Result<ContainerId> {
        let mut state = self.state.lock().await;
        state.call_count += 1;

        let id = ContainerId::new(format!("mock{}", state.created.len()))?;
        state.created.push(spec.clone());

        tracing::debug!(container_id = %id, image = %spec.image, "Mock: Created container");

        Ok(id)
    }

    async fn start_container(&self, id: &ContainerId) -> Result<()> {
        let mut state = self.state.lock().await;
        state.call_count += 1;
        state.known(id)?;

        if !state.started.contains(id) {
            state.started.push(id.clone());
        }

        tracing::debug!(container_id = %id, "Mock: Started container");

        Ok(())
    }

    async fn wait_container(&self, id: &ContainerId) -> Result<i64> {
        let mut state = self.state.lock().await;
        state.call_count += 1;
        state.known(id)?;

        if !state.started.contains(id) {
            return Err(Error::Engine {
                message: format!("container {id} is not running"),
            });
        }

        Ok(state.exit_code)
    }

    async fn container_logs(&self, id: &ContainerId) -> Result<Vec<Bytes>> {
        let mut state = self.state.lock().await;
        state.call_count += 1;
        state.known(id)?;

        tracing::trace!(container_id = %id, chunks = state.logs.len(), "Mock: Read logs");

        Ok(state.logs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_lifecycle() {
        let engine = MockEngine::new();
        engine.set_exit_code(3).await;

        engine.pull_image("centos").await.unwrap();
        let spec = RunSpec {
            image: "centos".to_string(),
            ..RunSpec::default()
        };
        let id = engine.create_container(&spec).await.unwrap();
        assert!(!engine.is_started(&id).await);

        engine.start_container(&id).await.unwrap();
        assert!(engine.is_started(&id).await);
        assert_eq!(engine.wait_container(&id).await.unwrap(), 3);

        assert_eq!(engine.pulled_images().await, ["centos"]);
        assert_eq!(engine.created_specs().await, [spec]);
        assert_eq!(engine.call_count().await, 4);
    }

    #[tokio::test]
    async fn test_mock_unknown_container() {
        let engine = MockEngine::new();
        let id = ContainerId::new("mock7").unwrap();
        assert!(matches!(
            engine.start_container(&id).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_wait_requires_start() {
        let engine = MockEngine::new();
        let id = engine.create_container(&RunSpec::default()).await.unwrap();
        assert!(engine.wait_container(&id).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_pull_failure() {
        let engine = MockEngine::new();
        engine.fail_pull().await;
        let err = engine.pull_image("centos").await.unwrap_err();
        assert!(err.to_string().contains("centos"));
    }
}
