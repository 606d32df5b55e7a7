//! Running a container to completion with event emission
//!
//! Drives the engine through pull, create, start, and wait, copies the
//! container's output, and reports each step as a [`RunEvent`].

use sccoc_core::{ContainerId, Result, RunEvent};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::{ContainerEngine, RunSpec};

/// Result of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Container that ran
    pub id: ContainerId,
    /// Its exit code
    pub exit_code: i64,
}

/// Runs containers on an engine
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use tokio::sync::mpsc;
/// use sccoc_engine::{ContainerEngine, ContainerRunner, MockEngine, RunSpec};
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let engine = MockEngine::new();
/// engine.set_logs(vec!["hello world\n".into()]).await;
/// let (tx, mut rx) = mpsc::channel(16);
///
/// let runner = ContainerRunner::new(Arc::new(engine) as Arc<dyn ContainerEngine>)
///     .with_events(tx);
///
/// let mut out = Vec::new();
/// let outcome = runner.run_to_completion(&RunSpec::default(), &mut out).await.unwrap();
/// assert_eq!(outcome.exit_code, 0);
/// assert_eq!(out, b"hello world\n");
///
/// drop(runner);
/// while let Some(event) = rx.recv().await {
///     println!("Event: {event}");
/// }
/// # });
/// ```
pub struct ContainerRunner {
    engine: Arc<dyn ContainerEngine>,
    event_tx: Option<mpsc::Sender<RunEvent>>,
}

impl ContainerRunner {
    /// Create a runner for an engine
    #[must_use]
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self {
            engine,
            event_tx: None,
        }
    }

    /// Add event channel for emitting events
    ///
    /// Events will be sent to this channel as they occur.
    #[must_use]
    pub fn with_events(mut self, tx: mpsc::Sender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    async fn emit(&self, event: RunEvent) {
        event.emit_trace();
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }

    /// Pull, create, start, and wait for a container, then copy its logs
    /// to `out`
    ///
    /// A non-zero exit code is reported in the outcome, not as an error.
    ///
    /// # Errors
    /// Returns error if any engine step fails or the output cannot be written
    pub async fn run_to_completion<W>(&self, spec: &RunSpec, out: &mut W) -> Result<RunOutcome>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut id = None;
        let result = self.run_steps(spec, out, &mut id).await;

        if let Err(e) = &result {
            self.emit(RunEvent::Error {
                id,
                message: e.to_string(),
                timestamp: SystemTime::now(),
            })
            .await;
        }

        result
    }

    async fn run_steps<W>(
        &self,
        spec: &RunSpec,
        out: &mut W,
        created: &mut Option<ContainerId>,
    ) -> Result<RunOutcome>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.engine.pull_image(&spec.image).await?;
        self.emit(RunEvent::ImagePulled {
            image: spec.image.clone(),
            timestamp: SystemTime::now(),
        })
        .await;

        let id = self.engine.create_container(spec).await?;
        *created = Some(id.clone());
        self.emit(RunEvent::ContainerCreated {
            id: id.clone(),
            image: spec.image.clone(),
            timestamp: SystemTime::now(),
        })
        .await;

        self.engine.start_container(&id).await?;
        self.emit(RunEvent::ContainerStarted {
            id: id.clone(),
            timestamp: SystemTime::now(),
        })
        .await;

        let exit_code = self.engine.wait_container(&id).await?;
        self.emit(RunEvent::ContainerExited {
            id: id.clone(),
            exit_code,
            timestamp: SystemTime::now(),
        })
        .await;

        for chunk in self.engine.container_logs(&id).await? {
            out.write_all(&chunk).await?;
        }
        out.flush().await?;

        Ok(RunOutcome { id, exit_code })
    }
}

impl std::fmt::Debug for ContainerRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerRunner")
            .field("has_events", &self.event_tx.is_some())
            .finish_non_exhaustive()
    }
}
