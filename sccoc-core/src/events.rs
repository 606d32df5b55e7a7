//! Container run events with structured tracing

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

use crate::ContainerId;

/// Events emitted while a container is run on the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Image is present locally
    ImagePulled {
        /// Image reference
        image: String,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// Container created
    ContainerCreated {
        /// Container ID
        id: ContainerId,
        /// Image reference
        image: String,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// Container started
    ContainerStarted {
        /// Container ID
        id: ContainerId,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// Container stopped running
    ContainerExited {
        /// Container ID
        id: ContainerId,
        /// Exit code
        exit_code: i64,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// Error occurred
    Error {
        /// Container ID, if one was created
        id: Option<ContainerId>,
        /// Error message
        message: String,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },
}

impl RunEvent {
    /// Get the container ID, if the event has one
    #[must_use]
    pub const fn container_id(&self) -> Option<&ContainerId> {
        match self {
            Self::ContainerCreated { id, .. }
            | Self::ContainerStarted { id, .. }
            | Self::ContainerExited { id, .. } => Some(id),
            Self::Error { id, .. } => id.as_ref(),
            Self::ImagePulled { .. } => None,
        }
    }

    /// Get the timestamp from any event
    #[must_use]
    pub const fn timestamp(&self) -> SystemTime {
        match self {
            Self::ImagePulled { timestamp, .. }
            | Self::ContainerCreated { timestamp, .. }
            | Self::ContainerStarted { timestamp, .. }
            | Self::ContainerExited { timestamp, .. }
            | Self::Error { timestamp, .. } => *timestamp,
        }
    }

    /// Check if this is a failure event
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        match self {
            Self::Error { .. } => true,
            Self::ContainerExited { exit_code, .. } => *exit_code != 0,
            _ => false,
        }
    }

    /// Emit structured tracing event
    pub fn emit_trace(&self) {
        match self {
            Self::ImagePulled { image, .. } => {
                tracing::info!(image = %image, event = "image_pulled", "Image pulled");
            }
            Self::ContainerCreated { id, image, .. } => {
                tracing::info!(
                    container_id = %id.short(),
                    image = %image,
                    event = "created",
                    "Container created"
                );
            }
            Self::ContainerStarted { id, .. } => {
                tracing::info!(
                    container_id = %id.short(),
                    event = "started",
                    "Container started"
                );
            }
            Self::ContainerExited { id, exit_code, .. } => {
                if *exit_code == 0 {
                    tracing::info!(
                        container_id = %id.short(),
                        exit_code,
                        event = "exited",
                        "Container exited"
                    );
                } else {
                    tracing::warn!(
                        container_id = %id.short(),
                        exit_code,
                        event = "exited",
                        "Container exited"
                    );
                }
            }
            Self::Error { id, message, .. } => {
                tracing::error!(
                    container_id = id.as_ref().map(ContainerId::short),
                    message = %message,
                    event = "error",
                    "Container error"
                );
            }
        }
    }
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImagePulled { image, .. } => write!(f, "Image {image} pulled"),
            Self::ContainerCreated { id, image, .. } => {
                write!(f, "Container {} created from {image}", id.short())
            }
            Self::ContainerStarted { id, .. } => write!(f, "Container {} started", id.short()),
            Self::ContainerExited { id, exit_code, .. } => {
                write!(f, "Container {} exited with code {exit_code}", id.short())
            }
            Self::Error { id: Some(id), message, .. } => {
                write!(f, "Container {} error: {message}", id.short())
            }
            Self::Error { id: None, message, .. } => write!(f, "Engine error: {message}"),
        }
    }
}

// Custom SystemTime serialization
mod systemtime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let since_epoch = time
            .duration_since(UNIX_EPOCH)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_u64(since_epoch.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + std::time::Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_container_id() {
        let id = ContainerId::new("abc123").unwrap();
        let event = RunEvent::ContainerStarted {
            id: id.clone(),
            timestamp: SystemTime::now(),
        };
        assert_eq!(event.container_id(), Some(&id));

        let event = RunEvent::ImagePulled {
            image: "busybox".to_string(),
            timestamp: SystemTime::now(),
        };
        assert_eq!(event.container_id(), None);
    }

    #[test]
    fn test_event_failure() {
        let id = ContainerId::new("abc123").unwrap();

        let event = RunEvent::ContainerExited {
            id: id.clone(),
            exit_code: 1,
            timestamp: SystemTime::now(),
        };
        assert!(event.is_failure());

        let event = RunEvent::ContainerExited {
            id,
            exit_code: 0,
            timestamp: SystemTime::now(),
        };
        assert!(!event.is_failure());
    }

    #[test]
    fn test_event_serde() {
        let event = RunEvent::ContainerExited {
            id: ContainerId::new("abc123").unwrap(),
            exit_code: 0,
            timestamp: SystemTime::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"container_exited\""));
        let deserialized: RunEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(event.container_id(), deserialized.container_id());
    }
}
