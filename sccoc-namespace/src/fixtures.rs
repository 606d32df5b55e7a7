//! Test pod used to probe a constraint

use sccoc_core::{Container, ContainerPort, Pod, PodSpec};

/// Build a single-container listener pod
///
/// The container is named after the pod and runs a `socat` listener on
/// `port`; the CLI replaces the command before running it on the engine.
#[must_use]
pub fn test_pod(image: &str, protocol: &str, pod_name: &str, namespace: &str, port: u16) -> Pod {
    let listen = format!("{}-l:{port},reuseaddr,fork,crlf", protocol.to_lowercase());

    Pod {
        name: pod_name.to_string(),
        namespace: namespace.to_string(),
        spec: PodSpec {
            restart_policy: "Never".to_string(),
            containers: vec![Container {
                name: pod_name.to_string(),
                image: image.to_string(),
                command: vec![
                    "socat".to_string(),
                    "-T".to_string(),
                    "1".to_string(),
                    "-d".to_string(),
                    listen,
                    "system:'echo Hello'".to_string(),
                ],
                ports: vec![ContainerPort {
                    container_port: port,
                    host_port: None,
                    protocol: protocol.to_uppercase(),
                }],
                security_context: None,
            }],
            ..PodSpec::default()
        },
        ..Pod::default()
    }
}
