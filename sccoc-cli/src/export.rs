//! Writing the resulting pod out as a manifest

use anyhow::{Context, Result};
use sccoc_core::{Pod, PodSpec};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest<'a> {
    api_version: &'static str,
    kind: &'static str,
    metadata: Metadata<'a>,
    spec: ManifestSpec<'a>,
}

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    name: &'a str,
    namespace: &'a str,
    #[serde(skip_serializing_if = "is_empty")]
    annotations: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestSpec<'a> {
    #[serde(flatten)]
    spec: &'a PodSpec,
    automount_service_account_token: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_empty(map: &&BTreeMap<String, String>) -> bool {
    map.is_empty()
}

/// Render a pod as a `v1` Pod manifest without a service account token
pub fn manifest_yaml(pod: &Pod) -> Result<String> {
    let manifest = Manifest {
        api_version: "v1",
        kind: "Pod",
        metadata: Metadata {
            name: &pod.name,
            namespace: &pod.namespace,
            annotations: &pod.annotations,
        },
        spec: ManifestSpec {
            spec: &pod.spec,
            automount_service_account_token: false,
        },
    };
    serde_yaml::to_string(&manifest).context("Failed to render pod manifest")
}

/// Write `<dir>/<pod name>.yaml`, creating `dir` if needed
pub fn export_pod(pod: &Pod, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;

    let path = dir.join(format!("{}.yaml", pod.name));
    fs::write(&path, manifest_yaml(pod)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), "Exported pod manifest");
    Ok(path)
}
