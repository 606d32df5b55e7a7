//! Run a test container under a constraint

use anyhow::{Context, Result};
use sccoc_core::{Namespace, Pod};
use sccoc_engine::{ContainerEngine, ContainerRunner, DockerEngine, RunSpec};
use sccoc_namespace::{InMemoryStore, NamespaceStore, create_for_test, test_pod};
use sccoc_security::bootstrap::find;
use sccoc_security::{
    SecurityContextConstraints, UserInfo, admission, admit, bootstrap_constraints,
    constraint_names, create_provider_from_constraint, default_service_account,
    prefer_for_service_account, revoke_cluster_admin_anyuid,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cli::{Cli, OutputFormat};
use crate::export::export_pod;
use crate::report::Report;

const TEST_POD_NAME: &str = "tmp";
const TEST_POD_PROTOCOL: &str = "tcp";
const TEST_POD_PORT: u16 = 12000;

/// The requested constraint is not part of the bootstrap set
#[derive(Debug)]
pub struct InvalidScc {
    name: String,
    choices: Vec<String>,
}

impl fmt::Display for InvalidScc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:?} is not a valid scc. Must choose one of these:", self.name)?;
        for choice in &self.choices {
            writeln!(f, " - {choice}")?;
        }
        Ok(())
    }
}

impl std::error::Error for InvalidScc {}

impl InvalidScc {
    fn new(name: &str, constraints: &[SecurityContextConstraints]) -> Self {
        Self {
            name: name.to_string(),
            choices: constraint_names(constraints)
                .into_iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

pub async fn execute(cli: &Cli) -> Result<()> {
    let namespace =
        create_for_test(&cli.namespace_config()).context("Invalid namespace allocation")?;
    let store = InMemoryStore::new();
    store
        .create(namespace.clone())
        .await
        .context("Failed to register test namespace")?;
    info!(namespace = %namespace.name, "Created test namespace");

    let mut constraints = bootstrap_constraints(&namespace.name);
    let pod = test_pod(
        &cli.image,
        TEST_POD_PROTOCOL,
        TEST_POD_NAME,
        &namespace.name,
        TEST_POD_PORT,
    );

    let (pod, scc) = if cli.admit {
        admit_pod(cli, &pod, &namespace, &mut constraints, &store).await?
    } else {
        apply_named(cli.scc_name(), &pod, &namespace, &constraints, &store).await?
    };

    if let Some(dir) = &cli.export {
        export_pod(&pod, dir)?;
    }

    let container = pod
        .spec
        .containers
        .first()
        .context("Test pod has no container")?;
    let spec = RunSpec::from_container(container, &pod).with_command(cli.container_command());
    debug!(?spec, "Engine settings");

    let mut report = Report::new(
        &scc,
        &namespace.name,
        pod.spec.security_context.as_ref(),
        container,
        &spec,
    );

    if cli.dry_run {
        info!("Dry run, not starting a container");
    } else {
        let engine = DockerEngine::connect().context("Failed to connect to container engine")?;
        let runner = ContainerRunner::new(Arc::new(engine) as Arc<dyn ContainerEngine>);

        let outcome = match cli.output {
            OutputFormat::Debug => {
                let mut stdout = tokio::io::stdout();
                runner.run_to_completion(&spec, &mut stdout).await
            }
            OutputFormat::Json => {
                let mut logs = Vec::new();
                let outcome = runner.run_to_completion(&spec, &mut logs).await;
                report = report.with_logs(&logs);
                outcome
            }
        }
        .context("Failed to run container")?;

        report = report.with_exit_code(outcome.exit_code);
    }

    report.print(cli.output)?;

    if let Some(code) = report.exit_code.filter(|c| *c != 0) {
        anyhow::bail!("Container exited with code {code}");
    }

    Ok(())
}

async fn apply_named(
    name: &str,
    pod: &Pod,
    namespace: &Namespace,
    constraints: &[SecurityContextConstraints],
    store: &dyn NamespaceStore,
) -> Result<(Pod, String)> {
    let Some(scc) = find(constraints, name) else {
        return Err(InvalidScc::new(name, constraints).into());
    };

    let (provider, _) =
        create_provider_from_constraint(&namespace.name, Some(namespace), scc, store)
            .await
            .with_context(|| format!("Failed to create provider for {name:?}"))?;

    let (pod, errors) = admission::apply(&provider, pod);
    for error in &errors {
        warn!(scc = %name, error = %error, "Generated context does not validate");
    }

    Ok((pod, provider.scc_name().to_string()))
}

async fn admit_pod(
    cli: &Cli,
    pod: &Pod,
    namespace: &Namespace,
    constraints: &mut [SecurityContextConstraints],
    store: &dyn NamespaceStore,
) -> Result<(Pod, String)> {
    if let Some(name) = cli.preferred_scc() {
        if find(constraints, name).is_none() {
            return Err(InvalidScc::new(name, constraints).into());
        }
        prefer_for_service_account(constraints, name, &namespace.name)
            .with_context(|| format!("Failed to prefer {name:?}"))?;
        revoke_cluster_admin_anyuid(constraints, name);
    }

    let name = cli
        .user
        .clone()
        .unwrap_or_else(|| default_service_account(&namespace.name));
    let user = cli
        .groups
        .iter()
        .fold(UserInfo::new(name), |user, group| user.with_group(group));
    debug!(user = %user.name, groups = ?user.groups, "Admitting test pod");

    let admitted = admit(pod, Some(namespace), constraints, Some(&user), store)
        .await
        .context("Pod was not admitted")?;

    Ok((admitted.pod, admitted.scc))
}
