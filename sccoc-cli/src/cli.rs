//! CLI argument definitions

use clap::{Parser, ValueEnum};
use sccoc_namespace::NamespaceConfig;
use std::path::PathBuf;
use sccoc_security::bootstrap::RESTRICTED;

/// Image the test pod runs by default
pub const DEFAULT_IMAGE: &str = "docker.io/centos:latest";

#[derive(Parser, Debug)]
#[command(name = "sccoc")]
#[command(
    about = "Run a container under an OpenShift security context constraint",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Constraint to run under (default: restricted); the last one given wins.
    /// With --admit, the constraint admission should prefer
    #[arg(value_name = "SCC")]
    pub scc: Vec<String>,

    /// Image for the test container
    #[arg(long, default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// UID block allocated to the test namespace (start/size)
    #[arg(long)]
    pub uid_range: Option<String>,

    /// MCS label allocated to the test namespace
    #[arg(long)]
    pub mcs: Option<String>,

    /// Supplemental group blocks allocated to the test namespace
    #[arg(long)]
    pub supplemental_groups: Option<String>,

    /// Pick the constraint by admission instead of by name
    #[arg(long)]
    pub admit: bool,

    /// User to admit the pod for (default: the namespace's default service account)
    #[arg(long)]
    pub user: Option<String>,

    /// Group of the admitted user (repeatable)
    #[arg(long = "group", default_value = "system:authenticated")]
    pub groups: Vec<String>,

    /// Compute the security context without running a container
    #[arg(long)]
    pub dry_run: bool,

    /// Write the resulting pod manifest into this directory
    #[arg(long, value_name = "DIR")]
    pub export: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Debug)]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to run in the container (default: echo hello world)
    #[arg(last = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed structures
    Debug,
    /// A single JSON document
    Json,
}

impl Cli {
    /// Constraint name chosen on the command line
    pub fn scc_name(&self) -> &str {
        self.scc.last().map_or(RESTRICTED, String::as_str)
    }

    /// Constraint admission is steered towards, if one was named
    pub fn preferred_scc(&self) -> Option<&str> {
        self.scc.last().map(String::as_str)
    }

    /// Namespace allocations with command-line overrides applied
    pub fn namespace_config(&self) -> NamespaceConfig {
        let mut config = NamespaceConfig::default();
        if let Some(uid_range) = &self.uid_range {
            config = config.with_uid_range(uid_range);
        }
        if let Some(mcs) = &self.mcs {
            config = config.with_mcs(mcs);
        }
        if let Some(groups) = &self.supplemental_groups {
            config = config.with_supplemental_groups(groups);
        }
        config
    }

    /// Command for the container
    pub fn container_command(&self) -> Vec<String> {
        if self.command.is_empty() {
            vec!["echo".to_string(), "hello world".to_string()]
        } else {
            self.command.clone()
        }
    }
}
