//! Printing what a constraint did to the test container

use anyhow::Result;
use sccoc_core::{Container, PodSecurityContext};
use sccoc_engine::RunSpec;
use serde::Serialize;

use crate::cli::OutputFormat;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report<'a> {
    pub scc: &'a str,
    pub namespace: &'a str,
    pub pod_security_context: Option<&'a PodSecurityContext>,
    pub container: &'a Container,
    pub run_spec: &'a RunSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
}

impl<'a> Report<'a> {
    pub const fn new(
        scc: &'a str,
        namespace: &'a str,
        pod_security_context: Option<&'a PodSecurityContext>,
        container: &'a Container,
        run_spec: &'a RunSpec,
    ) -> Self {
        Self {
            scc,
            namespace,
            pod_security_context,
            container,
            run_spec,
            exit_code: None,
            logs: None,
        }
    }

    #[must_use]
    pub const fn with_exit_code(mut self, code: i64) -> Self {
        self.exit_code = Some(code);
        self
    }

    #[must_use]
    pub fn with_logs(mut self, logs: &[u8]) -> Self {
        self.logs = Some(String::from_utf8_lossy(logs).into_owned());
        self
    }

    pub fn print(&self, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Debug => {
                self.print_debug();
                Ok(())
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(self)?);
                Ok(())
            }
        }
    }

    fn print_debug(&self) {
        let sc = self.container.security_context.as_ref();
        let selinux = sc
            .and_then(|s| s.selinux_options.as_ref())
            .or_else(|| self.pod_security_context?.selinux_options.as_ref());

        println!();
        println!("{:#?}", self.container);
        println!();
        println!("{:#?}", self.pod_security_context);
        println!();
        println!("{sc:#?}");
        println!();
        println!("{:#?}", sc.and_then(|s| s.capabilities.as_ref()));
        println!();
        println!("{selinux:#?}");
        println!();
        println!("Using {:?} scc...", self.scc);
        println!();
    }
}
