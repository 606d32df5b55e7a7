//! sccoc - run a container under an OpenShift security context constraint
//!
//! Builds a throwaway namespace with security allocations, applies one of
//! the bootstrap constraints to a test pod, and runs its container on the
//! local container engine with the resulting security context.

use clap::Parser;
use std::process;
use tracing::Level;

mod cli;
mod export;
mod report;
mod run;

use cli::Cli;
use run::InvalidScc;

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Handle errors
    if let Err(e) = run::execute(&cli).await {
        if let Some(invalid) = e.downcast_ref::<InvalidScc>() {
            println!("{invalid}");
        } else {
            eprintln!("❌ Error: {e:#}");
        }
        process::exit(1);
    }
}
