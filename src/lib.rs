pub mod cli;
pub mod config;
pub mod functional; // Functional-status trajectory
pub mod models;
pub mod pipeline;
pub mod pipeline_config;
pub mod reference;
pub mod timeline; // Causal timeline + relationship inference
pub mod treatment; // Treatment response + protocol compliance

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub use pipeline::{run_pipeline, run_pipeline_with_classifier, PipelineInput, PipelineOutput};
pub use reference::ClinicalReference;

/// Install the stderr subscriber. RUST_LOG wins over the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// CLI entry point: parse arguments, run, print JSON to stdout.
pub fn run() -> Result<(), cli::CliError> {
    let args = cli::Cli::parse();
    init_tracing();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let json = args.execute()?;
    println!("{json}");
    Ok(())
}
