//! tap-survicate CLI
//!
//! Command-line entrypoint for the Survicate tap. Logging verbosity is
//! configured here, once, at process startup; nothing downstream touches the
//! subscriber again.

use clap::Parser;
use tap_survicate::cli::{Cli, Runner};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runner = Runner::new(cli);

    if let Err(e) = runner.run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
