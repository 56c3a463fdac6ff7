//! hydra-bootstrap - resolve hydra settings and bootstrap cluster credentials

use anyhow::Context as _;
use clap::Parser;
use hydra_bootstrap::cli::Cli;
use tracing::{error, info};
use tracing_subscriber::filter::{Directive, EnvFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.debug);

    // Library code never exits; failures end the process here
    if let Err(e) = run(cli).await {
        error!("Error: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    info!("Starting hydra-bootstrap");

    let config = cli
        .load_config()
        .await
        .context("Could not load configuration")?;

    cli.execute(config).await?;

    Ok(())
}

fn init_logging(debug: bool) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::registry()
        .with(log_filter(debug, env.as_deref()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// `RUST_LOG` (or the info default), with `--debug` layered on top
fn log_filter(debug: bool, env: Option<&str>) -> EnvFilter {
    let filter = env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("hydra_bootstrap=info"));

    if !debug {
        return filter;
    }
    match "hydra_bootstrap=debug".parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}
