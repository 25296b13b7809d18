//! logfeed server binary.
//!
//! Tails the configured log file and streams it to SSE clients.

use anyhow::Context;
use clap::Parser;
use logfeed_server::{Cli, LogFormat, LogfeedServer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = cli.server_config();
    info!("Starting logfeed on {}", config.bind_addr);
    info!("  Event stream: http://{}/event-stream", config.bind_addr);
    info!("  Tailing:      {}", config.log_path().display());

    let server = LogfeedServer::new(config);
    server
        .serve_with_shutdown(shutdown_signal())
        .await
        .context("server failed")?;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Received ctrl-c");
}
