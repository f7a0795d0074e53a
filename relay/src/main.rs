use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use relay::{broadcaster, session, Relay, RelayConfig};
use tokio::{
    net::TcpListener,
    signal::unix::{signal, SignalKind},
    sync::broadcast,
    task::JoinSet,
};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "relay", about = "Collaborative whiteboard session relay", version)]
struct Cli {
    /// YAML config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overrides the config file
    #[arg(long)]
    port: Option<u16>,

    /// Shared access token, overrides the config file
    #[arg(long)]
    access_token: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<RelayConfig> {
    let mut config = match &cli.config {
        Some(path) => RelayConfig::load(path)?,
        None => RelayConfig::default(),
    };

    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(access_token) = &cli.access_token {
        config.access_token = access_token.clone();
    }

    config.validate()?;

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let config = load_config(&cli)?;
    if config.access_token.is_empty() {
        warn!("no access token configured, every client is allowed");
    }

    let relay = Arc::new(Relay::new(config));
    let port = relay.config().port;

    let mut join_set: JoinSet<anyhow::Result<()>> = JoinSet::new();
    let mut interrupt =
        signal(SignalKind::interrupt()).context("failed to create interrupt signal stream")?;
    let server = TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("could not bind to port {}", port))?;
    let (quit_tx, quit_rx) = broadcast::channel::<()>(1);

    let broadcaster = tokio::spawn(broadcaster::run_state_broadcaster(
        relay.clone(),
        quit_rx.resubscribe(),
    ));

    info!(port, "listening");
    loop {
        tokio::select! {
            _ = interrupt.recv() => {
                info!("server interrupted, gracefully shutting down");
                quit_tx.send(()).context("failed to send quit signal")?;
                break;
            }
            Ok((socket, addr)) = server.accept() => {
                info!(%addr, "accepted connection");
                join_set.spawn(session::handle_user_session(relay.clone(), quit_rx.resubscribe(), socket));
            }
            Some(finished) = join_set.join_next() => {
                if let Ok(Err(e)) = finished {
                    warn!(error = %e, "connection ended with an error");
                }
            }
        }
    }

    while join_set.join_next().await.is_some() {}
    if let Err(e) = broadcaster.await {
        error!(error = %e, "state broadcaster panicked");
    }

    info!("server shut down");

    Ok(())
}
