//! # blueblue
//!
//! HTTP server for the blueblue BLE presence scanner.
//!
//! This binary provides:
//! - A control page to start and stop scanning, and a live device list
//! - A JSON API with an OpenAPI description
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development, without a radio
//! cargo run --package blueblue-server -- --simulate --autostart
//!
//! # On a host with BlueZ
//! cargo run --package blueblue-server --features bluetooth -- -d 10s -p 8080
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::sync::Arc;

use anyhow::Context;
use blueblue_core::{AdvertisementSource, Config, SimulatedSource};
use blueblue_server::api;
use blueblue_server::cli::Cli;
use blueblue_server::logging;
use blueblue_server::render::Templates;
use blueblue_server::state::AppState;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    logging::init(&config.logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting blueblue");

    let public_dir = config
        .server
        .resolve_public_dir()
        .context("Could not determine the public directory")?;
    info!(dir = %public_dir.display(), "Serving pages from public directory");

    let templates = Templates::load(&public_dir);
    for problem in templates.problems() {
        warn!(error = %problem, "Page template unavailable");
    }

    let source = match open_source(cli.simulate).await {
        Ok(source) => source,
        Err(e) => {
            error!(error = %e, "Could not open advertisement source");
            return Err(e.into());
        }
    };
    info!(source = source.name(), window = ?config.scan.window(), "Advertisement source ready");

    let state = AppState::new(&config, source, public_dir, templates);

    if cli.autostart {
        let session = state.scanner().start()?;
        info!(%session, "Scanning started at launch");
    }

    let app = api::create_router(state.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, waiting for the scan loop");
    state.scanner().shutdown().await;

    Ok(())
}

async fn open_source(simulate: bool) -> blueblue_core::Result<Arc<dyn AdvertisementSource>> {
    if simulate {
        return Ok(Arc::new(SimulatedSource::default()));
    }

    #[cfg(feature = "bluetooth")]
    {
        let source = blueblue_core::BluezSource::new().await?;
        Ok(Arc::new(source))
    }

    #[cfg(not(feature = "bluetooth"))]
    {
        Err(blueblue_core::BlueblueError::BluetoothSupportDisabled)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
