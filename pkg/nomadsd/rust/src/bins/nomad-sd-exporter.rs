// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use nomad_sd_exporter::{
    Args, ConcurrencyLimiter, Exporter, ExporterConfig, MetricsRegistry, MetricsServer,
    NomadClient, api_error_counter,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::unix::{SignalKind, signal};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ExporterConfig::from_args(Args::parse()).context("invalid configuration")?;
    simple_logger::init_with_level(config.log_level)?;
    info!(
        "Starting nomad-service-discovery-exporter v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!("Using Nomad configuration: {:?}", config.nomad);

    let client = NomadClient::new(config.nomad.clone()).context("Unable to create client")?;
    let limiter = Arc::new(ConcurrencyLimiter::new(config.parallelism));
    let api_errors = api_error_counter().context("Unable to create error counter")?;
    let exporter = Exporter::new(
        Arc::new(client),
        Arc::clone(&limiter),
        api_errors,
        config.scrape,
    );
    let server = MetricsServer::new(
        MetricsRegistry::new(Arc::new(exporter)),
        config.metrics_path.clone(),
    );

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(
        "Metrics available on: {}{}",
        listener.local_addr()?,
        config.metrics_path
    );

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("Received SIGINT, shutting down"),
        }
    };

    let result = server.serve(listener, shutdown).await;
    // Scrapes still running on open connections stop at their next API call.
    limiter.close();
    if let Err(e) = result {
        warn!("Metrics listener stopped: {e:#}");
        return Err(e);
    }
    Ok(())
}
