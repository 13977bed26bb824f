// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::errors::ConfigError;
use crate::exporter::ScrapeSettings;
use crate::nomad::NomadSettings;
use clap::Parser;
use reqwest::Url;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::num::NonZeroUsize;
use std::time::Duration;

pub const DEFAULT_BIND: &str = ":9100";
pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_NOMAD_ADDR: &str = "http://127.0.0.1:4646";
pub const DEFAULT_DURATION: &str = "11s";
pub const DEFAULT_PARALLELISM: usize = 32;

/// Command line of the exporter. Every flag can also be set from the environment.
#[derive(Debug, Parser)]
#[command(name = "nomad-sd-exporter", version, about = "Export Nomad service discovery health to Prometheus")]
pub struct Args {
    /// Bind listen socket to this address; ":port" listens on every IPv4 and IPv6 interface
    #[arg(long, env = "NOMAD_SD_EXPORTER_BIND", default_value = DEFAULT_BIND)]
    pub bind: String,

    /// Path to export metrics at
    #[arg(long, env = "NOMAD_SD_EXPORTER_PATH", default_value = DEFAULT_METRICS_PATH)]
    pub path: String,

    /// Nomad address
    #[arg(long, env = "NOMAD_ADDR", default_value = DEFAULT_NOMAD_ADDR)]
    pub addr: String,

    /// Nomad namespace ("*" for all namespaces)
    #[arg(long, env = "NOMAD_NAMESPACE", default_value = "")]
    pub namespace: String,

    /// Nomad region (defaults to the agent's region)
    #[arg(long, env = "NOMAD_REGION", default_value = "")]
    pub region: String,

    /// Nomad ACL token
    #[arg(long, env = "NOMAD_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Allow stale read results (default)
    #[arg(long, overrides_with = "no_stale")]
    pub stale: bool,

    /// Require reads from the Nomad leader
    #[arg(long = "no-stale", overrides_with = "stale")]
    pub no_stale: bool,

    /// Max scrape time limit, e.g. "11s" or "1500ms"; bare numbers are seconds
    #[arg(long, env = "NOMAD_SD_EXPORTER_DURATION", default_value = DEFAULT_DURATION, value_parser = parse_duration)]
    pub duration: Duration,

    /// Max amount of parallel outgoing requests to Nomad HTTP API
    #[arg(long, env = "NOMAD_SD_EXPORTER_PARALLELISM", default_value_t = DEFAULT_PARALLELISM)]
    pub parallelism: usize,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "NOMAD_SD_EXPORTER_LOG_LEVEL", default_value = "info")]
    pub log_level: log::Level,
}

/// Validated, immutable exporter configuration.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub bind: SocketAddr,
    pub metrics_path: String,
    pub nomad: NomadSettings,
    pub scrape: ScrapeSettings,
    pub parallelism: NonZeroUsize,
    pub log_level: log::Level,
}

impl TryFrom<Args> for ExporterConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let parallelism =
            NonZeroUsize::new(args.parallelism).ok_or(ConfigError::ZeroParallelism)?;
        if args.duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        if !args.path.starts_with('/') {
            return Err(ConfigError::InvalidMetricsPath(args.path));
        }

        Ok(Self {
            bind: parse_bind_addr(&args.bind)?,
            metrics_path: args.path,
            nomad: NomadSettings {
                address: parse_nomad_address(&args.addr)?,
                region: non_empty(args.region),
                namespace: non_empty(args.namespace),
                token: args.token.and_then(non_empty),
            },
            scrape: ScrapeSettings {
                max_duration: args.duration,
                allow_stale: !args.no_stale,
            },
            parallelism,
            log_level: args.log_level,
        })
    }
}

impl ExporterConfig {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        Self::try_from(args)
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Accepts humantime durations ("11s", "1m30s", "250ms") and bare seconds.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(value).map_err(|e| ConfigError::InvalidDuration {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Accepts `host:port` socket addresses and the `:port` shorthand, which binds
/// the IPv6 unspecified address so a dual-stack host serves both families.
pub fn parse_bind_addr(value: &str) -> Result<SocketAddr, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBindAddress {
        value: value.to_string(),
        reason,
    };

    if let Some(port) = value.strip_prefix(':') {
        let port: u16 = port.parse().map_err(|e| invalid(format!("{e}")))?;
        return Ok(SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port));
    }
    value.parse().map_err(|e| invalid(format!("{e}")))
}

pub fn parse_nomad_address(value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidNomadAddress {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(value).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.cannot_be_a_base() || url.host().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(url)
}
