// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

// Correctness
#![deny(clippy::indexing_slicing)]
#![deny(clippy::string_slice)]
#![deny(clippy::cast_possible_wrap)]
#![deny(clippy::undocumented_unsafe_blocks)]
// Panicking code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unimplemented)]
#![deny(clippy::todo)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]

pub mod client;
pub mod config;
mod dedup;
mod errors;
pub mod exporter;
mod limiter;
pub mod metrics;
pub mod model;
pub mod nomad;
pub mod server;

// Re-export the public API
pub use client::{ClusterClient, QueryOptions};
pub use config::{Args, ExporterConfig};
pub use dedup::DedupCache;
pub use errors::{ConfigError, Error, Result};
pub use exporter::{Exporter, ScrapeSettings};
pub use limiter::{ConcurrencyLimiter, LimiterPermit};
pub use metrics::{HealthLabels, MetricSink, MetricsRegistry, Observation, api_error_counter};
pub use nomad::{NomadClient, NomadSettings};
pub use server::MetricsServer;
