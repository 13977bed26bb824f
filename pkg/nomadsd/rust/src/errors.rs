// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    UnexpectedStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("could not decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("scrape deadline exceeded")]
    DeadlineExceeded,

    #[error("concurrency limiter is closed")]
    LimiterClosed,

    #[error("scrape branch did not complete: {0}")]
    Branch(#[from] tokio::task::JoinError),

    #[error("could not encode metrics: {0}")]
    Encode(#[from] prometheus::Error),
}

impl Error {
    /// True when the error was caused by the cycle deadline rather than by Nomad.
    pub fn is_cancellation(&self) -> bool {
        match self {
            Error::DeadlineExceeded => true,
            Error::Request { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("parallelism must be at least 1")]
    ZeroParallelism,

    #[error("scrape duration must be greater than zero")]
    ZeroDuration,

    #[error("invalid duration {value:?}: {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("invalid bind address {value:?}: {reason}")]
    InvalidBindAddress { value: String, reason: String },

    #[error("metrics path must start with '/': {0:?}")]
    InvalidMetricsPath(String),

    #[error("invalid Nomad address {value:?}: {reason}")]
    InvalidNomadAddress { value: String, reason: String },
}
