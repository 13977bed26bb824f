// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Metric shapes produced by a scrape cycle and their Prometheus rendering.

use crate::errors::Result;
use crate::exporter::Exporter;
use crate::model::{CheckStatus, HealthCheckStatus, ServiceRegistration};
use log::debug;
use prometheus::{GaugeVec, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const SERVICES: &str = "nomad_services";
pub const SERVICES_HELP: &str = "Number of services registers to Nomad native service discovery";
pub const SERVICES_HEALTH: &str = "nomad_services_health";
pub const SERVICES_HEALTH_HELP: &str =
    "Health status of a service registered to Nomad Service Discovery";
pub const API_ERRORS: &str = "nomad_services_api_errors_total";
pub const API_ERRORS_HELP: &str =
    "Number of scrapes that resulted with one or more API errors from Nomad";

const HEALTH_LABELS: [&str; 7] = [
    "namespace",
    "job_id",
    "task_name",
    "service_name",
    "check_name",
    "check_id",
    "status",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HealthLabels {
    pub namespace: String,
    pub job_id: String,
    pub task_name: String,
    pub service_name: String,
    pub check_name: String,
    pub check_id: String,
}

impl HealthLabels {
    pub fn new(reg: &ServiceRegistration, check: &HealthCheckStatus) -> Self {
        Self {
            namespace: reg.namespace.clone(),
            job_id: reg.job_id.clone(),
            task_name: check.task.clone(),
            service_name: check.service.clone(),
            check_name: check.check.clone(),
            check_id: check.id.clone(),
        }
    }

    fn values<'a>(&'a self, status: &'a str) -> [&'a str; 7] {
        [
            self.namespace.as_str(),
            self.job_id.as_str(),
            self.task_name.as_str(),
            self.service_name.as_str(),
            self.check_name.as_str(),
            self.check_id.as_str(),
            status,
        ]
    }
}

/// A single typed sample written by the scrape pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// `nomad_services{namespace}`
    Services { namespace: String, count: u64 },
    /// `nomad_services_health{..., status}`, one of a one-hot triple.
    Health {
        labels: HealthLabels,
        status: CheckStatus,
        value: f64,
    },
    /// `nomad_services_api_errors_total`
    ApiErrors { total: u64 },
}

/// Expands a check result into one observation per reported status value,
/// exactly one of which is set.
pub fn one_hot(labels: HealthLabels, status: CheckStatus) -> impl Iterator<Item = Observation> {
    CheckStatus::REPORTED
        .into_iter()
        .map(move |candidate| Observation::Health {
            labels: labels.clone(),
            status: candidate,
            value: if candidate == status { 1.0 } else { 0.0 },
        })
}

/// Receives observations as the scrape pipeline produces them.
pub trait MetricSink: Send + Sync {
    fn submit(&self, observation: Observation);
}

impl MetricSink for mpsc::UnboundedSender<Observation> {
    fn submit(&self, observation: Observation) {
        // A closed receiver means nobody is waiting for this scrape anymore.
        if self.send(observation).is_err() {
            debug!("metric receiver dropped, discarding observation");
        }
    }
}

/// Process-wide count of scrapes that hit at least one API error.
///
/// Clones share the same value; create one per process and hand it to the
/// [`Exporter`].
pub fn api_error_counter() -> Result<IntCounter> {
    Ok(IntCounter::new(API_ERRORS, API_ERRORS_HELP)?)
}

/// Pull-side registry: runs a scrape cycle per request and renders the result.
#[derive(Clone)]
pub struct MetricsRegistry {
    exporter: Arc<Exporter>,
}

impl MetricsRegistry {
    pub fn new(exporter: Arc<Exporter>) -> Self {
        Self { exporter }
    }

    /// Runs one scrape cycle and returns everything it emitted.
    pub async fn gather(&self) -> Vec<Observation> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink: Arc<dyn MetricSink> = Arc::new(tx);
        // The cycle's outcome is already logged and counted by the exporter.
        let _ = self.exporter.collect(Arc::clone(&sink)).await;
        drop(sink);

        let mut observations = Vec::new();
        while let Ok(observation) = rx.try_recv() {
            observations.push(observation);
        }
        observations
    }

    /// Runs one scrape cycle and encodes it in the Prometheus text format.
    pub async fn render(&self) -> Result<String> {
        let observations = self.gather().await;
        encode(observations, self.exporter.errors())
    }
}

/// Encodes a cycle's observations, plus the shared error counter, in the
/// Prometheus text exposition format.
///
/// Gauges go into a registry built for this call so series from earlier
/// cycles never linger.
pub fn encode(
    observations: impl IntoIterator<Item = Observation>,
    api_errors: &IntCounter,
) -> Result<String> {
    let registry = Registry::new();
    let services = GaugeVec::new(Opts::new(SERVICES, SERVICES_HELP), &["namespace"])?;
    let health = GaugeVec::new(Opts::new(SERVICES_HEALTH, SERVICES_HEALTH_HELP), &HEALTH_LABELS)?;
    registry.register(Box::new(services.clone()))?;
    registry.register(Box::new(health.clone()))?;
    registry.register(Box::new(api_errors.clone()))?;

    for observation in observations {
        match observation {
            Observation::Services { namespace, count } => {
                services
                    .with_label_values(&[namespace.as_str()])
                    .set(count as f64);
            }
            Observation::Health {
                labels,
                status,
                value,
            } => {
                health
                    .with_label_values(&labels.values(status.as_str()))
                    .set(value);
            }
            // Rendered straight from the registered counter.
            Observation::ApiErrors { .. } => {}
        }
    }

    Ok(TextEncoder::new().encode_to_string(&registry.gather())?)
}
