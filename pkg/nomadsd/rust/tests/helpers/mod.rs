// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![allow(dead_code)]

use async_trait::async_trait;
use nomad_sd_exporter::model::{
    CheckMode, CheckStatus, HealthCheckStatus, NamespaceStub, ServiceIdentity,
    ServiceRegistration, ServiceStub,
};
use nomad_sd_exporter::{
    ClusterClient, ConcurrencyLimiter, Error, Exporter, MetricSink, Observation, QueryOptions,
    Result, ScrapeSettings, api_error_counter,
};
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scriptable in-memory cluster.
#[derive(Default)]
pub struct FakeCluster {
    namespaces: Vec<NamespaceStub>,
    registrations: HashMap<String, Vec<ServiceRegistration>>,
    checks: HashMap<String, Vec<HealthCheckStatus>>,
    fail_listing: bool,
    failing_services: HashSet<String>,
    failing_allocs: HashSet<String>,
    slow_allocs: HashMap<String, Duration>,
    call_delay: Duration,

    check_calls: Mutex<HashMap<String, usize>>,
    registration_calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    listings_in_flight: AtomicUsize,
    peak_listings: AtomicUsize,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, namespace: &str, services: &[&str]) -> Self {
        self.namespaces.push(NamespaceStub {
            namespace: namespace.to_string(),
            services: services
                .iter()
                .map(|name| ServiceStub {
                    service_name: name.to_string(),
                    tags: vec![],
                })
                .collect(),
        });
        self
    }

    pub fn registration(mut self, namespace: &str, service: &str, alloc_id: &str, job_id: &str) -> Self {
        let entry = self.registrations.entry(service.to_string()).or_default();
        let id = format!("_nomad-task-{alloc_id}-{service}-{}", entry.len());
        entry.push(ServiceRegistration {
            id,
            service_name: service.to_string(),
            namespace: namespace.to_string(),
            node_id: "node-1".to_string(),
            datacenter: "dc1".to_string(),
            job_id: job_id.to_string(),
            alloc_id: alloc_id.to_string(),
            tags: vec![],
            address: "10.0.0.1".to_string(),
            port: 8080,
        });
        self
    }

    pub fn check(mut self, alloc_id: &str, check: HealthCheckStatus) -> Self {
        self.checks.entry(alloc_id.to_string()).or_default().push(check);
        self
    }

    pub fn fail_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn fail_service(mut self, service: &str) -> Self {
        self.failing_services.insert(service.to_string());
        self
    }

    pub fn fail_alloc(mut self, alloc_id: &str) -> Self {
        self.failing_allocs.insert(alloc_id.to_string());
        self
    }

    pub fn slow_alloc(mut self, alloc_id: &str, delay: Duration) -> Self {
        self.slow_allocs.insert(alloc_id.to_string(), delay);
        self
    }

    pub fn call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    pub fn check_calls(&self, alloc_id: &str) -> usize {
        self.check_calls.lock().unwrap().get(alloc_id).copied().unwrap_or(0)
    }

    pub fn total_check_calls(&self) -> usize {
        self.check_calls.lock().unwrap().values().sum()
    }

    pub fn registration_calls(&self, service: &str) -> usize {
        self.registration_calls
            .lock()
            .unwrap()
            .get(service)
            .copied()
            .unwrap_or(0)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn peak_concurrent_listings(&self) -> usize {
        self.peak_listings.load(Ordering::SeqCst)
    }

    fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(&self.in_flight)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn api_error(endpoint: String) -> Error {
    Error::UnexpectedStatus {
        endpoint,
        status: 500,
        body: "rpc error: no cluster leader".to_string(),
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn list_service_stubs(&self, _opts: &QueryOptions) -> Result<Vec<NamespaceStub>> {
        let _guard = self.enter();
        let listings = self.listings_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_listings.fetch_max(listings, Ordering::SeqCst);
        let _listing = InFlight(&self.listings_in_flight);

        tokio::time::sleep(self.call_delay).await;
        if self.fail_listing {
            return Err(api_error("/v1/services".to_string()));
        }
        Ok(self.namespaces.clone())
    }

    async fn list_registrations(
        &self,
        service: &ServiceIdentity,
        _opts: &QueryOptions,
    ) -> Result<Vec<ServiceRegistration>> {
        let _guard = self.enter();
        *self
            .registration_calls
            .lock()
            .unwrap()
            .entry(service.service_name.clone())
            .or_default() += 1;

        tokio::time::sleep(self.call_delay).await;
        if self.failing_services.contains(&service.service_name) {
            return Err(api_error(format!("/v1/service/{}", service.service_name)));
        }
        Ok(self
            .registrations
            .get(&service.service_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_health_checks(
        &self,
        alloc_id: &str,
        _opts: &QueryOptions,
    ) -> Result<Vec<HealthCheckStatus>> {
        let _guard = self.enter();
        *self
            .check_calls
            .lock()
            .unwrap()
            .entry(alloc_id.to_string())
            .or_default() += 1;

        let delay = self.slow_allocs.get(alloc_id).copied().unwrap_or(self.call_delay);
        tokio::time::sleep(delay).await;
        if self.failing_allocs.contains(alloc_id) {
            return Err(api_error(format!("/v1/client/allocation/{alloc_id}/checks")));
        }
        Ok(self.checks.get(alloc_id).cloned().unwrap_or_default())
    }
}

pub fn check(id: &str, service: &str, mode: CheckMode, status: CheckStatus) -> HealthCheckStatus {
    HealthCheckStatus {
        id: id.to_string(),
        check: format!("{service}-alive"),
        group: "web.group".to_string(),
        mode,
        output: String::new(),
        service: service.to_string(),
        task: "server".to_string(),
        status,
        status_code: 0,
        timestamp: 0,
        alloc_id: String::new(),
    }
}

pub fn healthiness(id: &str, service: &str, status: CheckStatus) -> HealthCheckStatus {
    check(id, service, CheckMode::Healthiness, status)
}

pub fn exporter(cluster: Arc<FakeCluster>, parallelism: usize, max_duration: Duration) -> Exporter {
    let limiter = ConcurrencyLimiter::new(NonZeroUsize::new(parallelism).unwrap());
    exporter_with_limiter(cluster, Arc::new(limiter), max_duration)
}

pub fn exporter_with_limiter(
    cluster: Arc<FakeCluster>,
    limiter: Arc<ConcurrencyLimiter>,
    max_duration: Duration,
) -> Exporter {
    Exporter::new(
        cluster,
        limiter,
        api_error_counter().unwrap(),
        ScrapeSettings {
            max_duration,
            allow_stale: true,
        },
    )
}

/// Sink that keeps every observation of a cycle.
#[derive(Default)]
pub struct RecordingSink {
    observations: Mutex<Vec<Observation>>,
}

impl MetricSink for RecordingSink {
    fn submit(&self, observation: Observation) {
        self.observations.lock().unwrap().push(observation);
    }
}

impl RecordingSink {
    pub fn take(&self) -> Vec<Observation> {
        std::mem::take(&mut *self.observations.lock().unwrap())
    }
}

/// Runs one cycle and returns its outcome with everything it emitted.
pub async fn scrape(exporter: &Exporter) -> (Result<()>, Vec<Observation>) {
    let sink = Arc::new(RecordingSink::default());
    let result = exporter.collect(sink.clone()).await;
    (result, sink.take())
}

pub fn services_gauges(observations: &[Observation]) -> Vec<(String, u64)> {
    let mut gauges: Vec<_> = observations
        .iter()
        .filter_map(|o| match o {
            Observation::Services { namespace, count } => Some((namespace.clone(), *count)),
            _ => None,
        })
        .collect();
    gauges.sort();
    gauges
}

/// (check id, status, value) of every health observation.
pub fn health_rows(observations: &[Observation]) -> Vec<(String, CheckStatus, f64)> {
    observations
        .iter()
        .filter_map(|o| match o {
            Observation::Health {
                labels,
                status,
                value,
            } => Some((labels.check_id.clone(), *status, *value)),
            _ => None,
        })
        .collect()
}

pub fn api_errors(observations: &[Observation]) -> Vec<u64> {
    observations
        .iter()
        .filter_map(|o| match o {
            Observation::ApiErrors { total } => Some(*total),
            _ => None,
        })
        .collect()
}
