// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Scrape orchestration.
//!
//! One scrape cycle walks namespaces, services, registrations and allocations,
//! spawning one task per discovered item. Each level joins all of its children
//! before it completes, so a cycle is only reported done once every branch has
//! finished or observed the deadline. Every outgoing call goes through the
//! shared [`ConcurrencyLimiter`] and holds its admission for that call alone.

use crate::client::{ClusterClient, QueryOptions};
use crate::dedup::DedupCache;
use crate::errors::{Error, Result};
use crate::limiter::ConcurrencyLimiter;
use crate::metrics::{HealthLabels, MetricSink, Observation, one_hot};
use crate::model::{CheckStatus, NamespaceStub, ServiceIdentity, ServiceRegistration};
use log::{debug, error, warn};
use prometheus::IntCounter;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeSettings {
    /// Wall-clock budget of a whole cycle, shared by every call in it.
    pub max_duration: Duration,
    pub allow_stale: bool,
}

pub struct Exporter {
    client: Arc<dyn ClusterClient>,
    limiter: Arc<ConcurrencyLimiter>,
    errors: IntCounter,
    settings: ScrapeSettings,
    // Held for the whole cycle: pulls that overlap wait for the running one.
    cycle_cache: Mutex<Arc<DedupCache>>,
}

/// State of a single scrape cycle, dropped when the cycle ends.
struct Cycle {
    client: Arc<dyn ClusterClient>,
    limiter: Arc<ConcurrencyLimiter>,
    cache: Arc<DedupCache>,
    sink: Arc<dyn MetricSink>,
    opts: QueryOptions,
}

impl Exporter {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        limiter: Arc<ConcurrencyLimiter>,
        errors: IntCounter,
        settings: ScrapeSettings,
    ) -> Self {
        Self {
            client,
            limiter,
            errors,
            settings,
            cycle_cache: Mutex::new(Arc::new(DedupCache::new())),
        }
    }

    /// The process-wide `nomad_services_api_errors_total` counter.
    pub fn errors(&self) -> &IntCounter {
        &self.errors
    }

    /// Runs one scrape cycle, writing observations into `sink`.
    ///
    /// The error counter is always emitted last. The returned error is the
    /// first branch failure of the cycle; it has already been logged and
    /// counted.
    pub async fn collect(&self, sink: Arc<dyn MetricSink>) -> Result<()> {
        let cache = self.cycle_cache.lock().await;
        cache.reset();

        let opts = QueryOptions::with_timeout(self.settings.allow_stale, self.settings.max_duration);
        // Stops anything still waiting once the cycle returns.
        let _cancel = opts.cancel_on_drop();
        let started = Instant::now();

        let cycle = Arc::new(Cycle {
            client: Arc::clone(&self.client),
            limiter: Arc::clone(&self.limiter),
            cache: Arc::clone(&cache),
            sink: Arc::clone(&sink),
            opts,
        });

        let result = collect_services(cycle).await;
        if let Err(err) = &result {
            if err.is_cancellation() {
                error!(
                    "scrape did not finish within {:?}: {err}",
                    self.settings.max_duration
                );
            } else {
                error!("scrape error: {err}");
            }
            self.errors.inc();
        }

        sink.submit(Observation::ApiErrors {
            total: self.errors.get(),
        });
        debug!(
            "scrape cycle finished in {:?}, {} allocation(s) visited",
            started.elapsed(),
            cache.len()
        );
        result
    }
}

impl Cycle {
    /// Runs one API call under a limiter admission, failing fast once the
    /// cycle deadline has passed.
    async fn call<T, F>(&self, request: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            () = self.opts.cancelled() => Err(Error::DeadlineExceeded),
            result = async {
                let permit = self.limiter.acquire().await?;
                let result = request.await;
                permit.release();
                result
            } => result,
        }
    }
}

async fn collect_services(cycle: Arc<Cycle>) -> Result<()> {
    let stubs = cycle
        .call(cycle.client.list_service_stubs(&cycle.opts))
        .await?;

    let mut branches = JoinSet::new();
    for stub in stubs {
        cycle.sink.submit(Observation::Services {
            namespace: stub.namespace.clone(),
            count: stub.service_count() as u64,
        });
        branches.spawn(collect_namespace(Arc::clone(&cycle), stub));
    }
    join_branches(branches).await
}

async fn collect_namespace(cycle: Arc<Cycle>, stub: NamespaceStub) -> Result<()> {
    let mut branches = JoinSet::new();
    for service in stub.identities() {
        branches.spawn(collect_service(Arc::clone(&cycle), service));
    }
    join_branches(branches).await
}

async fn collect_service(cycle: Arc<Cycle>, service: ServiceIdentity) -> Result<()> {
    let registrations = match cycle
        .call(cycle.client.list_registrations(&service, &cycle.opts))
        .await
    {
        Ok(registrations) => registrations,
        Err(err) => {
            warn!("unable to list registrations of service {service}: {err}");
            return Err(err);
        }
    };

    let mut branches = JoinSet::new();
    for registration in registrations {
        // The same allocation can back several registrations; report it once.
        if !cycle.cache.try_claim(&registration.alloc_id) {
            continue;
        }
        branches.spawn(collect_allocation(Arc::clone(&cycle), registration));
    }
    join_branches(branches).await
}

async fn collect_allocation(cycle: Arc<Cycle>, registration: ServiceRegistration) -> Result<()> {
    let checks = match cycle
        .call(
            cycle
                .client
                .list_health_checks(&registration.alloc_id, &cycle.opts),
        )
        .await
    {
        Ok(checks) => checks,
        Err(err) => {
            warn!("unable to scrape allocation {}: {err}", registration.alloc_id);
            return Err(err);
        }
    };

    for check in checks.iter().filter(|check| check.is_reportable()) {
        if check.status == CheckStatus::Unknown {
            debug!(
                "skipping check {} of allocation {}: unknown status",
                check.id, registration.alloc_id
            );
            continue;
        }
        for observation in one_hot(HealthLabels::new(&registration, check), check.status) {
            cycle.sink.submit(observation);
        }
    }
    Ok(())
}

/// Waits for every branch and returns the first failure, if any.
async fn join_branches(mut branches: JoinSet<Result<()>>) -> Result<()> {
    let mut first = None;
    while let Some(joined) = branches.join_next().await {
        let Err(err) = joined.map_err(Error::from).and_then(|outcome| outcome) else {
            continue;
        };
        if first.is_none() {
            first = Some(err);
        } else {
            debug!("additional branch error: {err}");
        }
    }
    first.map_or(Ok(()), Err)
}
