// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Port to the cluster's service discovery API.
//! The production implementation lives in `nomad.rs`.

use crate::errors::Result;
use crate::model::{HealthCheckStatus, NamespaceStub, ServiceIdentity, ServiceRegistration};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Per-cycle query context shared by every outgoing call.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub allow_stale: bool,
    deadline: Instant,
    token: CancellationToken,
}

impl QueryOptions {
    pub fn with_timeout(allow_stale: bool, timeout: Duration) -> Self {
        Self {
            allow_stale,
            deadline: Instant::now() + timeout,
            token: CancellationToken::new(),
        }
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Resolves once the deadline elapses or the context is cancelled explicitly.
    pub async fn cancelled(&self) {
        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = sleep_until(self.deadline) => {}
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancels the context when the returned guard is dropped.
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }
}

#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// List the service stubs of every namespace visible with the configured filter.
    async fn list_service_stubs(&self, opts: &QueryOptions) -> Result<Vec<NamespaceStub>>;

    /// List the registrations of one service.
    async fn list_registrations(
        &self,
        service: &ServiceIdentity,
        opts: &QueryOptions,
    ) -> Result<Vec<ServiceRegistration>>;

    /// List the check results reported by one allocation.
    async fn list_health_checks(
        &self,
        alloc_id: &str,
        opts: &QueryOptions,
    ) -> Result<Vec<HealthCheckStatus>>;
}
