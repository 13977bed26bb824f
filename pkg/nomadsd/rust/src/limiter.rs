// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::errors::{Error, Result};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds the number of in-flight Nomad API calls across every scrape cycle.
///
/// One admission covers a single call, never a whole subtree of the fan-out.
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// An admission held for the duration of one API call.
#[derive(Debug)]
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
}

impl LimiterPermit {
    pub fn release(self) {}
}

impl ConcurrencyLimiter {
    pub fn new(capacity: NonZeroUsize) -> Self {
        let capacity = capacity.get();
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits until fewer than `capacity` admissions are held.
    pub async fn acquire(&self) -> Result<LimiterPermit> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| Error::LimiterClosed)?;
        Ok(LimiterPermit { _permit: permit })
    }

    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    /// Refuses every pending and future admission. Admissions already granted
    /// stay valid until released.
    pub fn close(&self) {
        self.semaphore.close();
    }
}
