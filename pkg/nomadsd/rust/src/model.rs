// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Nomad service discovery objects, decoded from the HTTP API's PascalCase JSON.

use serde::Deserialize;
use std::fmt;

/// Services registered in one namespace, as returned by `GET /v1/services`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NamespaceStub {
    pub namespace: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub services: Vec<ServiceStub>,
}

impl NamespaceStub {
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub fn identities(&self) -> impl Iterator<Item = ServiceIdentity> + '_ {
        self.services.iter().map(|svc| ServiceIdentity {
            namespace: self.namespace.clone(),
            service_name: svc.service_name.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceStub {
    pub service_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceIdentity {
    pub namespace: String,
    pub service_name: String,
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.service_name)
    }
}

/// One registration of a service instance, as returned by `GET /v1/service/:name`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceRegistration {
    #[serde(rename = "ID", default)]
    pub id: String,
    pub service_name: String,
    pub namespace: String,
    #[serde(rename = "NodeID", default)]
    pub node_id: String,
    #[serde(default)]
    pub datacenter: String,
    #[serde(rename = "JobID")]
    pub job_id: String,
    #[serde(rename = "AllocID")]
    pub alloc_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    Healthiness,
    Readiness,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Success,
    Failure,
    Pending,
    #[serde(other)]
    Unknown,
}

impl CheckStatus {
    /// The label values of the one-hot `status` dimension, in exposition order.
    pub const REPORTED: [CheckStatus; 3] =
        [CheckStatus::Success, CheckStatus::Failure, CheckStatus::Pending];

    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Success => "success",
            CheckStatus::Failure => "failure",
            CheckStatus::Pending => "pending",
            CheckStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one allocation check, as returned by
/// `GET /v1/client/allocation/:alloc_id/checks`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheckStatus {
    #[serde(rename = "ID")]
    pub id: String,
    pub check: String,
    #[serde(default)]
    pub group: String,
    pub mode: CheckMode,
    #[serde(default)]
    pub output: String,
    pub service: String,
    #[serde(default)]
    pub task: String,
    pub status: CheckStatus,
    #[serde(default)]
    pub status_code: i32,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(rename = "AllocID", default)]
    pub alloc_id: String,
}

impl HealthCheckStatus {
    /// Only healthiness checks are exported.
    pub fn is_reportable(&self) -> bool {
        self.mode == CheckMode::Healthiness
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
