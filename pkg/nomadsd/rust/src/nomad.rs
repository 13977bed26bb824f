// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! [`ClusterClient`] backed by the Nomad HTTP API.

use crate::client::{ClusterClient, QueryOptions};
use crate::errors::{Error, Result};
use crate::model::{HealthCheckStatus, NamespaceStub, ServiceIdentity, ServiceRegistration};
use async_trait::async_trait;
use log::debug;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;

const TOKEN_HEADER: &str = "X-Nomad-Token";
const MAX_ERROR_BODY: usize = 256;

#[derive(Clone, PartialEq, Eq)]
pub struct NomadSettings {
    pub address: Url,
    pub region: Option<String>,
    /// Namespace filter for the service listing; `*` lists every namespace.
    pub namespace: Option<String>,
    pub token: Option<String>,
}

impl fmt::Debug for NomadSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NomadSettings")
            .field("address", &self.address.as_str())
            .field("region", &self.region)
            .field("namespace", &self.namespace)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

pub struct NomadClient {
    http: reqwest::Client,
    settings: NomadSettings,
}

impl NomadClient {
    pub fn new(settings: NomadSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("nomad-sd-exporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| Error::Request {
                endpoint: settings.address.to_string(),
                source,
            })?;
        Ok(Self { http, settings })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.settings.address.clone();
        // Only fails for cannot-be-a-base URLs, which the config rejects.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, url: Url, namespace: Option<&str>, opts: &QueryOptions) -> RequestBuilder {
        let mut query: Vec<(&str, &str)> = Vec::with_capacity(3);
        if let Some(region) = self.settings.region.as_deref() {
            query.push(("region", region));
        }
        if let Some(namespace) = namespace {
            query.push(("namespace", namespace));
        }
        if opts.allow_stale {
            query.push(("stale", ""));
        }

        let mut builder = self.http.get(url).query(&query).timeout(opts.remaining());
        if let Some(token) = self.settings.token.as_deref() {
            builder = builder.header(TOKEN_HEADER, token);
        }
        builder
    }

    async fn get_json<T: DeserializeOwned>(&self, builder: RequestBuilder, endpoint: &str) -> Result<T> {
        debug!("GET {endpoint}");
        let request_error = |source: reqwest::Error| Error::Request {
            endpoint: endpoint.to_string(),
            source,
        };

        let response = builder.send().await.map_err(request_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(request_error)?;

        if !status.is_success() {
            let mut text = String::from_utf8_lossy(&body).trim().to_string();
            if text.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                text.truncate(cut);
            }
            return Err(Error::UnexpectedStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_slice(&body).map_err(|source| Error::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[async_trait]
impl ClusterClient for NomadClient {
    async fn list_service_stubs(&self, opts: &QueryOptions) -> Result<Vec<NamespaceStub>> {
        let url = self.endpoint(&["v1", "services"]);
        let endpoint = url.path().to_string();
        let builder = self.request(url, self.settings.namespace.as_deref(), opts);
        // Nomad answers `null` when nothing is registered.
        let stubs: Option<Vec<NamespaceStub>> = self.get_json(builder, &endpoint).await?;
        Ok(stubs.unwrap_or_default())
    }

    async fn list_registrations(
        &self,
        service: &ServiceIdentity,
        opts: &QueryOptions,
    ) -> Result<Vec<ServiceRegistration>> {
        let url = self.endpoint(&["v1", "service", &service.service_name]);
        let endpoint = url.path().to_string();
        let builder = self.request(url, Some(&service.namespace), opts);
        let registrations: Option<Vec<ServiceRegistration>> =
            self.get_json(builder, &endpoint).await?;
        Ok(registrations.unwrap_or_default())
    }

    async fn list_health_checks(
        &self,
        alloc_id: &str,
        opts: &QueryOptions,
    ) -> Result<Vec<HealthCheckStatus>> {
        let url = self.endpoint(&["v1", "client", "allocation", alloc_id, "checks"]);
        let endpoint = url.path().to_string();
        let builder = self.request(url, None, opts);
        let checks: Option<HashMap<String, HealthCheckStatus>> =
            self.get_json(builder, &endpoint).await?;

        let mut checks: Vec<HealthCheckStatus> = checks.unwrap_or_default().into_values().collect();
        checks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(checks)
    }
}
