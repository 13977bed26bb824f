// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::metrics::MetricsRegistry;
use anyhow::{Context, Result, anyhow};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use log::{debug, error, info};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

static NOTFOUND: &[u8] = b"Not found";
const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

type HttpBody = BoxBody<Bytes, std::io::Error>;

/// Routes served on the metrics listener.
pub struct MetricsServer {
    registry: MetricsRegistry,
    metrics_path: String,
    landing_page: Bytes,
}

impl MetricsServer {
    pub fn new(registry: MetricsRegistry, metrics_path: impl Into<String>) -> Self {
        let metrics_path = metrics_path.into();
        let landing_page = Bytes::from(landing_page(&metrics_path));
        Self {
            registry,
            metrics_path,
            landing_page,
        }
    }

    /// Accepts connections until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let server = Arc::new(self);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, peer) = accept_result.context("failed to accept connection")?;
                    debug!("accepted connection from {peer}");
                    let io = TokioIo::new(stream);
                    let server = Arc::clone(&server);

                    tokio::task::spawn(async move {
                        let service = service_fn(move |req| {
                            let server = Arc::clone(&server);
                            async move {
                                Ok::<_, anyhow::Error>(server.handle_request(req).await.unwrap_or_else(|e| {
                                    error!("Request handling failed: {e}");
                                    internal_error()
                                }))
                            }
                        });
                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                            error!("Error serving connection: {err}");
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("Shutting down metrics listener");
                    return Ok(());
                }
            }
        }
    }

    async fn handle_request<B>(&self, req: Request<B>) -> Result<Response<HttpBody>> {
        let method = req.method().clone();
        let on_metrics = req.uri().path() == self.metrics_path;
        match (&method, on_metrics) {
            (&Method::GET | &Method::HEAD, true) => {
                self.handle_metrics(method == Method::HEAD).await
            }
            (&Method::GET, false) => self.handle_landing(),
            _ => {
                info!("{} Request to unknown endpoint: {}", method, req.uri().path());
                not_found()
            }
        }
    }

    async fn handle_metrics(&self, head: bool) -> Result<Response<HttpBody>> {
        let text = match self.registry.render().await {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to encode metrics: {e}");
                return Ok(internal_error());
            }
        };

        let body = if head { empty() } else { full(Bytes::from(text)) };
        Response::builder()
            .header(CONTENT_TYPE, TEXT_FORMAT)
            .body(body)
            .map_err(|e| anyhow!("Failed to build metrics response: {}", e))
    }

    fn handle_landing(&self) -> Result<Response<HttpBody>> {
        Response::builder()
            .header(CONTENT_TYPE, "text/html; charset=utf-8")
            .body(full(self.landing_page.clone()))
            .map_err(|e| anyhow!("Failed to build landing page response: {}", e))
    }
}

fn landing_page(metrics_path: &str) -> String {
    format!(
        "<html>\n\
         <head><title>Nomad Service Discovery Exporter</title></head>\n\
         <body>\n\
         <h1>Nomad Service Discovery Exporter</h1>\n\
         <p><a href='{metrics_path}'>Metrics</a></p>\n\
         </body>\n\
         </html>\n"
    )
}

fn full(bytes: Bytes) -> HttpBody {
    Full::new(bytes).map_err(|e| match e {}).boxed()
}

fn empty() -> HttpBody {
    Empty::new().map_err(|e| match e {}).boxed()
}

fn not_found() -> Result<Response<HttpBody>> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(full(Bytes::from_static(NOTFOUND)))
        .map_err(|e| anyhow!("Failed to build not found response: {}", e))
}

fn internal_error() -> Response<HttpBody> {
    let mut response = Response::new(full(Bytes::from_static(b"Internal Server Error")));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landing_page_links_metrics_path() {
        let page = landing_page("/custom");
        assert!(page.contains("<title>Nomad Service Discovery Exporter</title>"));
        assert!(page.contains("<a href='/custom'>Metrics</a>"));
    }
}
