// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection-pooled HTTP transport over a list of candidate base URLs.
//!
//! Each service is configured with one or more base URLs. The transport
//! probes them in order with a bounded health check, caches the first
//! responsive one, and evicts the cache when a request-level failure
//! suggests the endpoint went away.

use parking_lot::Mutex;
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Bound on a single health probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Socket-level connect bound.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Whole-request read bound.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("service {0} has no configured base URLs")]
    NoBaseurls(String),
    #[error("service {0}: no base URL responded to a health probe")]
    Unreachable(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} returned {status}: {body}")]
    Status {
        service: String,
        status: StatusCode,
        body: String,
    },
}

impl TransportError {
    /// Connection problems, timeouts, and 5xx responses are transient;
    /// 4xx responses are final.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::NoBaseurls(_) => false,
            TransportError::Unreachable(_) => true,
            TransportError::Http(_) => true,
            TransportError::Status { status, .. } => status.is_server_error(),
        }
    }
}

/// Pooled client bound to one service's candidate base URLs.
#[derive(Debug)]
pub struct Transport {
    client: reqwest::Client,
    service: String,
    baseurls: Vec<String>,
    /// Index of the last responsive base URL
    active: Mutex<Option<usize>>,
}

impl Transport {
    pub fn new(
        service: impl Into<String>,
        baseurls: &[String],
    ) -> Result<Self, TransportError> {
        let service = service.into();
        if baseurls.is_empty() {
            return Err(TransportError::NoBaseurls(service));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            service,
            baseurls: baseurls
                .iter()
                .map(|u| u.trim_end_matches('/').to_string())
                .collect(),
            active: Mutex::new(None),
        })
    }

    /// The service label this transport talks to.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// First responsive base URL, probing if nothing is cached.
    ///
    /// A candidate counts as responsive if it answers the probe at all;
    /// the status code does not matter, only that something is listening.
    pub async fn base(&self) -> Result<String, TransportError> {
        if let Some(index) = *self.active.lock() {
            return Ok(self.baseurls[index].clone());
        }
        for (index, url) in self.baseurls.iter().enumerate() {
            let probe = self
                .client
                .head(format!("{url}/"))
                .timeout(PROBE_TIMEOUT)
                .send()
                .await;
            match probe {
                Ok(_) => {
                    tracing::debug!(service = %self.service, url = %url, "selected base URL");
                    *self.active.lock() = Some(index);
                    return Ok(url.clone());
                }
                Err(e) => {
                    tracing::debug!(service = %self.service, url = %url, error = %e, "probe failed");
                }
            }
        }
        Err(TransportError::Unreachable(self.service.clone()))
    }

    /// Forget the cached base URL after a request-level failure.
    fn evict(&self) {
        *self.active.lock() = None;
    }

    /// Send one request; classify the outcome.
    ///
    /// Connection failures evict the cached base URL so the next call
    /// re-probes. 5xx responses are surfaced as transient, 4xx as final.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Response, TransportError> {
        let base = self.base().await?;
        let mut request = self.client.request(method, format!("{base}{path}"));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(json) = body {
            request = request.json(json);
        }
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                self.evict();
                return Err(TransportError::Http(e));
            }
        };
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            if status.is_server_error() {
                self.evict();
            }
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                service: self.service.clone(),
                status,
                body,
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
