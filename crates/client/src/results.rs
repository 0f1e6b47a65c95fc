// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the results (long-term store) service.

use crate::queue::QueueError;
use crate::retry::RetryPolicy;
use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use mill_core::Work;
use mill_workspace::{Service, Workspace};
use reqwest::Method;

/// Deposit side of the results service, as seen by the transfer daemon.
#[async_trait]
pub trait ResultsStore: Send + Sync {
    async fn deposit(&self, work: &Work) -> Result<(), QueueError>;
}

pub struct ResultsClient {
    transport: Transport,
    retry: RetryPolicy,
}

impl ResultsClient {
    pub fn new(workspace: &Workspace) -> Result<Self, TransportError> {
        Ok(Self {
            transport: Transport::new("results", workspace.baseurls(Service::Results))?,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Query stored results.
    pub async fn get(&self, query: &str) -> Result<Vec<Work>, QueueError> {
        let path = format!("/results/{query}");
        let response = self
            .retry
            .run(
                "results.get",
                || self.transport.send(Method::GET, &path, &[], None),
                TransportError::is_transient,
            )
            .await?;
        let work: Vec<Work> = response
            .json()
            .await
            .map_err(|e| QueueError::BadResponse(e.to_string()))?;
        Ok(work)
    }
}

#[async_trait]
impl ResultsStore for ResultsClient {
    /// Deposit a terminal work item into the long-term store.
    async fn deposit(&self, work: &Work) -> Result<(), QueueError> {
        let body =
            serde_json::to_value(work).map_err(|e| QueueError::BadResponse(e.to_string()))?;
        self.retry
            .run(
                "results.deposit",
                || self.transport.send(Method::POST, "/results", &[], Some(&body)),
                TransportError::is_transient,
            )
            .await?;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeResults;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;

    /// In-memory results store.
    #[derive(Default)]
    pub struct FakeResults {
        items: Mutex<Vec<Work>>,
    }

    impl FakeResults {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn all(&self) -> Vec<Work> {
            self.items.lock().clone()
        }

        pub fn len(&self) -> usize {
            self.items.lock().len()
        }

        pub fn is_empty(&self) -> bool {
            self.items.lock().is_empty()
        }
    }

    #[async_trait]
    impl ResultsStore for FakeResults {
        async fn deposit(&self, work: &Work) -> Result<(), QueueError> {
            self.items.lock().push(work.clone());
            Ok(())
        }
    }
}
