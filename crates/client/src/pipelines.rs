// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the pipelines manager service.
//!
//! Configurations with a schedule live under `/schedules`; unscheduled
//! ones under `/pipelines`. The shapes are identical.

use crate::queue::QueueError;
use crate::retry::RetryPolicy;
use crate::transport::{Transport, TransportError};
use mill_workspace::{Service, Workspace};
use reqwest::Method;
use serde_json::Value;

pub struct PipelinesClient {
    transport: Transport,
    retry: RetryPolicy,
    /// Route under `/schedules` instead of `/pipelines`
    scheduled: bool,
}

impl PipelinesClient {
    pub fn new(workspace: &Workspace) -> Result<Self, TransportError> {
        Ok(Self {
            transport: Transport::new("pipelines", workspace.baseurls(Service::Pipelines))?,
            retry: RetryPolicy::default(),
            scheduled: false,
        })
    }

    /// Route requests under `/schedules`.
    pub fn scheduled(mut self) -> Self {
        self.scheduled = true;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn root(&self) -> &'static str {
        if self.scheduled {
            "/schedules"
        } else {
            "/pipelines"
        }
    }

    async fn send_retrying(
        &self,
        label: &str,
        method: Method,
        path: String,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, QueueError> {
        Ok(self
            .retry
            .run(
                label,
                || self.transport.send(method.clone(), &path, &[], body),
                TransportError::is_transient,
            )
            .await?)
    }

    /// Register a configuration; returns the assigned id.
    pub async fn create(&self, config: &Value) -> Result<String, QueueError> {
        let response = self
            .send_retrying(
                "pipelines.create",
                Method::POST,
                self.root().to_string(),
                Some(config),
            )
            .await?;
        let id: String = response
            .json()
            .await
            .map_err(|e| QueueError::BadResponse(e.to_string()))?;
        Ok(id)
    }

    pub async fn list(&self) -> Result<Vec<Value>, QueueError> {
        let response = self
            .send_retrying("pipelines.list", Method::GET, self.root().to_string(), None)
            .await?;
        response
            .json()
            .await
            .map_err(|e| QueueError::BadResponse(e.to_string()))
    }

    pub async fn get(&self, id: &str) -> Result<Value, QueueError> {
        let response = self
            .send_retrying(
                "pipelines.get",
                Method::GET,
                format!("{}/{id}", self.root()),
                None,
            )
            .await?;
        response
            .json()
            .await
            .map_err(|e| QueueError::BadResponse(e.to_string()))
    }

    /// Stop a running configuration.
    pub async fn stop(&self, id: &str) -> Result<(), QueueError> {
        self.send_retrying(
            "pipelines.stop",
            Method::POST,
            format!("{}/{id}/stop", self.root()),
            None,
        )
        .await?;
        Ok(())
    }

    /// Remove a configuration.
    pub async fn remove(&self, id: &str) -> Result<(), QueueError> {
        self.send_retrying(
            "pipelines.remove",
            Method::DELETE,
            format!("{}/{id}", self.root()),
            None,
        )
        .await?;
        Ok(())
    }
}
