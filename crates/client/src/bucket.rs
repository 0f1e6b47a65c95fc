// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the bucket (work queue) service.

use crate::queue::{QueueError, ScanQuery, WorkQueue};
use crate::retry::RetryPolicy;
use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use mill_core::{WithdrawFilter, Work};
use mill_workspace::{Service, Workspace};
use reqwest::{Method, StatusCode};
use serde_json::Value;

pub struct BucketClient {
    transport: Transport,
    retry: RetryPolicy,
}

impl BucketClient {
    pub fn new(workspace: &Workspace) -> Result<Self, TransportError> {
        Ok(Self {
            transport: Transport::new("buckets", workspace.baseurls(Service::Buckets))?,
            retry: RetryPolicy::default(),
        })
    }

    /// Override the retry policy (tests use [`RetryPolicy::none`]).
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn send_retrying(
        &self,
        label: &str,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<reqwest::Response, TransportError> {
        self.retry
            .run(
                label,
                || self.transport.send(method.clone(), path, query, body),
                TransportError::is_transient,
            )
            .await
    }
}

#[async_trait]
impl WorkQueue for BucketClient {
    async fn deposit(&self, work: Vec<Work>) -> Result<Vec<String>, QueueError> {
        let body = serde_json::to_value(&work)
            .map_err(|e| QueueError::BadResponse(e.to_string()))?;
        let response = self
            .send_retrying("bucket.deposit", Method::POST, "/work", &[], Some(&body))
            .await?;
        let ids: Vec<String> = response
            .json()
            .await
            .map_err(|e| QueueError::BadResponse(e.to_string()))?;
        Ok(ids)
    }

    async fn withdraw(
        &self,
        pipeline: &str,
        filter: &WithdrawFilter,
    ) -> Result<Option<Work>, QueueError> {
        let mut query = vec![("pipeline".to_string(), pipeline.to_string())];
        query.extend(filter.to_query());
        let response = self
            .send_retrying(
                "bucket.withdraw",
                Method::GET,
                "/work/withdraw",
                &query,
                None,
            )
            .await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let work: Work = response
            .json()
            .await
            .map_err(|e| QueueError::BadResponse(e.to_string()))?;
        Ok(Some(work))
    }

    async fn update(&self, work: &Work) -> Result<(), QueueError> {
        let id = work.id.as_deref().ok_or(QueueError::MissingId)?;
        let body = serde_json::to_value(work)
            .map_err(|e| QueueError::BadResponse(e.to_string()))?;
        self.send_retrying(
            "bucket.update",
            Method::PUT,
            &format!("/work/{id}"),
            &[],
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<(), QueueError> {
        if ids.is_empty() {
            return Ok(());
        }
        let query = vec![("ids".to_string(), ids.join(","))];
        self.send_retrying("bucket.delete", Method::DELETE, "/work", &query, None)
            .await?;
        Ok(())
    }

    async fn scan(&self, pipeline: &str, query: &ScanQuery) -> Result<Vec<Work>, QueueError> {
        let mut params = vec![("pipeline".to_string(), pipeline.to_string())];
        if let Some(site) = &query.site {
            params.push(("site".to_string(), site.clone()));
        }
        if !query.statuses.is_empty() {
            let statuses: Vec<String> =
                query.statuses.iter().map(|s| s.to_string()).collect();
            params.push(("status".to_string(), statuses.join(",")));
        }
        if query.limit > 0 {
            params.push(("limit".to_string(), query.limit.to_string()));
        }
        let response = self
            .send_retrying("bucket.scan", Method::GET, "/work", &params, None)
            .await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        let work: Vec<Work> = response
            .json()
            .await
            .map_err(|e| QueueError::BadResponse(e.to_string()))?;
        Ok(work)
    }
}
