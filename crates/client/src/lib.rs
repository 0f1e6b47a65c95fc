// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mill-client: HTTP clients for the bucket, results, and pipelines
//! services, plus the retry and transport plumbing they share.

pub mod bucket;
pub mod pipelines;
pub mod queue;
pub mod results;
pub mod retry;
pub mod transport;

pub use bucket::BucketClient;
pub use pipelines::PipelinesClient;
pub use queue::{QueueError, ScanQuery, WorkQueue};
pub use results::{ResultsClient, ResultsStore};
pub use retry::RetryPolicy;
pub use transport::{Transport, TransportError};

#[cfg(any(test, feature = "test-support"))]
pub use queue::FakeBucket;
#[cfg(any(test, feature = "test-support"))]
pub use results::FakeResults;
