// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mill-core: the Work entity, its lifecycle, and validation.

pub mod clock;
pub mod config;
pub mod merge;
pub mod status;
pub mod validate;
pub mod work;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ArchiveConfig, ArchiveMode, NotifyConfig, WorkConfig};
pub use status::WorkStatus;
pub use validate::{normalize_pipeline, validate, Strategy, ValidationError};
pub use work::{Payload, WithdrawFilter, Work};
