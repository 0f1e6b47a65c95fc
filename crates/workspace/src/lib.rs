// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mill-workspace: resolves a named environment into service endpoints,
//! allowed sites, archive storage, and policy toggles.

pub mod document;
pub mod resolve;

pub use document::{ArchiveStorage, ArchiveToggles, S3Site, Service, Workspace};
pub use resolve::{load_active, resolve, save_active, WorkspaceError};
