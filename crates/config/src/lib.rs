// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! insights-config: allow-list manager and service configuration files

mod allow_list;
mod service;

pub use allow_list::{AllowListManager, ConfigError, RESERVED_NAMES};
pub use service::{DatabaseSection, ListenSection, ServiceFile, TimeoutsSection};
