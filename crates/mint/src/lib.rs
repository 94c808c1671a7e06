// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client library for shipping metrics to a Dynatrace MINT ingest endpoint.
//!
//! Metric lines accumulate in a pending buffer, get partitioned into
//! wire-sized batches, and are shipped asynchronously over HTTP. Sends are
//! fire-and-forget: per-send failures are logged, never raised, and no batch
//! is ever retried or requeued.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batch;
pub mod constants;
pub mod dynatrace;
pub mod errors;
pub mod metric;
pub mod sanitize;
pub mod sender;
pub mod util;
