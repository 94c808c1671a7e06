// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Configuration and lifecycle for the MINT metric shipper.
//!
//! Wraps the `mint` sender engine with environment-driven configuration and
//! a managed run loop: startup connection check (a failure disables sending
//! for the rest of the run), periodic flushing, and graceful shutdown
//! draining.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod error;
pub mod services;
