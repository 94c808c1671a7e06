// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors raised while establishing the transport.
///
/// Any of these is fatal to the engine's enabled state: the caller should
/// disable sending rather than retry.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("invalid ingest url: {0}")]
    InvalidUrl(String),

    #[error("failed to build http client")]
    ClientBuild(#[from] reqwest::Error),
}

/// Errors raised by the startup connection check.
///
/// Raised only by `check_connection`; the caller is expected to disable the
/// engine for the remainder of the run, not retry.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("connection check rejected by MINT server: invalid token")]
    Authentication,

    #[error("connection check rejected by MINT server: invalid url")]
    Endpoint,

    #[error("connection check for MINT server failed: {0}")]
    Check(String),
}
