// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Maximum number of metric lines in a single ingest request body.
pub const MAX_LINES_PER_MESSAGE: usize = 1000;

/// Maximum byte size of a single ingest request body.
pub const MAX_MESSAGE_SIZE_BYTES: usize = 1_048_576;

/// Ceiling on pooled connections to the ingest endpoint.
pub const MAX_CONNECTIONS: usize = 10;

/// TCP connect timeout, also the bound on the startup connection check.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-request timeout once a connection is established.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long `destroy` waits for the last in-flight request.
pub const DESTROY_WAIT: Duration = Duration::from_secs(5);
