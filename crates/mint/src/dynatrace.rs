// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP transport to the MINT ingest endpoint.
//!
//! One pooled client and one fixed POST target are reused for every request.
//! Data sends are fire-and-forget: the request is issued immediately and a
//! spawned completion task observes the outcome. At most one in-flight send
//! is tracked at a time; `destroy` waits (bounded) on the most recently
//! issued one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::batch::Batch;
use crate::constants::{CONNECT_TIMEOUT, DESTROY_WAIT, MAX_CONNECTIONS, REQUEST_TIMEOUT};
use crate::errors::{ConnectionError, SetupError};

/// Summary counts from the ingest response body. Deserialized for log detail
/// only; all decisions are made on the status code.
#[derive(Debug, Deserialize)]
struct IngestResponse {
    #[serde(rename = "linesOk", default)]
    lines_ok: u64,
    #[serde(rename = "linesInvalid", default)]
    lines_invalid: u64,
}

/// Immutable outcome context captured when a send is issued, so overlapping
/// completions cannot cross-report.
#[derive(Debug, Clone, Copy)]
struct SendContext {
    batch_id: u64,
    line_count: usize,
    byte_size: usize,
}

/// Transport session for one ingest endpoint.
pub struct MintApi {
    name: String,
    client: reqwest::Client,
    url: reqwest::Url,
    token: Option<String>,
    check_timeout: Duration,
    batch_counter: AtomicU64,
    // Most recently issued data send. A newer send replaces the handle
    // without waiting; the replaced request still completes and logs on its
    // own.
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl MintApi {
    /// Establishes the pooled client and the reusable request target.
    pub fn new(
        name: impl Into<String>,
        ingest_url: &str,
        api_token: Option<&str>,
        check_timeout: Duration,
    ) -> Result<Self, SetupError> {
        let name = name.into();
        let url = reqwest::Url::parse(ingest_url)
            .map_err(|e| SetupError::InvalidUrl(format!("{ingest_url}: {e}")))?;
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(MAX_CONNECTIONS)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(SetupError::ClientBuild)?;
        let token = api_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);

        debug!("{}: created MINT transport for url {}", name, url);
        Ok(MintApi {
            name,
            client,
            url,
            token,
            check_timeout,
            batch_counter: AtomicU64::new(0),
            in_flight: Mutex::new(None),
        })
    }

    fn post(&self, body: String) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Api-token {token}"));
        }
        request
    }

    /// Sends an empty-body request and classifies the response, deciding
    /// whether the engine should keep sending for this run.
    ///
    /// Blocks the caller for at most the configured check timeout. The
    /// response is awaited directly and never occupies the in-flight slot.
    pub async fn check_connection(&self) -> Result<(), ConnectionError> {
        debug!("{}: sending empty metrics", self.name);
        let response = match tokio::time::timeout(self.check_timeout, self.post(String::new()).send())
            .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("{}: error executing connection check for MINT server: {}", self.name, e);
                return Err(ConnectionError::Check(e.to_string()));
            }
            Err(_) => {
                warn!("{}: connection check for MINT server timed out", self.name);
                return Err(ConnectionError::Check(
                    "timed out waiting for response".to_string(),
                ));
            }
        };

        let status = response.status();
        if is_success_status(status) {
            debug!("{}: successfully checked connection", self.name);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(
            "{}: error writing metrics to MINT url {}, status: {}, body: {}",
            self.name, self.url, status, body
        );
        match status.as_u16() {
            // the server's documented reply to an empty request
            400 => Ok(()),
            401 => Err(ConnectionError::Authentication),
            404 | 405 => Err(ConnectionError::Endpoint),
            _ => Err(ConnectionError::Check(format!("unexpected status {status}"))),
        }
    }

    /// Issues the request for one batch and returns immediately.
    ///
    /// The spawned completion task observes the response and logs it; a
    /// failed send is never retried, requeued or surfaced to the caller.
    /// Must be called from within a Tokio runtime.
    pub fn send(&self, batch: Batch) {
        let context = SendContext {
            batch_id: self.batch_counter.fetch_add(1, Ordering::Relaxed),
            line_count: batch.line_count(),
            byte_size: batch.byte_size(),
        };
        debug!(
            "{}: sending batch {} ({} lines, {} bytes)",
            self.name, context.batch_id, context.line_count, context.byte_size
        );

        let request = self.post(batch.into_body());
        let name = self.name.clone();
        let url = self.url.clone();
        let handle = tokio::spawn(async move {
            match request.send().await {
                Ok(response) => observe_response(&name, &url, context, response).await,
                Err(e) => {
                    error!("{}: failed to send data to MINT server: {}", name, e);
                }
            }
        });

        #[allow(clippy::expect_used)]
        let mut in_flight = self.in_flight.lock().expect("lock poisoned");
        *in_flight = Some(handle);
    }

    /// Waits (bounded) for the last tracked send, aborting it on timeout,
    /// then lets the pooled client go down with the session.
    ///
    /// Wait failures are logged, never propagated: teardown always completes.
    pub async fn destroy(&self) {
        info!("{}: destroying", self.name);

        let last = {
            #[allow(clippy::expect_used)]
            let mut in_flight = self.in_flight.lock().expect("lock poisoned");
            in_flight.take()
        };
        if let Some(handle) = last {
            let abort = handle.abort_handle();
            match tokio::time::timeout(DESTROY_WAIT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(
                        "{}: error waiting for last request to be sent to MINT server: {}",
                        self.name, e
                    );
                }
                Err(_) => {
                    abort.abort();
                    error!(
                        "{}: error waiting for last request to be sent to MINT server: timed out",
                        self.name
                    );
                }
            }
        }
    }
}

async fn observe_response(
    name: &str,
    url: &reqwest::Url,
    context: SendContext,
    response: reqwest::Response,
) {
    let status = response.status();
    if is_success_status(status) {
        info!(
            "{}: success, number of metrics written: {}",
            name, context.line_count
        );
        debug!(
            "{}: batch {} accepted ({} bytes)",
            name, context.batch_id, context.byte_size
        );
        return;
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<IngestResponse>(&body) {
        Ok(summary) => error!(
            "{}: error writing metrics to MINT url {}, status: {}, lines ok: {}, lines invalid: {}",
            name, url, status, summary.lines_ok, summary.lines_invalid
        ),
        Err(_) => error!(
            "{}: error writing metrics to MINT url {}, status: {}, body: {}",
            name, url, status, body
        ),
    }
    info!(
        "{}: batch {} dropped ({} lines)",
        name, context.batch_id, context.line_count
    );
}

fn is_success_status(status: StatusCode) -> bool {
    (200..400).contains(&status.as_u16())
}
