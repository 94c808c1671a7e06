// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The sender engine: a thread-safe pending buffer in front of the MINT
//! transport.
//!
//! Producers append lines from any thread; one periodic driver flushes.
//! `flush` atomically takes the buffered lines and installs a fresh buffer,
//! so lines added during partitioning land in the next batch instead of
//! being lost or duplicated.

use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, info};

use crate::batch::{self, Batch};
use crate::dynatrace::MintApi;
use crate::errors::{ConnectionError, SetupError};
use crate::metric::MetricLine;
use crate::util;

/// Everything needed to construct a [`MetricSender`].
pub struct SenderConfig {
    /// Instance label used as the prefix of every log line.
    pub name: String,
    pub ingest_url: String,
    /// Blank or absent means no `Authorization` header.
    pub api_token: Option<String>,
    /// Bound on the startup connection check.
    pub timeout: Duration,
    pub max_lines_per_message: usize,
    pub max_message_size_bytes: usize,
}

/// Composition root: owns the pending buffer and the transport.
pub struct MetricSender {
    name: String,
    max_lines_per_message: usize,
    max_message_size_bytes: usize,
    pending: Mutex<Vec<MetricLine>>,
    api: MintApi,
}

impl MetricSender {
    pub fn new(config: SenderConfig) -> Result<Self, SetupError> {
        let api = MintApi::new(
            config.name.clone(),
            &config.ingest_url,
            config.api_token.as_deref(),
            config.timeout,
        )?;
        Ok(MetricSender {
            name: config.name,
            max_lines_per_message: config.max_lines_per_message,
            max_message_size_bytes: config.max_message_size_bytes,
            pending: Mutex::new(Vec::new()),
            api,
        })
    }

    /// Appends a line to the pending buffer. Thread-safe, never blocks on
    /// network I/O, always succeeds.
    pub fn add_metric(&self, line: MetricLine) {
        debug!("{}: add_metric({})", self.name, line);
        #[allow(clippy::expect_used)]
        let mut pending = self.pending.lock().expect("lock poisoned");
        pending.push(line);
    }

    /// Takes ownership of everything currently pending, partitions it, and
    /// issues one send per batch, in order. Returns the number of lines
    /// taken; an empty buffer is a no-op.
    ///
    /// Must be called from within a Tokio runtime. Overlapping `flush`
    /// calls are not supported; invocation is expected to be serialized
    /// (one periodic driver plus one teardown call).
    pub fn flush(&self) -> usize {
        let taken = {
            #[allow(clippy::expect_used)]
            let mut pending = self.pending.lock().expect("lock poisoned");
            std::mem::take(&mut *pending)
        };
        if taken.is_empty() {
            return 0;
        }

        let batches = batch::split_messages(
            &taken,
            self.max_lines_per_message,
            self.max_message_size_bytes,
        );
        if batches.len() > 1 {
            info!(
                "{}: split the message into {} requests",
                self.name,
                batches.len()
            );
        }
        for batch in batches {
            self.api.send(batch);
        }
        taken.len()
    }

    /// Renders metadata lines into a single message and ships it directly,
    /// bypassing the pending buffer.
    pub fn send_metadata(&self, lines: &[MetricLine]) {
        if lines.is_empty() {
            return;
        }
        let body: String = lines
            .iter()
            .map(|line| format!("{}\n", line.render(true)))
            .collect();
        let line_count = util::line_count(&body);
        self.api.send(Batch::new(body, line_count));
        info!("{}: successfully sent metrics metadata", self.name);
    }

    /// Startup health check; see [`MintApi::check_connection`].
    pub async fn check_connection(&self) -> Result<(), ConnectionError> {
        self.api.check_connection().await
    }

    /// Final best-effort flush, then transport teardown.
    pub async fn destroy(&self) {
        let shipped = self.flush();
        if shipped > 0 {
            debug!("{}: flushed {} pending lines before teardown", self.name, shipped);
        }
        self.api.destroy().await;
    }
}

/// The fixed catalog of user-metric metadata lines registered once at
/// startup: unit, description and display name for every metric the load
/// harness reports.
pub fn standard_metadata() -> Vec<MetricLine> {
    vec![
        MetricLine::with_metadata(
            "jmeter.usermetrics.minactivethreads",
            "JMeter - min active threads",
            "count",
            "the minimum number of active threads",
        ),
        MetricLine::with_metadata(
            "jmeter.usermetrics.maxactivethreads",
            "JMeter - max active threads",
            "count",
            "the maximum number of active threads",
        ),
        MetricLine::with_metadata(
            "jmeter.usermetrics.meanactivethreads",
            "JMeter - mean active threads",
            "count",
            "the arithmetic mean of active threads",
        ),
        MetricLine::with_metadata(
            "jmeter.usermetrics.startedthreads",
            "JMeter - started threads",
            "count",
            "the number of started threads",
        ),
        MetricLine::with_metadata(
            "jmeter.usermetrics.finishedthreads",
            "JMeter - finished threads",
            "count",
            "the number of finished threads",
        ),
        MetricLine::with_metadata(
            "jmeter.usermetrics.transaction.count",
            "JMeter - number of requests",
            "count",
            "the total number of requests",
        ),
        MetricLine::with_metadata(
            "jmeter.usermetrics.transaction.success",
            "JMeter - successful requests",
            "count",
            "the number of successful requests",
        ),
        MetricLine::with_metadata(
            "jmeter.usermetrics.transaction.error",
            "JMeter - failed requests",
            "count",
            "the number of failed requests",
        ),
        MetricLine::with_metadata(
            "jmeter.usermetrics.transaction.hits",
            "JMeter - number of hits",
            "count",
            "the number of hits to the server",
        ),
        MetricLine::with_metadata(
            "jmeter.usermetrics.transaction.mintime",
            "JMeter - min response time",
            "MilliSecond",
            "the minimal elapsed time for requests within sliding window",
        ),
        MetricLine::with_metadata(
            "jmeter.usermetrics.transaction.maxtime",
            "JMeter - max response time",
            "MilliSecond",
            "the maximal elapsed time for requests within sliding window",
        ),
        MetricLine::with_metadata(
            "jmeter.usermetrics.transaction.meantime",
            "JMeter - mean response time",
            "MilliSecond",
            "the arithmetic mean of the elapsed time",
        ),
        MetricLine::with_metadata(
            "jmeter.usermetrics.transaction.sentbytes",
            "JMeter - sent bytes",
            "Byte",
            "the number of sent bytes",
        ),
        MetricLine::with_metadata(
            "jmeter.usermetrics.transaction.receivedbytes",
            "JMeter - received bytes",
            "Byte",
            "the number of received bytes",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MAX_LINES_PER_MESSAGE, MAX_MESSAGE_SIZE_BYTES};

    fn test_config(ingest_url: &str) -> SenderConfig {
        SenderConfig {
            name: "test sender".to_string(),
            ingest_url: ingest_url.to_string(),
            api_token: Some("mock-token".to_string()),
            timeout: Duration::from_secs(1),
            max_lines_per_message: MAX_LINES_PER_MESSAGE,
            max_message_size_bytes: MAX_MESSAGE_SIZE_BYTES,
        }
    }

    #[test]
    fn test_new_rejects_malformed_url() {
        let result = MetricSender::new(test_config("::not-a-url::"));
        assert!(matches!(result, Err(SetupError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_flush_empty_buffer_is_noop() {
        let sender = MetricSender::new(test_config("http://127.0.0.1:1/ingest"))
            .expect("valid url");
        assert_eq!(sender.flush(), 0);
    }

    #[test]
    fn test_standard_metadata_catalog() {
        let catalog = standard_metadata();
        assert_eq!(catalog.len(), 14);
        assert!(catalog.iter().all(MetricLine::is_metadata));
        assert_eq!(
            catalog[0].render(true),
            "#jmeter.usermetrics.minactivethreads gauge dt.meta.unit=\"count\",\
             dt.meta.description=\"the minimum number of active threads\",\
             dt.meta.displayname=\"JMeter - min active threads\""
        );
    }
}
