// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{config::ShipperConfig, error::ShipperError};
use mint::constants::CONNECT_TIMEOUT;
use mint::sender::{standard_metadata, MetricSender, SenderConfig};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

/// Status of the metric shipper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipperStatus {
    /// The shipper is starting up.
    Starting,
    /// The shipper is running and flushing on schedule.
    Running,
    /// The startup connection check failed (or the shipper was configured
    /// off); nothing will be sent for the remainder of the run.
    Disabled,
    /// The shipper is shutting down.
    Stopping,
    /// The shipper has stopped.
    Stopped,
}

/// Handle to the running shipper.
///
/// Producers reach the sender engine through [`ShipperHandle::sender`]; the
/// handle also allows checking the status and stopping the shipper.
#[derive(Clone)]
pub struct ShipperHandle {
    sender: Arc<MetricSender>,
    status: Arc<RwLock<ShipperStatus>>,
    status_tx: broadcast::Sender<ShipperStatus>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ShipperHandle {
    /// The shared sender engine; `add_metric` is safe from any thread.
    pub fn sender(&self) -> Arc<MetricSender> {
        Arc::clone(&self.sender)
    }

    /// Check if the shipper is currently running (and not disabled).
    pub async fn is_running(&self) -> bool {
        matches!(*self.status.read().await, ShipperStatus::Running)
    }

    /// Get a receiver for status updates.
    pub fn status_receiver(&self) -> broadcast::Receiver<ShipperStatus> {
        self.status_tx.subscribe()
    }

    /// Stop the shipper, draining pending metrics first.
    pub async fn stop(&self) -> Result<(), ShipperError> {
        let mut status = self.status.write().await;
        if *status == ShipperStatus::Stopped {
            return Ok(());
        }

        *status = ShipperStatus::Stopping;
        drop(status);

        // Signal shutdown; the run loop drains and destroys the sender.
        let _ = self.shutdown_tx.send(());

        Ok(())
    }
}

/// Lifecycle coordinator for the metric shipper.
pub struct ShipperServices {
    config: ShipperConfig,
}

impl ShipperServices {
    /// Create a new ShipperServices instance.
    pub fn new(config: ShipperConfig) -> Self {
        Self { config }
    }

    /// Start the shipper.
    ///
    /// Builds the sender engine, runs the startup connection check (a
    /// failure disables sending for the rest of the run rather than
    /// aborting), then drives periodic flushes until [`ShipperHandle::stop`]
    /// is called. Returns a handle for producers and lifecycle control.
    pub async fn start(self) -> Result<ShipperHandle, ShipperError> {
        self.config.validate()?;

        let sender = MetricSender::new(SenderConfig {
            name: self.config.name.clone(),
            ingest_url: self.config.ingest_url.clone(),
            api_token: Some(self.config.api_token.clone()),
            timeout: CONNECT_TIMEOUT,
            max_lines_per_message: self.config.max_lines_per_message,
            max_message_size_bytes: self.config.max_message_size_bytes,
        })
        .map_err(|e| ShipperError::SenderStart(e.to_string()))?;
        let sender = Arc::new(sender);

        let status = Arc::new(RwLock::new(ShipperStatus::Starting));
        let (status_tx, _status_rx) = broadcast::channel(16);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(16);

        let handle = ShipperHandle {
            sender: Arc::clone(&sender),
            status: Arc::clone(&status),
            status_tx: status_tx.clone(),
            shutdown_tx,
        };

        // Spawn the run loop
        let status_clone = Arc::clone(&status);
        let config = self.config;
        tokio::spawn(async move {
            run_shipper(config, sender, shutdown_rx, Arc::clone(&status_clone), status_tx).await;
            // Ensure we mark as stopped on any exit path
            let mut s = status_clone.write().await;
            *s = ShipperStatus::Stopped;
        });

        // Wait for the shipper to leave the Starting state
        let mut timeout = tokio::time::interval(std::time::Duration::from_millis(100));
        for _ in 0..50 {
            timeout.tick().await;
            if *status.read().await != ShipperStatus::Starting {
                break;
            }
        }

        Ok(handle)
    }
}

async fn run_shipper(
    config: ShipperConfig,
    sender: Arc<MetricSender>,
    mut shutdown_rx: broadcast::Receiver<()>,
    status: Arc<RwLock<ShipperStatus>>,
    status_tx: broadcast::Sender<ShipperStatus>,
) {
    let mut enabled = config.enabled;
    info!("{}: configured enabled state {}", config.name, enabled);

    if enabled {
        // only check the connection when the shipper is enabled
        match sender.check_connection().await {
            Ok(()) => {
                info!(
                    "{}: start MINT metric sender for url {}",
                    config.name, config.ingest_url
                );
            }
            Err(e) => {
                info!(
                    "{}: start MINT metric sender for url {} failed with {}, setting enabled state to false",
                    config.name, config.ingest_url, e
                );
                enabled = false;
            }
        }
    }

    let started_status = if enabled {
        ShipperStatus::Running
    } else {
        ShipperStatus::Disabled
    };
    {
        let mut s = status.write().await;
        *s = started_status;
    }
    let _ = status_tx.send(started_status);

    if enabled {
        sender.send_metadata(&standard_metadata());
    }

    let mut flush_interval = interval(Duration::from_secs(config.send_interval_secs));
    flush_interval.tick().await; // discard first tick, which is instantaneous

    loop {
        tokio::select! {
            _ = flush_interval.tick() => {
                if enabled {
                    let shipped = sender.flush();
                    if shipped > 0 {
                        debug!("{}: flushed {} metric lines", config.name, shipped);
                    }
                } else {
                    debug!(
                        "{}: skip sending metrics because the shipper has been disabled",
                        config.name
                    );
                }
            }
            result = shutdown_rx.recv() => {
                if let Err(e) = result {
                    error!("{}: shutdown channel closed unexpectedly: {}", config.name, e);
                }
                if enabled {
                    info!("{}: sending last metrics", config.name);
                }

                // Final drain and transport teardown, enabled or not.
                sender.destroy().await;

                let _ = status_tx.send(ShipperStatus::Stopped);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use tracing_test::traced_test;

    fn test_config(ingest_url: &str) -> ShipperConfig {
        ShipperConfig {
            ingest_url: ingest_url.to_string(),
            api_token: "mock-token".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_shipper_start_and_stop() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Any)
            .with_status(202)
            .expect_at_least(1)
            .create_async()
            .await;

        let services = ShipperServices::new(test_config(&server.url()));
        let handle = services.start().await.unwrap();

        assert!(handle.is_running().await);

        handle.stop().await.unwrap();

        // Wait a bit for the stop to complete
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

        let status = *handle.status.read().await;
        assert_eq!(status, ShipperStatus::Stopped);
    }

    #[tokio::test]
    async fn test_shipper_stop_idempotent() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Any)
            .with_status(202)
            .create_async()
            .await;

        let services = ShipperServices::new(test_config(&server.url()));
        let handle = services.start().await.unwrap();

        handle.stop().await.unwrap();
        handle.stop().await.unwrap(); // Second stop should be fine

        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

        let status = *handle.status.read().await;
        assert_eq!(status, ShipperStatus::Stopped);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_shipper_disabled_on_failed_check() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let services = ShipperServices::new(test_config(&server.url()));
        let handle = services.start().await.unwrap();

        assert!(!handle.is_running().await);
        let status = *handle.status.read().await;
        assert_eq!(status, ShipperStatus::Disabled);
        assert!(logs_contain("setting enabled state to false"));

        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_shipper_configured_off_never_checks() {
        // No server at all: with enabled=false the connection check must be
        // skipped entirely, otherwise start() would block on it.
        let config = ShipperConfig {
            enabled: false,
            ..test_config("http://127.0.0.1:1/api/v2/metrics/ingest")
        };

        let services = ShipperServices::new(config);
        let handle = services.start().await.unwrap();

        assert!(!handle.is_running().await);
        let status = *handle.status.read().await;
        assert_eq!(status, ShipperStatus::Disabled);

        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_shipper_rejects_invalid_config() {
        let config = ShipperConfig {
            send_interval_secs: 0,
            ..Default::default()
        };
        let services = ShipperServices::new(config);
        assert!(services.start().await.is_err());
    }

    #[tokio::test]
    async fn test_shipper_status_receiver() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Any)
            .with_status(202)
            .create_async()
            .await;

        let services = ShipperServices::new(test_config(&server.url()));
        let handle = services.start().await.unwrap();

        let mut rx = handle.status_receiver();
        handle.stop().await.unwrap();

        // Should receive the Stopped status update
        let update = tokio::time::timeout(tokio::time::Duration::from_secs(1), rx.recv()).await;
        assert!(update.is_ok());
    }
}
