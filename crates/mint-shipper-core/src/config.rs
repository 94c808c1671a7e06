// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::ShipperError;
use mint::constants::{MAX_LINES_PER_MESSAGE, MAX_MESSAGE_SIZE_BYTES};
use mint::sanitize::{sanitize_dimension_identifier, sanitize_dimension_value};
use std::env;

const DEFAULT_SEND_INTERVAL_SECS: u64 = 60;

/// Configuration for the MINT metric shipper.
///
/// An explicitly constructed, immutable record: `Default` is the defaults
/// record, `from_env` overrides it from `MINT_*` variables.
#[derive(Debug, Clone)]
pub struct ShipperConfig {
    /// Instance name used as the prefix of every log line
    pub name: String,
    /// MINT ingest endpoint URL
    pub ingest_url: String,
    /// API token for authentication; blank means no Authorization header
    pub api_token: String,
    /// Dimensions attached to every test-wide metric line
    pub test_dimensions: Vec<(String, String)>,
    /// Dimensions attached to every transaction metric line
    pub transaction_dimensions: Vec<(String, String)>,
    /// Whether the shipper starts enabled
    pub enabled: bool,
    /// Seconds between periodic flushes
    pub send_interval_secs: u64,
    /// Maximum lines per ingest request
    pub max_lines_per_message: usize,
    /// Maximum bytes per ingest request
    pub max_message_size_bytes: usize,
    /// Log level (e.g. trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            name: "MINT metric shipper".to_string(),
            ingest_url: "https://DT_SERVER/api/v2/metrics/ingest".to_string(),
            api_token: String::new(),
            test_dimensions: Vec::new(),
            transaction_dimensions: Vec::new(),
            enabled: true,
            send_interval_secs: DEFAULT_SEND_INTERVAL_SECS,
            max_lines_per_message: MAX_LINES_PER_MESSAGE,
            max_message_size_bytes: MAX_MESSAGE_SIZE_BYTES,
            log_level: "info".to_string(),
        }
    }
}

impl ShipperConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ShipperError> {
        let defaults = Self::default();

        let name = env::var("MINT_SHIPPER_NAME").unwrap_or(defaults.name);
        let ingest_url = env::var("MINT_INGEST_URL").unwrap_or(defaults.ingest_url);
        let api_token = env::var("MINT_API_TOKEN").unwrap_or(defaults.api_token);
        let test_dimensions = env::var("MINT_TEST_DIMENSIONS")
            .map(|val| parse_dimensions(&val))
            .unwrap_or(defaults.test_dimensions);
        let transaction_dimensions = env::var("MINT_TRANSACTION_DIMENSIONS")
            .map(|val| parse_dimensions(&val))
            .unwrap_or(defaults.transaction_dimensions);
        let enabled = env::var("MINT_ENABLED")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(defaults.enabled);
        let send_interval_secs = env::var("MINT_SEND_INTERVAL_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(defaults.send_interval_secs);
        let log_level = env::var("MINT_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);

        let config = Self {
            name,
            ingest_url,
            api_token,
            test_dimensions,
            transaction_dimensions,
            enabled,
            send_interval_secs,
            max_lines_per_message: defaults.max_lines_per_message,
            max_message_size_bytes: defaults.max_message_size_bytes,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ShipperError> {
        if self.ingest_url.trim().is_empty() {
            return Err(ShipperError::InvalidConfig(
                "ingest URL cannot be empty".to_string(),
            ));
        }

        if self.send_interval_secs == 0 {
            return Err(ShipperError::InvalidConfig(
                "send interval must be greater than 0".to_string(),
            ));
        }

        if self.max_lines_per_message == 0 {
            return Err(ShipperError::InvalidConfig(
                "max lines per message must be greater than 0".to_string(),
            ));
        }

        if self.max_message_size_bytes == 0 {
            return Err(ShipperError::InvalidConfig(
                "max message size must be greater than 0".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ShipperError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}

/// Parses a `key=value,key2=value2` dimension string into sanitized pairs.
///
/// Commas and spaces both separate entries; entries without a `=` or with an
/// empty side are skipped. Keys go through the dimension-identifier
/// sanitizer, values through the conditional-quoting value sanitizer, so the
/// sender engine only ever sees wire-safe pairs.
pub fn parse_dimensions(input: &str) -> Vec<(String, String)> {
    input
        .split([',', ' '])
        .filter_map(|entry| entry.split_once('='))
        .filter(|(key, value)| !key.trim().is_empty() && !value.trim().is_empty())
        .map(|(key, value)| {
            (
                sanitize_dimension_identifier(key),
                sanitize_dimension_value(value),
            )
        })
        .collect()
}
