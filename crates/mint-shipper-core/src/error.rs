// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors that can occur when configuring or starting the shipper
#[derive(Debug, thiserror::Error)]
pub enum ShipperError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to start metric sender: {0}")]
    SenderStart(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ShipperError::InvalidConfig("missing ingest url".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid configuration: missing ingest url"
        );
    }

    #[test]
    fn test_error_debug() {
        let error = ShipperError::SenderStart("bad url".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("SenderStart"));
    }

    #[test]
    fn test_all_error_variants() {
        // Ensure all variants can be constructed
        let _e1 = ShipperError::InvalidConfig("test".into());
        let _e2 = ShipperError::SenderStart("test".into());
        let _e3 = ShipperError::Runtime("test".into());
    }
}
