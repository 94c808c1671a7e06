// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The metric-line data model.
//!
//! A [`MetricLine`] is built once by a producer, appended to the sender's
//! pending buffer, rendered exactly once during partitioning, and then
//! discarded. Dimension names and values are expected to be sanitized by the
//! caller (see [`crate::sanitize`]) before they are inserted into a line.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A single numeric measurement value, optionally tagged with a field name
/// for multi-field lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Gauge {
    field: Option<String>,
    value: f64,
}

impl Gauge {
    pub fn new(value: f64) -> Self {
        Gauge { field: None, value }
    }

    pub fn with_field(field: impl Into<String>, value: f64) -> Self {
        Gauge {
            field: Some(field.into()),
            value,
        }
    }
}

impl fmt::Display for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}={}", field, self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

/// A key/value tag attached to a metric line for grouping and filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub key: String,
    pub value: String,
}

impl Dimension {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Dimension {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One line of the schemaless MINT wire format: a metric key, ordered
/// dimensions, ordered gauge values, and a flag selecting the data or the
/// metadata rendering.
#[derive(Debug, Clone)]
pub struct MetricLine {
    key: String,
    dimensions: Vec<Dimension>,
    gauges: Vec<Gauge>,
    metadata: bool,
}

impl MetricLine {
    pub fn new(key: impl Into<String>) -> Self {
        MetricLine {
            key: key.into(),
            dimensions: Vec::new(),
            gauges: Vec::new(),
            metadata: false,
        }
    }

    /// Builds a metadata line describing a metric's unit, description and
    /// display name.
    pub fn with_metadata(
        key: impl Into<String>,
        display_name: impl Into<String>,
        unit: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let mut line = MetricLine::new(key);
        line.metadata = true;
        line.dimensions.push(Dimension::new("dt.meta.unit", unit));
        line.dimensions
            .push(Dimension::new("dt.meta.description", description));
        line.dimensions
            .push(Dimension::new("dt.meta.displayname", display_name));
        line
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_metadata(&self) -> bool {
        self.metadata
    }

    /// Appends a dimension. Only meaningful before the line is handed to the
    /// partitioner.
    pub fn add_dimension(&mut self, dimension: Dimension) {
        self.dimensions.push(dimension);
    }

    /// Appends a gauge value. Only meaningful before the line is handed to
    /// the partitioner.
    pub fn add_gauge(&mut self, gauge: Gauge) {
        self.gauges.push(gauge);
    }

    /// Renders the wire text.
    ///
    /// The data form is `key[,dim=val,...] gauge,<g1>[,<g2>...] <millis>`,
    /// stamped with the wall-clock time of this call. The metadata form is
    /// `#key gauge dim="val",...` with every value quoted and no timestamp.
    pub fn render(&self, metadata: bool) -> String {
        if metadata {
            self.render_metadata()
        } else {
            self.render_data(epoch_millis())
        }
    }

    fn render_metadata(&self) -> String {
        let dimensions = self
            .dimensions
            .iter()
            .map(|d| format!("{}=\"{}\"", d.key, d.value))
            .collect::<Vec<_>>()
            .join(",");
        format!("#{} gauge {}", self.key, dimensions)
    }

    fn render_data(&self, timestamp_millis: u128) -> String {
        let gauges = self
            .gauges
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        if self.dimensions.is_empty() {
            format!("{} gauge,{} {}", self.key, gauges, timestamp_millis)
        } else {
            let dimensions = self
                .dimensions
                .iter()
                .map(|d| format!("{}={}", d.key, d.value))
                .collect::<Vec<_>>()
                .join(",");
            format!(
                "{},{} gauge,{} {}",
                self.key, dimensions, gauges, timestamp_millis
            )
        }
    }
}

impl fmt::Display for MetricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(self.metadata))
    }
}

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
