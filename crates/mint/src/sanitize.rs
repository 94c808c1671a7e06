// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Normalization of user-controlled strings for the schemaless MINT wire
//! format.
//!
//! Metric and dimension identifiers may only contain `[A-Za-z0-9._-]`, and
//! every dot-delimited section must begin with a letter. Dimension values are
//! quoted when they contain characters that would break line parsing.

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static INVALID_CHARACTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("hardcoded pattern"));

// The next two patterns could be folded into one, but keeping them separate
// avoids capturing.
#[allow(clippy::expect_used)]
static FIRST_SECTION_INVALID_BEGINNING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9_-]+").expect("hardcoded pattern"));

#[allow(clippy::expect_used)]
static NEXT_SECTIONS_INVALID_BEGINNING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[0-9_-]+").expect("hardcoded pattern"));

fn sanitize_identifier(value: &str) -> String {
    let sanitized = INVALID_CHARACTERS.replace_all(value, "_");
    // remove all digits, dashes and underscores from the start of the string
    let sanitized = FIRST_SECTION_INVALID_BEGINNING.replace_all(&sanitized, "");
    // ... and from the start of each subsequent section (i.e. after a dot)
    NEXT_SECTIONS_INVALID_BEGINNING
        .replace_all(&sanitized, ".")
        .into_owned()
}

/// Sanitizes a metric identifier: every character outside `[A-Za-z0-9._-]`
/// becomes `_`, then leading `[0-9_-]` runs are stripped from every
/// dot-delimited section so each section starts with a letter.
///
/// Empty input sanitizes to the empty string.
///
/// # Examples
///
/// ```
/// use mint::sanitize::sanitize_metric_identifier;
///
/// assert_eq!(sanitize_metric_identifier("my metric"), "my_metric");
/// assert_eq!(sanitize_metric_identifier("1foo.2bar"), "foo.bar");
/// ```
pub fn sanitize_metric_identifier(identifier: &str) -> String {
    sanitize_identifier(identifier)
}

/// Same as [`sanitize_metric_identifier`], additionally lower-cased for use
/// as a dimension key.
pub fn sanitize_dimension_identifier(identifier: &str) -> String {
    sanitize_identifier(identifier).to_lowercase()
}

/// Wraps a dimension value in double quotes when required.
///
/// A value already wrapped in double quotes is returned unchanged; a value
/// containing a space, comma or `=` is wrapped; anything else passes through.
/// Embedded quotes are not escaped.
pub fn sanitize_dimension_value(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') {
        return value.to_string();
    }
    if value.contains(' ') || value.contains(',') || value.contains('=') {
        return format!("\"{value}\"");
    }
    value.to_string()
}
