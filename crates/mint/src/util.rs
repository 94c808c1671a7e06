// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Small helpers shared across the crate.

/// Counts the lines in a rendered message.
///
/// `\n`, `\r` and `\r\n` all terminate a line; a final line without a
/// terminator still counts. Empty input has zero lines.
///
/// # Examples
///
/// ```
/// use mint::util::line_count;
///
/// assert_eq!(line_count(""), 0);
/// assert_eq!(line_count("line1"), 1);
/// assert_eq!(line_count("line1\nline2\n"), 2);
/// ```
pub fn line_count(message: &str) -> usize {
    let normalized = message.replace("\r\n", "\n");
    let terminators = normalized.matches(&['\n', '\r'][..]).count();
    if !normalized.is_empty() && !normalized.ends_with(&['\n', '\r'][..]) {
        terminators + 1
    } else {
        terminators
    }
}
