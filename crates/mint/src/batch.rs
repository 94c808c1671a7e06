// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Partitioning of pending metric lines into wire-sized messages.

use crate::metric::MetricLine;

/// A newline-joined group of rendered metric lines, sent as one request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    body: String,
    line_count: usize,
}

impl Batch {
    pub fn new(body: String, line_count: usize) -> Self {
        Batch { body, line_count }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn byte_size(&self) -> usize {
        self.body.len()
    }
}

/// Partitions `lines`, in order, into batches of at most `max_lines` lines
/// and strictly fewer than `max_bytes` bytes.
///
/// Every line is rendered in data form with a trailing newline. A line whose
/// own rendering already exceeds `max_bytes` still forms its own batch: the
/// limits bound growth, they never drop a line. Empty input yields no
/// batches.
pub fn split_messages(lines: &[MetricLine], max_lines: usize, max_bytes: usize) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut body = String::new();
    let mut line_count = 0usize;

    for line in lines {
        let rendered = format!("{}\n", line.render(false));
        if line_count + 1 <= max_lines && body.len() + rendered.len() < max_bytes {
            body.push_str(&rendered);
            line_count += 1;
        } else {
            if !body.is_empty() {
                batches.push(Batch::new(std::mem::take(&mut body), line_count));
            }
            body = rendered;
            line_count = 1;
        }
    }
    if !body.is_empty() {
        batches.push(Batch::new(body, line_count));
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MAX_LINES_PER_MESSAGE, MAX_MESSAGE_SIZE_BYTES};
    use crate::metric::{Dimension, Gauge};
    use proptest::prelude::*;

    fn line(key: &str, value: f64, dimension_value_len: usize) -> MetricLine {
        let mut line = MetricLine::new(key);
        if dimension_value_len > 0 {
            line.add_dimension(Dimension::new("dimkey", "d".repeat(dimension_value_len)));
        }
        line.add_gauge(Gauge::new(value));
        line
    }

    #[test]
    fn test_split_messages_empty_input() {
        assert!(split_messages(&[], MAX_LINES_PER_MESSAGE, MAX_MESSAGE_SIZE_BYTES).is_empty());
    }

    #[test]
    fn test_split_messages_below_limits() {
        let lines = vec![line("metric-key1", 1.0, 8), line("metric-key2", 2.0, 8)];
        let batches = split_messages(&lines, MAX_LINES_PER_MESSAGE, MAX_MESSAGE_SIZE_BYTES);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].line_count(), 2);
    }

    #[test]
    fn test_split_messages_above_max_lines() {
        let lines: Vec<MetricLine> = (0..MAX_LINES_PER_MESSAGE + 1)
            .map(|i| line(&format!("metric-key-{i}"), i as f64, 0))
            .collect();
        let batches = split_messages(&lines, MAX_LINES_PER_MESSAGE, MAX_MESSAGE_SIZE_BYTES);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].line_count(), MAX_LINES_PER_MESSAGE);
        assert_eq!(batches[1].line_count(), 1);
    }

    #[test]
    fn test_split_messages_above_max_size() {
        // Lines just under the byte limit accumulate until the next one
        // would cross it, then split exactly once.
        let max_bytes = 400;
        let lines = vec![
            line("metric-key-0", 0.0, 150),
            line("metric-key-1", 1.0, 150),
            line("metric-key-2", 2.0, 150),
        ];
        let batches = split_messages(&lines, MAX_LINES_PER_MESSAGE, max_bytes);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].line_count(), 2);
        assert_eq!(batches[1].line_count(), 1);
    }

    #[test]
    fn test_split_messages_oversized_single_line() {
        let max_bytes = 64;
        let lines = vec![
            line("small-before", 1.0, 0),
            line("oversized", 2.0, 500),
            line("small-after", 3.0, 0),
        ];
        let batches = split_messages(&lines, MAX_LINES_PER_MESSAGE, max_bytes);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].line_count(), 1);
        assert_eq!(batches[1].line_count(), 1);
        assert!(batches[1].byte_size() > max_bytes);
        assert!(batches[1].body().starts_with("oversized,"));
        assert_eq!(batches[2].line_count(), 1);
    }

    #[test]
    fn test_batch_bodies_end_with_newline() {
        let lines = vec![line("metric-key1", 1.0, 0)];
        let batches = split_messages(&lines, MAX_LINES_PER_MESSAGE, MAX_MESSAGE_SIZE_BYTES);
        assert_eq!(batches.len(), 1);
        assert!(batches[0].body().ends_with('\n'));
    }

    proptest! {
        #[test]
        fn prop_no_loss_no_duplication_in_order(
            line_count in 0usize..300,
            dimension_len in 0usize..64,
            max_lines in 1usize..40,
            max_bytes in 32usize..2048,
        ) {
            let lines: Vec<MetricLine> = (0..line_count)
                .map(|i| line(&format!("m{i}"), i as f64, dimension_len))
                .collect();
            let batches = split_messages(&lines, max_lines, max_bytes);

            // reassemble the keys of every emitted line, in order
            let mut keys = Vec::new();
            for batch in &batches {
                let mut batch_lines = 0;
                for rendered in batch.body().lines() {
                    let key = rendered
                        .split([',', ' '])
                        .next()
                        .expect("rendered line has a key");
                    keys.push(key.to_string());
                    batch_lines += 1;
                }
                prop_assert_eq!(batch_lines, batch.line_count());
                prop_assert!(batch.line_count() <= max_lines);
                prop_assert!(batch.line_count() >= 1);
                // only a lone oversized line may break the byte bound
                prop_assert!(batch.byte_size() < max_bytes || batch.line_count() == 1);
            }
            let expected: Vec<String> = (0..line_count).map(|i| format!("m{i}")).collect();
            prop_assert_eq!(keys, expected);
        }
    }
}
