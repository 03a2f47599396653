// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the aggregation and rule pipeline.
//!
//! This module contains message types for logging events related to:
//! * Record aggregation
//! * Filter, derive and detect stage lifecycle
//! * Rule-local failures
//! * Event detection and pipeline completion

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Records were merged into an aggregate batch.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use strom::observability::messages::pipeline::BatchAggregated;
///
/// let msg = BatchAggregated {
///     stream_token: "abc123",
///     version: 0,
///     rows: 26,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct BatchAggregated<'a> {
    pub stream_token: &'a str,
    pub version: u32,
    pub rows: usize,
}

impl Display for BatchAggregated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Aggregated {} records for stream {} (template v{})",
            self.rows, self.stream_token, self.version
        )
    }
}

impl StructuredLog for BatchAggregated<'_> {
    fn log(&self) {
        tracing::info!(
            stream_token = self.stream_token,
            version = self.version,
            rows = self.rows,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "aggregate",
            span_name = name,
            stream_token = self.stream_token,
            version = self.version,
            rows = self.rows,
        )
    }
}

/// A record was produced against a different template version.
///
/// # Log Level
/// `warn!` - Unexpected but recoverable
///
/// # Example
/// ```
/// use strom::observability::messages::pipeline::RecordVersionMismatch;
///
/// let msg = RecordVersionMismatch {
///     stream_token: "abc123",
///     record: 3,
///     expected: 2,
///     found: 1,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct RecordVersionMismatch<'a> {
    pub stream_token: &'a str,
    pub record: usize,
    pub expected: u32,
    pub found: u32,
}

impl Display for RecordVersionMismatch<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Record {} of stream {} was written for template v{}, aggregating with v{}",
            self.record, self.stream_token, self.found, self.expected
        )
    }
}

impl StructuredLog for RecordVersionMismatch<'_> {
    fn log(&self) {
        tracing::warn!(
            stream_token = self.stream_token,
            record = self.record,
            expected = self.expected,
            found = self.found,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "record_version_mismatch",
            span_name = name,
            stream_token = self.stream_token,
            record = self.record,
        )
    }
}

/// A rule stage is about to run.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
///
/// # Example
/// ```
/// use strom::observability::messages::pipeline::StageStarted;
///
/// let msg = StageStarted {
///     stage: "derive",
///     rule_count: 3,
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct StageStarted<'a> {
    pub stage: &'a str,
    pub rule_count: usize,
}

impl Display for StageStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Running {} stage with {} rules", self.stage, self.rule_count)
    }
}

impl StructuredLog for StageStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            stage = self.stage,
            rule_count = self.rule_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "stage",
            span_name = name,
            stage = self.stage,
            rule_count = self.rule_count,
        )
    }
}

/// A rule stage finished, possibly with rule-local failures.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use strom::observability::messages::pipeline::StageCompleted;
/// use std::time::Duration;
///
/// let msg = StageCompleted {
///     stage: "filter",
///     rule_count: 2,
///     failure_count: 0,
///     duration: Duration::from_millis(4),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct StageCompleted<'a> {
    pub stage: &'a str,
    pub rule_count: usize,
    pub failure_count: usize,
    pub duration: std::time::Duration,
}

impl Display for StageCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Completed {} stage: {} rules, {} failed, in {:?}",
            self.stage, self.rule_count, self.failure_count, self.duration
        )
    }
}

impl StructuredLog for StageCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            stage = self.stage,
            rule_count = self.rule_count,
            failure_count = self.failure_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "stage_completed",
            span_name = name,
            stage = self.stage,
            failure_count = self.failure_count,
            duration = ?self.duration,
        )
    }
}

/// A single rule failed; the stage continues unless running fail-fast.
///
/// # Log Level
/// `warn!` - Rule-local failure, batch continues
///
/// # Example
/// ```
/// use strom::observability::messages::pipeline::RuleFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "test error");
/// let msg = RuleFailed {
///     stage: "filter",
///     rule: "smoothing",
///     error: &error,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct RuleFailed<'a> {
    pub stage: &'a str,
    pub rule: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for RuleFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rule '{}' failed in {} stage: {}",
            self.rule, self.stage, self.error
        )
    }
}

impl StructuredLog for RuleFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            stage = self.stage,
            rule = self.rule,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "rule_failed",
            span_name = name,
            stage = self.stage,
            rule = self.rule,
            error = %self.error,
        )
    }
}

/// An event rule matched one or more rows.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use strom::observability::messages::pipeline::EventsDetected;
///
/// let msg = EventsDetected {
///     event_name: "turn_45.000000_location",
///     occurrences: 3,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct EventsDetected<'a> {
    pub event_name: &'a str,
    pub occurrences: usize,
}

impl Display for EventsDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Detected {} occurrences of event '{}'",
            self.occurrences, self.event_name
        )
    }
}

impl StructuredLog for EventsDetected<'_> {
    fn log(&self) {
        tracing::info!(
            event_name = self.event_name,
            occurrences = self.occurrences,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "events_detected",
            span_name = name,
            event_name = self.event_name,
            occurrences = self.occurrences,
        )
    }
}

/// A full pipeline invocation finished.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use strom::observability::messages::pipeline::PipelineCompleted;
/// use std::time::Duration;
///
/// let msg = PipelineCompleted {
///     stream_token: "abc123",
///     rows: 26,
///     failure_count: 0,
///     duration: Duration::from_millis(12),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct PipelineCompleted<'a> {
    pub stream_token: &'a str,
    pub rows: usize,
    pub failure_count: usize,
    pub duration: std::time::Duration,
}

impl Display for PipelineCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Processed {} rows for stream {} with {} rule failures in {:?}",
            self.rows, self.stream_token, self.failure_count, self.duration
        )
    }
}

impl StructuredLog for PipelineCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            stream_token = self.stream_token,
            rows = self.rows,
            failure_count = self.failure_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline",
            span_name = name,
            stream_token = self.stream_token,
            rows = self.rows,
        )
    }
}
