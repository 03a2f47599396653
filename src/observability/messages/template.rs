// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for template registration and mutation.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A template version was stored in the registry.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use strom::observability::messages::template::TemplateRegistered;
///
/// let msg = TemplateRegistered {
///     stream_token: "abc123",
///     version: 0,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct TemplateRegistered<'a> {
    pub stream_token: &'a str,
    pub version: u32,
}

impl Display for TemplateRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Registered template v{} for stream {}",
            self.version, self.stream_token
        )
    }
}

impl StructuredLog for TemplateRegistered<'_> {
    fn log(&self) {
        tracing::info!(
            stream_token = self.stream_token,
            version = self.version,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "template_registered",
            span_name = name,
            stream_token = self.stream_token,
            version = self.version,
        )
    }
}

/// Update ops were applied and produced a new template version.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use strom::observability::messages::template::TemplateUpdated;
///
/// let msg = TemplateUpdated {
///     stream_token: "abc123",
///     from_version: 1,
///     to_version: 2,
///     op_count: 4,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct TemplateUpdated<'a> {
    pub stream_token: &'a str,
    pub from_version: u32,
    pub to_version: u32,
    pub op_count: usize,
}

impl Display for TemplateUpdated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Applied {} update ops to stream {}: v{} -> v{}",
            self.op_count, self.stream_token, self.from_version, self.to_version
        )
    }
}

impl StructuredLog for TemplateUpdated<'_> {
    fn log(&self) {
        tracing::info!(
            stream_token = self.stream_token,
            from_version = self.from_version,
            to_version = self.to_version,
            op_count = self.op_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "template_updated",
            span_name = name,
            stream_token = self.stream_token,
            to_version = self.to_version,
        )
    }
}

/// An update was refused because it would break rule references.
///
/// # Log Level
/// `warn!` - Caller error, template unchanged
///
/// # Example
/// ```
/// use strom::observability::messages::template::UpdateRejected;
///
/// let msg = UpdateRejected {
///     stream_token: "abc123",
///     violation_count: 7,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct UpdateRejected<'a> {
    pub stream_token: &'a str,
    pub violation_count: usize,
}

impl Display for UpdateRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rejected update for stream {}: {} broken references",
            self.stream_token, self.violation_count
        )
    }
}

impl StructuredLog for UpdateRejected<'_> {
    fn log(&self) {
        tracing::warn!(
            stream_token = self.stream_token,
            violation_count = self.violation_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "update_rejected",
            span_name = name,
            stream_token = self.stream_token,
            violation_count = self.violation_count,
        )
    }
}
