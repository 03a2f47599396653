// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for template validation warnings and errors.
//!
//! This module contains message types for logging events related to:
//! * Validation lifecycle
//! * Unresolved column references
//! * Derived rules reading columns produced later in the list

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Template validation started.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
///
/// # Example
/// ```
/// use strom::observability::messages::validation::ValidationStarted;
///
/// let msg = ValidationStarted {
///     stream_token: "abc123",
///     rule_count: 4,
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct ValidationStarted<'a> {
    pub stream_token: &'a str,
    pub rule_count: usize,
}

impl Display for ValidationStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Validating template for stream {} ({} rules)",
            self.stream_token, self.rule_count
        )
    }
}

impl StructuredLog for ValidationStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            stream_token = self.stream_token,
            rule_count = self.rule_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "validation",
            span_name = name,
            stream_token = self.stream_token,
            rule_count = self.rule_count,
        )
    }
}

/// Template validation found one or more errors.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use strom::observability::messages::validation::ValidationFailed;
///
/// let msg = ValidationFailed {
///     stream_token: "abc123",
///     error_count: 2,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct ValidationFailed<'a> {
    pub stream_token: &'a str,
    pub error_count: usize,
}

impl Display for ValidationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Template for stream {} failed validation with {} errors",
            self.stream_token, self.error_count
        )
    }
}

impl StructuredLog for ValidationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            stream_token = self.stream_token,
            error_count = self.error_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            stream_token = self.stream_token,
            error_count = self.error_count,
        )
    }
}

/// A rule references a column nothing provides.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use strom::observability::messages::validation::UnresolvedReference;
///
/// let msg = UnresolvedReference {
///     rule: "DeriveHeading",
///     column: "where_i_am",
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct UnresolvedReference<'a> {
    pub rule: &'a str,
    pub column: &'a str,
}

impl Display for UnresolvedReference<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rule '{}' references '{}' which does not exist",
            self.rule, self.column
        )
    }
}

impl StructuredLog for UnresolvedReference<'_> {
    fn log(&self) {
        tracing::error!(
            rule = self.rule,
            column = self.column,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            rule = self.rule,
            column = self.column,
        )
    }
}

/// A derived rule reads a column that a later rule produces.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use strom::observability::messages::validation::DependencyOrderViolation;
///
/// let msg = DependencyOrderViolation {
///     rule: "DeriveChange",
///     column: "head_location",
///     produced_by: "DeriveHeading",
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct DependencyOrderViolation<'a> {
    pub rule: &'a str,
    pub column: &'a str,
    pub produced_by: &'a str,
}

impl Display for DependencyOrderViolation<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rule '{}' reads '{}' before '{}' produces it",
            self.rule, self.column, self.produced_by
        )
    }
}

impl StructuredLog for DependencyOrderViolation<'_> {
    fn log(&self) {
        tracing::error!(
            rule = self.rule,
            column = self.column,
            produced_by = self.produced_by,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            rule = self.rule,
            column = self.column,
        )
    }
}
