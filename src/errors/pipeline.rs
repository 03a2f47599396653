// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use thiserror::Error;

use super::{AggregateError, RegistryError, RuleError, ValidationError};

/// How the rule engine reacts when a single rule fails.
///
/// * `ContinueOnError` - record the failure and keep running the remaining rules
/// * `FailFast` - abort the stage on the first failing rule
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureStrategy {
    #[default]
    ContinueOnError,
    FailFast,
}

/// Errors reported by a persistence collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    #[error("storage rejected {document}: {reason}")]
    Rejected { document: &'static str, reason: String },
}

/// Errors that abort a whole pipeline invocation.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("rule execution aborted: {0}")]
    Rule(#[from] RuleError),

    #[error("template is invalid: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    InvalidTemplate(Vec<ValidationError>),

    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The worker pool was shut down or a worker panicked.
    #[error("pipeline worker failed: {0}")]
    Worker(String),
}
