// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Rule-local errors.
//!
//! A `RuleError` aborts only the rule that raised it. The rule engine collects
//! them next to the partial batch unless the stage runs with
//! `FailureStrategy::FailFast`.

use thiserror::Error;

use super::TransformError;
use crate::traits::TransformStage;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    /// The rule names a transform the registry does not know.
    #[error("rule '{rule}' uses unknown transform '{transform}'")]
    UnknownTransform { rule: String, transform: String },

    /// The transform exists but belongs to another stage.
    #[error("rule '{rule}' uses {transform}, which is not a {expected} transform")]
    StageMismatch {
        rule: String,
        transform: String,
        expected: TransformStage,
    },

    /// An input or partition column is not present in the batch.
    #[error("rule '{rule}' references column '{column}' which is not in the batch")]
    MissingColumn { rule: String, column: String },

    /// A derived rule has no `output_name` role binding.
    #[error("rule '{rule}' does not name an output")]
    MissingOutput { rule: String },

    /// A second event rule tried to emit an already-emitted event name.
    #[error("event '{event_name}' was already produced by an earlier rule")]
    EventNameCollision { event_name: String },

    #[error("rule '{rule}' failed: {source}")]
    Transform {
        rule: String,
        #[source]
        source: TransformError,
    },
}

impl RuleError {
    /// Label of the rule that failed, when the error is tied to one.
    pub fn rule(&self) -> &str {
        match self {
            RuleError::UnknownTransform { rule, .. }
            | RuleError::StageMismatch { rule, .. }
            | RuleError::MissingColumn { rule, .. }
            | RuleError::MissingOutput { rule }
            | RuleError::Transform { rule, .. } => rule,
            RuleError::EventNameCollision { event_name } => event_name,
        }
    }
}
