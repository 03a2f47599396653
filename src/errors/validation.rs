// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use crate::traits::TransformStage;

/// Errors that can occur during template validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A rule names a transform that is not registered
    UnknownTransform {
        /// Label of the offending rule
        rule: String,
        /// The transform name that could not be found
        transform: String,
    },
    /// A transform is used in a stage it does not belong to
    WrongStage {
        rule: String,
        transform: String,
        /// Stage the rule is declared in
        expected: TransformStage,
        /// Stage the transform belongs to
        actual: TransformStage,
    },
    /// A required transform parameter is absent from `func_params`
    MissingParameter {
        rule: String,
        transform: String,
        parameter: String,
    },
    /// A rule reads a column no earlier stage provides
    UnresolvedReference {
        rule: String,
        /// The column that couldn't be resolved
        column: String,
    },
    /// A derived rule reads a derived column produced by a later rule
    DependencyOrderViolation {
        rule: String,
        column: String,
        /// Label of the rule that produces the column
        produced_by: String,
    },
    /// Two rules in the same section write the same output name
    DuplicateOutput {
        /// Template section: "filter", "derived param" or "event"
        section: &'static str,
        output: String,
    },
    /// Two event rules emit the same `event_name`
    EventNameCollision {
        /// Key of the later rule in `event_rules`
        key: String,
        event_name: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnknownTransform { rule, transform } => {
                write!(f, "Rule '{}' uses unknown transform '{}'", rule, transform)
            }
            ValidationError::WrongStage {
                rule,
                transform,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Rule '{}' is a {} rule but '{}' is a {} transform",
                    rule, expected, transform, actual
                )
            }
            ValidationError::MissingParameter {
                rule,
                transform,
                parameter,
            } => {
                write!(
                    f,
                    "Rule '{}' is missing required {} parameter '{}'",
                    rule, transform, parameter
                )
            }
            ValidationError::UnresolvedReference { rule, column } => {
                write!(
                    f,
                    "Rule '{}' references '{}' which no earlier stage provides",
                    rule, column
                )
            }
            ValidationError::DependencyOrderViolation {
                rule,
                column,
                produced_by,
            } => {
                write!(
                    f,
                    "Rule '{}' reads '{}' before rule '{}' produces it",
                    rule, column, produced_by
                )
            }
            ValidationError::DuplicateOutput { section, output } => {
                write!(f, "Duplicate {} output: '{}'", section, output)
            }
            ValidationError::EventNameCollision { key, event_name } => {
                write!(
                    f,
                    "Event rule '{}' emits '{}', already emitted by an earlier rule",
                    key, event_name
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}
