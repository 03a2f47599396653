// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Kind of rule that lost one of its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RuleKind {
    #[serde(rename = "filter")]
    Filter,
    #[serde(rename = "derived param")]
    DerivedParam,
    #[serde(rename = "event")]
    Event,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Filter => "filter",
            RuleKind::DerivedParam => "derived param",
            RuleKind::Event => "event",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of template entry a rule depended on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DependencyKind {
    #[serde(rename = "measure")]
    Measure,
    #[serde(rename = "filter")]
    Filter,
    #[serde(rename = "derived param")]
    DerivedParam,
    #[serde(rename = "field")]
    Field,
    #[serde(rename = "tag")]
    Tag,
    #[serde(rename = "user id")]
    UserId,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Measure => "measure",
            DependencyKind::Filter => "filter",
            DependencyKind::DerivedParam => "derived param",
            DependencyKind::Field => "field",
            DependencyKind::Tag => "tag",
            DependencyKind::UserId => "user id",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One broken reference left behind by a removal.
///
/// Rendered as the tuple `(kind, rule, dependency kind, missing name)`, e.g.
/// `("derived param", "acceleration", "measure", "timestamp_winning")`. Derived
/// rules are named by their output, or by transform name when they have none.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Violation {
    pub kind: RuleKind,
    pub rule: String,
    pub dependency: DependencyKind,
    pub missing: String,
}

impl Violation {
    pub fn as_tuple(&self) -> (&'static str, &str, &'static str, &str) {
        (
            self.kind.as_str(),
            &self.rule,
            self.dependency.as_str(),
            &self.missing,
        )
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' depends on {} '{}'",
            self.kind, self.rule, self.dependency, self.missing
        )
    }
}

/// Errors returned by the template mutator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpdateError {
    /// Removals would leave rules reading columns that no longer exist.
    #[error("invalid update: {} broken reference(s)", violations.len())]
    InvalidUpdate { violations: Vec<Violation> },

    /// The op itself could not be applied (bad args, unknown target).
    #[error("malformed update on '{field}': {reason}")]
    Malformed { field: String, reason: String },
}

impl UpdateError {
    pub(crate) fn malformed(field: impl fmt::Display, reason: impl Into<String>) -> Self {
        UpdateError::Malformed {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Outcome of a dry-run update check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum UpdateStatus {
    Ok,
    InvalidUpdate(Vec<Violation>),
    Malformed(String),
}
