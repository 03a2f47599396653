// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors raised by a single transform invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("{transform} requires parameter '{name}'")]
    MissingParameter { transform: String, name: String },

    #[error("parameter '{name}' is invalid: expected {expected}")]
    InvalidParameter { name: String, expected: String },

    /// No column was bound to a measure role the transform reads.
    #[error("no input bound to measure role '{role}'")]
    MissingInput { role: String },

    #[error("input '{role}' is a {found} column, expected {expected}")]
    InputType {
        role: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A transform returned more samples than rows were selected.
    #[error("transform produced {produced} values for {available} selected rows")]
    OutputLength { produced: usize, available: usize },
}

impl TransformError {
    pub(crate) fn invalid(name: &str, expected: impl Into<String>) -> Self {
        TransformError::InvalidParameter {
            name: name.to_string(),
            expected: expected.into(),
        }
    }
}
