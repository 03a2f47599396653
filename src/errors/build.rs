// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors that can occur while building a template from mapping specs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// An event shorthand was missing one of its required arguments.
    #[error("event '{event}' requires argument '{argument}'")]
    MissingEventArgument { event: String, argument: String },

    /// An event shorthand argument had the wrong shape.
    #[error("event '{event}' argument '{argument}' is invalid: {reason}")]
    InvalidEventArgument {
        event: String,
        argument: String,
        reason: String,
    },

    /// A derived or event shorthand referenced a measure nobody declares.
    #[error("{context} references unknown measure '{measure}'")]
    UnknownMeasure { context: String, measure: String },

    /// Ingest data rules were given a different number of indices and keys.
    #[error("data rules need one template key per source index ({indices} indices, {keys} keys)")]
    MismatchedDataRules { indices: usize, keys: usize },
}
