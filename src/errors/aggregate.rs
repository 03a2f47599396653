// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while merging records into an aggregate batch.
//!
//! Every variant is fatal to the aggregation call: no partial batch is
//! returned when column alignment cannot be established.

use crate::template::DataType;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregateError {
    /// A record lacks a column the template declares.
    #[error("record {record} is missing {section} column '{column}' declared by the template")]
    SchemaMismatch {
        record: usize,
        section: &'static str,
        column: String,
    },

    /// A record value cannot be represented as the declared data type.
    #[error("record {record} has an invalid {dtype} value for '{column}': {reason}")]
    InvalidValue {
        record: usize,
        column: String,
        dtype: DataType,
        reason: String,
    },

    /// A record belongs to a different stream than the template.
    #[error("record {record} belongs to stream '{found}', expected '{expected}'")]
    StreamMismatch {
        record: usize,
        expected: String,
        found: String,
    },

    /// Storage identifiers do not line up with the aggregated rows.
    #[error("{ids} row identifiers supplied for {rows} aggregated rows")]
    IdLengthMismatch { rows: usize, ids: usize },
}
