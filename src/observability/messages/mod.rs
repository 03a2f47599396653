// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit the same data as structured tracing fields.
//!
//! # Organization
//!
//! * `pipeline` - Aggregation, stage lifecycle, rule failures, events
//! * `template` - Registry and mutator events
//! * `validation` - Template validation errors
//!
//! # Usage Pattern
//!
//! ```rust
//! use strom::observability::messages::pipeline::StageStarted;
//! use strom::observability::messages::StructuredLog;
//!
//! let msg = StageStarted {
//!     stage: "filter",
//!     rule_count: 2,
//! };
//!
//! msg.log();
//! ```

use tracing::Span;

pub mod pipeline;
pub mod template;
pub mod validation;

/// Emit a message as a structured tracing event or open a span carrying its fields.
pub trait StructuredLog {
    fn log(&self);

    fn span(&self, name: &str) -> Span;
}
