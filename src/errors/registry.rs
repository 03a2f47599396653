// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use super::{UpdateError, ValidationError};

/// Errors returned by a template registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("no template registered for stream '{token}'")]
    UnknownStream { token: String },

    #[error("stream '{token}' has no template version {version}")]
    UnknownVersion { token: String, version: u32 },

    /// Versions must increase monotonically per stream.
    #[error("stream '{token}' is already at version {latest}; cannot register version {attempted}")]
    VersionConflict {
        token: String,
        latest: u32,
        attempted: u32,
    },

    #[error("template for stream '{token}' failed validation with {} error(s)", errors.len())]
    Invalid {
        token: String,
        errors: Vec<ValidationError>,
    },

    #[error(transparent)]
    Update(#[from] UpdateError),
}
