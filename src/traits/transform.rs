// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use serde::Serialize;

use crate::batch::Column;
use crate::errors::TransformError;
use crate::transforms::{FuncParams, ParameterSchema, TransformInputs};

/// Pipeline stage a transform may run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformStage {
    Filter,
    Derive,
    Detect,
}

impl fmt::Display for TransformStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransformStage::Filter => "filter",
            TransformStage::Derive => "derive",
            TransformStage::Detect => "detect",
        })
    }
}

/// A pure column transform addressable by name from a rule.
///
/// `describe` reports the parameters and measure roles the transform accepts;
/// the rule engine resolves a rule's `func_params` against that schema before
/// calling `apply`, so `apply` can rely on every described parameter being
/// present.
pub trait Transform: Send + Sync {
    fn name(&self) -> &'static str;

    fn stage(&self) -> TransformStage;

    fn describe(&self) -> ParameterSchema;

    /// Runs the transform over the selected rows. Detect transforms return a
    /// boolean column marking the rows that trigger an event.
    fn apply(&self, inputs: &TransformInputs, params: &FuncParams) -> Result<Column, TransformError>;
}
