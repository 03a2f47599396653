// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::batch::Column;
use crate::errors::TransformError;
use crate::traits::{Transform, TransformStage};
use crate::transforms::derive::{apply_threshold, threshold_schema};
use crate::transforms::{FuncParams, ParameterSchema, TransformInputs};

/// Flags every row whose measure satisfies the threshold comparison. Each
/// flagged row becomes one event occurrence.
pub struct DetectThreshold;

impl Transform for DetectThreshold {
    fn name(&self) -> &'static str {
        "DetectThreshold"
    }

    fn stage(&self) -> TransformStage {
        TransformStage::Detect
    }

    fn describe(&self) -> ParameterSchema {
        threshold_schema(ParameterSchema::new(self.name(), self.stage()))
    }

    fn apply(&self, inputs: &TransformInputs, params: &FuncParams) -> Result<Column, TransformError> {
        apply_threshold(inputs, params)
    }
}
