// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::json;

use super::{filter_axes, TARGET};
use crate::batch::Column;
use crate::errors::TransformError;
use crate::traits::{Transform, TransformStage};
use crate::transforms::window::{self, WINDOW_LEN};
use crate::transforms::{FuncParams, ParamSpec, ParameterSchema, RoleSpec, TransformInputs};

/// Centered moving average with partial windows at the ends.
pub struct WindowAverage;

impl Transform for WindowAverage {
    fn name(&self) -> &'static str {
        "WindowAverage"
    }

    fn stage(&self) -> TransformStage {
        TransformStage::Filter
    }

    fn describe(&self) -> ParameterSchema {
        ParameterSchema::new(self.name(), self.stage())
            .param(ParamSpec::optional(WINDOW_LEN, "length of averaging window", json!(3)))
            .role(RoleSpec::input(TARGET, "name of the target measure"))
            .role(RoleSpec::output())
    }

    fn apply(&self, inputs: &TransformInputs, params: &FuncParams) -> Result<Column, TransformError> {
        let window_len = window::window_len(params)?;
        filter_axes(inputs.column(TARGET)?, |values| {
            window::window_average(values, window_len)
        })
    }
}
