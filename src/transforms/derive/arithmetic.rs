// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Numeric derived parameters over a single series.

use serde_json::json;

use crate::batch::Column;
use crate::errors::TransformError;
use crate::traits::{Transform, TransformStage};
use crate::transforms::window::{self, smooth, WINDOW_LEN};
use crate::transforms::{FuncParams, ParamSpec, ParameterSchema, RoleSpec, TransformInputs};

const TARGET: &str = "target_measure";

fn target_role() -> RoleSpec {
    RoleSpec::input(TARGET, "name of the target measure")
}

fn window_param(description: &'static str) -> ParamSpec {
    ParamSpec::optional(WINDOW_LEN, description, json!(1))
}

/// Normalizes a degree difference into `[-180, 180)`.
pub fn wrap_degrees(delta: f64) -> f64 {
    (delta + 180.0).rem_euclid(360.0) - 180.0
}

/// Elementwise rise / run.
pub struct DeriveSlope;

impl Transform for DeriveSlope {
    fn name(&self) -> &'static str {
        "DeriveSlope"
    }

    fn stage(&self) -> TransformStage {
        TransformStage::Derive
    }

    fn describe(&self) -> ParameterSchema {
        ParameterSchema::new(self.name(), self.stage())
            .param(window_param("length of averaging window"))
            .role(RoleSpec::input("rise_measure", "measure y values (rise in rise/run)"))
            .role(RoleSpec::input("run_measure", "measure x values (run in rise/run)"))
            .role(RoleSpec::output())
    }

    fn apply(&self, inputs: &TransformInputs, params: &FuncParams) -> Result<Column, TransformError> {
        let rise = inputs.floats("rise_measure")?;
        let run = inputs.floats("run_measure")?;
        let sloped = rise.iter().zip(run.iter()).map(|(y, x)| y / x).collect();
        Ok(Column::Float(smooth(sloped, window::window_len(params)?)))
    }
}

/// Successive difference, one sample shorter than the input.
pub struct DeriveChange;

impl Transform for DeriveChange {
    fn name(&self) -> &'static str {
        "DeriveChange"
    }

    fn stage(&self) -> TransformStage {
        TransformStage::Derive
    }

    fn describe(&self) -> ParameterSchema {
        ParameterSchema::new(self.name(), self.stage())
            .param(window_param("length of averaging window"))
            .param(ParamSpec::optional(
                "angle_change",
                "treat values as headings and return the signed smaller angle between them",
                json!(false),
            ))
            .role(target_role())
            .role(RoleSpec::output())
    }

    fn apply(&self, inputs: &TransformInputs, params: &FuncParams) -> Result<Column, TransformError> {
        let values = inputs.floats(TARGET)?;
        let angular = params.bool("angle_change")?;
        let diffed = values
            .windows(2)
            .map(|pair| {
                let delta = pair[1] - pair[0];
                if angular {
                    wrap_degrees(delta)
                } else {
                    delta
                }
            })
            .collect();
        Ok(Column::Float(smooth(diffed, window::window_len(params)?)))
    }
}

/// Running total plus a starting offset.
pub struct DeriveCumsum;

impl Transform for DeriveCumsum {
    fn name(&self) -> &'static str {
        "DeriveCumsum"
    }

    fn stage(&self) -> TransformStage {
        TransformStage::Derive
    }

    fn describe(&self) -> ParameterSchema {
        ParameterSchema::new(self.name(), self.stage())
            .param(ParamSpec::optional("offset", "initial offset value for starting sum", json!(0)))
            .role(target_role())
            .role(RoleSpec::output())
    }

    fn apply(&self, inputs: &TransformInputs, params: &FuncParams) -> Result<Column, TransformError> {
        let values = inputs.floats(TARGET)?;
        let mut total = params.f64("offset")?;
        let summed = values
            .iter()
            .map(|v| {
                total += v;
                total
            })
            .collect();
        Ok(Column::Float(summed))
    }
}

/// Centered moving sum, same length as the input.
pub struct DeriveWindowSum;

impl Transform for DeriveWindowSum {
    fn name(&self) -> &'static str {
        "DeriveWindowSum"
    }

    fn stage(&self) -> TransformStage {
        TransformStage::Derive
    }

    fn describe(&self) -> ParameterSchema {
        ParameterSchema::new(self.name(), self.stage())
            .param(ParamSpec::optional(WINDOW_LEN, "window size for summing", json!(2)))
            .role(target_role())
            .role(RoleSpec::output())
    }

    fn apply(&self, inputs: &TransformInputs, params: &FuncParams) -> Result<Column, TransformError> {
        let values = inputs.floats(TARGET)?;
        Ok(Column::Float(window::window_sum(
            &values,
            window::window_len(params)?,
        )))
    }
}

pub struct DeriveScaled;

impl Transform for DeriveScaled {
    fn name(&self) -> &'static str {
        "DeriveScaled"
    }

    fn stage(&self) -> TransformStage {
        TransformStage::Derive
    }

    fn describe(&self) -> ParameterSchema {
        ParameterSchema::new(self.name(), self.stage())
            .param(ParamSpec::required("scalar", "value to scale data with"))
            .role(target_role())
            .role(RoleSpec::output())
    }

    fn apply(&self, inputs: &TransformInputs, params: &FuncParams) -> Result<Column, TransformError> {
        let scalar = params.f64("scalar")?;
        let values = inputs.floats(TARGET)?;
        Ok(Column::Float(values.iter().map(|v| v * scalar).collect()))
    }
}
