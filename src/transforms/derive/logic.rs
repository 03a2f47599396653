// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::json;

use crate::batch::Column;
use crate::errors::TransformError;
use crate::traits::{Transform, TransformStage};
use crate::transforms::{
    ComparisonOperator, FuncParams, ParamSpec, ParameterSchema, RoleSpec, TransformInputs,
};

pub(crate) const TARGET: &str = "target_measure";

/// Compares every value against `threshold`. NaN is compared as zero.
pub fn compare_threshold(
    values: &[f64],
    operator: ComparisonOperator,
    threshold: f64,
    absolute: bool,
) -> Vec<bool> {
    values
        .iter()
        .map(|v| {
            let v = if v.is_nan() { 0.0 } else { *v };
            let v = if absolute { v.abs() } else { v };
            operator.compare(v, threshold)
        })
        .collect()
}

/// Parameters shared by the derive and detect threshold transforms.
pub(crate) fn threshold_schema(schema: ParameterSchema) -> ParameterSchema {
    schema
        .param(ParamSpec::required("threshold_value", "value to compare against"))
        .param(ParamSpec::required("comparison_operator", "one of == != >= <= > <"))
        .param(ParamSpec::optional(
            "absolute_compare",
            "compare the absolute value instead of the raw value",
            json!(false),
        ))
        .role(RoleSpec::input(TARGET, "name of the target measure"))
}

pub(crate) fn apply_threshold(
    inputs: &TransformInputs,
    params: &FuncParams,
) -> Result<Column, TransformError> {
    let values = inputs.floats(TARGET)?;
    Ok(Column::Bool(compare_threshold(
        &values,
        params.operator("comparison_operator")?,
        params.f64("threshold_value")?,
        params.bool("absolute_compare")?,
    )))
}

/// Boolean column marking where a measure crosses a threshold.
pub struct DeriveThreshold;

impl Transform for DeriveThreshold {
    fn name(&self) -> &'static str {
        "DeriveThreshold"
    }

    fn stage(&self) -> TransformStage {
        TransformStage::Derive
    }

    fn describe(&self) -> ParameterSchema {
        threshold_schema(ParameterSchema::new(self.name(), self.stage())).role(RoleSpec::output())
    }

    fn apply(&self, inputs: &TransformInputs, params: &FuncParams) -> Result<Column, TransformError> {
        apply_threshold(inputs, params)
    }
}

/// Elementwise AND / OR of two boolean columns.
pub struct DeriveLogicalCombination;

impl Transform for DeriveLogicalCombination {
    fn name(&self) -> &'static str {
        "DeriveLogicalCombination"
    }

    fn stage(&self) -> TransformStage {
        TransformStage::Derive
    }

    fn describe(&self) -> ParameterSchema {
        ParameterSchema::new(self.name(), self.stage())
            .param(ParamSpec::optional("combiner", "AND or OR", json!("AND")))
            .role(RoleSpec::input("first_measure", "first measure to be combined"))
            .role(RoleSpec::input("second_measure", "second measure to be combined"))
            .role(RoleSpec::output())
    }

    fn apply(&self, inputs: &TransformInputs, params: &FuncParams) -> Result<Column, TransformError> {
        let combiner = params.combiner("combiner")?;
        let first = inputs.bools("first_measure")?;
        let second = inputs.bools("second_measure")?;
        Ok(Column::Bool(
            first
                .iter()
                .zip(second.iter())
                .map(|(a, b)| combiner.combine(*a, *b))
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_compare_threshold_operators() {
        struct TestCase {
            operator: ComparisonOperator,
            absolute: bool,
            expected: Vec<bool>,
        }

        let values = [-3.0, 0.0, 2.0, f64::NAN];
        let cases = vec![
            TestCase {
                operator: ComparisonOperator::Eq,
                absolute: false,
                expected: vec![false, false, true, false],
            },
            TestCase {
                operator: ComparisonOperator::Ne,
                absolute: false,
                expected: vec![true, true, false, true],
            },
            TestCase {
                operator: ComparisonOperator::Ge,
                absolute: true,
                expected: vec![true, false, true, false],
            },
            TestCase {
                operator: ComparisonOperator::Le,
                absolute: false,
                expected: vec![true, true, true, true],
            },
            TestCase {
                operator: ComparisonOperator::Gt,
                absolute: false,
                expected: vec![false, false, false, false],
            },
            TestCase {
                operator: ComparisonOperator::Lt,
                absolute: true,
                expected: vec![false, true, false, true],
            },
        ];

        for case in cases {
            assert_eq!(
                compare_threshold(&values, case.operator, 2.0, case.absolute),
                case.expected,
                "{} abs={}",
                case.operator,
                case.absolute
            );
        }
    }

    #[test]
    fn test_derive_threshold_requires_operator() {
        let given = BTreeMap::from([("threshold_value".to_string(), json!(1))]);
        assert!(matches!(
            DeriveThreshold.describe().resolve(&given),
            Err(TransformError::MissingParameter { .. })
        ));
    }

    #[test]
    fn test_logical_combination() {
        let inputs = TransformInputs::new()
            .with("first_measure", Column::Bool(vec![true, true, false]))
            .with("second_measure", Column::Float(vec![1.0, 0.0, 0.0]));

        let and = DeriveLogicalCombination
            .describe()
            .resolve(&BTreeMap::new())
            .unwrap();
        assert_eq!(
            DeriveLogicalCombination.apply(&inputs, &and).unwrap(),
            Column::Bool(vec![true, false, false])
        );

        let or = DeriveLogicalCombination
            .describe()
            .resolve(&BTreeMap::from([("combiner".to_string(), json!("OR"))]))
            .unwrap();
        assert_eq!(
            DeriveLogicalCombination.apply(&inputs, &or).unwrap(),
            Column::Bool(vec![true, true, false])
        );
    }
}
