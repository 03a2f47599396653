// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::compare::{ComparisonOperator, LogicalCombiner};
use crate::batch::Column;
use crate::errors::TransformError;
use crate::rules::OUTPUT_ROLE;
use crate::traits::TransformStage;

/// One entry of `func_params`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            default: None,
            required: true,
        }
    }

    pub fn optional(name: &'static str, description: &'static str, default: Value) -> Self {
        Self {
            name,
            description,
            default: Some(default),
            required: false,
        }
    }
}

/// One entry of `measure_rules`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleSpec {
    pub role: &'static str,
    pub description: &'static str,
}

impl RoleSpec {
    pub fn input(role: &'static str, description: &'static str) -> Self {
        Self { role, description }
    }

    pub fn output() -> Self {
        Self {
            role: OUTPUT_ROLE,
            description: "name of returned measure",
        }
    }
}

/// Self-description of a transform's parameters and measure roles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSchema {
    pub transform: &'static str,
    pub stage: TransformStage,
    pub func_params: Vec<ParamSpec>,
    pub measure_rules: Vec<RoleSpec>,
}

impl ParameterSchema {
    pub fn new(transform: &'static str, stage: TransformStage) -> Self {
        Self {
            transform,
            stage,
            func_params: Vec::new(),
            measure_rules: Vec::new(),
        }
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.func_params.push(spec);
        self
    }

    pub fn role(mut self, spec: RoleSpec) -> Self {
        self.measure_rules.push(spec);
        self
    }

    /// Measure roles the transform reads, excluding the output role.
    pub fn input_roles(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.measure_rules
            .iter()
            .map(|r| r.role)
            .filter(|role| *role != OUTPUT_ROLE)
    }

    pub fn has_output(&self) -> bool {
        self.measure_rules.iter().any(|r| r.role == OUTPUT_ROLE)
    }

    /// Names of required parameters absent from `given`.
    pub fn missing_parameters<'a>(
        &'a self,
        given: &'a BTreeMap<String, Value>,
    ) -> impl Iterator<Item = &'static str> + 'a {
        self.func_params
            .iter()
            .filter(|spec| spec.required && !given.contains_key(spec.name))
            .map(|spec| spec.name)
    }

    /// Fills in defaults and rejects missing required parameters.
    /// Parameters not named in the schema pass through untouched.
    pub fn resolve(&self, given: &BTreeMap<String, Value>) -> Result<FuncParams, TransformError> {
        let mut values = given.clone();
        for spec in &self.func_params {
            if values.contains_key(spec.name) {
                continue;
            }
            match &spec.default {
                Some(default) => {
                    values.insert(spec.name.to_string(), default.clone());
                }
                None => {
                    return Err(TransformError::MissingParameter {
                        transform: self.transform.to_string(),
                        name: spec.name.to_string(),
                    })
                }
            }
        }
        Ok(FuncParams { values })
    }
}

/// Resolved `func_params` with typed accessors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuncParams {
    values: BTreeMap<String, Value>,
}

impl FuncParams {
    pub fn new(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }

    fn value(&self, name: &str) -> Result<&Value, TransformError> {
        self.values
            .get(name)
            .ok_or_else(|| TransformError::invalid(name, "a value"))
    }

    pub fn f64(&self, name: &str) -> Result<f64, TransformError> {
        self.value(name)?
            .as_f64()
            .ok_or_else(|| TransformError::invalid(name, "a number"))
    }

    pub fn usize(&self, name: &str) -> Result<usize, TransformError> {
        let value = self.value(name)?;
        value
            .as_u64()
            .or_else(|| {
                value
                    .as_f64()
                    .filter(|x| *x >= 0.0 && x.fract() == 0.0)
                    .map(|x| x as u64)
            })
            .map(|x| x as usize)
            .ok_or_else(|| TransformError::invalid(name, "a non-negative integer"))
    }

    pub fn bool(&self, name: &str) -> Result<bool, TransformError> {
        self.value(name)?
            .as_bool()
            .ok_or_else(|| TransformError::invalid(name, "a boolean"))
    }

    pub fn str(&self, name: &str) -> Result<&str, TransformError> {
        self.value(name)?
            .as_str()
            .ok_or_else(|| TransformError::invalid(name, "a string"))
    }

    pub fn point(&self, name: &str) -> Result<[f64; 2], TransformError> {
        match self.value(name)? {
            Value::Array(items) if items.len() == 2 => match (items[0].as_f64(), items[1].as_f64()) {
                (Some(a), Some(b)) => Ok([a, b]),
                _ => Err(TransformError::invalid(name, "a pair of numbers")),
            },
            _ => Err(TransformError::invalid(name, "a pair of numbers")),
        }
    }

    pub fn operator(&self, name: &str) -> Result<ComparisonOperator, TransformError> {
        self.str(name)?
            .parse()
            .map_err(|_| TransformError::invalid(name, "one of == != >= <= > <"))
    }

    pub fn combiner(&self, name: &str) -> Result<LogicalCombiner, TransformError> {
        self.str(name)?
            .parse()
            .map_err(|_| TransformError::invalid(name, "AND or OR"))
    }

    /// A string parameter restricted to `allowed` values.
    pub fn choice(&self, name: &str, allowed: &[&str]) -> Result<String, TransformError> {
        let value = self.str(name)?;
        if allowed.contains(&value) {
            Ok(value.to_string())
        } else {
            Err(TransformError::invalid(name, format!("one of {}", allowed.join(", "))))
        }
    }
}

/// Columns bound to a transform's measure roles, restricted to the rows the
/// rule selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformInputs {
    columns: BTreeMap<String, Column>,
}

impl TransformInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: impl Into<String>, column: Column) -> Self {
        self.insert(role, column);
        self
    }

    pub fn insert(&mut self, role: impl Into<String>, column: Column) {
        self.columns.insert(role.into(), column);
    }

    pub fn column(&self, role: &str) -> Result<&Column, TransformError> {
        self.columns.get(role).ok_or_else(|| TransformError::MissingInput {
            role: role.to_string(),
        })
    }

    pub fn floats(&self, role: &str) -> Result<Cow<'_, [f64]>, TransformError> {
        self.column(role)?.as_floats(role)
    }

    pub fn points(&self, role: &str) -> Result<Cow<'_, [[f64; 2]]>, TransformError> {
        self.column(role)?.as_points(role)
    }

    pub fn bools(&self, role: &str) -> Result<Cow<'_, [bool]>, TransformError> {
        self.column(role)?.as_bools(role)
    }
}
