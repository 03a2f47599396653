// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::partition::Predicate;
use crate::transforms::LogicalCombiner;

/// Role in `measure_rules` naming the column a rule writes.
pub const OUTPUT_ROLE: &str = "output_name";

/// Parameters of a rule: transform arguments plus the role -> column mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformParams {
    #[serde(default)]
    pub func_params: BTreeMap<String, Value>,
    #[serde(default)]
    pub measure_rules: BTreeMap<String, String>,
}

/// Shared shape of filter, derived-parameter and event rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_id: Option<u64>,
    pub transform_name: String,
    #[serde(default)]
    pub measure_list: Vec<String>,
    #[serde(default)]
    pub partition_list: Vec<Predicate>,
    #[serde(default)]
    pub logical_comparison: LogicalCombiner,
    #[serde(default, rename = "param_dict")]
    pub params: TransformParams,
}

impl Rule {
    pub fn new(transform_name: impl Into<String>) -> Self {
        Self {
            transform_id: None,
            transform_name: transform_name.into(),
            measure_list: Vec::new(),
            partition_list: Vec::new(),
            logical_comparison: LogicalCombiner::default(),
            params: TransformParams::default(),
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.transform_id = Some(id);
        self
    }

    /// Binds `role` to `column` and adds the column to `measure_list`.
    pub fn with_input(mut self, role: impl Into<String>, column: impl Into<String>) -> Self {
        let column = column.into();
        if !self.measure_list.contains(&column) {
            self.measure_list.push(column.clone());
        }
        self.params.measure_rules.insert(role.into(), column);
        self
    }

    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.params
            .measure_rules
            .insert(OUTPUT_ROLE.to_string(), name.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.func_params.insert(name.into(), value);
        self
    }

    pub fn with_partition(mut self, predicate: Predicate) -> Self {
        self.partition_list.push(predicate);
        self
    }

    pub fn with_combiner(mut self, combiner: LogicalCombiner) -> Self {
        self.logical_comparison = combiner;
        self
    }

    pub fn output_name(&self) -> Option<&str> {
        self.params.measure_rules.get(OUTPUT_ROLE).map(String::as_str)
    }

    /// Columns the transform reads: every role binding except the output,
    /// then anything else in `measure_list`. Deduplicated, first seen wins.
    pub fn input_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        let bound = self
            .params
            .measure_rules
            .iter()
            .filter(|(role, _)| role.as_str() != OUTPUT_ROLE)
            .map(|(_, column)| column.as_str());
        for column in bound.chain(self.measure_list.iter().map(String::as_str)) {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        columns
    }

    pub fn partition_columns(&self) -> impl Iterator<Item = &str> {
        self.partition_list.iter().map(|p| p.column.as_str())
    }

    /// Every column the rule touches, inputs first, deduplicated.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut columns = self.input_columns();
        for column in self.partition_columns() {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        columns
    }
}

/// A rule whose output lands in `filter_measures[filter_name]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    pub filter_name: String,
    #[serde(flatten)]
    pub rule: Rule,
}

impl FilterRule {
    pub fn new(filter_name: impl Into<String>, rule: Rule) -> Self {
        Self {
            filter_name: filter_name.into(),
            rule,
        }
    }
}

/// A detection rule producing occurrences under `event_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRule {
    pub event_name: String,
    pub stream_token: String,
    #[serde(flatten)]
    pub rule: Rule,
}

impl EventRule {
    pub fn new(event_name: impl Into<String>, stream_token: impl Into<String>, rule: Rule) -> Self {
        Self {
            event_name: event_name.into(),
            stream_token: stream_token.into(),
            rule,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::ComparisonOperator;
    use serde_json::json;

    #[test]
    fn test_input_columns_exclude_output() {
        let rule = Rule::new("DeriveSlope")
            .with_input("rise_measure", "altitude")
            .with_input("run_measure", "timestamp")
            .with_output("climb")
            .with_partition(Predicate::new("mode", ComparisonOperator::Eq, json!("drive")));

        assert_eq!(rule.output_name(), Some("climb"));
        assert_eq!(rule.input_columns(), vec!["altitude", "timestamp"]);
        assert_eq!(rule.referenced_columns(), vec!["altitude", "timestamp", "mode"]);
    }

    #[test]
    fn test_rule_json_shape() {
        let rule: FilterRule = serde_json::from_value(json!({
            "filter_name": "location_buttered",
            "transform_id": 1,
            "transform_name": "ButterLowpass",
            "measure_list": ["location"],
            "param_dict": {
                "func_params": {"order": 2},
                "measure_rules": {"target_measure": "location", "output_name": "location_buttered"}
            }
        }))
        .unwrap();

        assert_eq!(rule.rule.transform_id, Some(1));
        assert_eq!(rule.rule.logical_comparison, LogicalCombiner::And);
        assert!(rule.rule.partition_list.is_empty());
        assert_eq!(rule.rule.params.func_params["order"], json!(2));
    }
}
