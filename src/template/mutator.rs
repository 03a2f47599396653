// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured add / modify / remove edits of a template.
//!
//! Ops are applied in order to a copy of the template. Every name an op takes
//! away (a measure, a field, a filter output, ...) is remembered; once all ops
//! are applied, each remembered name that the edited template no longer
//! provides is checked against every rule still reading it. Any hit rejects
//! the whole update with the complete list of broken references, and the
//! original template is left as it was.
//!
//! # Op format
//! ```json
//! { "field": "measures", "type": "remove", "args": ["heading"] }
//! { "field": "fields", "type": "new", "args": ["mode"], "kwargs": { "old_field": "transport" } }
//! { "field": "dparam_rules", "type": "modify", "args": [3, "window_len", 5],
//!   "kwargs": { "new_partition_list": [] } }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::dependency_graph::DependencyGraph;
use super::{DataType, MeasureDef, Template};
use crate::errors::{DependencyKind, UpdateError, UpdateStatus, Violation};
use crate::rules::{EventRule, FilterRule, Predicate, Rule, OUTPUT_ROLE};

/// Template attribute an update op targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateField {
    StreamName,
    UserDescription,
    SourceKey,
    UserIds,
    Fields,
    Tags,
    ForeignKeys,
    StorageRules,
    IngestRules,
    EngineRules,
    Measures,
    Filters,
    DparamRules,
    EventRules,
}

impl TemplateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateField::StreamName => "stream_name",
            TemplateField::UserDescription => "user_description",
            TemplateField::SourceKey => "source_key",
            TemplateField::UserIds => "user_ids",
            TemplateField::Fields => "fields",
            TemplateField::Tags => "tags",
            TemplateField::ForeignKeys => "foreign_keys",
            TemplateField::StorageRules => "storage_rules",
            TemplateField::IngestRules => "ingest_rules",
            TemplateField::EngineRules => "engine_rules",
            TemplateField::Measures => "measures",
            TemplateField::Filters => "filters",
            TemplateField::DparamRules => "dparam_rules",
            TemplateField::EventRules => "event_rules",
        }
    }
}

impl fmt::Display for TemplateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    New,
    Modify,
    Remove,
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            UpdateKind::New => "new",
            UpdateKind::Modify => "modify",
            UpdateKind::Remove => "remove",
        };
        f.write_str(kind)
    }
}

/// One edit: target field, kind, positional args and keyword args.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOp {
    pub field: TemplateField,
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: BTreeMap<String, Value>,
}

impl UpdateOp {
    pub fn new(field: TemplateField, kind: UpdateKind) -> Self {
        Self {
            field,
            kind,
            args: Vec::new(),
            kwargs: BTreeMap::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }

    fn malformed(&self, reason: impl Into<String>) -> UpdateError {
        UpdateError::malformed(self.field, reason)
    }

    fn arg(&self, i: usize) -> Result<&Value, UpdateError> {
        self.args
            .get(i)
            .ok_or_else(|| self.malformed(format!("missing argument {}", i)))
    }

    fn str_arg(&self, i: usize) -> Result<&str, UpdateError> {
        self.arg(i)?
            .as_str()
            .ok_or_else(|| self.malformed(format!("argument {} must be a string", i)))
    }

    fn id_arg(&self, i: usize) -> Result<u64, UpdateError> {
        self.arg(i)?
            .as_u64()
            .ok_or_else(|| self.malformed(format!("argument {} must be a transform id", i)))
    }

    fn parse_arg<T: DeserializeOwned>(&self, i: usize) -> Result<T, UpdateError> {
        serde_json::from_value(self.arg(i)?.clone())
            .map_err(|e| self.malformed(format!("argument {}: {}", i, e)))
    }

    fn kwarg_str(&self, name: &str) -> Result<Option<&str>, UpdateError> {
        match self.kwargs.get(name) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| self.malformed(format!("'{}' must be a string", name))),
        }
    }

    fn parse_kwarg<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, UpdateError> {
        self.kwargs
            .get(name)
            .map(|value| {
                serde_json::from_value(value.clone())
                    .map_err(|e| self.malformed(format!("'{}': {}", name, e)))
            })
            .transpose()
    }

    /// `args[from..]` read as `key, value, key, value, ...`, or as a single
    /// list of `[key, value]` pairs.
    fn pairs(&self, from: usize) -> Result<Vec<(String, Value)>, UpdateError> {
        let rest = self.args.get(from..).unwrap_or_default();
        if let [Value::Array(nested)] = rest {
            return nested
                .iter()
                .map(|pair| match pair.as_array().map(Vec::as_slice) {
                    Some([Value::String(key), value]) => Ok((key.clone(), value.clone())),
                    _ => Err(self.malformed(format!("{} is not a [key, value] pair", pair))),
                })
                .collect();
        }
        if rest.len() % 2 != 0 {
            return Err(self.malformed("key/value arguments must come in pairs"));
        }
        rest.chunks(2)
            .map(|pair| match &pair[0] {
                Value::String(key) => Ok((key.clone(), pair[1].clone())),
                other => Err(self.malformed(format!("key {} is not a string", other))),
            })
            .collect()
    }
}

/// Applies `ops` to a copy of `template` and returns it as the next version.
pub fn update_template(template: &Template, ops: &[UpdateOp]) -> Result<Template, UpdateError> {
    let mut updated = template.clone();
    let mut removed = Vec::new();
    for op in ops {
        apply_op(&mut updated, op, &mut removed)?;
    }

    let violations = broken_references(&updated, &removed);
    if !violations.is_empty() {
        return Err(UpdateError::InvalidUpdate { violations });
    }

    updated.version += 1;
    Ok(updated)
}

/// Dry run of [`update_template`].
pub fn validate_update(template: &Template, ops: &[UpdateOp]) -> UpdateStatus {
    match update_template(template, ops) {
        Ok(_) => UpdateStatus::Ok,
        Err(UpdateError::InvalidUpdate { violations }) => UpdateStatus::InvalidUpdate(violations),
        Err(err @ UpdateError::Malformed { .. }) => UpdateStatus::Malformed(err.to_string()),
    }
}

/// Every rule in `template` still reading a removed name, sorted.
fn broken_references(template: &Template, removed: &[(DependencyKind, String)]) -> Vec<Violation> {
    let graph = DependencyGraph::from_template(template);
    let mut violations = BTreeSet::new();
    for (dependency, name) in removed {
        if graph.contains(name) {
            continue;
        }
        for reader in graph.readers_of(name) {
            if let Some(kind) = reader.slot.rule_kind() {
                violations.insert(Violation {
                    kind,
                    rule: reader.label.clone(),
                    dependency: *dependency,
                    missing: name.clone(),
                });
            }
        }
    }
    violations.into_iter().collect()
}

fn apply_op(
    template: &mut Template,
    op: &UpdateOp,
    removed: &mut Vec<(DependencyKind, String)>,
) -> Result<(), UpdateError> {
    use TemplateField as F;
    use UpdateKind as K;

    match (op.field, op.kind) {
        (F::StreamName, K::New | K::Modify) => template.stream_name = op.str_arg(0)?.to_string(),
        (F::UserDescription, K::New | K::Modify) => {
            template.user_description = Some(op.str_arg(0)?.to_string())
        }
        (F::UserDescription, K::Remove) => template.user_description = None,
        (F::SourceKey, K::New | K::Modify) => template.source_key = Some(op.str_arg(0)?.to_string()),
        (F::SourceKey, K::Remove) => template.source_key = None,

        (F::UserIds, K::New) => add_name(&mut template.user_ids, op, "old_id", DependencyKind::UserId, removed)?,
        (F::Fields, K::New) => add_name(&mut template.fields, op, "old_field", DependencyKind::Field, removed)?,
        (F::Tags, K::New) => add_name(&mut template.tags, op, "old_tag", DependencyKind::Tag, removed)?,
        (F::UserIds, K::Remove) => remove_name(&mut template.user_ids, op, DependencyKind::UserId, removed)?,
        (F::Fields, K::Remove) => remove_name(&mut template.fields, op, DependencyKind::Field, removed)?,
        (F::Tags, K::Remove) => remove_name(&mut template.tags, op, DependencyKind::Tag, removed)?,

        (F::ForeignKeys, K::New) => {
            let key = op.str_arg(0)?.to_string();
            match op.kwarg_str("old_fk")? {
                Some(old) => {
                    let slot = template
                        .foreign_keys
                        .iter_mut()
                        .find(|fk| fk.as_str() == old)
                        .ok_or_else(|| op.malformed(format!("no foreign key '{}'", old)))?;
                    *slot = key;
                }
                None if template.foreign_keys.contains(&key) => {}
                None => template.foreign_keys.push(key),
            }
        }
        (F::ForeignKeys, K::Remove) => {
            let key = op.str_arg(0)?;
            let position = template
                .foreign_keys
                .iter()
                .position(|fk| fk == key)
                .ok_or_else(|| op.malformed(format!("no foreign key '{}'", key)))?;
            template.foreign_keys.remove(position);
        }

        (F::StorageRules, K::Modify) => merge_pairs(&mut template.storage_rules, op)?,
        (F::IngestRules, K::Modify) => merge_pairs(&mut template.ingest_rules, op)?,
        (F::EngineRules, K::Modify) => merge_pairs(&mut template.engine_rules, op)?,

        (F::Measures, K::New) => {
            let name = op.str_arg(0)?;
            let dtype: DataType = op
                .str_arg(1)?
                .parse()
                .map_err(|e: String| op.malformed(e))?;
            if template.measures.contains_key(name) {
                return Err(op.malformed(format!("measure '{}' already exists", name)));
            }
            template.measures.insert(name.to_string(), MeasureDef { dtype });
        }
        (F::Measures, K::Remove) => {
            let name = op.str_arg(0)?;
            template
                .measures
                .remove(name)
                .ok_or_else(|| op.malformed(format!("no measure '{}'", name)))?;
            removed.push((DependencyKind::Measure, name.to_string()));
        }

        (F::Filters, K::New) => {
            let mut filter: FilterRule = op.parse_arg(0)?;
            if filter.rule.transform_id.is_none() {
                filter.rule.transform_id = Some(template.next_transform_id());
            }
            template.filters.push(filter);
        }
        (F::Filters, K::Modify) => {
            let index = filter_index(template, op)?;
            modify_rule(&mut template.filters[index].rule, op)?;
        }
        (F::Filters, K::Remove) => {
            let index = filter_index(template, op)?;
            let filter = template.filters.remove(index);
            removed.push((DependencyKind::Filter, filter.filter_name));
        }

        (F::DparamRules, K::New) => {
            let mut rule: Rule = op.parse_arg(0)?;
            if rule.transform_id.is_none() {
                rule.transform_id = Some(template.next_transform_id());
            }
            template.dparam_rules.push(rule);
        }
        (F::DparamRules, K::Modify) => {
            let index = dparam_index(template, op)?;
            let rule = &mut template.dparam_rules[index];
            let before = rule.output_name().map(str::to_string);
            modify_rule(rule, op)?;
            if let Some(before) = before {
                if rule.output_name() != Some(before.as_str()) {
                    removed.push((DependencyKind::DerivedParam, before));
                }
            }
        }
        (F::DparamRules, K::Remove) => {
            let index = dparam_index(template, op)?;
            let rule = template.dparam_rules.remove(index);
            if let Some(output) = rule.output_name() {
                removed.push((DependencyKind::DerivedParam, output.to_string()));
            }
        }

        (F::EventRules, K::New) => {
            let name = op.str_arg(0)?;
            if template.event_rules.contains_key(name) {
                return Err(op.malformed(format!("event '{}' already exists", name)));
            }
            let rule: Rule = op.parse_arg(1)?;
            let event = EventRule::new(name, template.stream_token.clone(), rule);
            template.event_rules.insert(name.to_string(), event);
        }
        (F::EventRules, K::Modify) => {
            let name = op.str_arg(0)?;
            let event = template
                .event_rules
                .get_mut(name)
                .ok_or_else(|| op.malformed(format!("no event '{}'", name)))?;
            modify_rule(&mut event.rule, op)?;
        }
        (F::EventRules, K::Remove) => {
            let name = op.str_arg(0)?;
            template
                .event_rules
                .remove(name)
                .ok_or_else(|| op.malformed(format!("no event '{}'", name)))?;
        }

        (field, kind) => {
            return Err(UpdateError::malformed(
                field,
                format!("'{}' is not supported on this field", kind),
            ))
        }
    }
    Ok(())
}

/// Adds `args[0]` to a name set, renaming `kwargs[old_key]` when given.
fn add_name(
    names: &mut BTreeSet<String>,
    op: &UpdateOp,
    old_key: &str,
    dependency: DependencyKind,
    removed: &mut Vec<(DependencyKind, String)>,
) -> Result<(), UpdateError> {
    let name = op.str_arg(0)?.to_string();
    if let Some(old) = op.kwarg_str(old_key)? {
        if !names.remove(old) {
            return Err(op.malformed(format!("no {} '{}' to rename", dependency, old)));
        }
        removed.push((dependency, old.to_string()));
    }
    names.insert(name);
    Ok(())
}

fn remove_name(
    names: &mut BTreeSet<String>,
    op: &UpdateOp,
    dependency: DependencyKind,
    removed: &mut Vec<(DependencyKind, String)>,
) -> Result<(), UpdateError> {
    let name = op.str_arg(0)?;
    if !names.remove(name) {
        return Err(op.malformed(format!("no {} '{}'", dependency, name)));
    }
    removed.push((dependency, name.to_string()));
    Ok(())
}

fn merge_pairs(target: &mut BTreeMap<String, Value>, op: &UpdateOp) -> Result<(), UpdateError> {
    let pairs = op.pairs(0)?;
    if pairs.is_empty() && op.kwargs.is_empty() {
        return Err(op.malformed("nothing to modify"));
    }
    target.extend(pairs);
    target.extend(op.kwargs.iter().map(|(k, v)| (k.clone(), v.clone())));
    Ok(())
}

fn filter_index(template: &Template, op: &UpdateOp) -> Result<usize, UpdateError> {
    let id = op.id_arg(0)?;
    template
        .filters
        .iter()
        .position(|f| f.rule.transform_id == Some(id))
        .ok_or_else(|| op.malformed(format!("no filter with transform id {}", id)))
}

fn dparam_index(template: &Template, op: &UpdateOp) -> Result<usize, UpdateError> {
    let id = op.id_arg(0)?;
    template
        .dparam_rules
        .iter()
        .position(|r| r.transform_id == Some(id))
        .ok_or_else(|| op.malformed(format!("no derived param with transform id {}", id)))
}

/// Applies `args[1..]` pairs to `func_params` plus the `new_partition_list`
/// and `new_measure_rules` kwargs.
fn modify_rule(rule: &mut Rule, op: &UpdateOp) -> Result<(), UpdateError> {
    let pairs = op.pairs(1)?;
    let partitions: Option<Vec<Predicate>> = op.parse_kwarg("new_partition_list")?;
    let roles: Option<BTreeMap<String, String>> = op.parse_kwarg("new_measure_rules")?;
    if pairs.is_empty() && partitions.is_none() && roles.is_none() {
        return Err(op.malformed("nothing to modify"));
    }

    rule.params.func_params.extend(pairs);
    if let Some(partitions) = partitions {
        rule.partition_list = partitions;
    }
    if let Some(roles) = roles {
        rule.measure_list = roles
            .iter()
            .filter(|(role, _)| role.as_str() != OUTPUT_ROLE)
            .map(|(_, column)| column.clone())
            .collect();
        rule.params.measure_rules = roles;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RuleKind;
    use crate::template::DataType;
    use crate::transforms::ComparisonOperator;
    use serde_json::json;

    fn template() -> Template {
        Template::new("driver_data", "tok")
            .with_measure("location", DataType::Geo)
            .with_measure("timestamp_winning", DataType::Int)
            .with_measure("speed", DataType::Float)
            .with_field("mode")
            .with_user_id("driver-id")
            .with_filter(FilterRule::new(
                "location_buttered",
                Rule::new("ButterLowpass")
                    .with_id(1)
                    .with_input("target_measure", "location"),
            ))
            .with_dparam_rule(
                Rule::new("DeriveSlope")
                    .with_id(2)
                    .with_input("rise_measure", "speed")
                    .with_input("run_measure", "timestamp_winning")
                    .with_output("acceleration"),
            )
            .with_dparam_rule(
                Rule::new("DeriveDistance")
                    .with_id(3)
                    .with_input("spatial_measure", "location_buttered")
                    .with_output("distance")
                    .with_partition(Predicate::new("mode", ComparisonOperator::Eq, json!("drive"))),
            )
            .with_event_rule(EventRule::new(
                "far",
                "tok",
                Rule::new("DetectThreshold")
                    .with_input("target_measure", "distance")
                    .with_param("threshold_value", json!(1.0))
                    .with_param("comparison_operator", json!(">")),
            ))
    }

    fn remove(field: TemplateField, name: impl Into<Value>) -> UpdateOp {
        UpdateOp::new(field, UpdateKind::Remove).with_arg(name)
    }

    #[test]
    fn test_removing_referenced_measure_reports_one_violation() {
        let ops = [remove(TemplateField::Measures, "timestamp_winning")];

        let status = validate_update(&template(), &ops);

        let UpdateStatus::InvalidUpdate(violations) = status else {
            panic!("expected invalid update, got {:?}", status);
        };
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].as_tuple(),
            ("derived param", "acceleration", "measure", "timestamp_winning")
        );
    }

    #[test]
    fn test_all_violations_reported_in_one_pass() {
        let ops = [
            remove(TemplateField::Measures, "location"),
            remove(TemplateField::Fields, "mode"),
            remove(TemplateField::DparamRules, 3),
        ];
        let original = template();

        let err = update_template(&original, &ops).unwrap_err();

        let UpdateError::InvalidUpdate { violations } = err else {
            panic!("expected invalid update");
        };
        let tuples: Vec<_> = violations.iter().map(Violation::as_tuple).collect();
        // mode lost its only reader with rule 3; distance did not
        assert_eq!(
            tuples,
            vec![
                ("filter", "location_buttered", "measure", "location"),
                ("event", "far", "derived param", "distance"),
            ]
        );
        assert_eq!(original, template());
    }

    #[test]
    fn test_successful_updates() {
        struct TestCase {
            name: &'static str,
            ops: Vec<UpdateOp>,
            check: fn(&Template),
        }

        let cases = vec![
            TestCase {
                name: "remove measure together with its reader",
                ops: vec![
                    remove(TemplateField::DparamRules, 2),
                    remove(TemplateField::Measures, "timestamp_winning"),
                ],
                check: |t| {
                    assert!(!t.measures.contains_key("timestamp_winning"));
                    assert_eq!(t.dparam_rules.len(), 1);
                },
            },
            TestCase {
                name: "remove and re-add a measure",
                ops: vec![
                    remove(TemplateField::Measures, "speed"),
                    UpdateOp::new(TemplateField::Measures, UpdateKind::New)
                        .with_arg("speed")
                        .with_arg("int"),
                ],
                check: |t| assert_eq!(t.measures["speed"].dtype, DataType::Int),
            },
            TestCase {
                name: "rename an unreferenced user id",
                ops: vec![UpdateOp::new(TemplateField::UserIds, UpdateKind::New)
                    .with_arg("driver")
                    .with_kwarg("old_id", "driver-id")],
                check: |t| {
                    assert!(t.user_ids.contains("driver"));
                    assert!(!t.user_ids.contains("driver-id"));
                },
            },
            TestCase {
                name: "modify derived params by transform id",
                ops: vec![UpdateOp::new(TemplateField::DparamRules, UpdateKind::Modify)
                    .with_arg(3)
                    .with_arg("units")
                    .with_arg("km")
                    .with_kwarg("new_partition_list", json!([]))],
                check: |t| {
                    let rule = &t.dparam_rules[1];
                    assert_eq!(rule.params.func_params["units"], json!("km"));
                    assert!(rule.partition_list.is_empty());
                },
            },
            TestCase {
                name: "new filter gets the next transform id",
                ops: vec![UpdateOp::new(TemplateField::Filters, UpdateKind::New).with_arg(json!({
                    "filter_name": "speed_windowed",
                    "transform_name": "WindowAverage",
                    "measure_list": ["speed"],
                    "param_dict": { "measure_rules": { "target_measure": "speed" } }
                }))],
                check: |t| assert_eq!(t.filters[1].rule.transform_id, Some(4)),
            },
            TestCase {
                name: "new event rule takes the stream token",
                ops: vec![UpdateOp::new(TemplateField::EventRules, UpdateKind::New)
                    .with_arg("slow")
                    .with_arg(json!({
                        "transform_name": "DetectThreshold",
                        "param_dict": {
                            "func_params": { "threshold_value": 2, "comparison_operator": "<" },
                            "measure_rules": { "target_measure": "speed" }
                        }
                    }))],
                check: |t| assert_eq!(t.event_rules["slow"].stream_token, "tok"),
            },
            TestCase {
                name: "modify storage rules",
                ops: vec![UpdateOp::new(TemplateField::StorageRules, UpdateKind::Modify)
                    .with_arg("store_filtered")
                    .with_arg(false)],
                check: |t| assert!(!t.stores("store_filtered")),
            },
            TestCase {
                name: "modify filter params with nested pairs",
                ops: vec![UpdateOp::new(TemplateField::Filters, UpdateKind::Modify)
                    .with_arg(1)
                    .with_arg(json!([["order", 1], ["cutoff", 0.05]]))],
                check: |t| {
                    let params = &t.filters[0].rule.params.func_params;
                    assert_eq!(params["order"], json!(1));
                    assert_eq!(params["cutoff"], json!(0.05));
                },
            },
            TestCase {
                name: "describe the stream",
                ops: vec![
                    UpdateOp::new(TemplateField::UserDescription, UpdateKind::New).with_arg("fleet"),
                    UpdateOp::new(TemplateField::ForeignKeys, UpdateKind::New).with_arg("fleet_id"),
                ],
                check: |t| {
                    assert_eq!(t.user_description.as_deref(), Some("fleet"));
                    assert_eq!(t.foreign_keys, vec!["fleet_id".to_string()]);
                },
            },
        ];

        for case in cases {
            let original = template();
            let updated = update_template(&original, &case.ops)
                .unwrap_or_else(|e| panic!("{}: {}", case.name, e));
            assert_eq!(updated.version, original.version + 1, "{}", case.name);
            (case.check)(&updated);
        }
    }

    #[test]
    fn test_renaming_derived_output_breaks_readers() {
        let ops = [UpdateOp::new(TemplateField::DparamRules, UpdateKind::Modify)
            .with_arg(3)
            .with_kwarg(
                "new_measure_rules",
                json!({ "spatial_measure": "location", "output_name": "dist" }),
            )];

        let err = update_template(&template(), &ops).unwrap_err();
        assert_eq!(
            err,
            UpdateError::InvalidUpdate {
                violations: vec![Violation {
                    kind: RuleKind::Event,
                    rule: "far".to_string(),
                    dependency: DependencyKind::DerivedParam,
                    missing: "distance".to_string(),
                }]
            }
        );
    }

    #[test]
    fn test_malformed_ops() {
        struct TestCase {
            name: &'static str,
            op: UpdateOp,
        }

        let cases = vec![
            TestCase {
                name: "unknown measure",
                op: remove(TemplateField::Measures, "altitude"),
            },
            TestCase {
                name: "bad dtype",
                op: UpdateOp::new(TemplateField::Measures, UpdateKind::New)
                    .with_arg("altitude")
                    .with_arg("poodle"),
            },
            TestCase {
                name: "unknown transform id",
                op: remove(TemplateField::Filters, 99),
            },
            TestCase {
                name: "unsupported kind",
                op: UpdateOp::new(TemplateField::Measures, UpdateKind::Modify).with_arg("speed"),
            },
            TestCase {
                name: "odd key/value arguments",
                op: UpdateOp::new(TemplateField::EngineRules, UpdateKind::Modify).with_arg("dangling"),
            },
            TestCase {
                name: "rename of a missing field",
                op: UpdateOp::new(TemplateField::Fields, UpdateKind::New)
                    .with_arg("transport")
                    .with_kwarg("old_field", "vehicle"),
            },
        ];

        for case in cases {
            let status = validate_update(&template(), &[case.op]);
            assert!(
                matches!(status, UpdateStatus::Malformed(_)),
                "{}: {:?}",
                case.name,
                status
            );
        }
    }

    #[test]
    fn test_op_deserializes_from_json() {
        let op: UpdateOp = serde_json::from_value(json!({
            "field": "fields",
            "type": "new",
            "args": ["transport"],
            "kwargs": { "old_field": "mode" }
        }))
        .unwrap();

        assert_eq!(op.field, TemplateField::Fields);
        assert_eq!(op.kind, UpdateKind::New);
        // mode is read by the distance partition
        let status = validate_update(&template(), &[op]);
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({
                "status": "invalid_update",
                "detail": [{
                    "kind": "derived param",
                    "rule": "distance",
                    "dependency": "field",
                    "missing": "mode"
                }]
            })
        );
    }
}
