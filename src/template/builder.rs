// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Template construction from shorthand mapping specs.
//!
//! Callers describe a stream in terms of measures, fields and a few named
//! shorthands (`butter_lowpass` filters, `heading` derived params, `turn`
//! events, ...). The builder expands every shorthand into fully-parameterised
//! rules, numbers filters and derived rules with sequential transform ids,
//! and rejects shorthands pointing at measures the template cannot provide.
//!
//! [`build_data_rules`] and [`Puller`] describe how an external loader maps
//! source columns onto template keys. The result is written into the
//! template's opaque `ingest_rules` and has no effect on rule execution.
//!
//! # Examples
//!
//! ## Turn detection over a filtered location
//! ```
//! use serde_json::json;
//! use strom::template::{
//!     DataType, EventShorthand, EventSpec, FilterShorthand, FilterSpec, MappingSpec, TemplateBuilder,
//! };
//!
//! let template = TemplateBuilder::new("driver_data", "abc123")
//!     .source_key("driver_id")
//!     .user_ids(["driver-id"])
//!     .filter(FilterSpec::new(FilterShorthand::ButterLowpass, ["location"]))
//!     .mapping(
//!         MappingSpec::new()
//!             .measure("location", DataType::Geo)
//!             .event(
//!                 EventSpec::new(EventShorthand::Turn, ["location_buttered"])
//!                     .arg("partition_list", json!([]))
//!                     .arg("turn_value", json!(45))
//!                     .arg("stream_id", json!("abc123")),
//!             ),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert!(template.event_rules.contains_key("turn_45.000000_location_buttered"));
//! assert_eq!(template.dparam_rules.len(), 2);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};

use super::{DataType, MeasureDef, Template};
use crate::batch::TIMESTAMP;
use crate::errors::BuildError;
use crate::rules::{EventRule, FilterRule, Predicate, Rule, OUTPUT_ROLE};
use crate::transforms::{ComparisonOperator, LogicalCombiner, TransformKind};

const TARGET: &str = "target_measure";
const SPATIAL: &str = "spatial_measure";

/// Filter shorthands and the suffix their outputs get.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterShorthand {
    ButterLowpass,
    WindowAverage,
}

impl FilterShorthand {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterShorthand::ButterLowpass => "butter_lowpass",
            FilterShorthand::WindowAverage => "window_average",
        }
    }

    pub fn transform(&self) -> TransformKind {
        match self {
            FilterShorthand::ButterLowpass => TransformKind::ButterLowpass,
            FilterShorthand::WindowAverage => TransformKind::WindowAverage,
        }
    }

    /// `location` filtered by this shorthand is stored as `location_<suffix>`.
    pub fn suffix(&self) -> &'static str {
        match self {
            FilterShorthand::ButterLowpass => "buttered",
            FilterShorthand::WindowAverage => "windowed",
        }
    }
}

impl fmt::Display for FilterShorthand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One filter shorthand applied to each measure in `measure_list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub kind: FilterShorthand,
    pub measure_list: Vec<String>,
    #[serde(default)]
    pub partition_list: Vec<Predicate>,
    #[serde(default)]
    pub func_params: BTreeMap<String, Value>,
}

impl FilterSpec {
    pub fn new<I, S>(kind: FilterShorthand, measures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            measure_list: measures.into_iter().map(Into::into).collect(),
            partition_list: Vec::new(),
            func_params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.func_params.insert(name.into(), value);
        self
    }

    pub fn partition(mut self, predicate: Predicate) -> Self {
        self.partition_list.push(predicate);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedShorthand {
    Heading,
    Distance,
    Change,
    Cumsum,
    Slope,
    WindowSum,
    Scaled,
    InBox,
    Threshold,
}

impl DerivedShorthand {
    pub fn as_str(&self) -> &'static str {
        match self {
            DerivedShorthand::Heading => "heading",
            DerivedShorthand::Distance => "distance",
            DerivedShorthand::Change => "change",
            DerivedShorthand::Cumsum => "cumsum",
            DerivedShorthand::Slope => "slope",
            DerivedShorthand::WindowSum => "window_sum",
            DerivedShorthand::Scaled => "scaled",
            DerivedShorthand::InBox => "in_box",
            DerivedShorthand::Threshold => "threshold",
        }
    }

    pub fn transform(&self) -> TransformKind {
        match self {
            DerivedShorthand::Heading => TransformKind::DeriveHeading,
            DerivedShorthand::Distance => TransformKind::DeriveDistance,
            DerivedShorthand::Change => TransformKind::DeriveChange,
            DerivedShorthand::Cumsum => TransformKind::DeriveCumsum,
            DerivedShorthand::Slope => TransformKind::DeriveSlope,
            DerivedShorthand::WindowSum => TransformKind::DeriveWindowSum,
            DerivedShorthand::Scaled => TransformKind::DeriveScaled,
            DerivedShorthand::InBox => TransformKind::DeriveInBox,
            DerivedShorthand::Threshold => TransformKind::DeriveThreshold,
        }
    }

    /// Input role a single measure binds to when no role is named.
    fn default_role(&self) -> &'static str {
        match self {
            DerivedShorthand::Heading | DerivedShorthand::Distance | DerivedShorthand::InBox => SPATIAL,
            _ => TARGET,
        }
    }
}

impl fmt::Display for DerivedShorthand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A derived-parameter shorthand.
///
/// `measure_rules` maps input roles to columns. Without an `output_name` the
/// output is named `<shorthand>_<first input>`, e.g. `heading_location`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSpec {
    pub kind: DerivedShorthand,
    #[serde(default)]
    pub measure_rules: BTreeMap<String, String>,
    #[serde(default)]
    pub func_params: BTreeMap<String, Value>,
    #[serde(default)]
    pub partition_list: Vec<Predicate>,
    #[serde(default)]
    pub logical_comparison: LogicalCombiner,
}

impl DerivedSpec {
    pub fn new(kind: DerivedShorthand) -> Self {
        Self {
            kind,
            measure_rules: BTreeMap::new(),
            func_params: BTreeMap::new(),
            partition_list: Vec::new(),
            logical_comparison: LogicalCombiner::default(),
        }
    }

    /// Binds the shorthand's default input role to `measure`.
    pub fn on(self, measure: impl Into<String>) -> Self {
        let role = self.kind.default_role();
        self.role(role, measure)
    }

    pub fn role(mut self, role: impl Into<String>, measure: impl Into<String>) -> Self {
        self.measure_rules.insert(role.into(), measure.into());
        self
    }

    pub fn output(self, name: impl Into<String>) -> Self {
        self.role(OUTPUT_ROLE, name)
    }

    pub fn param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.func_params.insert(name.into(), value);
        self
    }

    pub fn partition(mut self, predicate: Predicate) -> Self {
        self.partition_list.push(predicate);
        self
    }

    fn to_rule(&self) -> Rule {
        let mut rule = Rule::new(self.kind.transform().as_str())
            .with_combiner(self.logical_comparison);
        for (role, column) in self.measure_rules.iter().filter(|(r, _)| r.as_str() != OUTPUT_ROLE) {
            rule = rule.with_input(role.as_str(), column.as_str());
        }
        let output = match self.measure_rules.get(OUTPUT_ROLE) {
            Some(output) => output.clone(),
            None => match rule.measure_list.first() {
                Some(first) => format!("{}_{}", self.kind, first),
                None => self.kind.to_string(),
            },
        };
        rule = rule.with_output(output);
        rule.params.func_params = self.func_params.clone();
        rule.partition_list = self.partition_list.clone();
        rule
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventShorthand {
    Turn,
}

impl EventShorthand {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventShorthand::Turn => "turn",
        }
    }
}

/// An event shorthand applied to each measure in `measure_list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSpec {
    pub kind: EventShorthand,
    #[serde(default)]
    pub args: BTreeMap<String, Value>,
    pub measure_list: Vec<String>,
}

impl EventSpec {
    pub fn new<I, S>(kind: EventShorthand, measures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            args: BTreeMap::new(),
            measure_list: measures.into_iter().map(Into::into).collect(),
        }
    }

    pub fn arg(mut self, name: impl Into<String>, value: Value) -> Self {
        self.args.insert(name.into(), value);
        self
    }

    fn required(&self, name: &str) -> Result<&Value, BuildError> {
        self.args
            .get(name)
            .ok_or_else(|| BuildError::MissingEventArgument {
                event: self.kind.as_str().to_string(),
                argument: name.to_string(),
            })
    }

    fn invalid(&self, name: &str, reason: impl Into<String>) -> BuildError {
        BuildError::InvalidEventArgument {
            event: self.kind.as_str().to_string(),
            argument: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Expands a `turn` spec: requires `partition_list`, `turn_value` and
    /// `stream_id`.
    fn turn_rules(&self, measure: &str) -> Result<TurnRules, BuildError> {
        let partition_list: Vec<Predicate> = serde_json::from_value(self.required("partition_list")?.clone())
            .map_err(|e| self.invalid("partition_list", e.to_string()))?;
        let turn_value = self
            .required("turn_value")?
            .as_f64()
            .ok_or_else(|| self.invalid("turn_value", "expected a number"))?;
        let stream_id = self
            .required("stream_id")?
            .as_str()
            .ok_or_else(|| self.invalid("stream_id", "expected a string"))?;
        Ok(create_turn_rules(measure, partition_list, turn_value, stream_id))
    }
}

/// Measures, fields and shorthands declared together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingSpec {
    #[serde(default)]
    pub measures: Vec<(String, DataType)>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub dparams: Vec<DerivedSpec>,
    #[serde(default)]
    pub events: Vec<EventSpec>,
}

impl MappingSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn measure(mut self, name: impl Into<String>, dtype: DataType) -> Self {
        self.measures.push((name.into(), dtype));
        self
    }

    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(name.into());
        self
    }

    pub fn dparam(mut self, spec: DerivedSpec) -> Self {
        self.dparams.push(spec);
        self
    }

    pub fn event(mut self, spec: EventSpec) -> Self {
        self.events.push(spec);
        self
    }
}

/// Rules generated for one turn event.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRules {
    /// Heading, then angular change of the heading.
    pub dparam_rules: Vec<Rule>,
    pub event_name: String,
    pub event_rule: EventRule,
}

/// Heading + angular change + absolute threshold rules detecting turns of at
/// least `turn_value` degrees along `spatial_measure`.
pub fn create_turn_rules(
    spatial_measure: &str,
    partition_list: Vec<Predicate>,
    turn_value: f64,
    stream_token: &str,
) -> TurnRules {
    let heading_name = format!("head_{}", spatial_measure);
    let change_name = format!("change_{}", spatial_measure);
    let event_name = format!("turn_{:.6}_{}", turn_value, spatial_measure);

    let mut heading = Rule::new(TransformKind::DeriveHeading.as_str())
        .with_input(SPATIAL, spatial_measure)
        .with_output(heading_name.as_str())
        .with_param("window_len", json!(1))
        .with_param("units", json!("deg"))
        .with_param("heading_type", json!("bearing"))
        .with_param("swap_lon_lat", json!(true));
    heading.partition_list = partition_list;

    let change = Rule::new(TransformKind::DeriveChange.as_str())
        .with_input(TARGET, heading_name.as_str())
        .with_output(change_name.as_str())
        .with_param("window_len", json!(1))
        .with_param("angle_change", json!(true))
        .with_partition(Predicate::new(heading_name.as_str(), ComparisonOperator::Ne, Value::Null));

    let detect = Rule::new(TransformKind::DetectThreshold.as_str())
        .with_input(TARGET, change_name.as_str())
        .with_param("threshold_value", json!(turn_value))
        .with_param("comparison_operator", json!(">="))
        .with_param("absolute_compare", json!(true))
        .with_partition(Predicate::new(change_name.as_str(), ComparisonOperator::Ne, Value::Null));

    TurnRules {
        dparam_rules: vec![heading, change],
        event_rule: EventRule::new(event_name.as_str(), stream_token, detect),
        event_name,
    }
}

// Ingest data rules. These only shape the `ingest_rules` section of a template
// document for the loader that feeds records in; the pipeline never reads them.

/// Source of ingest data named in the data rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Puller {
    #[serde(rename = "type")]
    pub kind: String,
    pub inputs: BTreeMap<String, String>,
}

impl Puller {
    pub fn new<I, K, V>(kind: impl Into<String>, inputs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            kind: kind.into(),
            inputs: inputs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Ingest mapping: which source column feeds which template key path.
///
/// Template-document helper, attached through [`TemplateBuilder::data_rules`]
/// and stored verbatim in `ingest_rules`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataRules {
    pub mapping_list: Vec<(usize, Vec<String>)>,
    pub date_format: Option<String>,
    #[serde(serialize_with = "puller_or_empty")]
    pub puller: Option<Puller>,
    pub pull: bool,
}

fn puller_or_empty<S: Serializer>(puller: &Option<Puller>, serializer: S) -> Result<S::Ok, S::Error> {
    match puller {
        Some(puller) => puller.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}

/// Pairs source column indices with template key paths.
pub fn build_data_rules(
    source_indices: &[usize],
    template_keys: &[Vec<String>],
    puller: Option<Puller>,
) -> Result<DataRules, BuildError> {
    if source_indices.len() != template_keys.len() {
        return Err(BuildError::MismatchedDataRules {
            indices: source_indices.len(),
            keys: template_keys.len(),
        });
    }
    Ok(DataRules {
        mapping_list: source_indices
            .iter()
            .copied()
            .zip(template_keys.iter().cloned())
            .collect(),
        date_format: None,
        pull: puller.is_some(),
        puller,
    })
}

/// Builds a new template, or extends an existing one, from shorthand specs.
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    template: Template,
    filters: Vec<FilterSpec>,
    mappings: Vec<MappingSpec>,
    data_rules: Option<DataRules>,
}

impl TemplateBuilder {
    pub fn new(stream_name: impl Into<String>, stream_token: impl Into<String>) -> Self {
        Self::extend(Template::new(stream_name, stream_token))
    }

    /// Starts from an existing template. New rules get ids after its highest
    /// transform id; the version is left for the registry to bump.
    pub fn extend(template: Template) -> Self {
        Self {
            template,
            filters: Vec::new(),
            mappings: Vec::new(),
            data_rules: None,
        }
    }

    pub fn source_key(mut self, key: impl Into<String>) -> Self {
        self.template.source_key = Some(key.into());
        self
    }

    pub fn user_description(mut self, description: impl Into<String>) -> Self {
        self.template.user_description = Some(description.into());
        self
    }

    pub fn user_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.template.user_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.template.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn filter(mut self, spec: FilterSpec) -> Self {
        self.filters.push(spec);
        self
    }

    pub fn mapping(mut self, spec: MappingSpec) -> Self {
        self.mappings.push(spec);
        self
    }

    /// Stores `rules` as the template's `ingest_rules`.
    pub fn data_rules(mut self, rules: DataRules) -> Self {
        self.data_rules = Some(rules);
        self
    }

    pub fn build(self) -> Result<Template, BuildError> {
        let mut template = self.template;

        for mapping in &self.mappings {
            for (name, dtype) in &mapping.measures {
                template
                    .measures
                    .entry(name.clone())
                    .or_insert(MeasureDef { dtype: *dtype });
            }
            template.fields.extend(mapping.fields.iter().cloned());
        }

        let mut next_id = template.next_transform_id();
        for spec in &self.filters {
            for measure in &spec.measure_list {
                if !template.measures.contains_key(measure) {
                    return Err(BuildError::UnknownMeasure {
                        context: format!("{} filter", spec.kind),
                        measure: measure.clone(),
                    });
                }
                let filter_name = format!("{}_{}", measure, spec.kind.suffix());
                if template.filters.iter().any(|f| f.filter_name == filter_name) {
                    continue;
                }
                let mut rule = Rule::new(spec.kind.transform().as_str())
                    .with_id(next_id)
                    .with_input(TARGET, measure.as_str());
                rule.params.func_params = spec.func_params.clone();
                rule.partition_list = spec.partition_list.clone();
                next_id += 1;
                template.filters.push(FilterRule::new(filter_name, rule));
            }
        }

        for mapping in &self.mappings {
            for spec in &mapping.dparams {
                let rule = spec.to_rule();
                for column in rule.input_columns() {
                    require_known(&template, &format!("{} derived param", spec.kind), column)?;
                }
                push_dparam(&mut template, rule, &mut next_id);
            }

            for spec in &mapping.events {
                for measure in &spec.measure_list {
                    require_known(&template, &format!("{} event", spec.kind.as_str()), measure)?;
                    let turn = match spec.kind {
                        EventShorthand::Turn => spec.turn_rules(measure)?,
                    };
                    for rule in turn.dparam_rules {
                        push_dparam(&mut template, rule, &mut next_id);
                    }
                    template.event_rules.insert(turn.event_name, turn.event_rule);
                }
            }
        }

        if let Some(rules) = &self.data_rules {
            if let Ok(Value::Object(map)) = serde_json::to_value(rules) {
                template.ingest_rules.extend(map);
            }
        }

        Ok(template)
    }
}

/// Measures, timestamp and outputs of already-built rules are all readable.
fn require_known(template: &Template, context: &str, column: &str) -> Result<(), BuildError> {
    let known = column == TIMESTAMP
        || template.measures.contains_key(column)
        || template.filter_outputs().any(|name| name == column)
        || template.dparam_outputs().any(|name| name == column);
    if known {
        Ok(())
    } else {
        Err(BuildError::UnknownMeasure {
            context: context.to_string(),
            measure: column.to_string(),
        })
    }
}

/// Appends `rule` unless an identical rule already produces the same output.
fn push_dparam(template: &mut Template, mut rule: Rule, next_id: &mut u64) {
    let duplicate = template.dparam_rules.iter().any(|existing| {
        existing.output_name() == rule.output_name()
            && Rule {
                transform_id: None,
                ..existing.clone()
            } == rule
    });
    if duplicate {
        return;
    }
    rule.transform_id = Some(*next_id);
    *next_id += 1;
    template.dparam_rules.push(rule);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(value: i64) -> EventSpec {
        EventSpec::new(EventShorthand::Turn, ["location"])
            .arg("partition_list", json!([]))
            .arg("turn_value", json!(value))
            .arg("stream_id", json!("abc123"))
    }

    fn location() -> MappingSpec {
        MappingSpec::new().measure("location", DataType::Geo)
    }

    #[test]
    fn test_create_turn_rules() {
        let rules = create_turn_rules("where_i_am", vec![], 45.0, "abc123");

        assert_eq!(rules.event_name, "turn_45.000000_where_i_am");
        assert_eq!(rules.dparam_rules.len(), 2);
        assert_eq!(rules.dparam_rules[0].output_name(), Some("head_where_i_am"));
        assert_eq!(rules.dparam_rules[1].output_name(), Some("change_where_i_am"));
        assert_eq!(rules.dparam_rules[1].input_columns(), vec!["head_where_i_am"]);

        let detect = &rules.event_rule.rule;
        assert_eq!(detect.transform_name, "DetectThreshold");
        assert_eq!(detect.params.func_params["absolute_compare"], json!(true));
        assert_eq!(detect.partition_list[0].column, "change_where_i_am");
        assert_eq!(rules.event_rule.stream_token, "abc123");
    }

    #[test]
    fn test_build_template() {
        let template = TemplateBuilder::new("tester", "tok")
            .source_key("driver_id")
            .user_ids(["driver-id", "idd"])
            .mapping(location().field("region-code").event(turn(45)))
            .build()
            .unwrap();

        assert_eq!(template.stream_name, "tester");
        assert_eq!(template.source_key.as_deref(), Some("driver_id"));
        assert_eq!(template.measures["location"].dtype, DataType::Geo);
        assert!(template.user_ids.contains("idd"));
        assert!(template.fields.contains("region-code"));
        assert!(template.stores("store_raw"));
        assert!(template.event_rules.contains_key("turn_45.000000_location"));
    }

    #[test]
    fn test_turn_events_share_heading_rules() {
        let template = TemplateBuilder::new("test", "tok")
            .mapping(location().event(turn(45)).event(turn(66)))
            .mapping(
                MappingSpec::new()
                    .measure("smokeation", DataType::Geo)
                    .event(EventSpec {
                        measure_list: vec!["smokeation".to_string()],
                        ..turn(30)
                    }),
            )
            .build()
            .unwrap();

        assert_eq!(template.event_rules.len(), 3);
        assert_eq!(template.measures.len(), 2);
        // head_/change_ for location once, and once for smokeation
        assert_eq!(template.dparam_rules.len(), 4);
        let ids: Vec<Option<u64>> = template.dparam_rules.iter().map(|r| r.transform_id).collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn test_filters_and_derived_shorthands() {
        let template = TemplateBuilder::new("test", "tok")
            .filter(FilterSpec::new(FilterShorthand::ButterLowpass, ["location"]).param("order", json!(3)))
            .filter(FilterSpec::new(FilterShorthand::WindowAverage, ["location"]))
            .mapping(
                location()
                    .dparam(DerivedSpec::new(DerivedShorthand::Heading).on("location_buttered"))
                    .dparam(
                        DerivedSpec::new(DerivedShorthand::Distance)
                            .on("location_windowed")
                            .output("distance")
                            .param("units", json!("km")),
                    ),
            )
            .build()
            .unwrap();

        let names: Vec<&str> = template.filter_outputs().collect();
        assert_eq!(names, vec!["location_buttered", "location_windowed"]);
        assert_eq!(template.filters[0].rule.params.func_params["order"], json!(3));

        let outputs: Vec<&str> = template.dparam_outputs().collect();
        assert_eq!(outputs, vec!["heading_location_buttered", "distance"]);
        assert_eq!(template.dparam_rules[0].transform_name, "DeriveHeading");
        // filters take ids 1 and 2
        assert_eq!(template.dparam_rules[0].transform_id, Some(3));
    }

    #[test]
    fn test_build_errors() {
        struct TestCase {
            name: &'static str,
            builder: TemplateBuilder,
            expected: BuildError,
        }

        let cases = vec![
            TestCase {
                name: "turn on an unknown measure",
                builder: TemplateBuilder::new("t", "tok").mapping(location().event(EventSpec {
                    measure_list: vec!["smokeation".to_string()],
                    ..turn(45)
                })),
                expected: BuildError::UnknownMeasure {
                    context: "turn event".to_string(),
                    measure: "smokeation".to_string(),
                },
            },
            TestCase {
                name: "filter on an unknown measure",
                builder: TemplateBuilder::new("t", "tok")
                    .mapping(location())
                    .filter(FilterSpec::new(FilterShorthand::ButterLowpass, ["where"])),
                expected: BuildError::UnknownMeasure {
                    context: "butter_lowpass filter".to_string(),
                    measure: "where".to_string(),
                },
            },
            TestCase {
                name: "derived shorthand on an unfiltered measure",
                builder: TemplateBuilder::new("t", "tok")
                    .mapping(location().dparam(DerivedSpec::new(DerivedShorthand::Heading).on("location_buttered"))),
                expected: BuildError::UnknownMeasure {
                    context: "heading derived param".to_string(),
                    measure: "location_buttered".to_string(),
                },
            },
            TestCase {
                name: "missing stream_id",
                builder: TemplateBuilder::new("t", "tok").mapping(location().event(EventSpec::new(
                    EventShorthand::Turn,
                    ["location"],
                )
                .arg("partition_list", json!([]))
                .arg("turn_value", json!(45)))),
                expected: BuildError::MissingEventArgument {
                    event: "turn".to_string(),
                    argument: "stream_id".to_string(),
                },
            },
            TestCase {
                name: "misspelled turn_value",
                builder: TemplateBuilder::new("t", "tok").mapping(location().event(EventSpec::new(
                    EventShorthand::Turn,
                    ["location"],
                )
                .arg("partition_list", json!([]))
                .arg("urn_value", json!(45))
                .arg("stream_id", json!("abc123")))),
                expected: BuildError::MissingEventArgument {
                    event: "turn".to_string(),
                    argument: "turn_value".to_string(),
                },
            },
            TestCase {
                name: "turn_value not a number",
                builder: TemplateBuilder::new("t", "tok").mapping(location().event(turn(45).arg("turn_value", json!("big")))),
                expected: BuildError::InvalidEventArgument {
                    event: "turn".to_string(),
                    argument: "turn_value".to_string(),
                    reason: "expected a number".to_string(),
                },
            },
        ];

        for case in cases {
            assert_eq!(case.builder.build().unwrap_err(), case.expected, "{}", case.name);
        }
    }

    #[test]
    fn test_extend_existing_template() {
        let existing = TemplateBuilder::new("test", "tok")
            .mapping(location().event(turn(99)))
            .build()
            .unwrap();

        let extended = TemplateBuilder::extend(existing)
            .filter(FilterSpec::new(FilterShorthand::ButterLowpass, ["where"]))
            .mapping(
                MappingSpec::new()
                    .measure("where", DataType::Geo)
                    .event(EventSpec {
                        measure_list: vec!["where".to_string()],
                        ..turn(99)
                    }),
            )
            .build()
            .unwrap();

        assert_eq!(extended.measures.len(), 2);
        assert_eq!(extended.filters[0].rule.transform_id, Some(3));
        assert!(extended.event_rules.contains_key("turn_99.000000_location"));
        assert!(extended.event_rules.contains_key("turn_99.000000_where"));
    }

    #[test]
    fn test_build_data_rules() {
        let indices = [0, 1, 8, 3];
        let keys: Vec<Vec<String>> = [
            vec!["user_ids", "sex"],
            vec!["measures", "length", "val"],
            vec!["fields", "rings"],
            vec!["timestamp"],
        ]
        .iter()
        .map(|path| path.iter().map(|s| s.to_string()).collect())
        .collect();

        let plain = build_data_rules(&indices, &keys, None).unwrap();
        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            json!({
                "mapping_list": [
                    [0, ["user_ids", "sex"]],
                    [1, ["measures", "length", "val"]],
                    [8, ["fields", "rings"]],
                    [3, ["timestamp"]]
                ],
                "date_format": null,
                "puller": {},
                "pull": false
            })
        );

        let puller = Puller::new("dir", [("path", "data/"), ("file_type", "csv")]);
        let pulled = build_data_rules(&indices, &keys, Some(puller)).unwrap();
        let doc = serde_json::to_value(&pulled).unwrap();
        assert_eq!(doc["puller"], json!({ "type": "dir", "inputs": { "path": "data/", "file_type": "csv" } }));
        assert_eq!(doc["pull"], json!(true));

        let template = TemplateBuilder::new("abalone", "tok").data_rules(pulled).build().unwrap();
        assert_eq!(template.ingest_rules["pull"], json!(true));

        assert_eq!(
            build_data_rules(&indices, &keys[..2], None).unwrap_err(),
            BuildError::MismatchedDataRules { indices: 4, keys: 2 }
        );
    }
}
