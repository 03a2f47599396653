// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stream templates: the versioned schema that drives aggregation and rules.

mod builder;
mod dependency_graph;
mod mutator;
mod registry;
mod validation;

pub use builder::{
    build_data_rules, create_turn_rules, DataRules, DerivedShorthand, DerivedSpec, EventShorthand,
    EventSpec, FilterShorthand, FilterSpec, MappingSpec, Puller, TemplateBuilder, TurnRules,
};
pub use dependency_graph::{ColumnOrigin, DependencyGraph};
pub use mutator::{update_template, validate_update, TemplateField, UpdateKind, UpdateOp};
pub use registry::InMemoryTemplateRegistry;
pub use validation::validate_template;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rules::{EventRule, FilterRule, Rule};

/// Storage keys every new template starts with.
pub const STORE_RAW: &str = "store_raw";
pub const STORE_FILTERED: &str = "store_filtered";
pub const STORE_DERIVED: &str = "store_derived";

/// Declared type of a measure column.
///
/// Parsed leniently from SQL-flavoured names so `varchar(50)` and `double`
/// are accepted alongside the canonical names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    Int,
    Float,
    Geo,
    Varchar,
    Bool,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Geo => "geo",
            DataType::Varchar => "varchar",
            DataType::Bool => "bool",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        // "varchar(50)" -> "varchar"
        let base = lowered.split('(').next().unwrap_or_default().trim();
        match base {
            "int" | "integer" | "bigint" | "smallint" => Ok(DataType::Int),
            "float" | "double" | "real" | "decimal" | "numeric" => Ok(DataType::Float),
            "geo" | "point" => Ok(DataType::Geo),
            "varchar" | "text" | "string" | "char" => Ok(DataType::Varchar),
            "bool" | "boolean" => Ok(DataType::Bool),
            _ => Err(format!("unknown data type '{}'", s)),
        }
    }
}

impl TryFrom<String> for DataType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureDef {
    pub dtype: DataType,
}

/// Versioned stream schema.
///
/// A template is immutable once registered; edits go through
/// [`update_template`], which returns a new version.
///
/// # Example
/// ```json
/// {
///   "stream_name": "driver_data",
///   "stream_token": "abc123",
///   "version": 0,
///   "measures": { "location": { "dtype": "geo" } },
///   "user_ids": ["driver-id"],
///   "dparam_rules": [{
///     "transform_name": "DeriveDistance",
///     "measure_list": ["location"],
///     "param_dict": {
///       "func_params": { "distance_func": "great_circle", "units": "km" },
///       "measure_rules": { "spatial_measure": "location", "output_name": "distance" }
///     }
///   }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub stream_name: String,
    pub stream_token: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_description: Option<String>,
    #[serde(default)]
    pub measures: BTreeMap<String, MeasureDef>,
    #[serde(default)]
    pub user_ids: BTreeSet<String>,
    #[serde(default)]
    pub fields: BTreeSet<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub foreign_keys: Vec<String>,
    #[serde(default)]
    pub filters: Vec<FilterRule>,
    #[serde(default)]
    pub dparam_rules: Vec<Rule>,
    #[serde(default)]
    pub event_rules: BTreeMap<String, EventRule>,
    #[serde(default = "default_storage_rules")]
    pub storage_rules: BTreeMap<String, Value>,
    #[serde(default)]
    pub ingest_rules: BTreeMap<String, Value>,
    #[serde(default)]
    pub engine_rules: BTreeMap<String, Value>,
}

fn default_storage_rules() -> BTreeMap<String, Value> {
    [STORE_RAW, STORE_FILTERED, STORE_DERIVED]
        .into_iter()
        .map(|key| (key.to_string(), Value::Bool(true)))
        .collect()
}

impl Template {
    pub fn new(stream_name: impl Into<String>, stream_token: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            stream_token: stream_token.into(),
            version: 0,
            source_key: None,
            user_description: None,
            measures: BTreeMap::new(),
            user_ids: BTreeSet::new(),
            fields: BTreeSet::new(),
            tags: BTreeSet::new(),
            foreign_keys: Vec::new(),
            filters: Vec::new(),
            dparam_rules: Vec::new(),
            event_rules: BTreeMap::new(),
            storage_rules: default_storage_rules(),
            ingest_rules: BTreeMap::new(),
            engine_rules: BTreeMap::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_measure(mut self, name: impl Into<String>, dtype: DataType) -> Self {
        self.measures.insert(name.into(), MeasureDef { dtype });
        self
    }

    pub fn with_user_id(mut self, name: impl Into<String>) -> Self {
        self.user_ids.insert(name.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into());
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>) -> Self {
        self.tags.insert(name.into());
        self
    }

    pub fn with_filter(mut self, rule: FilterRule) -> Self {
        self.filters.push(rule);
        self
    }

    pub fn with_dparam_rule(mut self, rule: Rule) -> Self {
        self.dparam_rules.push(rule);
        self
    }

    pub fn with_event_rule(mut self, rule: EventRule) -> Self {
        self.event_rules.insert(rule.event_name.clone(), rule);
        self
    }

    /// Whether the given storage section should be persisted. Absent keys
    /// default to `true`.
    pub fn stores(&self, key: &str) -> bool {
        self.storage_rules
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// Output names of every filter rule, in declared order.
    pub fn filter_outputs(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|f| f.filter_name.as_str())
    }

    /// Output names of every derived rule, in declared order.
    pub fn dparam_outputs(&self) -> impl Iterator<Item = &str> {
        self.dparam_rules.iter().filter_map(Rule::output_name)
    }

    /// Next free transform id across filters and derived rules.
    pub fn next_transform_id(&self) -> u64 {
        self.filters
            .iter()
            .map(|f| &f.rule)
            .chain(self.dparam_rules.iter())
            .filter_map(|r| r.transform_id)
            .max()
            .map_or(1, |id| id + 1)
    }
}
