// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Single raw observations as produced by ingestion.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::template::DataType;

/// One measure reading with its declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureValue {
    pub val: Value,
    pub dtype: DataType,
}

/// A single time-stamped observation conforming to a template.
///
/// Records are immutable once handed to the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub stream_token: String,
    #[serde(default)]
    pub version: u32,
    pub timestamp: i64,
    #[serde(default)]
    pub measures: BTreeMap<String, MeasureValue>,
    #[serde(default)]
    pub user_ids: BTreeMap<String, Value>,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub tags: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(stream_token: impl Into<String>, timestamp: i64) -> Self {
        Self {
            stream_token: stream_token.into(),
            version: 0,
            timestamp,
            measures: BTreeMap::new(),
            user_ids: BTreeMap::new(),
            fields: BTreeMap::new(),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_measure(mut self, name: impl Into<String>, val: Value, dtype: DataType) -> Self {
        self.measures.insert(name.into(), MeasureValue { val, dtype });
        self
    }

    pub fn with_user_id(mut self, name: impl Into<String>, val: Value) -> Self {
        self.user_ids.insert(name.into(), val);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, val: Value) -> Self {
        self.fields.insert(name.into(), val);
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>, val: Value) -> Self {
        self.tags.insert(name.into(), val);
        self
    }

    /// Parses a JSON array of records.
    pub fn list_from_json(json: &str) -> Result<Vec<Record>, serde_json::Error> {
        serde_json::from_str(json)
    }
}
