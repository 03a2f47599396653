// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::column::{Column, ColumnView, Series};
use crate::errors::AggregateError;
use crate::observability::messages::pipeline::RecordVersionMismatch;
use crate::observability::messages::StructuredLog;
use crate::record::Record;
use crate::template::{DataType, Template};

pub const TIMESTAMP: &str = "timestamp";

/// One detected event at a single batch row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOccurrence {
    pub event_name: String,
    pub stream_token: String,
    pub timestamp: i64,
    pub row: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Values of the rule's input columns at the triggering row.
    pub context: BTreeMap<String, Value>,
}

/// Column-aligned merge of the records of one stream under one template.
///
/// Raw columns always hold exactly `len()` values. The rule stages fill
/// `filter_measures`, `derived_measures` and `events`; each stage consumes the
/// batch and hands back a new one, so a section is either absent or complete.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateBatch {
    pub stream_token: String,
    pub stream_name: String,
    pub version: u32,
    pub timestamp: Vec<i64>,
    pub measures: BTreeMap<String, Column>,
    pub user_ids: BTreeMap<String, Vec<Value>>,
    pub fields: BTreeMap<String, Vec<Value>>,
    pub tags: BTreeMap<String, Vec<Value>>,
    ids: Option<Vec<i64>>,
    pub filter_measures: Option<BTreeMap<String, Series>>,
    pub derived_measures: Option<BTreeMap<String, Series>>,
    pub events: Option<BTreeMap<String, Vec<EventOccurrence>>>,
}

/// Merges `records` into columns declared by `template`, preserving record
/// order. Records must already be in time order; no sort is performed.
pub fn aggregate(template: &Template, records: &[Record]) -> Result<AggregateBatch, AggregateError> {
    let mut builders: BTreeMap<&str, ColumnBuilder> = template
        .measures
        .iter()
        .map(|(name, def)| (name.as_str(), ColumnBuilder::new(def.dtype, records.len())))
        .collect();
    let mut user_ids = value_columns(template.user_ids.iter(), records.len());
    let mut fields = value_columns(template.fields.iter(), records.len());
    let mut tags = value_columns(template.tags.iter(), records.len());
    let mut timestamp = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        if record.stream_token != template.stream_token {
            return Err(AggregateError::StreamMismatch {
                record: index,
                expected: template.stream_token.clone(),
                found: record.stream_token.clone(),
            });
        }
        if record.version != template.version {
            RecordVersionMismatch {
                stream_token: &template.stream_token,
                record: index,
                expected: template.version,
                found: record.version,
            }
            .log();
        }

        timestamp.push(record.timestamp);

        for (name, builder) in builders.iter_mut() {
            let measure = record
                .measures
                .get(*name)
                .ok_or_else(|| missing(index, "measure", name))?;
            builder.push(&measure.val).map_err(|reason| AggregateError::InvalidValue {
                record: index,
                column: name.to_string(),
                dtype: builder.dtype,
                reason,
            })?;
        }
        collect_values(&mut user_ids, &record.user_ids, index, "user id")?;
        collect_values(&mut fields, &record.fields, index, "field")?;
        collect_values(&mut tags, &record.tags, index, "tag")?;
    }

    Ok(AggregateBatch {
        stream_token: template.stream_token.clone(),
        stream_name: template.stream_name.clone(),
        version: template.version,
        timestamp,
        measures: builders
            .into_iter()
            .map(|(name, builder)| (name.to_string(), builder.finish()))
            .collect(),
        user_ids,
        fields,
        tags,
        ids: None,
        filter_measures: None,
        derived_measures: None,
        events: None,
    })
}

fn missing(record: usize, section: &'static str, column: &str) -> AggregateError {
    AggregateError::SchemaMismatch {
        record,
        section,
        column: column.to_string(),
    }
}

fn value_columns<'a>(
    names: impl Iterator<Item = &'a String>,
    capacity: usize,
) -> BTreeMap<String, Vec<Value>> {
    names
        .map(|name| (name.clone(), Vec::with_capacity(capacity)))
        .collect()
}

fn collect_values(
    columns: &mut BTreeMap<String, Vec<Value>>,
    source: &BTreeMap<String, Value>,
    record: usize,
    section: &'static str,
) -> Result<(), AggregateError> {
    for (name, column) in columns.iter_mut() {
        let value = source.get(name).ok_or_else(|| missing(record, section, name))?;
        column.push(value.clone());
    }
    Ok(())
}

struct ColumnBuilder {
    dtype: DataType,
    column: Column,
}

impl ColumnBuilder {
    fn new(dtype: DataType, capacity: usize) -> Self {
        let column = match dtype {
            DataType::Int | DataType::Float => Column::Float(Vec::with_capacity(capacity)),
            DataType::Geo => Column::Geo(Vec::with_capacity(capacity)),
            DataType::Bool => Column::Bool(Vec::with_capacity(capacity)),
            DataType::Varchar => Column::Json(Vec::with_capacity(capacity)),
        };
        Self { dtype, column }
    }

    fn push(&mut self, value: &Value) -> Result<(), String> {
        match &mut self.column {
            Column::Float(values) => match value {
                Value::Null => values.push(f64::NAN),
                Value::Number(n) => values.push(n.as_f64().ok_or("number out of range")?),
                Value::String(s) => values.push(
                    s.trim()
                        .parse::<f64>()
                        .map_err(|_| format!("'{}' is not numeric", s))?,
                ),
                other => return Err(format!("expected a number, got {}", other)),
            },
            Column::Geo(values) => match value {
                Value::Array(items) if items.len() == 2 => {
                    let a = items[0].as_f64().ok_or("coordinate is not numeric")?;
                    let b = items[1].as_f64().ok_or("coordinate is not numeric")?;
                    values.push([a, b]);
                }
                Value::Null => values.push([f64::NAN, f64::NAN]),
                other => return Err(format!("expected a coordinate pair, got {}", other)),
            },
            Column::Bool(values) => match value {
                Value::Bool(b) => values.push(*b),
                Value::Number(n) => values.push(n.as_f64().is_some_and(|x| x != 0.0)),
                other => return Err(format!("expected a boolean, got {}", other)),
            },
            Column::Json(values) => values.push(value.clone()),
        }
        Ok(())
    }

    fn finish(self) -> Column {
        self.column
    }
}

impl AggregateBatch {
    /// Number of aggregated rows.
    pub fn len(&self) -> usize {
        self.timestamp.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamp.is_empty()
    }

    pub fn ids(&self) -> Option<&[i64]> {
        self.ids.as_deref()
    }

    /// Attaches the storage identifiers of the raw rows.
    pub fn attach_ids(mut self, ids: Vec<i64>) -> Result<Self, AggregateError> {
        if ids.len() != self.len() {
            return Err(AggregateError::IdLengthMismatch {
                rows: self.len(),
                ids: ids.len(),
            });
        }
        self.ids = Some(ids);
        Ok(self)
    }

    /// Looks up any addressable column by name.
    ///
    /// Resolution order: timestamp, measures, filter outputs, derived
    /// outputs, user ids, fields, tags.
    pub fn column(&self, name: &str) -> Option<ColumnView<'_>> {
        if name == TIMESTAMP {
            let values = self.timestamp.iter().map(|t| *t as f64).collect();
            return Some(ColumnView::dense(Cow::Owned(Column::Float(values))));
        }
        if let Some(column) = self.measures.get(name) {
            return Some(ColumnView::dense(Cow::Borrowed(column)));
        }
        let rule_output = self
            .filter_measures
            .as_ref()
            .and_then(|section| section.get(name))
            .or_else(|| {
                self.derived_measures
                    .as_ref()
                    .and_then(|section| section.get(name))
            });
        if let Some(series) = rule_output {
            return Some(ColumnView::series(series));
        }
        [&self.user_ids, &self.fields, &self.tags]
            .into_iter()
            .find_map(|section| section.get(name))
            .map(|values| ColumnView::dense(Cow::Owned(Column::Json(values.clone()))))
    }

    pub fn has_column(&self, name: &str) -> bool {
        name == TIMESTAMP
            || self.measures.contains_key(name)
            || self
                .filter_measures
                .as_ref()
                .is_some_and(|s| s.contains_key(name))
            || self
                .derived_measures
                .as_ref()
                .is_some_and(|s| s.contains_key(name))
            || self.user_ids.contains_key(name)
            || self.fields.contains_key(name)
            || self.tags.contains_key(name)
    }

    fn id_at(&self, row: usize) -> Option<i64> {
        self.ids.as_ref().and_then(|ids| ids.get(row).copied())
    }

    /// One insertable row per aggregated record.
    pub fn raw_rows(&self) -> Vec<RawRow> {
        (0..self.len())
            .map(|row| RawRow {
                stream_token: self.stream_token.clone(),
                timestamp: self.timestamp[row],
                measures: cells_at(self.measures.iter().map(|(k, c)| (k, c.cell(row)))),
                user_ids: cells_at(self.user_ids.iter().map(|(k, v)| (k, v.get(row).cloned()))),
                fields: cells_at(self.fields.iter().map(|(k, v)| (k, v.get(row).cloned()))),
                tags: cells_at(self.tags.iter().map(|(k, v)| (k, v.get(row).cloned()))),
            })
            .collect()
    }

    /// One row per aggregated record carrying every filter output at that
    /// row (`null` where a partitioned filter skipped it).
    pub fn filtered_rows(&self) -> Vec<FilteredRow> {
        let Some(section) = self.filter_measures.as_ref() else {
            return Vec::new();
        };
        (0..self.len())
            .map(|row| FilteredRow {
                stream_token: self.stream_token.clone(),
                timestamp: self.timestamp[row],
                id: self.id_at(row),
                filter_measures: section
                    .iter()
                    .map(|(name, series)| {
                        let value = series
                            .position(row)
                            .and_then(|i| series.values.cell(i))
                            .unwrap_or(Value::Null);
                        (name.clone(), value)
                    })
                    .collect(),
            })
            .collect()
    }

    pub fn derived_document(&self) -> DerivedDocument {
        let derived_measures = self
            .derived_measures
            .iter()
            .flatten()
            .map(|(name, series)| (name.clone(), self.series_document(series)))
            .collect();
        DerivedDocument {
            stream_token: self.stream_token.clone(),
            version: self.version,
            derived_measures,
        }
    }

    pub fn events_document(&self) -> EventsDocument {
        EventsDocument {
            stream_token: self.stream_token.clone(),
            events: self.events.clone().unwrap_or_default(),
        }
    }

    fn series_document(&self, series: &Series) -> SeriesDocument {
        SeriesDocument {
            rows: series.rows.clone(),
            ids: self
                .ids
                .as_ref()
                .map(|ids| series.rows.iter().map(|&r| ids[r]).collect()),
            timestamp: series.rows.iter().map(|&r| self.timestamp[r]).collect(),
            values: series.values.to_values(),
        }
    }
}

fn cells_at<'a>(cells: impl Iterator<Item = (&'a String, Option<Value>)>) -> BTreeMap<String, Value> {
    cells
        .map(|(name, value)| (name.clone(), value.unwrap_or(Value::Null)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRow {
    pub stream_token: String,
    pub timestamp: i64,
    pub measures: BTreeMap<String, Value>,
    pub user_ids: BTreeMap<String, Value>,
    pub fields: BTreeMap<String, Value>,
    pub tags: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredRow {
    pub stream_token: String,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub filter_measures: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesDocument {
    pub rows: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<i64>>,
    pub timestamp: Vec<i64>,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedDocument {
    pub stream_token: String,
    pub version: u32,
    pub derived_measures: BTreeMap<String, SeriesDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventsDocument {
    pub stream_token: String,
    pub events: BTreeMap<String, Vec<EventOccurrence>>,
}
