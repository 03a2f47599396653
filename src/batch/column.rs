// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::errors::TransformError;

/// Typed column of values aligned to batch rows.
///
/// `Json` holds values that have no numeric representation (strings, ids,
/// arbitrary documents) and numeric data whose declared type was `varchar`.
/// Transforms coerce `Json` cells on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", content = "values", rename_all = "snake_case")]
pub enum Column {
    Float(Vec<f64>),
    Geo(Vec<[f64; 2]>),
    Bool(Vec<bool>),
    Json(Vec<Value>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Geo(v) => v.len(),
            Column::Bool(v) => v.len(),
            Column::Json(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype_name(&self) -> &'static str {
        match self {
            Column::Float(_) => "float",
            Column::Geo(_) => "geo",
            Column::Bool(_) => "bool",
            Column::Json(_) => "json",
        }
    }

    /// Value at position `i` as JSON. NaN becomes `null`.
    pub fn cell(&self, i: usize) -> Option<Value> {
        match self {
            Column::Float(v) => v.get(i).map(|x| float_value(*x)),
            Column::Geo(v) => v
                .get(i)
                .map(|p| Value::Array(vec![float_value(p[0]), float_value(p[1])])),
            Column::Bool(v) => v.get(i).map(|b| Value::Bool(*b)),
            Column::Json(v) => v.get(i).cloned(),
        }
    }

    /// Every cell as JSON, in order.
    pub fn to_values(&self) -> Vec<Value> {
        (0..self.len()).filter_map(|i| self.cell(i)).collect()
    }

    /// New column holding the values at `positions`, in that order.
    pub fn gather(&self, positions: &[usize]) -> Column {
        match self {
            Column::Float(v) => Column::Float(positions.iter().map(|&i| v[i]).collect()),
            Column::Geo(v) => Column::Geo(positions.iter().map(|&i| v[i]).collect()),
            Column::Bool(v) => Column::Bool(positions.iter().map(|&i| v[i]).collect()),
            Column::Json(v) => Column::Json(positions.iter().map(|&i| v[i].clone()).collect()),
        }
    }

    /// Numeric view. Booleans become 0/1; JSON numbers are parsed and `null`
    /// becomes NaN.
    pub fn as_floats(&self, role: &str) -> Result<Cow<'_, [f64]>, TransformError> {
        match self {
            Column::Float(v) => Ok(Cow::Borrowed(v)),
            Column::Bool(v) => Ok(Cow::Owned(
                v.iter().map(|b| if *b { 1.0 } else { 0.0 }).collect(),
            )),
            Column::Json(values) => values
                .iter()
                .map(|value| match value {
                    Value::Null => Some(f64::NAN),
                    Value::Number(n) => n.as_f64(),
                    Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                    _ => None,
                })
                .collect::<Option<Vec<f64>>>()
                .map(Cow::Owned)
                .ok_or_else(|| self.type_error(role, "float")),
            Column::Geo(_) => Err(self.type_error(role, "float")),
        }
    }

    /// Two-axis view. JSON cells must be `[a, b]` numeric pairs.
    pub fn as_points(&self, role: &str) -> Result<Cow<'_, [[f64; 2]]>, TransformError> {
        match self {
            Column::Geo(v) => Ok(Cow::Borrowed(v)),
            Column::Json(values) => values
                .iter()
                .map(json_point)
                .collect::<Option<Vec<[f64; 2]>>>()
                .map(Cow::Owned)
                .ok_or_else(|| self.type_error(role, "geo")),
            _ => Err(self.type_error(role, "geo")),
        }
    }

    /// Boolean view. Numbers are true when non-zero and not NaN.
    pub fn as_bools(&self, role: &str) -> Result<Cow<'_, [bool]>, TransformError> {
        match self {
            Column::Bool(v) => Ok(Cow::Borrowed(v)),
            Column::Float(v) => Ok(Cow::Owned(
                v.iter().map(|x| !x.is_nan() && *x != 0.0).collect(),
            )),
            Column::Json(values) => values
                .iter()
                .map(|value| match value {
                    Value::Bool(b) => Some(*b),
                    Value::Null => Some(false),
                    Value::Number(n) => n.as_f64().map(|x| x != 0.0),
                    _ => None,
                })
                .collect::<Option<Vec<bool>>>()
                .map(Cow::Owned)
                .ok_or_else(|| self.type_error(role, "bool")),
            Column::Geo(_) => Err(self.type_error(role, "bool")),
        }
    }

    fn type_error(&self, role: &str, expected: &'static str) -> TransformError {
        TransformError::InputType {
            role: role.to_string(),
            expected,
            found: self.dtype_name(),
        }
    }
}

pub(crate) fn float_value(x: f64) -> Value {
    Number::from_f64(x).map_or(Value::Null, Value::Number)
}

fn json_point(value: &Value) -> Option<[f64; 2]> {
    match value {
        Value::Array(items) if items.len() == 2 => Some([items[0].as_f64()?, items[1].as_f64()?]),
        Value::Null => Some([f64::NAN, f64::NAN]),
        _ => None,
    }
}

/// A column produced by a rule, plus the batch rows each value aligns to.
///
/// Shrinking transforms (differences, distances) keep the first `len`
/// selected rows, so `rows.len() == values.len()` always holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub rows: Vec<usize>,
    pub values: Column,
}

impl Series {
    pub fn new(rows: Vec<usize>, values: Column) -> Self {
        debug_assert_eq!(rows.len(), values.len());
        Self { rows, values }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of batch row `row` inside this series.
    pub fn position(&self, row: usize) -> Option<usize> {
        self.rows.binary_search(&row).ok()
    }
}

/// Read-only view over any column a rule can address.
///
/// Raw columns are dense (one value per batch row); rule outputs are sparse
/// and carry their own row alignment.
#[derive(Debug, Clone)]
pub struct ColumnView<'a> {
    rows: Option<&'a [usize]>,
    column: Cow<'a, Column>,
}

impl<'a> ColumnView<'a> {
    pub fn dense(column: Cow<'a, Column>) -> Self {
        Self { rows: None, column }
    }

    pub fn series(series: &'a Series) -> Self {
        Self {
            rows: Some(&series.rows),
            column: Cow::Borrowed(&series.values),
        }
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn position(&self, row: usize) -> Option<usize> {
        match self.rows {
            None if row < self.column.len() => Some(row),
            None => None,
            Some(rows) => rows.binary_search(&row).ok(),
        }
    }

    pub fn contains(&self, row: usize) -> bool {
        self.position(row).is_some()
    }

    pub fn cell(&self, row: usize) -> Option<Value> {
        self.position(row).and_then(|i| self.column.cell(i))
    }

    /// Values at the given batch rows. Rows this view doesn't hold are skipped.
    pub fn gather(&self, rows: &[usize]) -> Column {
        let positions: Vec<usize> = rows.iter().filter_map(|&r| self.position(r)).collect();
        self.column.gather(&positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_maps_nan_to_null() {
        let column = Column::Float(vec![1.5, f64::NAN]);
        assert_eq!(column.cell(0), Some(json!(1.5)));
        assert_eq!(column.cell(1), Some(Value::Null));
        assert_eq!(column.cell(2), None);
    }

    #[test]
    fn test_json_columns_coerce() {
        let numbers = Column::Json(vec![json!(1), json!(2.5), Value::Null]);
        let floats = numbers.as_floats("target_measure").unwrap();
        assert_eq!(floats[0], 1.0);
        assert_eq!(floats[1], 2.5);
        assert!(floats[2].is_nan());

        let points = Column::Json(vec![json!([-122.6, 45.5])]);
        assert_eq!(points.as_points("spatial_measure").unwrap()[0], [-122.6, 45.5]);

        let strings = Column::Json(vec![json!("PDX")]);
        assert!(matches!(
            strings.as_floats("target_measure"),
            Err(TransformError::InputType { found: "json", .. })
        ));
    }

    #[test]
    fn test_series_view_alignment() {
        let series = Series::new(vec![2, 3, 5], Column::Float(vec![10.0, 20.0, 30.0]));
        let view = ColumnView::series(&series);

        assert!(!view.contains(0));
        assert_eq!(view.cell(5), Some(json!(30.0)));
        assert_eq!(view.gather(&[0, 3, 5]), Column::Float(vec![20.0, 30.0]));
    }

    #[test]
    fn test_dense_view_bounds() {
        let view = ColumnView::dense(Cow::Owned(Column::Bool(vec![true, false])));
        assert!(view.contains(1));
        assert!(!view.contains(2));
        assert_eq!(view.gather(&[1, 0]), Column::Bool(vec![false, true]));
    }
}
