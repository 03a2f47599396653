// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Partition predicates restricting which rows a rule sees.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::batch::{AggregateBatch, ColumnView};
use crate::errors::RuleError;
use crate::transforms::{ComparisonOperator, LogicalCombiner};

/// `(column, operator, value)` row condition.
///
/// A `null` value tests presence: `!= null` keeps rows where the column has a
/// non-null value, `== null` keeps rows where it is missing or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub column: String,
    pub operator: ComparisonOperator,
    #[serde(default)]
    pub value: Value,
}

impl Predicate {
    pub fn new(column: impl Into<String>, operator: ComparisonOperator, value: Value) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
        }
    }

    /// Whether a cell satisfies the predicate. `None` means the column has no
    /// value at that row.
    pub fn matches(&self, cell: Option<&Value>) -> bool {
        let cell = cell.filter(|v| !v.is_null());
        if self.value.is_null() {
            return match self.operator {
                ComparisonOperator::Eq => cell.is_none(),
                ComparisonOperator::Ne => cell.is_some(),
                _ => false,
            };
        }
        let Some(cell) = cell else {
            return false;
        };
        match ordering(cell, &self.value) {
            Some(ordering) => self.operator.holds(ordering),
            None => matches!(self.operator, ComparisonOperator::Ne),
        }
    }
}

fn ordering(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (a, b) if a == b => Some(Ordering::Equal),
        _ => None,
    }
}

/// Boolean mask over the batch rows. An empty predicate list selects every row.
pub fn row_mask(
    batch: &AggregateBatch,
    rule: &str,
    predicates: &[Predicate],
    combiner: LogicalCombiner,
) -> Result<Vec<bool>, RuleError> {
    if predicates.is_empty() {
        return Ok(vec![true; batch.len()]);
    }

    let views = predicates
        .iter()
        .map(|p| {
            batch
                .column(&p.column)
                .map(|view| (p, view))
                .ok_or_else(|| RuleError::MissingColumn {
                    rule: rule.to_string(),
                    column: p.column.clone(),
                })
        })
        .collect::<Result<Vec<(&Predicate, ColumnView<'_>)>, RuleError>>()?;

    Ok((0..batch.len())
        .map(|row| {
            views
                .iter()
                .map(|(predicate, view)| predicate.matches(view.cell(row).as_ref()))
                .reduce(|acc, hit| combiner.combine(acc, hit))
                .unwrap_or(true)
        })
        .collect())
}
