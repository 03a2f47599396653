// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Binary comparison used by thresholds and partition predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "==",
            ComparisonOperator::Ne => "!=",
            ComparisonOperator::Ge => ">=",
            ComparisonOperator::Le => "<=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Lt => "<",
        }
    }

    pub fn all() -> [ComparisonOperator; 6] {
        [
            ComparisonOperator::Eq,
            ComparisonOperator::Ne,
            ComparisonOperator::Ge,
            ComparisonOperator::Le,
            ComparisonOperator::Gt,
            ComparisonOperator::Lt,
        ]
    }

    /// `lhs <op> rhs`. Unordered operands (NaN) only satisfy `!=`.
    pub fn compare<T: PartialOrd>(&self, lhs: T, rhs: T) -> bool {
        match lhs.partial_cmp(&rhs) {
            Some(ordering) => self.holds(ordering),
            None => matches!(self, ComparisonOperator::Ne),
        }
    }

    /// Whether the operator accepts the given ordering of `lhs` relative to `rhs`.
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonOperator::Eq => ordering == Ordering::Equal,
            ComparisonOperator::Ne => ordering != Ordering::Equal,
            ComparisonOperator::Ge => ordering != Ordering::Less,
            ComparisonOperator::Le => ordering != Ordering::Greater,
            ComparisonOperator::Gt => ordering == Ordering::Greater,
            ComparisonOperator::Lt => ordering == Ordering::Less,
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComparisonOperator::all()
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown comparison operator '{}'", s))
    }
}

/// How several boolean masks are folded together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalCombiner {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

impl LogicalCombiner {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalCombiner::And => "AND",
            LogicalCombiner::Or => "OR",
        }
    }

    pub fn combine(&self, a: bool, b: bool) -> bool {
        match self {
            LogicalCombiner::And => a && b,
            LogicalCombiner::Or => a || b,
        }
    }
}

impl FromStr for LogicalCombiner {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Ok(LogicalCombiner::And),
            "OR" => Ok(LogicalCombiner::Or),
            _ => Err(format!("unknown logical combiner '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operators() {
        struct TestCase {
            op: ComparisonOperator,
            lhs: f64,
            rhs: f64,
            expected: bool,
        }

        let cases = vec![
            TestCase { op: ComparisonOperator::Eq, lhs: 1.0, rhs: 1.0, expected: true },
            TestCase { op: ComparisonOperator::Ne, lhs: 1.0, rhs: 1.0, expected: false },
            TestCase { op: ComparisonOperator::Ge, lhs: 2.0, rhs: 2.0, expected: true },
            TestCase { op: ComparisonOperator::Le, lhs: 3.0, rhs: 2.0, expected: false },
            TestCase { op: ComparisonOperator::Gt, lhs: 3.0, rhs: 2.0, expected: true },
            TestCase { op: ComparisonOperator::Lt, lhs: 3.0, rhs: 2.0, expected: false },
            TestCase { op: ComparisonOperator::Ne, lhs: f64::NAN, rhs: 0.0, expected: true },
            TestCase { op: ComparisonOperator::Eq, lhs: f64::NAN, rhs: f64::NAN, expected: false },
        ];

        for case in cases {
            assert_eq!(
                case.op.compare(case.lhs, case.rhs),
                case.expected,
                "{} {} {}",
                case.lhs,
                case.op,
                case.rhs
            );
        }
    }

    #[test]
    fn test_operator_round_trips_through_str() {
        for op in ComparisonOperator::all() {
            assert_eq!(op.as_str().parse::<ComparisonOperator>().unwrap(), op);
        }
        assert!("=>".parse::<ComparisonOperator>().is_err());
    }

    #[test]
    fn test_combiner() {
        assert!(LogicalCombiner::Or.combine(false, true));
        assert!(!LogicalCombiner::And.combine(false, true));
        assert_eq!("or".parse::<LogicalCombiner>().unwrap(), LogicalCombiner::Or);
    }
}
