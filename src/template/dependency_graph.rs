// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use super::Template;
use crate::batch::TIMESTAMP;
use crate::errors::{DependencyKind, RuleKind};

/// Where a column addressable by rules comes from.
///
/// Rule outputs carry their position in the declared rule list so a reader
/// can tell whether the producer runs before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnOrigin {
    Timestamp,
    Measure,
    UserId,
    Field,
    Tag,
    Filter(usize),
    Derived(usize),
    /// Position of an event rule in key order. Events produce no columns;
    /// this variant only describes readers.
    Event(usize),
}

impl ColumnOrigin {
    /// Execution rank: raw columns first, then filters, derived rules and
    /// events in declared order.
    fn rank(&self) -> (u8, usize) {
        match self {
            ColumnOrigin::Timestamp
            | ColumnOrigin::Measure
            | ColumnOrigin::UserId
            | ColumnOrigin::Field
            | ColumnOrigin::Tag => (0, 0),
            ColumnOrigin::Filter(i) => (1, *i),
            ColumnOrigin::Derived(i) => (2, *i),
            ColumnOrigin::Event(i) => (3, *i),
        }
    }

    /// Whether a column with this origin exists by the time `reader` runs.
    pub fn precedes(&self, reader: ColumnOrigin) -> bool {
        self.rank() < reader.rank()
    }

    /// The dependency kind reported when this column disappears.
    pub fn dependency_kind(&self) -> Option<DependencyKind> {
        match self {
            ColumnOrigin::Measure => Some(DependencyKind::Measure),
            ColumnOrigin::UserId => Some(DependencyKind::UserId),
            ColumnOrigin::Field => Some(DependencyKind::Field),
            ColumnOrigin::Tag => Some(DependencyKind::Tag),
            ColumnOrigin::Filter(_) => Some(DependencyKind::Filter),
            ColumnOrigin::Derived(_) => Some(DependencyKind::DerivedParam),
            ColumnOrigin::Timestamp | ColumnOrigin::Event(_) => None,
        }
    }

    /// Kind of the rule at this position, if it is one.
    pub fn rule_kind(&self) -> Option<RuleKind> {
        match self {
            ColumnOrigin::Filter(_) => Some(RuleKind::Filter),
            ColumnOrigin::Derived(_) => Some(RuleKind::DerivedParam),
            ColumnOrigin::Event(_) => Some(RuleKind::Event),
            _ => None,
        }
    }
}

/// A rule that reads a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reader {
    pub slot: ColumnOrigin,
    pub label: String,
}

/// Column -> producer and column -> readers tables of one template.
///
/// When two entries produce the same name the first one in execution order
/// wins; validation reports the duplicate separately.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub origins: HashMap<String, ColumnOrigin>,
    pub readers: HashMap<String, Vec<Reader>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_template(template: &Template) -> Self {
        let mut graph = Self::new();
        graph.add_origin(TIMESTAMP, ColumnOrigin::Timestamp);
        for name in template.measures.keys() {
            graph.add_origin(name, ColumnOrigin::Measure);
        }
        for name in &template.user_ids {
            graph.add_origin(name, ColumnOrigin::UserId);
        }
        for name in &template.fields {
            graph.add_origin(name, ColumnOrigin::Field);
        }
        for name in &template.tags {
            graph.add_origin(name, ColumnOrigin::Tag);
        }

        for (i, filter) in template.filters.iter().enumerate() {
            let slot = ColumnOrigin::Filter(i);
            graph.add_origin(&filter.filter_name, slot);
            graph.add_reads(slot, &filter.filter_name, filter.rule.referenced_columns());
        }
        for (i, rule) in template.dparam_rules.iter().enumerate() {
            let slot = ColumnOrigin::Derived(i);
            if let Some(output) = rule.output_name() {
                graph.add_origin(output, slot);
            }
            graph.add_reads(slot, &derived_label(rule), rule.referenced_columns());
        }
        for (i, (key, event)) in template.event_rules.iter().enumerate() {
            graph.add_reads(ColumnOrigin::Event(i), key, event.rule.referenced_columns());
        }
        graph
    }

    fn add_origin(&mut self, name: &str, origin: ColumnOrigin) {
        self.origins.entry(name.to_string()).or_insert(origin);
    }

    fn add_reads(&mut self, slot: ColumnOrigin, label: &str, columns: Vec<&str>) {
        for column in columns {
            self.readers.entry(column.to_string()).or_default().push(Reader {
                slot,
                label: label.to_string(),
            });
        }
    }

    pub fn origin(&self, column: &str) -> Option<ColumnOrigin> {
        self.origins.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.origins.contains_key(column)
    }

    /// Rules reading `column`, in execution order.
    pub fn readers_of(&self, column: &str) -> &[Reader] {
        self.readers.get(column).map_or(&[], Vec::as_slice)
    }
}

/// Label of a derived rule in errors and violations: its output name, or the
/// transform name when it has none.
pub(crate) fn derived_label(rule: &crate::rules::Rule) -> String {
    rule.output_name()
        .unwrap_or(&rule.transform_name)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{EventRule, FilterRule, Rule};
    use crate::template::DataType;

    fn template() -> Template {
        Template::new("s", "t")
            .with_measure("location", DataType::Geo)
            .with_field("mode")
            .with_filter(FilterRule::new(
                "location_buttered",
                Rule::new("ButterLowpass").with_input("target_measure", "location"),
            ))
            .with_dparam_rule(
                Rule::new("DeriveDistance")
                    .with_input("spatial_measure", "location_buttered")
                    .with_output("distance"),
            )
            .with_event_rule(EventRule::new(
                "far",
                "t",
                Rule::new("DetectThreshold").with_input("target_measure", "distance"),
            ))
    }

    #[test]
    fn test_origins() {
        let graph = DependencyGraph::from_template(&template());

        assert_eq!(graph.origin("timestamp"), Some(ColumnOrigin::Timestamp));
        assert_eq!(graph.origin("location"), Some(ColumnOrigin::Measure));
        assert_eq!(graph.origin("mode"), Some(ColumnOrigin::Field));
        assert_eq!(graph.origin("location_buttered"), Some(ColumnOrigin::Filter(0)));
        assert_eq!(graph.origin("distance"), Some(ColumnOrigin::Derived(0)));
        assert!(!graph.contains("far"));
    }

    #[test]
    fn test_readers() {
        let graph = DependencyGraph::from_template(&template());

        let readers = graph.readers_of("distance");
        assert_eq!(readers.len(), 1);
        assert_eq!(readers[0].slot, ColumnOrigin::Event(0));
        assert_eq!(readers[0].label, "far");
        assert_eq!(graph.readers_of("location")[0].label, "location_buttered");
        assert!(graph.readers_of("mode").is_empty());
    }

    #[test]
    fn test_precedes() {
        struct TestCase {
            origin: ColumnOrigin,
            reader: ColumnOrigin,
            expected: bool,
        }

        let cases = vec![
            TestCase { origin: ColumnOrigin::Measure, reader: ColumnOrigin::Filter(0), expected: true },
            TestCase { origin: ColumnOrigin::Filter(0), reader: ColumnOrigin::Filter(1), expected: true },
            TestCase { origin: ColumnOrigin::Filter(1), reader: ColumnOrigin::Filter(1), expected: false },
            TestCase { origin: ColumnOrigin::Derived(0), reader: ColumnOrigin::Filter(5), expected: false },
            TestCase { origin: ColumnOrigin::Derived(3), reader: ColumnOrigin::Derived(2), expected: false },
            TestCase { origin: ColumnOrigin::Derived(3), reader: ColumnOrigin::Event(0), expected: true },
        ];

        for case in cases {
            assert_eq!(
                case.origin.precedes(case.reader),
                case.expected,
                "{:?} before {:?}",
                case.origin,
                case.reader
            );
        }
    }
}
