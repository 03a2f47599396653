// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Load-time validation of a template against the transform registry.
//!
//! Every rule is checked for:
//!
//! 1. **Transform lookup**: the name is registered and belongs to the
//!    rule's stage
//! 2. **Parameters**: every required `func_params` entry is present
//! 3. **References**: every input and partition column is provided by the
//!    raw schema or by a rule that runs earlier
//!
//! plus template-wide checks for duplicate outputs and event-name
//! collisions. Errors are accumulated so a caller sees every problem at once.
//!
//! # Example
//! ```rust
//! use strom::rules::Rule;
//! use strom::template::{validate_template, DataType, Template};
//! use strom::transforms::TransformRegistry;
//!
//! let registry = TransformRegistry::with_builtins();
//! let template = Template::new("walk", "abc123")
//!     .with_measure("speed", DataType::Float)
//!     .with_dparam_rule(
//!         Rule::new("DeriveChange")
//!             .with_input("target_measure", "acceleration")
//!             .with_output("jerk"),
//!     );
//!
//! let errors = validate_template(&template, &registry).unwrap_err();
//! assert_eq!(errors.len(), 1);
//! ```

use std::collections::HashSet;

use super::dependency_graph::{derived_label, ColumnOrigin, DependencyGraph};
use super::Template;
use crate::errors::ValidationError;
use crate::observability::messages::validation::{
    DependencyOrderViolation, UnresolvedReference, ValidationFailed, ValidationStarted,
};
use crate::observability::messages::StructuredLog;
use crate::rules::{Rule, OUTPUT_ROLE};
use crate::traits::TransformStage;
use crate::transforms::TransformRegistry;

/// Validates every rule of `template` against `registry`.
pub fn validate_template(
    template: &Template,
    registry: &TransformRegistry,
) -> Result<(), Vec<ValidationError>> {
    ValidationStarted {
        stream_token: &template.stream_token,
        rule_count: template.filters.len() + template.dparam_rules.len() + template.event_rules.len(),
    }
    .log();

    let graph = DependencyGraph::from_template(template);
    let mut errors = Vec::new();

    for (i, filter) in template.filters.iter().enumerate() {
        let slot = ColumnOrigin::Filter(i);
        validate_rule(template, registry, &graph, slot, &filter.filter_name, &filter.rule, &mut errors);
    }
    for (i, rule) in template.dparam_rules.iter().enumerate() {
        let slot = ColumnOrigin::Derived(i);
        let label = derived_label(rule);
        validate_rule(template, registry, &graph, slot, &label, rule, &mut errors);
        if rule.output_name().is_none() {
            errors.push(ValidationError::MissingParameter {
                rule: label,
                transform: rule.transform_name.clone(),
                parameter: OUTPUT_ROLE.to_string(),
            });
        }
    }
    for (i, (key, event)) in template.event_rules.iter().enumerate() {
        let slot = ColumnOrigin::Event(i);
        validate_rule(template, registry, &graph, slot, key, &event.rule, &mut errors);
    }

    validate_unique_outputs(template, &mut errors);
    validate_event_names(template, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        ValidationFailed {
            stream_token: &template.stream_token,
            error_count: errors.len(),
        }
        .log();
        Err(errors)
    }
}

fn expected_stage(slot: ColumnOrigin) -> TransformStage {
    match slot {
        ColumnOrigin::Filter(_) => TransformStage::Filter,
        ColumnOrigin::Event(_) => TransformStage::Detect,
        _ => TransformStage::Derive,
    }
}

fn validate_rule(
    template: &Template,
    registry: &TransformRegistry,
    graph: &DependencyGraph,
    slot: ColumnOrigin,
    label: &str,
    rule: &Rule,
    errors: &mut Vec<ValidationError>,
) {
    match registry.get(&rule.transform_name) {
        None => errors.push(ValidationError::UnknownTransform {
            rule: label.to_string(),
            transform: rule.transform_name.clone(),
        }),
        Some(transform) => {
            let expected = expected_stage(slot);
            if transform.stage() != expected {
                errors.push(ValidationError::WrongStage {
                    rule: label.to_string(),
                    transform: rule.transform_name.clone(),
                    expected,
                    actual: transform.stage(),
                });
            }
            let schema = transform.describe();
            for parameter in schema.missing_parameters(&rule.params.func_params) {
                errors.push(ValidationError::MissingParameter {
                    rule: label.to_string(),
                    transform: rule.transform_name.clone(),
                    parameter: parameter.to_string(),
                });
            }
        }
    }

    for column in rule.referenced_columns() {
        match graph.origin(column) {
            None => {
                UnresolvedReference { rule: label, column }.log();
                errors.push(ValidationError::UnresolvedReference {
                    rule: label.to_string(),
                    column: column.to_string(),
                });
            }
            Some(origin) if !origin.precedes(slot) => {
                let produced_by = producer_label(template, origin);
                DependencyOrderViolation {
                    rule: label,
                    column,
                    produced_by: &produced_by,
                }
                .log();
                errors.push(ValidationError::DependencyOrderViolation {
                    rule: label.to_string(),
                    column: column.to_string(),
                    produced_by,
                });
            }
            Some(_) => {}
        }
    }
}

fn producer_label(template: &Template, origin: ColumnOrigin) -> String {
    match origin {
        ColumnOrigin::Filter(i) => template.filters[i].filter_name.clone(),
        ColumnOrigin::Derived(i) => derived_label(&template.dparam_rules[i]),
        _ => String::new(),
    }
}

/// Filter names and derived outputs share one namespace in the batch.
fn validate_unique_outputs(template: &Template, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for name in template.filter_outputs() {
        if !seen.insert(name) {
            errors.push(ValidationError::DuplicateOutput {
                section: "filter",
                output: name.to_string(),
            });
        }
    }
    for name in template.dparam_outputs() {
        if !seen.insert(name) {
            errors.push(ValidationError::DuplicateOutput {
                section: "derived param",
                output: name.to_string(),
            });
        }
    }
}

fn validate_event_names(template: &Template, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for (key, event) in &template.event_rules {
        if !seen.insert(event.event_name.as_str()) {
            errors.push(ValidationError::EventNameCollision {
                key: key.clone(),
                event_name: event.event_name.clone(),
            });
        }
    }
}
