// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stage-by-stage evaluation of a template's rules against a batch.
//!
//! The engine runs three stages in a fixed order:
//!
//! 1. **Filter**: `template.filters`, producing `filter_measures`
//! 2. **Derive**: `template.dparam_rules`, producing `derived_measures`
//! 3. **Detect**: `template.event_rules`, producing `events`
//!
//! Inside a stage rules run in declaration order, so a rule may read the
//! output of any rule declared before it. Each stage takes the batch by value
//! and rebuilds its own section from scratch, which makes re-running a stage
//! on its own output idempotent.
//!
//! ## Row alignment
//!
//! A rule sees only the rows selected by its partition predicates that are
//! also present in every bound input column. Transforms that shrink their
//! input (`DeriveChange`, `DeriveDistance`, ...) have their output aligned to
//! the first `len` selected rows.
//!
//! ## Failure handling
//!
//! A failing rule never poisons the batch. Under
//! [`FailureStrategy::ContinueOnError`] its error is collected in
//! [`StageOutcome::failures`] and the stage moves on; under
//! [`FailureStrategy::FailFast`] the first failure is returned.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::Value;

use super::partition::row_mask;
use super::rule::Rule;
use crate::batch::{AggregateBatch, Column, EventOccurrence, Series};
use crate::errors::{FailureStrategy, RuleError};
use crate::observability::messages::pipeline::{
    EventsDetected, RuleFailed, StageCompleted, StageStarted,
};
use crate::observability::messages::StructuredLog;
use crate::template::Template;
use crate::traits::TransformStage;
use crate::transforms::{TransformInputs, TransformRegistry};

/// What happens when two event rules emit the same event name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCollisionPolicy {
    /// The later rule fails with `RuleError::EventNameCollision`.
    #[default]
    Reject,
    /// The later rule replaces the earlier occurrences.
    Overwrite,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub failure_strategy: FailureStrategy,
    pub event_collision: EventCollisionPolicy,
}

/// The batch after a stage plus the rule-local failures it collected.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub batch: AggregateBatch,
    pub failures: Vec<RuleError>,
}

/// Output of one successfully evaluated rule.
struct Evaluated {
    rows: Vec<usize>,
    values: Column,
    inputs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RuleEngine {
    registry: Arc<TransformRegistry>,
    options: EngineOptions,
}

impl RuleEngine {
    pub fn new(registry: Arc<TransformRegistry>, options: EngineOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Runs filter, derive and detect in order, accumulating failures.
    pub fn run(&self, template: &Template, batch: AggregateBatch) -> Result<StageOutcome, RuleError> {
        let filtered = self.apply_filters(template, batch)?;
        let derived = self.apply_dparam_rules(template, filtered.batch)?;
        let detected = self.find_events(template, derived.batch)?;

        let failures = filtered
            .failures
            .into_iter()
            .chain(derived.failures)
            .chain(detected.failures)
            .collect();
        Ok(StageOutcome {
            batch: detected.batch,
            failures,
        })
    }

    /// Evaluates every filter rule and replaces `filter_measures`.
    pub fn apply_filters(
        &self,
        template: &Template,
        mut batch: AggregateBatch,
    ) -> Result<StageOutcome, RuleError> {
        let stage = TransformStage::Filter;
        let started = self.stage_started(stage, template.filters.len());
        let mut failures = Vec::new();

        batch.filter_measures = Some(BTreeMap::new());
        for filter in &template.filters {
            let label = filter.filter_name.as_str();
            match self.evaluate(&batch, label, &filter.rule, stage) {
                Ok(evaluated) => {
                    if let Some(section) = batch.filter_measures.as_mut() {
                        section.insert(label.to_string(), Series::new(evaluated.rows, evaluated.values));
                    }
                }
                Err(err) => self.record_failure(stage, err, &mut failures)?,
            }
        }

        self.stage_completed(stage, template.filters.len(), failures.len(), started);
        Ok(StageOutcome { batch, failures })
    }

    /// Evaluates every derived-parameter rule and replaces `derived_measures`.
    pub fn apply_dparam_rules(
        &self,
        template: &Template,
        mut batch: AggregateBatch,
    ) -> Result<StageOutcome, RuleError> {
        let stage = TransformStage::Derive;
        let started = self.stage_started(stage, template.dparam_rules.len());
        let mut failures = Vec::new();

        batch.derived_measures = Some(BTreeMap::new());
        for rule in &template.dparam_rules {
            let label = rule.output_name().unwrap_or(&rule.transform_name);
            match self.evaluate_output(&batch, label, rule, stage) {
                Ok((output, evaluated)) => {
                    if let Some(section) = batch.derived_measures.as_mut() {
                        section.insert(output, Series::new(evaluated.rows, evaluated.values));
                    }
                }
                Err(err) => self.record_failure(stage, err, &mut failures)?,
            }
        }

        self.stage_completed(stage, template.dparam_rules.len(), failures.len(), started);
        Ok(StageOutcome { batch, failures })
    }

    /// Evaluates every event rule and replaces `events`.
    pub fn find_events(
        &self,
        template: &Template,
        mut batch: AggregateBatch,
    ) -> Result<StageOutcome, RuleError> {
        let stage = TransformStage::Detect;
        let started = self.stage_started(stage, template.event_rules.len());
        let mut failures = Vec::new();
        let mut events: BTreeMap<String, Vec<EventOccurrence>> = BTreeMap::new();

        for (key, event_rule) in &template.event_rules {
            let event_name = event_rule.event_name.as_str();
            if events.contains_key(event_name)
                && self.options.event_collision == EventCollisionPolicy::Reject
            {
                let err = RuleError::EventNameCollision {
                    event_name: event_name.to_string(),
                };
                self.record_failure(stage, err, &mut failures)?;
                continue;
            }

            let occurrences = self
                .evaluate(&batch, key, &event_rule.rule, stage)
                .and_then(|evaluated| occurrences(&batch, key, event_name, evaluated));
            match occurrences {
                Ok(occurrences) => {
                    EventsDetected {
                        event_name,
                        occurrences: occurrences.len(),
                    }
                    .log();
                    events.insert(event_name.to_string(), occurrences);
                }
                Err(err) => self.record_failure(stage, err, &mut failures)?,
            }
        }

        batch.events = Some(events);
        self.stage_completed(stage, template.event_rules.len(), failures.len(), started);
        Ok(StageOutcome { batch, failures })
    }

    /// Evaluates a derived rule, which must name its output column.
    fn evaluate_output(
        &self,
        batch: &AggregateBatch,
        label: &str,
        rule: &Rule,
        stage: TransformStage,
    ) -> Result<(String, Evaluated), RuleError> {
        let output = rule
            .output_name()
            .ok_or_else(|| RuleError::MissingOutput {
                rule: label.to_string(),
            })?
            .to_string();
        let evaluated = self.evaluate(batch, label, rule, stage)?;
        Ok((output, evaluated))
    }

    fn evaluate(
        &self,
        batch: &AggregateBatch,
        label: &str,
        rule: &Rule,
        stage: TransformStage,
    ) -> Result<Evaluated, RuleError> {
        let transform = self
            .registry
            .get(&rule.transform_name)
            .ok_or_else(|| RuleError::UnknownTransform {
                rule: label.to_string(),
                transform: rule.transform_name.clone(),
            })?;
        if transform.stage() != stage {
            return Err(RuleError::StageMismatch {
                rule: label.to_string(),
                transform: rule.transform_name.clone(),
                expected: stage,
            });
        }

        let wrap = |source| RuleError::Transform {
            rule: label.to_string(),
            source,
        };
        let schema = transform.describe();
        let params = schema.resolve(&rule.params.func_params).map_err(wrap)?;
        let mask = row_mask(batch, label, &rule.partition_list, rule.logical_comparison)?;

        let input_roles: Vec<&str> = schema.input_roles().collect();
        let mut bound = Vec::with_capacity(input_roles.len());
        for role in &input_roles {
            let column = match rule.params.measure_rules.get(*role) {
                Some(column) => Some(column.as_str()),
                // A single-input transform may name its column through measure_list alone.
                None if input_roles.len() == 1 => rule.measure_list.first().map(String::as_str),
                None => None,
            };
            let Some(column) = column else { continue };
            let view = batch.column(column).ok_or_else(|| RuleError::MissingColumn {
                rule: label.to_string(),
                column: column.to_string(),
            })?;
            bound.push((*role, column, view));
        }

        let selected: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter(|(row, keep)| **keep && bound.iter().all(|(_, _, view)| view.contains(*row)))
            .map(|(row, _)| row)
            .collect();

        let mut inputs = TransformInputs::new();
        for (role, _, view) in &bound {
            inputs.insert(*role, view.gather(&selected));
        }
        let values = transform.apply(&inputs, &params).map_err(wrap)?;
        if values.len() > selected.len() {
            return Err(wrap(crate::errors::TransformError::OutputLength {
                produced: values.len(),
                available: selected.len(),
            }));
        }

        let mut rows = selected;
        rows.truncate(values.len());
        Ok(Evaluated {
            rows,
            values,
            inputs: bound.iter().map(|(_, column, _)| column.to_string()).collect(),
        })
    }

    fn record_failure(
        &self,
        stage: TransformStage,
        err: RuleError,
        failures: &mut Vec<RuleError>,
    ) -> Result<(), RuleError> {
        let stage_name = stage.to_string();
        RuleFailed {
            stage: &stage_name,
            rule: err.rule(),
            error: &err,
        }
        .log();
        match self.options.failure_strategy {
            FailureStrategy::FailFast => Err(err),
            FailureStrategy::ContinueOnError => {
                failures.push(err);
                Ok(())
            }
        }
    }

    fn stage_started(&self, stage: TransformStage, rule_count: usize) -> Instant {
        let stage_name = stage.to_string();
        StageStarted {
            stage: &stage_name,
            rule_count,
        }
        .log();
        Instant::now()
    }

    fn stage_completed(
        &self,
        stage: TransformStage,
        rule_count: usize,
        failure_count: usize,
        started: Instant,
    ) {
        let stage_name = stage.to_string();
        StageCompleted {
            stage: &stage_name,
            rule_count,
            failure_count,
            duration: started.elapsed(),
        }
        .log();
    }
}

/// Turns a detect transform's boolean output into event occurrences.
fn occurrences(
    batch: &AggregateBatch,
    label: &str,
    event_name: &str,
    evaluated: Evaluated,
) -> Result<Vec<EventOccurrence>, RuleError> {
    let hits = evaluated
        .values
        .as_bools("event")
        .map_err(|source| RuleError::Transform {
            rule: label.to_string(),
            source,
        })?;

    Ok(evaluated
        .rows
        .iter()
        .zip(hits.iter())
        .filter(|(_, hit)| **hit)
        .map(|(&row, _)| {
            let context = evaluated
                .inputs
                .iter()
                .map(|column| {
                    let value = batch
                        .column(column)
                        .and_then(|view| view.cell(row))
                        .unwrap_or(Value::Null);
                    (column.clone(), value)
                })
                .collect();
            EventOccurrence {
                event_name: event_name.to_string(),
                stream_token: batch.stream_token.clone(),
                timestamp: batch.timestamp[row],
                row,
                id: batch.ids().and_then(|ids| ids.get(row).copied()),
                context,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::aggregate;
    use crate::errors::TransformError;
    use crate::record::Record;
    use crate::rules::{EventRule, FilterRule, Predicate};
    use crate::template::DataType;
    use crate::transforms::ComparisonOperator;
    use serde_json::json;

    fn engine(options: EngineOptions) -> RuleEngine {
        RuleEngine::new(Arc::new(TransformRegistry::with_builtins()), options)
    }

    fn template() -> Template {
        Template::new("walk", "tok")
            .with_measure("speed", DataType::Float)
            .with_measure("heading", DataType::Float)
            .with_field("mode")
    }

    fn batch(template: &Template) -> AggregateBatch {
        let speeds = [1.0, 2.0, 9.0, 4.0, 12.0, 3.0];
        let records: Vec<Record> = speeds
            .iter()
            .enumerate()
            .map(|(i, speed)| {
                let mode = if *speed > 5.0 { "drive" } else { "walk" };
                Record::new("tok", 100 + i as i64)
                    .with_measure("speed", json!(speed), DataType::Float)
                    .with_measure("heading", json!(350.0 + 5.0 * i as f64), DataType::Float)
                    .with_field("mode", json!(mode))
            })
            .collect();
        aggregate(template, &records).unwrap()
    }

    fn floats(series: &Series) -> Vec<f64> {
        match &series.values {
            Column::Float(values) => values.clone(),
            other => panic!("expected floats, got {}", other.dtype_name()),
        }
    }

    #[test]
    fn test_filter_then_derive_reads_earlier_outputs() {
        let template = template()
            .with_filter(FilterRule::new(
                "speed_windowed",
                Rule::new("WindowAverage")
                    .with_input("target_measure", "speed")
                    .with_output("speed_windowed")
                    .with_param("window_len", json!(1)),
            ))
            .with_dparam_rule(
                Rule::new("DeriveScaled")
                    .with_input("target_measure", "speed_windowed")
                    .with_output("speed_x2")
                    .with_param("scalar", json!(2.0)),
            )
            .with_dparam_rule(
                Rule::new("DeriveChange")
                    .with_input("target_measure", "speed_x2")
                    .with_output("speed_delta"),
            );

        let outcome = engine(EngineOptions::default())
            .run(&template, batch(&template))
            .unwrap();
        assert!(outcome.failures.is_empty());

        let derived = outcome.batch.derived_measures.as_ref().unwrap();
        assert_eq!(floats(&derived["speed_x2"]), vec![2.0, 4.0, 18.0, 8.0, 24.0, 6.0]);
        let delta = &derived["speed_delta"];
        assert_eq!(floats(delta), vec![2.0, 14.0, -10.0, 16.0, -18.0]);
        assert_eq!(delta.rows, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_partitioned_rule_aligns_to_selected_rows() {
        let template = template().with_dparam_rule(
            Rule::new("DeriveChange")
                .with_input("target_measure", "speed")
                .with_output("walk_delta")
                .with_partition(Predicate::new("mode", ComparisonOperator::Eq, json!("walk"))),
        );

        let outcome = engine(EngineOptions::default())
            .apply_dparam_rules(&template, batch(&template))
            .unwrap();
        let series = &outcome.batch.derived_measures.unwrap()["walk_delta"];
        // walk rows are 0, 1, 3, 5; the change drops the last selected row
        assert_eq!(series.rows, vec![0, 1, 3]);
        assert_eq!(floats(series), vec![1.0, 2.0, -1.0]);
    }

    #[test]
    fn test_single_input_falls_back_to_measure_list() {
        let mut rule = Rule::new("DeriveCumsum").with_output("total");
        rule.measure_list.push("speed".to_string());
        let template = template().with_dparam_rule(rule);

        let outcome = engine(EngineOptions::default())
            .apply_dparam_rules(&template, batch(&template))
            .unwrap();
        let total = &outcome.batch.derived_measures.unwrap()["total"];
        assert_eq!(floats(total), vec![1.0, 3.0, 12.0, 16.0, 28.0, 31.0]);
    }

    #[test]
    fn test_rule_failures() {
        struct TestCase {
            name: &'static str,
            rule: Rule,
            check: fn(&RuleError) -> bool,
        }

        let cases = vec![
            TestCase {
                name: "unknown transform",
                rule: Rule::new("DeriveMagic").with_output("x"),
                check: |e| matches!(e, RuleError::UnknownTransform { .. }),
            },
            TestCase {
                name: "wrong stage",
                rule: Rule::new("ButterLowpass")
                    .with_input("target_measure", "speed")
                    .with_output("x"),
                check: |e| {
                    matches!(e, RuleError::StageMismatch { expected: TransformStage::Derive, .. })
                },
            },
            TestCase {
                name: "missing column",
                rule: Rule::new("DeriveCumsum")
                    .with_input("target_measure", "altitude")
                    .with_output("x"),
                check: |e| matches!(e, RuleError::MissingColumn { column, .. } if column == "altitude"),
            },
            TestCase {
                name: "missing parameter",
                rule: Rule::new("DeriveScaled")
                    .with_input("target_measure", "speed")
                    .with_output("x"),
                check: |e| {
                    matches!(
                        e,
                        RuleError::Transform {
                            source: TransformError::MissingParameter { .. },
                            ..
                        }
                    )
                },
            },
            TestCase {
                name: "no output",
                rule: Rule::new("DeriveCumsum").with_input("target_measure", "speed"),
                check: |e| matches!(e, RuleError::MissingOutput { .. }),
            },
        ];

        for case in cases {
            let template = template()
                .with_dparam_rule(case.rule)
                .with_dparam_rule(
                    Rule::new("DeriveCumsum")
                        .with_input("target_measure", "speed")
                        .with_output("survivor"),
                );
            let outcome = engine(EngineOptions::default())
                .apply_dparam_rules(&template, batch(&template))
                .unwrap();

            assert_eq!(outcome.failures.len(), 1, "{}", case.name);
            assert!((case.check)(&outcome.failures[0]), "{}: {:?}", case.name, outcome.failures[0]);
            assert!(
                outcome.batch.derived_measures.unwrap().contains_key("survivor"),
                "{}",
                case.name
            );
        }
    }

    #[test]
    fn test_fail_fast_returns_first_error() {
        let template = template().with_dparam_rule(Rule::new("DeriveMagic").with_output("x"));
        let options = EngineOptions {
            failure_strategy: FailureStrategy::FailFast,
            ..EngineOptions::default()
        };

        let err = engine(options)
            .apply_dparam_rules(&template, batch(&template))
            .unwrap_err();
        assert_eq!(err.rule(), "x");
    }

    #[test]
    fn test_find_events_with_context() {
        let template = template().with_event_rule(EventRule::new(
            "fast",
            "tok",
            Rule::new("DetectThreshold")
                .with_input("target_measure", "speed")
                .with_param("threshold_value", json!(5.0))
                .with_param("comparison_operator", json!(">")),
        ));
        let batch = batch(&template).attach_ids(vec![10, 11, 12, 13, 14, 15]).unwrap();

        let outcome = engine(EngineOptions::default()).find_events(&template, batch).unwrap();
        let fast = &outcome.batch.events.unwrap()["fast"];

        let rows: Vec<usize> = fast.iter().map(|o| o.row).collect();
        assert_eq!(rows, vec![2, 4]);
        assert_eq!(fast[0].timestamp, 102);
        assert_eq!(fast[0].id, Some(12));
        assert_eq!(fast[1].context["speed"], json!(12.0));
    }

    #[test]
    fn test_event_name_collision() {
        let detect = || {
            Rule::new("DetectThreshold")
                .with_input("target_measure", "speed")
                .with_param("threshold_value", json!(5.0))
                .with_param("comparison_operator", json!(">="))
        };
        let mut template = template().with_event_rule(EventRule::new("fast", "tok", detect()));
        template
            .event_rules
            .insert("fast_again".to_string(), EventRule::new("fast", "tok", detect()));

        let rejected = engine(EngineOptions::default())
            .find_events(&template, batch(&template))
            .unwrap();
        assert_eq!(
            rejected.failures,
            vec![RuleError::EventNameCollision {
                event_name: "fast".to_string()
            }]
        );

        let options = EngineOptions {
            event_collision: EventCollisionPolicy::Overwrite,
            ..EngineOptions::default()
        };
        let overwritten = engine(options).find_events(&template, batch(&template)).unwrap();
        assert!(overwritten.failures.is_empty());
        assert_eq!(overwritten.batch.events.unwrap()["fast"].len(), 2);
    }

    #[test]
    fn test_rerunning_filters_is_idempotent() {
        let template = template().with_filter(FilterRule::new(
            "speed_buttered",
            Rule::new("ButterLowpass")
                .with_input("target_measure", "speed")
                .with_output("speed_buttered"),
        ));
        let engine = engine(EngineOptions::default());

        let once = engine.apply_filters(&template, batch(&template)).unwrap().batch;
        let twice = engine.apply_filters(&template, once.clone()).unwrap().batch;
        assert_eq!(once, twice);
    }
}
