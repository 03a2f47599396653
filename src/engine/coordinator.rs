// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Request-level orchestration: template registration and the
//! aggregate, store, run rules, store flow for a batch of records.
//!
//! Pipelines are CPU-bound, so aggregation and rule evaluation run on
//! tokio's blocking pool. A semaphore caps how many pipelines hold a
//! blocking worker at once; requests beyond the cap wait for a permit.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use crate::batch::{aggregate, AggregateBatch, EventOccurrence};
use crate::config::PipelineOptions;
use crate::errors::{PipelineError, RegistryError, RuleError};
use crate::observability::messages::pipeline::{BatchAggregated, PipelineCompleted};
use crate::observability::messages::StructuredLog;
use crate::record::Record;
use crate::rules::RuleEngine;
use crate::template::{
    update_template, validate_template, Template, UpdateOp, STORE_DERIVED, STORE_FILTERED,
    STORE_RAW,
};
use crate::traits::{ResultSink, TemplateRegistry};
use crate::transforms::TransformRegistry;

/// Result of one `process_data` call.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub stream_token: String,
    pub version: u32,
    /// Batch with every stage's section populated.
    pub batch: AggregateBatch,
    /// Rule-local failures collected while the pipeline kept going.
    pub failures: Vec<RuleError>,
}

impl PipelineReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Coordinator {
    registry: Arc<dyn TemplateRegistry>,
    sink: Arc<dyn ResultSink>,
    transforms: Arc<TransformRegistry>,
    engine: RuleEngine,
    permits: Arc<Semaphore>,
}

impl Coordinator {
    pub fn new(
        registry: Arc<dyn TemplateRegistry>,
        sink: Arc<dyn ResultSink>,
        transforms: Arc<TransformRegistry>,
        options: &PipelineOptions,
    ) -> Self {
        let engine = RuleEngine::new(Arc::clone(&transforms), options.engine_options());
        Self {
            registry,
            sink,
            transforms,
            engine,
            permits: Arc::new(Semaphore::new(options.max_concurrency.max(1))),
        }
    }

    /// Validates `template` against the transform registry and stores it.
    pub async fn process_template(&self, template: Template) -> Result<Arc<Template>, PipelineError> {
        validate_template(&template, &self.transforms).map_err(PipelineError::InvalidTemplate)?;
        Ok(self.registry.register(template).await?)
    }

    /// Applies update ops to the latest template of `token`.
    ///
    /// The updated template must pass the same validation as a freshly
    /// registered one; an invalid result is rejected before the registry
    /// stores a new version.
    pub async fn update_template(&self, token: &str, ops: &[UpdateOp]) -> Result<Arc<Template>, PipelineError> {
        let current = self.registry.get_latest_template(token).await?;
        let candidate = update_template(&current, ops).map_err(RegistryError::from)?;
        validate_template(&candidate, &self.transforms).map_err(PipelineError::InvalidTemplate)?;
        Ok(self.registry.update(token, ops).await?)
    }

    /// Runs the full pipeline over `records` with the latest template of
    /// `token`.
    ///
    /// Raw rows are stored first so derived series and events can carry
    /// their storage ids. Sections disabled in `storage_rules` are computed
    /// but not written.
    pub async fn process_data(&self, token: &str, records: Vec<Record>) -> Result<PipelineReport, PipelineError> {
        let started = Instant::now();
        let template = self.registry.get_latest_template(token).await?;
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| PipelineError::Worker(e.to_string()))?;

        let batch = {
            let template = Arc::clone(&template);
            tokio::task::spawn_blocking(move || aggregate(&template, &records))
                .await
                .map_err(|e| PipelineError::Worker(e.to_string()))??
        };
        BatchAggregated {
            stream_token: token,
            version: template.version,
            rows: batch.len(),
        }
        .log();

        let batch = if template.stores(STORE_RAW) {
            let ids = self.sink.store_raw(token, &batch.raw_rows()).await?;
            batch.attach_ids(ids)?
        } else {
            batch
        };

        let outcome = {
            let template = Arc::clone(&template);
            let engine = self.engine.clone();
            tokio::task::spawn_blocking(move || engine.run(&template, batch))
                .await
                .map_err(|e| PipelineError::Worker(e.to_string()))??
        };
        let batch = outcome.batch;

        if template.stores(STORE_FILTERED) && batch.filter_measures.is_some() {
            self.sink.store_filtered(token, &batch.filtered_rows()).await?;
        }
        if template.stores(STORE_DERIVED) && batch.derived_measures.is_some() {
            self.sink.store_derived(&batch.derived_document()).await?;
        }
        if batch.events.as_ref().is_some_and(|events| !events.is_empty()) {
            self.sink.store_events(&batch.events_document()).await?;
        }

        PipelineCompleted {
            stream_token: token,
            rows: batch.len(),
            failure_count: outcome.failures.len(),
            duration: started.elapsed(),
        }
        .log();

        Ok(PipelineReport {
            stream_token: token.to_string(),
            version: template.version,
            batch,
            failures: outcome.failures,
        })
    }

    /// Every stored event occurrence of a stream.
    pub async fn get_events(&self, token: &str) -> Result<Vec<EventOccurrence>, PipelineError> {
        Ok(self.sink.events_for(token).await?)
    }
}
