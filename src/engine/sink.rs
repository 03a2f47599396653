// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::batch::{DerivedDocument, EventOccurrence, EventsDocument, FilteredRow, RawRow};
use crate::errors::SinkError;
use crate::traits::ResultSink;

#[derive(Default)]
struct Stored {
    next_id: i64,
    raw: HashMap<String, Vec<RawRow>>,
    filtered: HashMap<String, Vec<FilteredRow>>,
    derived: Vec<DerivedDocument>,
    events: HashMap<String, Vec<EventOccurrence>>,
}

/// Keeps everything in memory. Raw row ids start at 1 and increase across
/// all streams.
#[derive(Default)]
pub struct MemorySink {
    stored: Mutex<Stored>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn raw_rows(&self, stream_token: &str) -> Vec<RawRow> {
        self.stored.lock().await.raw.get(stream_token).cloned().unwrap_or_default()
    }

    pub async fn filtered_rows(&self, stream_token: &str) -> Vec<FilteredRow> {
        self.stored
            .lock()
            .await
            .filtered
            .get(stream_token)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn derived_documents(&self, stream_token: &str) -> Vec<DerivedDocument> {
        self.stored
            .lock()
            .await
            .derived
            .iter()
            .filter(|doc| doc.stream_token == stream_token)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn store_raw(&self, stream_token: &str, rows: &[RawRow]) -> Result<Vec<i64>, SinkError> {
        let mut stored = self.stored.lock().await;
        let first = stored.next_id + 1;
        let ids: Vec<i64> = (first..first + rows.len() as i64).collect();
        stored.next_id += rows.len() as i64;
        stored
            .raw
            .entry(stream_token.to_string())
            .or_default()
            .extend_from_slice(rows);
        Ok(ids)
    }

    async fn store_filtered(&self, stream_token: &str, rows: &[FilteredRow]) -> Result<(), SinkError> {
        self.stored
            .lock()
            .await
            .filtered
            .entry(stream_token.to_string())
            .or_default()
            .extend_from_slice(rows);
        Ok(())
    }

    async fn store_derived(&self, document: &DerivedDocument) -> Result<(), SinkError> {
        self.stored.lock().await.derived.push(document.clone());
        Ok(())
    }

    async fn store_events(&self, document: &EventsDocument) -> Result<(), SinkError> {
        let mut stored = self.stored.lock().await;
        let occurrences = stored.events.entry(document.stream_token.clone()).or_default();
        for list in document.events.values() {
            occurrences.extend_from_slice(list);
        }
        Ok(())
    }

    async fn events_for(&self, stream_token: &str) -> Result<Vec<EventOccurrence>, SinkError> {
        Ok(self
            .stored
            .lock()
            .await
            .events
            .get(stream_token)
            .cloned()
            .unwrap_or_default())
    }
}
