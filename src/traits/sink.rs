// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::batch::{DerivedDocument, EventOccurrence, EventsDocument, FilteredRow, RawRow};
use crate::errors::SinkError;

/// Persistence collaborator fed by the coordinator.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Stores raw rows and returns one storage id per row, in order.
    async fn store_raw(&self, stream_token: &str, rows: &[RawRow]) -> Result<Vec<i64>, SinkError>;

    async fn store_filtered(&self, stream_token: &str, rows: &[FilteredRow]) -> Result<(), SinkError>;

    async fn store_derived(&self, document: &DerivedDocument) -> Result<(), SinkError>;

    async fn store_events(&self, document: &EventsDocument) -> Result<(), SinkError>;

    /// Every stored occurrence for a stream, in storage order.
    async fn events_for(&self, stream_token: &str) -> Result<Vec<EventOccurrence>, SinkError>;
}
