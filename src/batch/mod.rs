// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod aggregate;
mod column;

pub use aggregate::{
    aggregate, AggregateBatch, DerivedDocument, EventOccurrence, EventsDocument, FilteredRow,
    RawRow, SeriesDocument, TIMESTAMP,
};
pub(crate) use column::float_value;
pub use column::{Column, ColumnView, Series};
