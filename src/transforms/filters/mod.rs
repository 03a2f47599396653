// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Same-length smoothing filters. Geo columns are filtered per axis.

mod butter_lowpass;
mod window_average;

pub use butter_lowpass::{butter_lowpass, ButterLowpass};
pub use window_average::WindowAverage;

use crate::batch::Column;
use crate::errors::TransformError;

pub(crate) const TARGET: &str = "target_measure";

/// Runs `filter` over a scalar column, or over each axis of a position column.
pub(crate) fn filter_axes(
    column: &Column,
    filter: impl Fn(&[f64]) -> Vec<f64>,
) -> Result<Column, TransformError> {
    let as_points = matches!(column, Column::Geo(_))
        || (matches!(column, Column::Json(_)) && column.as_floats(TARGET).is_err());
    if !as_points {
        return Ok(Column::Float(filter(&column.as_floats(TARGET)?)));
    }

    let points = column.as_points(TARGET)?;
    let first: Vec<f64> = points.iter().map(|p| p[0]).collect();
    let second: Vec<f64> = points.iter().map(|p| p[1]).collect();
    let first = filter(&first);
    let second = filter(&second);
    Ok(Column::Geo(
        first.into_iter().zip(second).map(|(a, b)| [a, b]).collect(),
    ))
}
