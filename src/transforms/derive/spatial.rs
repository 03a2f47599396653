// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Derived parameters over two-axis positions.
//!
//! Positions are `[lat, lon]` unless `swap_lon_lat` is set, in which case the
//! input is read as `[lon, lat]`.

use std::borrow::Cow;
use std::f64::consts::PI;

use serde_json::json;

use super::arithmetic::wrap_degrees;
use crate::batch::Column;
use crate::errors::TransformError;
use crate::traits::{Transform, TransformStage};
use crate::transforms::window::{self, smooth, WINDOW_LEN};
use crate::transforms::{FuncParams, ParamSpec, ParameterSchema, RoleSpec, TransformInputs};

const SPATIAL: &str = "spatial_measure";

pub const EARTH_RADIUS_MI: f64 = 3959.0;
pub const EARTH_RADIUS_KM: f64 = 6371.0;

fn spatial_role() -> RoleSpec {
    RoleSpec::input(SPATIAL, "name of geo-spatial measure")
}

fn swap_param() -> ParamSpec {
    ParamSpec::optional(
        "swap_lon_lat",
        "set when positions are stored lon before lat",
        json!(false),
    )
}

fn positions<'a>(
    inputs: &'a TransformInputs,
    params: &FuncParams,
) -> Result<Cow<'a, [[f64; 2]]>, TransformError> {
    let points = inputs.points(SPATIAL)?;
    if params.bool("swap_lon_lat")? {
        Ok(Cow::Owned(points.iter().map(|p| [p[1], p[0]]).collect()))
    } else {
        Ok(points)
    }
}

pub fn euclidean(a: [f64; 2], b: [f64; 2]) -> f64 {
    ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt()
}

/// Haversine distance between two `[lat, lon]` points in degrees.
pub fn great_circle(a: [f64; 2], b: [f64; 2], radius: f64) -> f64 {
    let (lat1, lon1) = (a[0].to_radians(), a[1].to_radians());
    let (lat2, lon2) = (b[0].to_radians(), b[1].to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let inner = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * inner.sqrt().asin() * radius
}

/// Initial great-circle bearing from `a` to `b`, radians in `(-π, π]`,
/// clockwise from north: due east is `+π/2`.
pub fn bearing(a: [f64; 2], b: [f64; 2]) -> f64 {
    let (lat1, lon1) = (a[0].to_radians(), a[1].to_radians());
    let (lat2, lon2) = (b[0].to_radians(), b[1].to_radians());
    let dlon = lon2 - lon1;
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    y.atan2(x)
}

/// Planar angle of the step from `a` to `b`, radians.
pub fn flat_angle(a: [f64; 2], b: [f64; 2]) -> f64 {
    (b[1] - a[1]).atan2(b[0] - a[0])
}

fn wrap_radians(angle: f64) -> f64 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

/// Distance between consecutive positions, one sample shorter than the input.
pub struct DeriveDistance;

impl Transform for DeriveDistance {
    fn name(&self) -> &'static str {
        "DeriveDistance"
    }

    fn stage(&self) -> TransformStage {
        TransformStage::Derive
    }

    fn describe(&self) -> ParameterSchema {
        ParameterSchema::new(self.name(), self.stage())
            .param(ParamSpec::optional(WINDOW_LEN, "length of averaging window", json!(1)))
            .param(ParamSpec::optional(
                "distance_func",
                "euclidean or great_circle",
                json!("euclidean"),
            ))
            .param(ParamSpec::optional("units", "mi or km for great_circle", json!("mi")))
            .param(swap_param())
            .role(spatial_role())
            .role(RoleSpec::output())
    }

    fn apply(&self, inputs: &TransformInputs, params: &FuncParams) -> Result<Column, TransformError> {
        let points = positions(inputs, params)?;
        let distances: Vec<f64> = match params.choice("distance_func", &["euclidean", "great_circle"])?.as_str() {
            "euclidean" => points.windows(2).map(|w| euclidean(w[0], w[1])).collect(),
            _ => {
                let radius = match params.choice("units", &["mi", "km"])?.as_str() {
                    "km" => EARTH_RADIUS_KM,
                    _ => EARTH_RADIUS_MI,
                };
                points
                    .windows(2)
                    .map(|w| great_circle(w[0], w[1], radius))
                    .collect()
            }
        };
        Ok(Column::Float(smooth(distances, window::window_len(params)?)))
    }
}

/// Heading of each step between consecutive positions, one sample shorter
/// than the input. Degrees land in `[-180, 180)`, radians in `[-π, π)`.
pub struct DeriveHeading;

impl Transform for DeriveHeading {
    fn name(&self) -> &'static str {
        "DeriveHeading"
    }

    fn stage(&self) -> TransformStage {
        TransformStage::Derive
    }

    fn describe(&self) -> ParameterSchema {
        ParameterSchema::new(self.name(), self.stage())
            .param(ParamSpec::optional(WINDOW_LEN, "length of averaging window", json!(1)))
            .param(ParamSpec::optional("units", "deg or rad", json!("deg")))
            .param(ParamSpec::optional(
                "heading_type",
                "bearing or flat_angle",
                json!("bearing"),
            ))
            .param(swap_param())
            .role(spatial_role())
            .role(RoleSpec::output())
    }

    fn apply(&self, inputs: &TransformInputs, params: &FuncParams) -> Result<Column, TransformError> {
        let points = positions(inputs, params)?;
        let angle: fn([f64; 2], [f64; 2]) -> f64 =
            match params.choice("heading_type", &["bearing", "flat_angle"])?.as_str() {
                "bearing" => bearing,
                _ => flat_angle,
            };
        let degrees = params.choice("units", &["deg", "rad"])? == "deg";
        let headings = points
            .windows(2)
            .map(|w| {
                let theta = angle(w[0], w[1]);
                if degrees {
                    wrap_degrees(theta.to_degrees())
                } else {
                    wrap_radians(theta)
                }
            })
            .collect();
        Ok(Column::Float(smooth(headings, window::window_len(params)?)))
    }
}

/// Inclusive containment in an axis-aligned box given by its upper-left and
/// lower-right corners.
pub struct DeriveInBox;

impl Transform for DeriveInBox {
    fn name(&self) -> &'static str {
        "DeriveInBox"
    }

    fn stage(&self) -> TransformStage {
        TransformStage::Derive
    }

    fn describe(&self) -> ParameterSchema {
        ParameterSchema::new(self.name(), self.stage())
            .param(ParamSpec::required("upper_left_corner", "location of upper left corner"))
            .param(ParamSpec::required("lower_right_corner", "location of lower right corner"))
            .role(spatial_role())
            .role(RoleSpec::output())
    }

    fn apply(&self, inputs: &TransformInputs, params: &FuncParams) -> Result<Column, TransformError> {
        let upper_left = params.point("upper_left_corner")?;
        let lower_right = params.point("lower_right_corner")?;
        let points = inputs.points(SPATIAL)?;
        Ok(Column::Bool(
            points
                .iter()
                .map(|p| {
                    p[0] >= upper_left[0]
                        && p[0] <= lower_right[0]
                        && p[1] <= upper_left[1]
                        && p[1] >= lower_right[1]
                })
                .collect(),
        ))
    }
}
