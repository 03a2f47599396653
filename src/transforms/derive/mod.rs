// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod arithmetic;
mod logic;
mod spatial;

pub use arithmetic::{
    wrap_degrees, DeriveChange, DeriveCumsum, DeriveScaled, DeriveSlope, DeriveWindowSum,
};
pub(crate) use logic::{apply_threshold, threshold_schema};
pub use logic::{compare_threshold, DeriveLogicalCombination, DeriveThreshold};
pub use spatial::{
    bearing, euclidean, flat_angle, great_circle, DeriveDistance, DeriveHeading, DeriveInBox,
    EARTH_RADIUS_KM, EARTH_RADIUS_MI,
};
