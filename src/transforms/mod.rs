// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Transform library: pure column functions addressable by name.

mod compare;
pub mod derive;
mod detect;
pub mod filters;
mod params;
mod registry;
pub mod window;

pub use compare::{ComparisonOperator, LogicalCombiner};
pub use detect::DetectThreshold;
pub use params::{FuncParams, ParamSpec, ParameterSchema, RoleSpec, TransformInputs};
pub use registry::TransformRegistry;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::traits::Transform;

/// Every built-in transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    ButterLowpass,
    WindowAverage,
    DeriveSlope,
    DeriveChange,
    DeriveCumsum,
    DeriveWindowSum,
    DeriveScaled,
    DeriveDistance,
    DeriveHeading,
    DeriveInBox,
    DeriveThreshold,
    DeriveLogicalCombination,
    DetectThreshold,
}

impl TransformKind {
    pub fn all() -> [TransformKind; 13] {
        [
            TransformKind::ButterLowpass,
            TransformKind::WindowAverage,
            TransformKind::DeriveSlope,
            TransformKind::DeriveChange,
            TransformKind::DeriveCumsum,
            TransformKind::DeriveWindowSum,
            TransformKind::DeriveScaled,
            TransformKind::DeriveDistance,
            TransformKind::DeriveHeading,
            TransformKind::DeriveInBox,
            TransformKind::DeriveThreshold,
            TransformKind::DeriveLogicalCombination,
            TransformKind::DetectThreshold,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::ButterLowpass => "ButterLowpass",
            TransformKind::WindowAverage => "WindowAverage",
            TransformKind::DeriveSlope => "DeriveSlope",
            TransformKind::DeriveChange => "DeriveChange",
            TransformKind::DeriveCumsum => "DeriveCumsum",
            TransformKind::DeriveWindowSum => "DeriveWindowSum",
            TransformKind::DeriveScaled => "DeriveScaled",
            TransformKind::DeriveDistance => "DeriveDistance",
            TransformKind::DeriveHeading => "DeriveHeading",
            TransformKind::DeriveInBox => "DeriveInBox",
            TransformKind::DeriveThreshold => "DeriveThreshold",
            TransformKind::DeriveLogicalCombination => "DeriveLogicalCombination",
            TransformKind::DetectThreshold => "DetectThreshold",
        }
    }

    /// Instantiate the transform implementing this kind.
    pub fn create(&self) -> Arc<dyn Transform> {
        match self {
            TransformKind::ButterLowpass => Arc::new(filters::ButterLowpass),
            TransformKind::WindowAverage => Arc::new(filters::WindowAverage),
            TransformKind::DeriveSlope => Arc::new(derive::DeriveSlope),
            TransformKind::DeriveChange => Arc::new(derive::DeriveChange),
            TransformKind::DeriveCumsum => Arc::new(derive::DeriveCumsum),
            TransformKind::DeriveWindowSum => Arc::new(derive::DeriveWindowSum),
            TransformKind::DeriveScaled => Arc::new(derive::DeriveScaled),
            TransformKind::DeriveDistance => Arc::new(derive::DeriveDistance),
            TransformKind::DeriveHeading => Arc::new(derive::DeriveHeading),
            TransformKind::DeriveInBox => Arc::new(derive::DeriveInBox),
            TransformKind::DeriveThreshold => Arc::new(derive::DeriveThreshold),
            TransformKind::DeriveLogicalCombination => Arc::new(derive::DeriveLogicalCombination),
            TransformKind::DetectThreshold => Arc::new(DetectThreshold),
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransformKind::all()
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown transform: '{}'", s))
    }
}
