// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Zero-phase Butterworth low-pass.
//!
//! The analog prototype is mapped with a prewarped bilinear transform and run
//! as a cascade of second-order sections (plus one first-order section for odd
//! orders) in transposed direct form II. The cascade runs forward then
//! backward so the output has no phase lag. Each pass starts from the steady
//! state of its first sample to avoid an edge transient.

use std::f64::consts::PI;

use serde_json::json;

use super::{filter_axes, TARGET};
use crate::batch::Column;
use crate::errors::TransformError;
use crate::traits::{Transform, TransformStage};
use crate::transforms::{FuncParams, ParamSpec, ParameterSchema, RoleSpec, TransformInputs};

pub const MAX_ORDER: usize = 8;

#[derive(Debug, Clone, Copy)]
enum Section {
    First { b0: f64, b1: f64, a1: f64 },
    Second { b0: f64, b1: f64, b2: f64, a1: f64, a2: f64 },
}

impl Section {
    fn run(&self, input: &[f64]) -> Vec<f64> {
        let Some(&x0) = input.first() else {
            return Vec::new();
        };
        match *self {
            Section::First { b0, b1, a1 } => {
                let mut z1 = (b1 - a1) * x0;
                input
                    .iter()
                    .map(|&x| {
                        let y = b0 * x + z1;
                        z1 = b1 * x - a1 * y;
                        y
                    })
                    .collect()
            }
            Section::Second { b0, b1, b2, a1, a2 } => {
                let mut z2 = (b2 - a2) * x0;
                let mut z1 = (b1 - a1) * x0 + z2;
                input
                    .iter()
                    .map(|&x| {
                        let y = b0 * x + z1;
                        z1 = b1 * x - a1 * y + z2;
                        z2 = b2 * x - a2 * y;
                        y
                    })
                    .collect()
            }
        }
    }
}

fn design(order: usize, cutoff: f64) -> Vec<Section> {
    let k = (PI * cutoff / 2.0).tan();
    let k2 = k * k;
    let mut sections: Vec<Section> = (0..order / 2)
        .map(|i| {
            let q = 1.0 / (2.0 * (PI * (2 * i + 1) as f64 / (2 * order) as f64).cos());
            let norm = 1.0 / (1.0 + k / q + k2);
            let b0 = k2 * norm;
            Section::Second {
                b0,
                b1: 2.0 * b0,
                b2: b0,
                a1: 2.0 * (k2 - 1.0) * norm,
                a2: (1.0 - k / q + k2) * norm,
            }
        })
        .collect();
    if order % 2 == 1 {
        let norm = 1.0 / (1.0 + k);
        sections.push(Section::First {
            b0: k * norm,
            b1: k * norm,
            a1: (k - 1.0) * norm,
        });
    }
    sections
}

fn cascade(sections: &[Section], input: Vec<f64>) -> Vec<f64> {
    sections.iter().fold(input, |signal, section| section.run(&signal))
}

/// Forward-backward Butterworth low-pass of `values`.
///
/// `cutoff` is the corner frequency as a fraction of Nyquist, in `(0, 1)`.
pub fn butter_lowpass(values: &[f64], order: usize, cutoff: f64) -> Vec<f64> {
    let sections = design(order, cutoff);
    let mut forward = cascade(&sections, values.to_vec());
    forward.reverse();
    let mut backward = cascade(&sections, forward);
    backward.reverse();
    backward
}

pub struct ButterLowpass;

impl Transform for ButterLowpass {
    fn name(&self) -> &'static str {
        "ButterLowpass"
    }

    fn stage(&self) -> TransformStage {
        TransformStage::Filter
    }

    fn describe(&self) -> ParameterSchema {
        ParameterSchema::new(self.name(), self.stage())
            .param(ParamSpec::optional("order", "filter order, 1 to 8", json!(2)))
            .param(ParamSpec::optional(
                "cutoff",
                "corner frequency as a fraction of Nyquist, between 0 and 1",
                json!(0.1),
            ))
            .role(RoleSpec::input(TARGET, "name of the target measure"))
            .role(RoleSpec::output())
    }

    fn apply(&self, inputs: &TransformInputs, params: &FuncParams) -> Result<Column, TransformError> {
        let order = params.usize("order")?;
        if !(1..=MAX_ORDER).contains(&order) {
            return Err(TransformError::invalid("order", "an integer between 1 and 8"));
        }
        let cutoff = params.f64("cutoff")?;
        if !(cutoff > 0.0 && cutoff < 1.0) {
            return Err(TransformError::invalid("cutoff", "a number between 0 and 1"));
        }
        filter_axes(inputs.column(TARGET)?, |values| {
            butter_lowpass(values, order, cutoff)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_constant_signal_passes_unchanged() {
        for order in 1..=MAX_ORDER {
            let out = butter_lowpass(&[5.0; 40], order, 0.2);
            assert_eq!(out.len(), 40);
            for v in out {
                assert!((v - 5.0).abs() < 1e-9, "order {}: {}", order, v);
            }
        }
    }

    #[test]
    fn test_high_frequency_is_attenuated() {
        let alternating: Vec<f64> = (0..400).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let out = butter_lowpass(&alternating, 4, 0.1);
        let peak = out[150..250].iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        assert!(peak < 1e-3, "residual amplitude {}", peak);
    }

    #[test]
    fn test_empty_input() {
        assert!(butter_lowpass(&[], 2, 0.1).is_empty());
    }

    #[test]
    fn test_parameter_bounds() {
        struct TestCase {
            order: serde_json::Value,
            cutoff: serde_json::Value,
            ok: bool,
        }

        let cases = vec![
            TestCase { order: json!(2), cutoff: json!(0.1), ok: true },
            TestCase { order: json!(0), cutoff: json!(0.1), ok: false },
            TestCase { order: json!(9), cutoff: json!(0.1), ok: false },
            TestCase { order: json!(2), cutoff: json!(1.0), ok: false },
            TestCase { order: json!(2), cutoff: json!(0), ok: false },
        ];

        let inputs = TransformInputs::new().with(TARGET, Column::Float(vec![1.0, 2.0, 3.0]));
        for case in cases {
            let given = BTreeMap::from([
                ("order".to_string(), case.order.clone()),
                ("cutoff".to_string(), case.cutoff.clone()),
            ]);
            let params = ButterLowpass.describe().resolve(&given).unwrap();
            assert_eq!(
                ButterLowpass.apply(&inputs, &params).is_ok(),
                case.ok,
                "order {} cutoff {}",
                case.order,
                case.cutoff
            );
        }
    }
}
