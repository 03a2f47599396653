// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centered moving windows with partial windows at both ends.
//!
//! The window for sample `i` covers `[i - (w-1)/2, i - (w-1)/2 + w)` clipped
//! to the input, so even-length windows lean forward by one sample. Output
//! length always equals input length, including when `w > n`.

use crate::errors::TransformError;
use crate::transforms::FuncParams;

pub const WINDOW_LEN: &str = "window_len";

fn bounds(i: usize, n: usize, window_len: usize) -> (usize, usize) {
    let back = (window_len - 1) / 2;
    let lo = i.saturating_sub(back);
    let hi = i.saturating_add(window_len - back).min(n);
    (lo, hi)
}

/// Sums each window directly so a NaN or inf only reaches the windows that
/// cover it.
pub fn window_sum(values: &[f64], window_len: usize) -> Vec<f64> {
    let n = values.len();
    let window_len = window_len.max(1);
    (0..n)
        .map(|i| {
            let (lo, hi) = bounds(i, n, window_len);
            values[lo..hi].iter().sum()
        })
        .collect()
}

pub fn window_average(values: &[f64], window_len: usize) -> Vec<f64> {
    let n = values.len();
    let window_len = window_len.max(1);
    (0..n)
        .map(|i| {
            let (lo, hi) = bounds(i, n, window_len);
            values[lo..hi].iter().sum::<f64>() / (hi - lo) as f64
        })
        .collect()
}

/// Reads `window_len` and rejects zero.
pub(crate) fn window_len(params: &FuncParams) -> Result<usize, TransformError> {
    match params.usize(WINDOW_LEN)? {
        0 => Err(TransformError::invalid(WINDOW_LEN, "an integer >= 1")),
        w => Ok(w),
    }
}

/// Averages `values` over `window_len` when it is larger than one.
pub(crate) fn smooth(values: Vec<f64>, window_len: usize) -> Vec<f64> {
    if window_len > 1 {
        window_average(&values, window_len)
    } else {
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_sum_odd_window() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(window_sum(&values, 3), vec![3.0, 6.0, 9.0, 12.0, 9.0]);
    }

    #[test]
    fn test_window_sum_even_window_leans_forward() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(window_sum(&values, 2), vec![3.0, 5.0, 7.0, 4.0]);
    }

    #[test]
    fn test_window_longer_than_input_keeps_length() {
        struct TestCase {
            window_len: usize,
            expected: Vec<f64>,
        }

        let values = [1.0, 2.0, 3.0];
        let cases = vec![
            TestCase { window_len: 1, expected: vec![1.0, 2.0, 3.0] },
            TestCase { window_len: 3, expected: vec![3.0, 6.0, 5.0] },
            TestCase { window_len: 5, expected: vec![6.0, 6.0, 6.0] },
            TestCase { window_len: 50, expected: vec![6.0, 6.0, 6.0] },
        ];

        for case in cases {
            let summed = window_sum(&values, case.window_len);
            assert_eq!(summed.len(), values.len());
            assert_eq!(summed, case.expected, "window_len {}", case.window_len);
        }
    }

    #[test]
    fn test_non_finite_samples_stay_local() {
        struct TestCase {
            name: &'static str,
            values: Vec<f64>,
            window_len: usize,
            average: bool,
            expected: Vec<f64>,
        }

        let cases = vec![
            TestCase {
                name: "nan in sum",
                values: vec![1.0, f64::NAN, 1.0, 1.0, 1.0, 1.0],
                window_len: 3,
                average: false,
                expected: vec![f64::NAN, f64::NAN, f64::NAN, 3.0, 3.0, 2.0],
            },
            TestCase {
                name: "nan in average",
                values: vec![1.0, f64::NAN, 1.0, 1.0, 1.0, 1.0],
                window_len: 3,
                average: true,
                expected: vec![f64::NAN, f64::NAN, f64::NAN, 1.0, 1.0, 1.0],
            },
            TestCase {
                name: "inf in sum",
                values: vec![2.0, 2.0, 2.0, f64::INFINITY, 2.0],
                window_len: 2,
                average: false,
                expected: vec![4.0, 4.0, f64::INFINITY, f64::INFINITY, 2.0],
            },
            TestCase {
                name: "large then small",
                values: vec![1e17, 1.0, 1.0, 1.0],
                window_len: 1,
                average: false,
                expected: vec![1e17, 1.0, 1.0, 1.0],
            },
            TestCase {
                name: "small after large window",
                values: vec![1e17, 1e17, 0.5, 0.5, 0.5],
                window_len: 3,
                average: false,
                expected: vec![2e17, 2e17, 1e17, 1.5, 1.0],
            },
        ];

        for case in cases {
            let out = if case.average {
                window_average(&case.values, case.window_len)
            } else {
                window_sum(&case.values, case.window_len)
            };
            assert_eq!(out.len(), case.expected.len(), "{}", case.name);
            for (i, (got, want)) in out.iter().zip(&case.expected).enumerate() {
                if want.is_nan() {
                    assert!(got.is_nan(), "{} [{}]: {}", case.name, i, got);
                } else {
                    assert_eq!(got, want, "{} [{}]", case.name, i);
                }
            }
        }
    }

    #[test]
    fn test_huge_window_does_not_overflow() {
        assert_eq!(window_sum(&[1.0, 2.0], usize::MAX), vec![3.0, 3.0]);
        assert_eq!(window_average(&[1.0, 2.0], usize::MAX), vec![1.5, 1.5]);
    }

    #[test]
    fn test_window_average_divides_by_covered_samples() {
        let values = [2.0, 4.0, 6.0];
        assert_eq!(window_average(&values, 3), vec![3.0, 4.0, 5.0]);
        assert!(window_average(&[], 3).is_empty());
    }
}
