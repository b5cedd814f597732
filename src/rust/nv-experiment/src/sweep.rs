// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::error::SequenceError;

/// Relative tolerance of the Cauchy-Schwarz pre-check.
const COLLINEARITY_RTOL: f64 = 1e-9;

/// Largest deviation `|w_i - k * v_i|` accepted per element, relative to
/// `max |w|`. Only absorbs rounding from unit scaling.
const ELEMENT_RTOL: f64 = 1e-12;

/// The single swept axis of an experiment.
///
/// The first registered vector defines the loop values. Every later
/// registration must be a positive multiple of it; the multiple is returned
/// and folded into the command that registered the vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SweepAxis {
    values: Option<Vec<f64>>,
}

impl SweepAxis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> Option<&[f64]> {
        self.values.as_deref()
    }

    pub fn is_defined(&self) -> bool {
        self.values.is_some()
    }

    pub fn len(&self) -> usize {
        self.values.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers `values` as a sweep of the axis and returns `k` such that
    /// `values == k * first`.
    ///
    /// The first registration always returns `1.0`.
    pub fn register(&mut self, values: &[f64]) -> Result<f64, SequenceError> {
        if values.is_empty() {
            return Err(SequenceError::EmptySweep);
        }
        if values.iter().all(|v| *v == 0.0) {
            return Err(SequenceError::ZeroSweep);
        }
        let Some(first) = &self.values else {
            self.values = Some(values.to_vec());
            return Ok(1.0);
        };
        scale_factor(first, values).ok_or(SequenceError::InconsistentSweep)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Positive `k` with `other == k * base`, if there is one.
///
/// Collinearity follows from equality in Cauchy-Schwarz:
/// `(v.w)^2 == (v.v)(w.w)`. The factor is then read off the first index
/// where both vectors are non-zero and checked against every element.
fn scale_factor(base: &[f64], other: &[f64]) -> Option<f64> {
    if base.len() != other.len() {
        return None;
    }
    let vw = dot(base, other);
    let vv = dot(base, base);
    let ww = dot(other, other);
    if (vw * vw - vv * ww).abs() > COLLINEARITY_RTOL * vv * ww {
        return None;
    }
    let k = base
        .iter()
        .zip(other)
        .find(|(b, o)| **b != 0.0 && **o != 0.0)
        .map(|(b, o)| o / b)?;
    if k <= 0.0 {
        return None;
    }
    let magnitude = other.iter().fold(0.0_f64, |m, o| m.max(o.abs()));
    base.iter()
        .zip(other)
        .all(|(b, o)| (o - k * b).abs() <= ELEMENT_RTOL * magnitude)
        .then_some(k)
}
