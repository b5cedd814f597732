// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use anyhow::bail;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::runtime::StreamValue;

pub const COUNTS0: &str = "counts0";
pub const COUNTS_REF0: &str = "counts_ref0";
pub const COUNTS1: &str = "counts1";
pub const COUNTS_REF1: &str = "counts_ref1";
pub const ITERATION: &str = "iteration";

/// Averaged photon counts, one entry per sweep point.
///
/// `counts1` and `counts_ref1` are only present for dual-state runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResults {
    pub counts0: Option<Vec<f64>>,
    pub counts_ref0: Option<Vec<f64>>,
    pub counts1: Option<Vec<f64>>,
    pub counts_ref1: Option<Vec<f64>>,
    pub iteration: Option<f64>,
}

fn array(values: &IndexMap<String, StreamValue>, name: &str) -> anyhow::Result<Option<Vec<f64>>> {
    match values.get(name) {
        Some(StreamValue::Array(v)) => Ok(Some(v.clone())),
        Some(StreamValue::Scalar(_)) => bail!("Result '{}' is a scalar, expected an array", name),
        None => Ok(None),
    }
}

/// Element-wise `a - b`, `None` unless both have one entry per sweep point.
fn difference(a: &[f64], b: &[f64]) -> Option<Vec<f64>> {
    if a.len() != b.len() {
        nv_log::warn!("Count arrays differ in length ({} and {})", a.len(), b.len());
        return None;
    }
    Some(a.iter().zip(b).map(|(a, b)| a - b).collect())
}

impl ExperimentResults {
    /// Picks the count arrays and the iteration counter out of fetched
    /// streams. Missing streams stay `None`.
    pub fn from_values(values: &IndexMap<String, StreamValue>) -> anyhow::Result<Self> {
        let iteration = match values.get(ITERATION) {
            Some(StreamValue::Scalar(v)) => Some(*v),
            Some(StreamValue::Array(v)) => v.last().copied(),
            None => None,
        };
        Ok(ExperimentResults {
            counts0: array(values, COUNTS0)?,
            counts_ref0: array(values, COUNTS_REF0)?,
            counts1: array(values, COUNTS1)?,
            counts_ref1: array(values, COUNTS_REF1)?,
            iteration,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.counts0.is_none() && self.counts_ref0.is_none()
    }

    pub fn has_second_state(&self) -> bool {
        self.counts1.is_some() && self.counts_ref1.is_some()
    }

    /// `counts0 - counts_ref0`, minus `counts1 - counts_ref1` for dual-state
    /// runs.
    ///
    /// `None` when counts are missing or the arrays are of unequal length.
    pub fn contrast(&self) -> Option<Vec<f64>> {
        let first = difference(self.counts0.as_deref()?, self.counts_ref0.as_deref()?)?;
        match (self.counts1.as_deref(), self.counts_ref1.as_deref()) {
            (Some(c1), Some(r1)) => difference(&first, &difference(c1, r1)?),
            _ => Some(first),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values() {
        let values = IndexMap::from([
            (COUNTS0.to_string(), StreamValue::Array(vec![5.0, 6.0])),
            (COUNTS_REF0.to_string(), StreamValue::Array(vec![4.0, 4.0])),
            (ITERATION.to_string(), StreamValue::Scalar(99.0)),
        ]);
        let results = ExperimentResults::from_values(&values).unwrap();
        assert_eq!(results.counts0, Some(vec![5.0, 6.0]));
        assert_eq!(results.iteration, Some(99.0));
        assert!(!results.has_second_state());
        assert_eq!(results.contrast(), Some(vec![1.0, 2.0]));
    }

    #[test]
    fn test_scalar_count_is_rejected() {
        let values = IndexMap::from([(COUNTS0.to_string(), StreamValue::Scalar(1.0))]);
        assert!(ExperimentResults::from_values(&values).is_err());
    }

    #[test]
    fn test_dual_state_contrast() {
        let results = ExperimentResults {
            counts0: Some(vec![10.0, 12.0]),
            counts_ref0: Some(vec![8.0, 8.0]),
            counts1: Some(vec![7.0, 9.0]),
            counts_ref1: Some(vec![8.0, 8.0]),
            iteration: None,
        };
        assert_eq!(results.contrast(), Some(vec![3.0, 3.0]));
        assert!(ExperimentResults::default().contrast().is_none());
        assert!(ExperimentResults::default().is_empty());
    }

    #[test]
    fn test_unequal_lengths_have_no_contrast() {
        let mut results = ExperimentResults {
            counts0: Some(vec![10.0, 12.0, 11.0]),
            counts_ref0: Some(vec![8.0, 8.0]),
            ..Default::default()
        };
        assert!(results.contrast().is_none());

        results.counts_ref0 = Some(vec![8.0, 8.0, 8.0]);
        results.counts1 = Some(vec![7.0, 9.0, 9.0]);
        results.counts_ref1 = Some(vec![8.0]);
        assert!(results.contrast().is_none());

        results.counts_ref1 = Some(vec![8.0, 8.0, 8.0]);
        assert_eq!(results.contrast(), Some(vec![3.0, 3.0, 2.0]));
    }
}
