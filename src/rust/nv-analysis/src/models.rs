// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Closed-form lineshapes.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

pub fn gaussian(x: f64, amplitude: f64, mean: f64, stddev: f64) -> f64 {
    amplitude * (-(x - mean).powi(2) / (2.0 * stddev.powi(2))).exp()
}

/// Peak of height `amplitude` at `mean` with half-width at half-maximum
/// `gamma`.
pub fn lorentzian(x: f64, amplitude: f64, mean: f64, gamma: f64) -> f64 {
    amplitude * gamma.powi(2) / ((x - mean).powi(2) + gamma.powi(2))
}

/// Rabi or Ramsey oscillation; `frequency` in cycles per unit of `x`.
pub fn exp_damped_cosine(x: f64, amplitude: f64, decay: f64, frequency: f64, phase: f64) -> f64 {
    amplitude * (-decay * x).exp() * (2.0 * PI * frequency * x + phase).cos()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    Gaussian,
    Lorentzian,
    ExpDampedCosine,
}

impl Model {
    pub const ALL: [Model; 3] = [Model::Gaussian, Model::Lorentzian, Model::ExpDampedCosine];

    /// Key under which fit results are cached.
    pub fn name(self) -> &'static str {
        match self {
            Model::Gaussian => "gaussian",
            Model::Lorentzian => "lorentzian",
            Model::ExpDampedCosine => "exp_damped_cosine",
        }
    }

    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            Model::Gaussian => &["amplitude", "mean", "stddev"],
            Model::Lorentzian => &["amplitude", "mean", "gamma"],
            Model::ExpDampedCosine => &["amplitude", "decay", "frequency", "phase"],
        }
    }

    pub fn param_count(self) -> usize {
        self.param_names().len()
    }

    /// Evaluates the model at `x`. A parameter slice of the wrong length
    /// yields NaN.
    pub fn eval(self, x: f64, params: &[f64]) -> f64 {
        match (self, params) {
            (Model::Gaussian, &[amplitude, mean, stddev]) => gaussian(x, amplitude, mean, stddev),
            (Model::Lorentzian, &[amplitude, mean, gamma]) => lorentzian(x, amplitude, mean, gamma),
            (Model::ExpDampedCosine, &[amplitude, decay, frequency, phase]) => {
                exp_damped_cosine(x, amplitude, decay, frequency, phase)
            }
            _ => f64::NAN,
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Model {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.to_ascii_lowercase().replace('-', "_");
        Model::ALL
            .into_iter()
            .find(|m| m.name() == key)
            .ok_or_else(|| {
                format!(
                    "Unknown model '{s}', expected one of: {}",
                    Model::ALL.map(Model::name).join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_values() {
        assert_eq!(gaussian(2.0, 3.0, 2.0, 0.5), 3.0);
        assert!((lorentzian(80.0, 1.5, 80.0, 0.4) - 1.5).abs() < 1e-12);
        assert!((lorentzian(80.4, 1.0, 80.0, 0.4) - 0.5).abs() < 1e-12);
        assert!((gaussian(1.0, 1.0, 0.0, 1.0) - (-0.5_f64).exp()).abs() < 1e-12);
        assert_eq!(exp_damped_cosine(0.0, 2.0, 0.1, 5.0, 0.0), 2.0);
        // Half a period later the cosine has flipped sign.
        let x: f64 = 0.1;
        let expected = -2.0 * (-0.1 * x).exp();
        assert!((exp_damped_cosine(x, 2.0, 0.1, 5.0, 0.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_zero_width_is_not_finite() {
        assert!(gaussian(1.0, 1.0, 1.0, 0.0).is_nan());
        assert!(lorentzian(1.0, 1.0, 1.0, 0.0).is_nan());
    }

    #[test]
    fn test_model_dispatch() {
        assert_eq!(Model::Lorentzian.eval(80.0, &[2.0, 80.0, 0.5]), 2.0);
        assert!(Model::Lorentzian.eval(80.0, &[2.0, 80.0]).is_nan());
        assert_eq!(Model::ExpDampedCosine.param_count(), 4);
        assert_eq!("Exp-Damped-Cosine".parse::<Model>(), Ok(Model::ExpDampedCosine));
        assert_eq!(Model::Gaussian.to_string(), "gaussian");
        let err = "voigt".parse::<Model>().unwrap_err();
        assert!(err.contains("gaussian, lorentzian, exp_damped_cosine"));
    }
}
