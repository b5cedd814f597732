// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SequenceError;

/// A numeric builder argument: a single value or the values of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sweepable {
    Value(f64),
    Sweep(Vec<f64>),
}

impl Sweepable {
    pub fn is_sweep(&self) -> bool {
        matches!(self, Sweepable::Sweep(_))
    }
}

impl From<f64> for Sweepable {
    fn from(value: f64) -> Self {
        Sweepable::Value(value)
    }
}

impl From<i64> for Sweepable {
    fn from(value: i64) -> Self {
        Sweepable::Value(value as f64)
    }
}

impl From<Vec<f64>> for Sweepable {
    fn from(values: Vec<f64>) -> Self {
        Sweepable::Sweep(values)
    }
}

impl From<&[f64]> for Sweepable {
    fn from(values: &[f64]) -> Self {
        Sweepable::Sweep(values.to_vec())
    }
}

impl From<Vec<i64>> for Sweepable {
    fn from(values: Vec<i64>) -> Self {
        Sweepable::Sweep(values.into_iter().map(|v| v as f64).collect())
    }
}

/// A command field that is either fixed or driven by the loop variable.
///
/// A swept field evaluates to `scale * var` inside the scanning loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOrSweep<T> {
    Value(T),
    Swept { scale: f64 },
}

impl<T> ValueOrSweep<T> {
    pub fn is_swept(&self) -> bool {
        matches!(self, ValueOrSweep::Swept { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

/// One of the predefined rotations `[-](x|y)(90|180)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PulseName {
    pub axis: Axis,
    pub angle: u16,
    pub negative: bool,
}

impl PulseName {
    pub const X180: PulseName = PulseName {
        axis: Axis::X,
        angle: 180,
        negative: false,
    };

    /// The same rotation with opposite sign.
    pub fn inverted(self) -> Self {
        PulseName {
            negative: !self.negative,
            ..self
        }
    }
}

impl FromStr for PulseName {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || SequenceError::UnknownPulse(s.to_string());
        let (negative, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let axis = match rest.chars().next() {
            Some('x') => Axis::X,
            Some('y') => Axis::Y,
            _ => return Err(unknown()),
        };
        let angle = match &rest[1..] {
            "90" => 90,
            "180" => 180,
            _ => return Err(unknown()),
        };
        Ok(PulseName {
            axis,
            angle,
            negative,
        })
    }
}

impl TryFrom<String> for PulseName {
    type Error = SequenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PulseName> for String {
    fn from(value: PulseName) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PulseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.negative { "-" } else { "" };
        let axis = match self.axis {
            Axis::X => "x",
            Axis::Y => "y",
        };
        write!(f, "{sign}{axis}{}", self.angle)
    }
}

/// A single step of the experiment sequence.
///
/// Durations are in clock cycles. Measurement lengths stay in nanoseconds,
/// as the time tagger expects them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Pulse {
        element: String,
        name: PulseName,
        amplitude: ValueOrSweep<f64>,
        length: ValueOrSweep<i64>,
        /// Invert the pulse in the second pass of a dual-state measurement.
        cycle: bool,
    },
    Cw {
        element: String,
        amplitude: ValueOrSweep<f64>,
        length: ValueOrSweep<i64>,
    },
    Wait {
        length: ValueOrSweep<i64>,
    },
    Laser {
        mode: String,
        channel: String,
        length: i64,
    },
    Measure {
        mode: String,
        channel: String,
        meas_len: i64,
    },
    UpdateFrequency {
        element: String,
        scale: f64,
    },
    Align,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_names() {
        for name in ["x90", "x180", "y90", "y180", "-x90", "-x180", "-y90", "-y180"] {
            let parsed: PulseName = name.parse().unwrap();
            assert_eq!(parsed.to_string(), name);
        }
        for name in ["z90", "x45", "--x90", "", "-", "x"] {
            assert_eq!(
                name.parse::<PulseName>(),
                Err(SequenceError::UnknownPulse(name.to_string()))
            );
        }
    }

    #[test]
    fn test_inversion_toggles_sign() {
        let pulse: PulseName = "y90".parse().unwrap();
        assert_eq!(pulse.inverted().to_string(), "-y90");
        assert_eq!(pulse.inverted().inverted(), pulse);
    }

    #[test]
    fn test_command_serialization() {
        let command = Command::Pulse {
            element: "NV".to_string(),
            name: PulseName::X180,
            amplitude: ValueOrSweep::Swept { scale: 1.0 },
            length: ValueOrSweep::Value(125),
            cycle: true,
        };
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["type"], "pulse");
        assert_eq!(json["name"], "x180");
        assert_eq!(json["amplitude"]["swept"]["scale"], 1.0);
        assert_eq!(json["length"]["value"], 125);
        let back: Command = serde_json::from_value(json).unwrap();
        assert_eq!(back, command);
    }
}
