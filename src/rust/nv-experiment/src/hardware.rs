// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! The hardware document consumed by the real-time runtime.
//!
//! [`HardwareConfig::from_parameters`] is the only constructor: the document
//! is a pure function of the scalar constants in [`NvParameters`] and is
//! never edited in place.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::NvParameters;

pub const CONTROLLER: &str = "con1";

/// Mixer correction matrix for gain imbalance `g` and phase imbalance `phi`
/// (radians) between the I and Q ports.
pub fn iq_imbalance(g: f64, phi: f64) -> [f64; 4] {
    let c = phi.cos();
    let s = phi.sin();
    let n = 1.0 / ((1.0 - g * g) * (2.0 * c * c - 1.0));
    [
        n * (1.0 - g) * c,
        n * (1.0 + g) * s,
        n * (1.0 - g) * s,
        n * (1.0 + g) * c,
    ]
}

/// A controller port, serialized as `["con1", 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port(pub String, pub u8);

impl Port {
    fn on_controller(port: u8) -> Self {
        Port(CONTROLLER.to_string(), port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalogOutput {
    pub offset: f64,
    pub delay: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DigitalOutput {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalogInput {
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Controller {
    #[serde(rename = "type")]
    pub kind: String,
    pub analog_outputs: IndexMap<u8, AnalogOutput>,
    pub digital_outputs: IndexMap<u8, DigitalOutput>,
    pub analog_inputs: IndexMap<u8, AnalogInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixInputs {
    #[serde(rename = "I")]
    pub i: Port,
    #[serde(rename = "Q")]
    pub q: Port,
    pub lo_frequency: f64,
    pub mixer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleInput {
    pub port: Port,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitalInput {
    pub port: Port,
    pub delay: i64,
    pub buffer: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputPulseParameters {
    pub signal_threshold: i64,
    pub signal_polarity: String,
    pub derivative_threshold: i64,
    pub derivative_polarity: String,
}

impl OutputPulseParameters {
    fn spcm(signal_threshold: i64) -> Self {
        OutputPulseParameters {
            signal_threshold,
            signal_polarity: "Below".to_string(),
            derivative_threshold: -2_000,
            derivative_polarity: "Above".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mix_inputs: Option<MixInputs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_input: Option<SingleInput>,
    #[serde(
        rename = "intermediate_frequency",
        skip_serializing_if = "Option::is_none"
    )]
    pub intermediate_frequency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digital_inputs: Option<IndexMap<String, DigitalInput>>,
    pub operations: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<IndexMap<String, Port>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_pulse_parameters: Option<OutputPulseParameters>,
    #[serde(rename = "time_of_flight", skip_serializing_if = "Option::is_none")]
    pub time_of_flight: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smearing: Option<i64>,
}

impl Element {
    fn operation_map<const N: usize>(ops: [(&str, &str); N]) -> IndexMap<String, String> {
        ops.into_iter()
            .map(|(op, pulse)| (op.to_string(), pulse.to_string()))
            .collect()
    }

    fn marker(port: u8, delay: i64) -> IndexMap<String, DigitalInput> {
        IndexMap::from([(
            "marker".to_string(),
            DigitalInput {
                port: Port::on_controller(port),
                delay,
                buffer: 0,
            },
        )])
    }

    fn laser(port: u8, delay: i64, pulse: &str) -> Self {
        Element {
            digital_inputs: Some(Self::marker(port, delay)),
            operations: Self::operation_map([("laser_ON", pulse)]),
            ..Default::default()
        }
    }

    fn spcm(
        marker_port: u8,
        input: u8,
        detection_delay: i64,
        signal_threshold: i64,
        pulses: [&str; 2],
    ) -> Self {
        Element {
            single_input: Some(SingleInput {
                port: Port::on_controller(1),
            }),
            digital_inputs: Some(Self::marker(marker_port, detection_delay)),
            operations: Self::operation_map([("readout", pulses[0]), ("long_readout", pulses[1])]),
            outputs: Some(IndexMap::from([(
                "out1".to_string(),
                Port::on_controller(input),
            )])),
            output_pulse_parameters: Some(OutputPulseParameters::spcm(signal_threshold)),
            time_of_flight: Some(detection_delay),
            smearing: Some(0),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseOperation {
    Control,
    Measurement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    pub operation: PulseOperation,
    /// Length in nanoseconds.
    pub length: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waveforms: Option<IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digital_marker: Option<String>,
}

impl Pulse {
    fn iq(length: i64, i: &str, q: &str) -> Self {
        Pulse {
            operation: PulseOperation::Control,
            length,
            waveforms: Some(IndexMap::from([
                ("I".to_string(), i.to_string()),
                ("Q".to_string(), q.to_string()),
            ])),
            digital_marker: None,
        }
    }

    fn single(length: i64, waveform: &str) -> Self {
        Pulse {
            operation: PulseOperation::Control,
            length,
            waveforms: Some(IndexMap::from([(
                "single".to_string(),
                waveform.to_string(),
            )])),
            digital_marker: None,
        }
    }

    fn marker(length: i64) -> Self {
        Pulse {
            operation: PulseOperation::Control,
            length,
            waveforms: None,
            digital_marker: Some("ON".to_string()),
        }
    }

    fn readout(length: i64) -> Self {
        Pulse {
            operation: PulseOperation::Measurement,
            length,
            waveforms: Some(IndexMap::from([(
                "single".to_string(),
                "zero_wf".to_string(),
            )])),
            digital_marker: Some("ON".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Waveform {
    Constant { sample: f64 },
}

impl Waveform {
    pub fn sample(&self) -> f64 {
        match self {
            Waveform::Constant { sample } => *sample,
        }
    }
}

/// Digital samples as `(level, duration_ns)` pairs; a zero duration holds
/// the level to the end of the pulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitalWaveform {
    pub samples: Vec<(u8, i64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerCorrection {
    pub intermediate_frequency: f64,
    pub lo_frequency: f64,
    pub correction: [f64; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareConfig {
    pub version: u32,
    pub controllers: IndexMap<String, Controller>,
    pub elements: IndexMap<String, Element>,
    pub pulses: IndexMap<String, Pulse>,
    pub waveforms: IndexMap<String, Waveform>,
    pub digital_waveforms: IndexMap<String, DigitalWaveform>,
    pub mixers: IndexMap<String, Vec<MixerCorrection>>,
}

impl HardwareConfig {
    pub fn from_parameters(p: &NvParameters) -> Self {
        let analog_out = |offset: f64| AnalogOutput {
            offset,
            delay: p.mw_delay,
        };
        let controller = Controller {
            kind: "opx1".to_string(),
            analog_outputs: IndexMap::from([
                (1, analog_out(-0.02)),
                (2, analog_out(-0.02)),
                (3, analog_out(-0.005)),
                (4, analog_out(-0.023)),
            ]),
            digital_outputs: (1..=4).map(|port| (port, DigitalOutput {})).collect(),
            analog_inputs: IndexMap::from([
                (1, AnalogInput { offset: 0.004 }),
                (2, AnalogInput { offset: 0.0 }),
            ]),
        };

        let nv = Element {
            mix_inputs: Some(MixInputs {
                i: Port::on_controller(1),
                q: Port::on_controller(2),
                lo_frequency: p.sg1_lo_freq,
                mixer: "mixer_NV".to_string(),
            }),
            intermediate_frequency: Some(p.if_freq_nv),
            operations: Element::operation_map([
                ("cw", "const_pulse"),
                ("x180", "x180_pulse"),
                ("x90", "x90_pulse"),
                ("-x90", "-x90_pulse"),
                ("-y90", "-y90_pulse"),
                ("y90", "y90_pulse"),
                ("y180", "y180_pulse"),
                ("-x180", "-x180_pulse"),
                ("-y180", "-y180_pulse"),
            ]),
            ..Default::default()
        };
        let rf = Element {
            single_input: Some(SingleInput {
                port: Port::on_controller(3),
            }),
            intermediate_frequency: Some(p.rf_frequency),
            operations: Element::operation_map([("const", "const_pulse_single")]),
            ..Default::default()
        };

        let elements = IndexMap::from([
            ("NV".to_string(), nv),
            ("RF".to_string(), rf),
            (
                "AOM1".to_string(),
                Element::laser(1, p.laser_delay_1, "laser_ON_1"),
            ),
            (
                "AOM2".to_string(),
                Element::laser(2, p.laser_delay_2, "laser_ON_2"),
            ),
            (
                "SPCM1".to_string(),
                Element::spcm(
                    3,
                    1,
                    p.detection_delay_1,
                    p.signal_threshold_1,
                    ["readout_pulse_1", "long_readout_pulse_1"],
                ),
            ),
            (
                "SPCM2".to_string(),
                Element::spcm(
                    4,
                    2,
                    p.detection_delay_2,
                    p.signal_threshold_2,
                    ["readout_pulse_2", "long_readout_pulse_2"],
                ),
            ),
        ]);

        let pulses = IndexMap::from([
            (
                "const_pulse".to_string(),
                Pulse::iq(p.mw_len_nv, "cw_wf", "zero_wf"),
            ),
            (
                "x180_pulse".to_string(),
                Pulse::iq(p.x180_len_nv, "x180_wf", "zero_wf"),
            ),
            (
                "x90_pulse".to_string(),
                Pulse::iq(p.x90_len_nv, "x90_wf", "zero_wf"),
            ),
            (
                "-x90_pulse".to_string(),
                Pulse::iq(p.x90_len_nv, "minus_x90_wf", "zero_wf"),
            ),
            (
                "-y90_pulse".to_string(),
                Pulse::iq(p.x90_len_nv, "zero_wf", "minus_x90_wf"),
            ),
            (
                "y90_pulse".to_string(),
                Pulse::iq(p.x90_len_nv, "zero_wf", "x90_wf"),
            ),
            (
                "y180_pulse".to_string(),
                Pulse::iq(p.x180_len_nv, "zero_wf", "x180_wf"),
            ),
            (
                "-x180_pulse".to_string(),
                Pulse::iq(p.x180_len_nv, "minus_x180_wf", "zero_wf"),
            ),
            (
                "-y180_pulse".to_string(),
                Pulse::iq(p.x180_len_nv, "zero_wf", "minus_x180_wf"),
            ),
            (
                "const_pulse_single".to_string(),
                Pulse::single(p.rf_length, "rf_const_wf"),
            ),
            (
                "laser_ON_1".to_string(),
                Pulse::marker(p.initialization_len_1),
            ),
            (
                "laser_ON_2".to_string(),
                Pulse::marker(p.initialization_len_2),
            ),
            ("readout_pulse_1".to_string(), Pulse::readout(p.meas_len_1)),
            (
                "long_readout_pulse_1".to_string(),
                Pulse::readout(p.long_meas_len_1),
            ),
            ("readout_pulse_2".to_string(), Pulse::readout(p.meas_len_2)),
            (
                "long_readout_pulse_2".to_string(),
                Pulse::readout(p.long_meas_len_2),
            ),
        ]);

        let constant = |sample: f64| Waveform::Constant { sample };
        let waveforms = IndexMap::from([
            ("cw_wf".to_string(), constant(p.mw_amp_nv)),
            ("rf_const_wf".to_string(), constant(p.rf_amp)),
            ("x180_wf".to_string(), constant(p.x180_amp_nv)),
            ("x90_wf".to_string(), constant(p.x90_amp_nv)),
            ("minus_x90_wf".to_string(), constant(-p.x90_amp_nv)),
            ("minus_x180_wf".to_string(), constant(-p.x180_amp_nv)),
            ("zero_wf".to_string(), constant(0.0)),
        ]);

        let digital_waveforms = IndexMap::from([
            (
                "ON".to_string(),
                DigitalWaveform {
                    samples: vec![(1, 0)],
                },
            ),
            (
                "OFF".to_string(),
                DigitalWaveform {
                    samples: vec![(0, 0)],
                },
            ),
        ]);

        let mixers = IndexMap::from([(
            "mixer_NV".to_string(),
            vec![MixerCorrection {
                intermediate_frequency: p.if_freq_nv,
                lo_frequency: p.sg1_lo_freq,
                correction: iq_imbalance(p.g, p.phi),
            }],
        )]);

        HardwareConfig {
            version: 1,
            controllers: IndexMap::from([(CONTROLLER.to_string(), controller)]),
            elements,
            pulses,
            waveforms,
            digital_waveforms,
            mixers,
        }
    }

    /// The pulse bound to `operation` on `element`.
    pub fn operation(&self, element: &str, operation: &str) -> Option<&Pulse> {
        let pulse = self.elements.get(element)?.operations.get(operation)?;
        self.pulses.get(pulse)
    }

    pub fn has_operation(&self, element: &str, operation: &str) -> bool {
        self.operation(element, operation).is_some()
    }
}
