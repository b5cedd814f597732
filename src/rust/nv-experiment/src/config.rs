// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sg384::{ModulationType, Sg384, TransportFactory};

use crate::error::{Error, Result};
use crate::hardware::HardwareConfig;
use crate::runtime::RuntimeManager;

/// Scalar constants of the setup.
///
/// Lengths and delays are in nanoseconds, frequencies in hertz, source
/// amplitudes in dBm and waveform amplitudes in volts. Keys missing from a
/// persisted file take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NvParameters {
    // Communication
    pub qop_ip: String,
    pub cluster_name: String,
    pub qop_port: Option<u16>,
    pub mw_port1: String,
    pub mw_port2: String,

    // Signal generators
    #[serde(rename = "SG1_LO_freq")]
    pub sg1_lo_freq: f64,
    #[serde(rename = "SG1_LO_amp")]
    pub sg1_lo_amp: f64,
    #[serde(rename = "SG2_LO_freq")]
    pub sg2_lo_freq: f64,
    #[serde(rename = "SG2_LO_amp")]
    pub sg2_lo_amp: f64,

    // Laser and readout pulses
    pub initialization_len_1: i64,
    pub meas_len_1: i64,
    pub long_meas_len_1: i64,
    pub initialization_len_2: i64,
    pub meas_len_2: i64,
    pub long_meas_len_2: i64,
    /// Decay time from the metastable state to the ground state.
    pub relaxation_time: i64,
    pub wait_for_initialization: i64,

    // NV microwave drive
    #[serde(rename = "IF_freq_NV")]
    pub if_freq_nv: f64,
    #[serde(rename = "mw_amp_NV")]
    pub mw_amp_nv: f64,
    #[serde(rename = "mw_len_NV")]
    pub mw_len_nv: i64,
    #[serde(rename = "x180_amp_NV")]
    pub x180_amp_nv: f64,
    #[serde(rename = "x180_len_NV")]
    pub x180_len_nv: i64,
    #[serde(rename = "x90_amp_NV")]
    pub x90_amp_nv: f64,
    #[serde(rename = "x90_len_NV")]
    pub x90_len_nv: i64,

    // Dark spin microwave drive
    #[serde(rename = "IF_freq_X")]
    pub if_freq_x: f64,
    #[serde(rename = "mw_amp_X")]
    pub mw_amp_x: f64,
    #[serde(rename = "mw_len_X")]
    pub mw_len_x: i64,
    #[serde(rename = "x180_amp_X")]
    pub x180_amp_x: f64,

    // RF drive
    pub rf_frequency: f64,
    pub rf_amp: f64,
    pub rf_length: i64,

    /// ADC units; divide by 4096 for volts.
    pub signal_threshold_1: i64,
    pub signal_threshold_2: i64,

    // Delays
    pub detection_delay_1: i64,
    pub detection_delay_2: i64,
    pub laser_delay_1: i64,
    pub laser_delay_2: i64,
    pub mw_delay: i64,
    pub rf_delay: i64,
    pub wait_between_runs: i64,

    // IQ mixer imbalance
    pub g: f64,
    pub phi: f64,

    pub filename: String,
}

impl Default for NvParameters {
    fn default() -> Self {
        let relaxation_time = 300;
        let x180_amp_nv = 0.238;
        let x180_len_nv = 500;
        NvParameters {
            qop_ip: "18.25.10.244".to_string(),
            cluster_name: "QM_NV2".to_string(),
            qop_port: None,
            mw_port1: "TCPIP0::18.25.11.6::5025::SOCKET".to_string(),
            mw_port2: "TCPIP0::18.25.11.5::5025::SOCKET".to_string(),

            sg1_lo_freq: 1.769e9,
            sg1_lo_amp: -24.0,
            sg2_lo_freq: 0.940e9,
            sg2_lo_amp: -23.0,

            initialization_len_1: 3_000,
            meas_len_1: 600,
            long_meas_len_1: 10_000,
            initialization_len_2: 3_000,
            meas_len_2: 500,
            long_meas_len_2: 5_000,
            relaxation_time,
            wait_for_initialization: 2 * relaxation_time,

            if_freq_nv: 80e6,
            mw_amp_nv: 0.25,
            mw_len_nv: 500,
            x180_amp_nv,
            x180_len_nv,
            x90_amp_nv: x180_amp_nv / 2.0,
            x90_len_nv: x180_len_nv,

            if_freq_x: 80e6,
            mw_amp_x: 0.25,
            mw_len_x: 500,
            x180_amp_x: 0.144,

            rf_frequency: 10e6,
            rf_amp: 0.1,
            rf_length: 1_000,

            signal_threshold_1: -800,
            signal_threshold_2: -2_000,

            detection_delay_1: 292,
            detection_delay_2: 80,
            laser_delay_1: 140,
            laser_delay_2: 0,
            mw_delay: 0,
            rf_delay: 0,
            wait_between_runs: 500,

            g: 0.03,
            phi: -0.05,

            filename: String::new(),
        }
    }
}

/// `config_YYYYMMDD.json` for the current local date.
pub fn default_filename() -> String {
    chrono::Local::now().format("config_%Y%m%d.json").to_string()
}

/// Which connections [`ConfigNv::connect`] opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    pub runtime: bool,
    pub sg1: bool,
    pub sg2: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            runtime: true,
            sg1: true,
            sg2: true,
        }
    }
}

impl ConnectOptions {
    pub fn none() -> Self {
        ConnectOptions {
            runtime: false,
            sg1: false,
            sg2: false,
        }
    }
}

/// Source of live connections for a configuration.
pub trait Connector {
    fn runtime_manager(&self, params: &NvParameters) -> anyhow::Result<Box<dyn RuntimeManager>>;

    fn transport_factory(&self) -> &dyn TransportFactory;

    /// Delay after every write to a signal generator.
    fn settle_delay(&self) -> Duration {
        sg384::DEFAULT_SETTLE_DELAY
    }
}

/// Experiment configuration: scalar constants, the hardware document
/// derived from them, and the live connections.
///
/// Every mutation goes through a method that rebuilds the hardware document,
/// so [`ConfigNv::hardware`] always matches [`ConfigNv::parameters`].
pub struct ConfigNv {
    params: NvParameters,
    hardware: HardwareConfig,
    runtime: Option<Box<dyn RuntimeManager>>,
    sg1: Option<Sg384>,
    sg2: Option<Sg384>,
}

impl fmt::Debug for ConfigNv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigNv")
            .field("params", &self.params)
            .field("runtime", &self.runtime.is_some())
            .field("sg1", &self.sg1)
            .field("sg2", &self.sg2)
            .finish()
    }
}

impl fmt::Display for ConfigNv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string_pretty(&self.params).map_err(|_| fmt::Error)?;
        write!(f, "NV experiment configuration\n{json}")
    }
}

impl ConfigNv {
    /// Default constants, named after today's date, connected as requested.
    pub fn new(options: ConnectOptions, connector: &dyn Connector) -> Result<Self> {
        let mut config = Self::from_parameters(NvParameters {
            filename: default_filename(),
            ..Default::default()
        });
        config.connect(options, connector)?;
        Ok(config)
    }

    /// Reconstructs a configuration without any connections.
    pub fn from_parameters(params: NvParameters) -> Self {
        let hardware = HardwareConfig::from_parameters(&params);
        ConfigNv {
            params,
            hardware,
            runtime: None,
            sg1: None,
            sg2: None,
        }
    }

    /// Loads persisted constants. Nothing is connected.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let mut config = Self::from_json(serde_json::from_str(&text)?)?;
        config.params.filename = path.display().to_string();
        Ok(config)
    }

    /// Like [`ConfigNv::from_file`], logging the error instead of returning it.
    pub fn load(path: impl AsRef<Path>) -> Option<Self> {
        match Self::from_file(path.as_ref()) {
            Ok(config) => Some(config),
            Err(e) => {
                nv_log::error!("Error loading file {}: {}", path.as_ref().display(), e);
                None
            }
        }
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        Ok(Self::from_parameters(serde_json::from_value(value)?))
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(&self.params)?)
    }

    /// Writes the constants to `path`, or to the current filename.
    pub fn try_save(&mut self, path: Option<&Path>) -> Result<()> {
        if let Some(path) = path {
            self.params.filename = path.display().to_string();
        }
        let text = serde_json::to_string_pretty(&self.params)?;
        fs::write(&self.params.filename, text)?;
        nv_log::info!("Saved configuration to {}", self.params.filename);
        Ok(())
    }

    /// Like [`ConfigNv::try_save`], logging the error instead of returning it.
    pub fn save(&mut self, path: Option<&Path>) {
        if let Err(e) = self.try_save(path) {
            nv_log::error!("Error saving file {}: {}", self.params.filename, e);
        }
    }

    /// Opens the runtime manager and the signal generators selected in
    /// `options`.
    ///
    /// A signal generator that cannot be reached is kept as a disconnected
    /// driver; the failure surfaces on first use. A runtime manager that
    /// cannot be opened is an error.
    pub fn connect(&mut self, options: ConnectOptions, connector: &dyn Connector) -> Result<()> {
        if options.runtime {
            let manager = connector
                .runtime_manager(&self.params)
                .map_err(Error::Runtime)?;
            self.runtime = Some(manager);
        }
        let factory = connector.transport_factory();
        if options.sg1 {
            self.sg1 = Some(Sg384::connect_with_delay(
                &self.params.mw_port1,
                factory,
                connector.settle_delay(),
            ));
        }
        if options.sg2 {
            self.sg2 = Some(Sg384::connect_with_delay(
                &self.params.mw_port2,
                factory,
                connector.settle_delay(),
            ));
        }
        Ok(())
    }

    pub fn parameters(&self) -> &NvParameters {
        &self.params
    }

    pub fn hardware(&self) -> &HardwareConfig {
        &self.hardware
    }

    pub fn filename(&self) -> &str {
        &self.params.filename
    }

    pub fn runtime_manager(&self) -> Option<&dyn RuntimeManager> {
        self.runtime.as_deref()
    }

    pub fn sg1(&self) -> Option<&Sg384> {
        self.sg1.as_ref()
    }

    pub fn sg2(&self) -> Option<&Sg384> {
        self.sg2.as_ref()
    }

    fn recompute(&mut self) {
        self.hardware = HardwareConfig::from_parameters(&self.params);
    }

    /// Applies `f` to the constants and rebuilds the hardware document.
    pub fn update(&mut self, f: impl FnOnce(&mut NvParameters)) {
        f(&mut self.params);
        self.recompute();
    }

    /// Sets one constant by its persisted name.
    pub fn set_value(&mut self, name: &str, value: serde_json::Value) -> Result<()> {
        let mut doc = serde_json::to_value(&self.params)?;
        let slot = doc
            .as_object_mut()
            .and_then(|fields| fields.get_mut(name))
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))?;
        *slot = value;
        self.params = serde_json::from_value(doc)?;
        self.recompute();
        Ok(())
    }

    /// One constant by its persisted name.
    pub fn get_value(&self, name: &str) -> Option<serde_json::Value> {
        serde_json::to_value(&self.params)
            .ok()?
            .as_object_mut()?
            .remove(name)
    }

    pub fn set_sg1_lo_frequency(&mut self, hz: f64) {
        self.update(|p| p.sg1_lo_freq = hz);
    }

    pub fn set_sg2_lo_frequency(&mut self, hz: f64) {
        self.update(|p| p.sg2_lo_freq = hz);
    }

    pub fn set_pi_pulse(&mut self, amplitude: f64, length_ns: i64) {
        self.update(|p| {
            p.x180_amp_nv = amplitude;
            p.x180_len_nv = length_ns;
        });
    }

    pub fn set_iq_imbalance(&mut self, g: f64, phi: f64) {
        self.update(|p| {
            p.g = g;
            p.phi = phi;
        });
    }

    /// Pushes the SG1 settings and switches its output on with IQ
    /// modulation.
    pub fn enable_sg1(&mut self) -> Result<()> {
        let sg = self.sg1.as_mut().ok_or(Error::NotConnected("SG1"))?;
        enable_source(sg, self.params.sg1_lo_amp, self.params.sg1_lo_freq)
    }

    pub fn enable_sg2(&mut self) -> Result<()> {
        let sg = self.sg2.as_mut().ok_or(Error::NotConnected("SG2"))?;
        enable_source(sg, self.params.sg2_lo_amp, self.params.sg2_lo_freq)
    }

    pub fn disable_sg1(&mut self) -> Result<()> {
        let sg = self.sg1.as_mut().ok_or(Error::NotConnected("SG1"))?;
        Ok(sg.rf_off()?)
    }

    pub fn disable_sg2(&mut self) -> Result<()> {
        let sg = self.sg2.as_mut().ok_or(Error::NotConnected("SG2"))?;
        Ok(sg.rf_off()?)
    }

    /// Enables every signal generator that was requested at connection.
    pub fn enable_sg(&mut self) -> Result<()> {
        if self.sg1.is_some() {
            self.enable_sg1()?;
        }
        if self.sg2.is_some() {
            self.enable_sg2()?;
        }
        Ok(())
    }

    /// Switches off every present signal generator, logging failures.
    pub fn disable_sg(&mut self) {
        for (name, sg) in [("SG1", &mut self.sg1), ("SG2", &mut self.sg2)] {
            let Some(sg) = sg else {
                continue;
            };
            if let Err(e) = sg.rf_off() {
                nv_log::error!("Failed to disable {}: {}", name, e);
            }
        }
    }

    /// Enables the sources for the lifetime of the returned guard.
    ///
    /// The sources are switched off when the guard is dropped, including
    /// when enabling itself fails halfway.
    pub fn enable_sources(&mut self) -> Result<SourceGuard<'_>> {
        let mut guard = SourceGuard { config: self };
        guard.config.enable_sg()?;
        Ok(guard)
    }

    /// Closes the signal generator connections.
    pub fn close(&mut self) {
        for sg in [&mut self.sg1, &mut self.sg2].into_iter().flatten() {
            sg.close();
        }
    }
}

fn enable_source(sg: &mut Sg384, amplitude_dbm: f64, frequency_hz: f64) -> Result<()> {
    sg.set_amplitude(nv_units::dbm(amplitude_dbm))?;
    sg.set_frequency(nv_units::hertz(frequency_hz))?;
    sg.rf_on()?;
    sg.enable_modulation()?;
    sg.set_modulation_type(ModulationType::Iq)?;
    Ok(())
}

/// Keeps the microwave sources on while alive.
pub struct SourceGuard<'a> {
    config: &'a mut ConfigNv,
}

impl Drop for SourceGuard<'_> {
    fn drop(&mut self) {
        self.config.disable_sg();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::dry_run::DryRunConnector;

    const SG1: &str = "TCPIP0::18.25.11.6::5025::SOCKET";
    const SG2: &str = "TCPIP0::18.25.11.5::5025::SOCKET";

    #[test]
    fn test_defaults() {
        let p = NvParameters::default();
        assert_eq!(p.wait_for_initialization, 600);
        assert_eq!(p.x90_amp_nv, 0.119);
        assert_eq!(p.x90_len_nv, 500);
        assert_eq!(p.sg1_lo_freq, 1.769e9);
        assert_eq!(p.mw_port1, SG1);
    }

    #[test]
    fn test_default_filename() {
        let name = default_filename();
        assert!(name.starts_with("config_"));
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), "config_20250101.json".len());
    }

    #[test]
    fn test_persisted_key_names() {
        let config = ConfigNv::from_parameters(NvParameters::default());
        let json = config.to_json().unwrap();
        assert_eq!(json["SG1_LO_freq"], 1.769e9);
        assert_eq!(json["IF_freq_NV"], 80e6);
        assert_eq!(json["x180_len_NV"], 500);
        assert!(json["qop_port"].is_null());
    }

    #[test]
    fn test_mutation_recomputes_document() {
        let mut config = ConfigNv::from_parameters(NvParameters::default());
        config.update(|p| p.x180_len_nv = 48);
        assert_eq!(config.hardware().operation("NV", "x180").unwrap().length, 48);
        assert_eq!(config.hardware().operation("NV", "-y180").unwrap().length, 48);

        config.set_sg1_lo_frequency(2.1e9);
        assert_eq!(
            config.hardware().elements["NV"].mix_inputs.as_ref().unwrap().lo_frequency,
            2.1e9
        );
        assert_eq!(config.hardware().mixers["mixer_NV"][0].lo_frequency, 2.1e9);

        config.set_value("meas_len_1", serde_json::json!(400)).unwrap();
        assert_eq!(config.parameters().meas_len_1, 400);
        assert_eq!(config.hardware().operation("SPCM1", "readout").unwrap().length, 400);

        config.set_iq_imbalance(0.0, 0.0);
        assert_eq!(
            config.hardware().mixers["mixer_NV"][0].correction,
            [1.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_set_value_rejects_bad_input() {
        let mut config = ConfigNv::from_parameters(NvParameters::default());
        assert!(matches!(
            config.set_value("no_such_thing", serde_json::json!(1)),
            Err(Error::UnknownParameter(_))
        ));
        assert!(matches!(
            config.set_value("meas_len_1", serde_json::json!("long")),
            Err(Error::Json(_))
        ));
        assert_eq!(config.parameters().meas_len_1, 600);
        assert_eq!(config.get_value("meas_len_1"), Some(serde_json::json!(600)));
        assert_eq!(config.get_value("no_such_thing"), None);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        let mut config = ConfigNv::from_parameters(NvParameters::default());
        config.update(|p| {
            p.x180_amp_nv = 0.1234567890123;
            p.g = 0.011;
            p.qop_port = Some(9510);
        });
        config.try_save(Some(&path)).unwrap();
        assert_eq!(config.filename(), path.display().to_string());

        let loaded = ConfigNv::from_file(&path).unwrap();
        assert_eq!(loaded.parameters(), config.parameters());
        assert_eq!(loaded.hardware(), config.hardware());
        assert!(loaded.runtime_manager().is_none());
        assert!(loaded.sg1().is_none());
    }

    #[test]
    fn test_load_missing_keys_take_defaults() {
        let config = ConfigNv::from_json(serde_json::json!({"meas_len_1": 300})).unwrap();
        assert_eq!(config.parameters().meas_len_1, 300);
        assert_eq!(config.parameters().meas_len_2, 500);
        assert_eq!(config.hardware().operation("SPCM1", "readout").unwrap().length, 300);
    }

    #[test]
    fn test_load_failure_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ConfigNv::load(dir.path().join("missing.json")).is_none());
        let mut config = ConfigNv::from_parameters(NvParameters::default());
        // Saving into a missing directory logs and returns.
        config.save(Some(&dir.path().join("missing").join("cfg.json")));
    }

    #[test]
    fn test_enable_and_disable_sources() {
        let connector = DryRunConnector::new();
        let log = connector.command_log();
        let mut config = ConfigNv::new(ConnectOptions::default(), &connector).unwrap();
        assert!(config.runtime_manager().is_some());
        log.clear();

        config.enable_sg1().unwrap();
        assert_eq!(
            log.lines_for(SG1),
            vec![
                "AMPR -24.0",
                "FREQ 1769000000.0",
                "ENBR 1",
                "MODL 1",
                "TYPE 6"
            ]
        );
        config.disable_sg1().unwrap();
        assert_eq!(log.lines_for(SG1).last().unwrap(), "ENBR 0");
        assert!(log.lines_for(SG2).is_empty());
    }

    #[test]
    fn test_source_guard_disables_on_drop() {
        let connector = DryRunConnector::new();
        let log = connector.command_log();
        let mut config = ConfigNv::new(ConnectOptions::default(), &connector).unwrap();
        log.clear();
        {
            let _guard = config.enable_sources().unwrap();
            assert_eq!(log.lines_for(SG2)[0], "AMPR -23.0");
            assert_eq!(log.lines_for(SG2)[1], "FREQ 940000000.0");
        }
        assert_eq!(log.lines_for(SG1).last().unwrap(), "ENBR 0");
        assert_eq!(log.lines_for(SG2).last().unwrap(), "ENBR 0");
    }

    #[test]
    fn test_only_requested_sources_are_used() {
        let connector = DryRunConnector::new();
        let log = connector.command_log();
        let options = ConnectOptions {
            sg2: false,
            ..Default::default()
        };
        let mut config = ConfigNv::new(options, &connector).unwrap();
        assert!(config.sg2().is_none());
        config.enable_sg().unwrap();
        assert!(log.lines_for(SG2).is_empty());
        assert!(matches!(config.enable_sg2(), Err(Error::NotConnected("SG2"))));
    }

    #[test]
    fn test_unreachable_source_fails_on_use() {
        let connector = DryRunConnector::unreachable_sources();
        let mut config = ConfigNv::new(ConnectOptions::default(), &connector).unwrap();
        assert!(!config.sg1().unwrap().is_connected());
        assert!(matches!(config.enable_sg1(), Err(Error::Instrument(_))));
        assert!(config.enable_sources().is_err());
    }
}
