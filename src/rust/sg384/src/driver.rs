// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use nv_units::{Dbm, Frequency, Hertz, Power};

use crate::{Error, ResourceAddress, Result, Transport, TransportFactory};

/// Time granted to the instrument after each write.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Modulation types accepted by `TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModulationType {
    Am,
    Fm,
    PhaseM,
    Sweep,
    Pulse,
    Blank,
    Iq,
}

impl ModulationType {
    pub const ALL: [ModulationType; 7] = [
        ModulationType::Am,
        ModulationType::Fm,
        ModulationType::PhaseM,
        ModulationType::Sweep,
        ModulationType::Pulse,
        ModulationType::Blank,
        ModulationType::Iq,
    ];

    /// Code sent with `TYPE`.
    pub fn code(self) -> u8 {
        match self {
            ModulationType::Am => 0,
            ModulationType::Fm => 1,
            ModulationType::PhaseM => 2,
            ModulationType::Sweep => 3,
            ModulationType::Pulse => 4,
            ModulationType::Blank => 5,
            ModulationType::Iq => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ModulationType::Am => "AM",
            ModulationType::Fm => "FM",
            ModulationType::PhaseM => "PHASEM",
            ModulationType::Sweep => "SWEEP",
            ModulationType::Pulse => "PULSE",
            ModulationType::Blank => "BLANK",
            ModulationType::Iq => "IQ",
        }
    }
}

impl FromStr for ModulationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ModulationType::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| Error::UnknownModulation(s.to_string()))
    }
}

impl fmt::Display for ModulationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// SRS SG384 signal generator.
///
/// A failed connection does not fail construction. The driver is left
/// without a transport and every later call returns [`Error::NotConnected`].
pub struct Sg384 {
    address: String,
    transport: Option<Box<dyn Transport>>,
    settle_delay: Duration,
}

impl fmt::Debug for Sg384 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sg384")
            .field("address", &self.address)
            .field("connected", &self.is_connected())
            .field("settle_delay", &self.settle_delay)
            .finish()
    }
}

impl Sg384 {
    /// Connects to the instrument at `address` and checks that it answers
    /// `*IDN?`.
    pub fn connect(address: &str, factory: &dyn TransportFactory) -> Self {
        Self::connect_with_delay(address, factory, DEFAULT_SETTLE_DELAY)
    }

    pub fn connect_with_delay(
        address: &str,
        factory: &dyn TransportFactory,
        settle_delay: Duration,
    ) -> Self {
        let mut sg = Sg384 {
            address: address.to_string(),
            transport: None,
            settle_delay,
        };
        let opened = address
            .parse::<ResourceAddress>()
            .and_then(|resource| factory.open(&resource));
        match opened {
            Ok(transport) => {
                sg.transport = Some(transport);
                sg.settle();
                match sg.identify() {
                    Ok(idn) if !idn.is_empty() => {
                        nv_log::info!("Connected to SG384 at {} ({})", address, idn);
                    }
                    Ok(_) => {
                        nv_log::warn!("SG384 at {} connected but not responding", address);
                    }
                    Err(e) => {
                        nv_log::warn!("SG384 at {} connected but not responding: {}", address, e);
                    }
                }
            }
            Err(e) => {
                nv_log::error!("Error connecting to SG384 at {}: {}", address, e);
            }
        }
        sg
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn set_settle_delay(&mut self, delay: Duration) {
        self.settle_delay = delay;
    }

    fn settle(&self) {
        if !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }
    }

    fn transport(&mut self) -> Result<&mut Box<dyn Transport>> {
        self.transport
            .as_mut()
            .ok_or_else(|| Error::NotConnected(self.address.clone()))
    }

    /// Writes `command` and waits the settling delay. Nothing is read back,
    /// so a malformed command goes unnoticed.
    pub fn send_command(&mut self, command: &str) -> Result<()> {
        self.transport()?.write_line(command)?;
        self.settle();
        Ok(())
    }

    pub fn query(&mut self, query: &str) -> Result<String> {
        self.transport()?.query(query)
    }

    pub fn identify(&mut self) -> Result<String> {
        self.query("*IDN?")
    }

    /// Amplitude of the type-N RF output.
    pub fn set_amplitude(&mut self, amplitude: Power<Dbm>) -> Result<()> {
        self.send_command(&format!("AMPR {:#}", amplitude))
    }

    /// Amplitude of the BNC low-frequency output.
    pub fn set_amplitude_lf(&mut self, amplitude: Power<Dbm>) -> Result<()> {
        self.send_command(&format!("AMPL {:#}", amplitude))
    }

    pub fn set_frequency(&mut self, frequency: Frequency<Hertz>) -> Result<()> {
        self.send_command(&format!("FREQ {:#}", frequency))
    }

    /// Current frequency in MHz.
    pub fn frequency(&mut self) -> Result<f64> {
        let query = "FREQ?MHz";
        let response = self.query(query)?;
        response.trim().parse::<f64>().map_err(|_| Error::Parse {
            query: query.to_string(),
            response,
        })
    }

    pub fn rf_on(&mut self) -> Result<()> {
        self.send_command("ENBR 1")?;
        nv_log::info!("SG384 {}: N-type RF output on", self.address);
        Ok(())
    }

    pub fn rf_off(&mut self) -> Result<()> {
        self.send_command("ENBR 0")?;
        nv_log::info!("SG384 {}: N-type RF output off", self.address);
        Ok(())
    }

    pub fn set_bnc_output(&mut self, enabled: bool) -> Result<()> {
        self.send_command(&format!("ENBL {}", u8::from(enabled)))?;
        nv_log::info!("SG384 {}: BNC output set to {}", self.address, enabled);
        Ok(())
    }

    pub fn enable_modulation(&mut self) -> Result<()> {
        self.send_command("MODL 1")?;
        nv_log::info!("SG384 {}: modulation on", self.address);
        Ok(())
    }

    pub fn disable_modulation(&mut self) -> Result<()> {
        self.send_command("MODL 0")?;
        nv_log::info!("SG384 {}: modulation off", self.address);
        Ok(())
    }

    pub fn set_modulation_type(&mut self, modulation: ModulationType) -> Result<()> {
        self.send_command(&format!("TYPE {}", modulation.code()))
    }

    /// Sets the modulation type by name.
    ///
    /// An unknown name is logged and nothing is sent to the instrument.
    pub fn set_modulation_type_str(&mut self, name: &str) -> Result<()> {
        match name.parse::<ModulationType>() {
            Ok(modulation) => self.set_modulation_type(modulation),
            Err(e) => {
                nv_log::error!("{}", e);
                Ok(())
            }
        }
    }

    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            nv_log::info!("SG384 {}: connection closed", self.address);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFactory;
    use nv_units::{dbm, gigahertz};

    fn connected() -> (Sg384, crate::mock::CommandLog) {
        let factory = MockFactory::new();
        let log = factory.log();
        let sg = Sg384::connect_with_delay(
            "TCPIP0::127.0.0.1::5025::SOCKET",
            &factory,
            Duration::ZERO,
        );
        (sg, log)
    }

    #[test]
    fn test_modulation_type_codes() {
        assert_eq!("IQ".parse::<ModulationType>().unwrap().code(), 6);
        assert_eq!("AM".parse::<ModulationType>().unwrap().code(), 0);
        assert!("iq".parse::<ModulationType>().is_err());
        assert!("QAM".parse::<ModulationType>().is_err());
    }

    #[test]
    fn test_command_grammar() {
        let (mut sg, log) = connected();
        log.clear();
        sg.set_amplitude(dbm(-24.0)).unwrap();
        sg.set_amplitude_lf(dbm(-10.5)).unwrap();
        sg.set_frequency(gigahertz(1.769)).unwrap();
        sg.rf_on().unwrap();
        sg.set_bnc_output(false).unwrap();
        sg.enable_modulation().unwrap();
        sg.set_modulation_type(ModulationType::Iq).unwrap();
        sg.disable_modulation().unwrap();
        sg.rf_off().unwrap();
        assert_eq!(
            log.lines(),
            vec![
                "AMPR -24.0",
                "AMPL -10.5",
                "FREQ 1769000000.0",
                "ENBR 1",
                "ENBL 0",
                "MODL 1",
                "TYPE 6",
                "MODL 0",
                "ENBR 0",
            ]
        );
    }

    #[test]
    fn test_frequency_readback() {
        let (mut sg, _log) = connected();
        sg.set_frequency(gigahertz(2.87)).unwrap();
        assert!((sg.frequency().unwrap() - 2870.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_modulation_sends_nothing() {
        let (mut sg, log) = connected();
        log.clear();
        sg.set_modulation_type_str("QAM").unwrap();
        assert!(log.lines().is_empty());
        sg.set_modulation_type_str("FM").unwrap();
        assert_eq!(log.lines(), vec!["TYPE 1"]);
    }

    #[test]
    fn test_failed_connection_surfaces_on_use() {
        let factory = MockFactory::unreachable();
        let mut sg = Sg384::connect_with_delay(
            "TCPIP0::127.0.0.1::5025::SOCKET",
            &factory,
            Duration::ZERO,
        );
        assert!(!sg.is_connected());
        assert!(matches!(sg.rf_on(), Err(Error::NotConnected(_))));

        let mut sg = Sg384::connect_with_delay("GPIB0::27::INSTR", &factory, Duration::ZERO);
        assert!(!sg.is_connected());
        assert!(sg.frequency().is_err());
    }

    #[test]
    fn test_close() {
        let (mut sg, _log) = connected();
        assert!(sg.is_connected());
        sg.close();
        assert!(!sg.is_connected());
        assert!(sg.identify().is_err());
    }
}
