// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! In-memory stand-in for an SG384, used by tests and dry runs.

use std::cell::RefCell;
use std::rc::Rc;

use nv_units::hertz;

use crate::{Error, ResourceAddress, Result, Transport, TransportFactory};

/// Shared record of every line written to mock instruments.
#[derive(Debug, Clone, Default)]
pub struct CommandLog(Rc<RefCell<Vec<(String, String)>>>);

impl CommandLog {
    pub fn lines(&self) -> Vec<String> {
        self.0.borrow().iter().map(|(_, line)| line.clone()).collect()
    }

    /// Lines sent to the instrument with the given resource address.
    pub fn lines_for(&self, address: &str) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter(|(resource, _)| resource == address)
            .map(|(_, line)| line.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    fn push(&self, address: &str, line: &str) {
        self.0
            .borrow_mut()
            .push((address.to_string(), line.to_string()));
    }
}

/// Transport emulating the parts of the SG384 command set the driver uses.
pub struct MockTransport {
    address: String,
    log: CommandLog,
    frequency_hz: f64,
}

impl MockTransport {
    pub fn new(address: &ResourceAddress, log: CommandLog) -> Self {
        MockTransport {
            address: address.to_string(),
            log,
            frequency_hz: 2.87e9,
        }
    }
}

impl Transport for MockTransport {
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.log.push(&self.address, line);
        if let Some(value) = line.strip_prefix("FREQ ") {
            self.frequency_hz = value.trim().parse().map_err(|_| Error::Parse {
                query: line.to_string(),
                response: String::new(),
            })?;
        }
        Ok(())
    }

    fn query(&mut self, line: &str) -> Result<String> {
        self.log.push(&self.address, line);
        match line {
            "*IDN?" => Ok("Stanford Research Systems,SG384,s/n000000,ver0.00".to_string()),
            "FREQ?MHz" => Ok(format!("{}", hertz(self.frequency_hz).to_megahertz())),
            _ => Ok(String::new()),
        }
    }
}

/// Factory handing out [`MockTransport`]s that share one [`CommandLog`].
#[derive(Debug, Clone, Default)]
pub struct MockFactory {
    log: CommandLog,
    unreachable: bool,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory whose every `open` fails, as for an instrument that is
    /// switched off.
    pub fn unreachable() -> Self {
        MockFactory {
            log: CommandLog::default(),
            unreachable: true,
        }
    }

    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }
}

impl TransportFactory for MockFactory {
    fn open(&self, address: &ResourceAddress) -> Result<Box<dyn Transport>> {
        if self.unreachable {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("no instrument at {address}"),
            )));
        }
        Ok(Box::new(MockTransport::new(address, self.log.clone())))
    }
}
