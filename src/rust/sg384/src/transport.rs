// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::{Error, ResourceAddress, Result};

/// Line-oriented instrument I/O.
///
/// Implementations append the write termination themselves and strip the
/// read termination from responses.
pub trait Transport {
    fn write_line(&mut self, line: &str) -> Result<()>;

    fn query(&mut self, line: &str) -> Result<String>;
}

/// Opens transports for resource addresses.
pub trait TransportFactory {
    fn open(&self, address: &ResourceAddress) -> Result<Box<dyn Transport>>;
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Raw TCP socket transport (`TCPIP::host::port::SOCKET`).
pub struct TcpTransport {
    stream: BufReader<TcpStream>,
    termination: &'static str,
}

impl TcpTransport {
    pub fn connect(address: &ResourceAddress) -> Result<Self> {
        let target = (address.host.as_str(), address.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::InvalidAddress(address.to_string()))?;
        let stream = TcpStream::connect_timeout(&target, CONNECT_TIMEOUT)?;
        stream.set_nodelay(true)?;
        Ok(TcpTransport {
            stream: BufReader::new(stream),
            termination: "\n",
        })
    }
}

impl Transport for TcpTransport {
    fn write_line(&mut self, line: &str) -> Result<()> {
        nv_log::debug!("SCPI write: {:?}", line);
        let stream = self.stream.get_mut();
        stream.write_all(line.as_bytes())?;
        stream.write_all(self.termination.as_bytes())?;
        stream.flush()?;
        Ok(())
    }

    fn query(&mut self, line: &str) -> Result<String> {
        self.write_line(line)?;
        let mut response = String::new();
        let n = self.stream.read_line(&mut response)?;
        if n == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed by device",
            )));
        }
        let response = response.trim_end_matches(['\r', '\n']).to_string();
        nv_log::debug!("SCPI response: {:?}", response);
        Ok(response)
    }
}

/// Opens [`TcpTransport`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct SocketFactory;

impl TransportFactory for SocketFactory {
    fn open(&self, address: &ResourceAddress) -> Result<Box<dyn Transport>> {
        Ok(Box::new(TcpTransport::connect(address)?))
    }
}
