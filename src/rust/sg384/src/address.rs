// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A VISA resource string reduced to what the raw socket transport needs.
///
/// Only `TCPIP[n]::<host>::<port>::SOCKET` is supported. VXI-11 (`::INSTR`)
/// and serial resources need a VISA library and are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAddress {
    pub board: u16,
    pub host: String,
    pub port: u16,
}

impl FromStr for ResourceAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidAddress(s.to_string());
        let parts: Vec<&str> = s.trim().split("::").collect();
        let [interface, host, port, kind] = parts.as_slice() else {
            return Err(invalid());
        };
        let interface = interface.to_ascii_uppercase();
        let digits = interface.strip_prefix("TCPIP").ok_or_else(invalid)?;
        let board = if digits.is_empty() {
            0
        } else {
            digits.parse::<u16>().map_err(|_| invalid())?
        };
        if !kind.eq_ignore_ascii_case("SOCKET") || host.is_empty() {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;
        Ok(ResourceAddress {
            board,
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TCPIP{}::{}::{}::SOCKET", self.board, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_socket_resource() {
        let addr: ResourceAddress = "TCPIP0::18.25.11.6::5025::SOCKET".parse().unwrap();
        assert_eq!(addr.board, 0);
        assert_eq!(addr.host, "18.25.11.6");
        assert_eq!(addr.port, 5025);
        assert_eq!(addr.to_string(), "TCPIP0::18.25.11.6::5025::SOCKET");

        let addr: ResourceAddress = "tcpip::localhost::5025::socket".parse().unwrap();
        assert_eq!(addr.board, 0);
        assert_eq!(addr.host, "localhost");
    }

    #[test]
    fn test_reject_unsupported_resources() {
        assert!("TCPIP0::18.25.11.6::INSTR".parse::<ResourceAddress>().is_err());
        assert!("ASRL3::INSTR".parse::<ResourceAddress>().is_err());
        assert!("TCPIP0::host::notaport::SOCKET".parse::<ResourceAddress>().is_err());
        assert!("TCPIPx::host::5025::SOCKET".parse::<ResourceAddress>().is_err());
    }
}
