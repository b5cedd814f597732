// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Driver for the SRS SG384 signal generator.
//!
//! The instrument speaks newline-terminated ASCII. Writes are not
//! acknowledged; the driver waits a fixed settling delay after every write
//! instead. Only `FREQ?MHz` and `*IDN?` read a response.

pub mod address;
pub mod driver;
pub mod mock;
pub mod transport;

pub use address::ResourceAddress;
pub use driver::{DEFAULT_SETTLE_DELAY, ModulationType, Sg384};
pub use transport::{SocketFactory, TcpTransport, Transport, TransportFactory};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("SG384 at '{0}' is not connected")]
    NotConnected(String),
    #[error("invalid VISA resource address '{0}'")]
    InvalidAddress(String),
    #[error("modulation type '{0}' not recognized, expected one of AM, FM, PHASEM, SWEEP, PULSE, BLANK, IQ")]
    UnknownModulation(String),
    #[error("could not parse response '{response}' to '{query}'")]
    Parse { query: String, response: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
