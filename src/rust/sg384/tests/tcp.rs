// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use nv_units::{dbm, megahertz};
use sg384::{ModulationType, Sg384, SocketFactory};

const IDN: &str = "Stanford Research Systems,SG384,s/n001234,ver1.02";

/// Answers the queries the driver issues and records every received line
/// until the client hangs up.
fn spawn_instrument() -> (u16, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);
        let mut received = Vec::new();
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap() > 0 {
            let command = line.trim_end().to_string();
            match command.as_str() {
                "*IDN?" => writeln!(writer, "{IDN}").unwrap(),
                "FREQ?MHz" => writer.write_all(b"2870.000000\r\n").unwrap(),
                _ => {}
            }
            received.push(command);
            line.clear();
        }
        received
    });
    (port, handle)
}

#[test]
fn test_driver_over_socket() {
    let (port, instrument) = spawn_instrument();
    let address = format!("TCPIP0::127.0.0.1::{port}::SOCKET");
    let mut sg = Sg384::connect_with_delay(&address, &SocketFactory, Duration::ZERO);
    assert!(sg.is_connected());

    assert_eq!(sg.identify().unwrap(), IDN);
    assert_eq!(sg.frequency().unwrap(), 2870.0);
    sg.set_amplitude(dbm(-24.0)).unwrap();
    sg.set_frequency(megahertz(2870.0)).unwrap();
    sg.set_modulation_type(ModulationType::Iq).unwrap();
    // Unknown names never reach the wire.
    sg.set_modulation_type_str("QAM").unwrap();
    sg.rf_off().unwrap();
    sg.close();
    assert!(!sg.is_connected());

    let received = instrument.join().unwrap();
    assert_eq!(
        received,
        [
            "*IDN?",
            "*IDN?",
            "FREQ?MHz",
            "AMPR -24.0",
            "FREQ 2870000000.0",
            "TYPE 6",
            "ENBR 0"
        ]
    );
}

#[test]
fn test_unreachable_instrument() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let address = format!("TCPIP0::127.0.0.1::{port}::SOCKET");
    let mut sg = Sg384::connect_with_delay(&address, &SocketFactory, Duration::ZERO);
    assert!(!sg.is_connected());
    assert!(matches!(sg.rf_on(), Err(sg384::Error::NotConnected(_))));
}
