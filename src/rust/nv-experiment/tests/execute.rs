// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use nv_experiment::presets::{default_rabi_durations, default_odmr_frequencies};
use nv_experiment::runtime::dry_run::{DryRunConnector, DryRunManager, RuntimeEvent};
use nv_experiment::{
    ConfigNv, ConnectOptions, Error, ExecuteOptions, Experiment, Figure, HardwareConfig,
    NoopPlotter, NvParameters, Plotter, SequenceError,
};
use nv_units::{MHZ, arange};

const SG1: &str = "TCPIP0::18.25.11.6::5025::SOCKET";
const SG2: &str = "TCPIP0::18.25.11.5::5025::SOCKET";

#[derive(Default)]
struct RecordingPlotter {
    live: Vec<Figure>,
    finished: Vec<Figure>,
    close_after: Option<usize>,
}

impl Plotter for RecordingPlotter {
    fn draw(&mut self, figure: &Figure, live: bool) -> anyhow::Result<()> {
        if live {
            self.live.push(figure.clone());
        } else {
            self.finished.push(figure.clone());
        }
        Ok(())
    }

    fn interrupted(&self) -> bool {
        self.close_after.is_some_and(|n| self.live.len() >= n)
    }
}

/// Fluorescence dip of 5 counts at 80.3 MHz with a 0.4 MHz half-width.
fn odmr_response(name: &str, x: f64) -> f64 {
    let gamma: f64 = 0.4;
    let dip = 5.0 * gamma.powi(2) / ((x / MHZ - 80.3).powi(2) + gamma.powi(2));
    if name == "counts0" { 20.0 - dip } else { 20.0 }
}

fn connected(manager: DryRunManager) -> (Experiment, DryRunConnector) {
    let connector = DryRunConnector::with_manager(manager);
    let config = ConfigNv::new(ConnectOptions::default(), &connector).unwrap();
    connector.command_log().clear();
    (Experiment::new(config), connector)
}

fn blocking(n_avg: u32) -> ExecuteOptions {
    ExecuteOptions {
        n_avg,
        measure_contrast: true,
        live_plot: false,
    }
}

#[test]
fn test_pulsed_odmr_execution() {
    let (mut expt, connector) = connected(DryRunManager::new().with_response(odmr_response));
    let frequencies = arange(75.0 * MHZ, 85.0 * MHZ, 0.2 * MHZ);
    expt.setup_pulsed_odmr(&frequencies, 1.0).unwrap();

    let mut plotter = RecordingPlotter::default();
    expt.execute(blocking(100_000), &mut plotter).unwrap();

    let results = expt.results();
    let counts0 = results.counts0.as_ref().unwrap();
    assert_eq!(counts0.len(), 50);
    assert_eq!(results.counts_ref0.as_ref().unwrap().len(), 50);
    assert!(results.counts1.is_none());
    assert_eq!(results.iteration, Some(99_999.0));
    // Deepest point at 80.2 or 80.4 MHz.
    let deepest = counts0
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    assert!((26..=27).contains(&deepest));

    assert_eq!(
        connector.runtime_log().events(),
        vec![RuntimeEvent::Open, RuntimeEvent::Execute, RuntimeEvent::Close]
    );
    let log = connector.command_log();
    assert_eq!(
        log.lines_for(SG1),
        vec![
            "AMPR -24.0",
            "FREQ 1769000000.0",
            "ENBR 1",
            "MODL 1",
            "TYPE 6",
            "ENBR 0"
        ]
    );
    assert_eq!(log.lines_for(SG2).last().unwrap(), "ENBR 0");

    assert!(plotter.live.is_empty());
    assert_eq!(plotter.finished.len(), 1);
    let figure = &plotter.finished[0];
    assert_eq!(figure.title, "Pulsed ODMR");
    assert_eq!(figure.series.len(), 2);
    assert!((figure.series[0].x[0] - 75.0).abs() < 1e-9);
}

#[test]
fn test_dual_state_live_execution() {
    let (mut expt, connector) = connected(DryRunManager::new().with_live_polls(3));
    expt.setup_time_rabi(&default_rabi_durations()).unwrap();

    let mut plotter = RecordingPlotter::default();
    let options = ExecuteOptions {
        n_avg: 10,
        measure_contrast: false,
        live_plot: true,
    };
    expt.execute(options, &mut plotter).unwrap();

    assert_eq!(plotter.live.len(), 3);
    assert!(plotter.live.iter().all(|f| f.series.len() == 4));
    assert_eq!(plotter.finished.len(), 1);
    let results = expt.results();
    assert!(results.has_second_state());
    assert_eq!(results.counts1.as_ref().unwrap().len(), 21);
    assert_eq!(results.iteration, Some(9.0));
    assert!(!connector.runtime_log().events().contains(&RuntimeEvent::Halt));
}

#[test]
fn test_closing_live_view_halts_the_job() {
    let (mut expt, connector) = connected(DryRunManager::new().with_live_polls(5));
    expt.setup_pulsed_odmr(&default_odmr_frequencies(), 1.0)
        .unwrap();

    let mut plotter = RecordingPlotter {
        close_after: Some(1),
        ..Default::default()
    };
    let options = ExecuteOptions {
        n_avg: 100,
        ..Default::default()
    };
    expt.execute(options, &mut plotter).unwrap();

    assert_eq!(plotter.live.len(), 1);
    assert_eq!(
        connector.runtime_log().events(),
        vec![
            RuntimeEvent::Open,
            RuntimeEvent::Execute,
            RuntimeEvent::Halt,
            RuntimeEvent::Close
        ]
    );
    assert_eq!(expt.results().counts0.as_ref().unwrap().len(), 40);
    assert_eq!(
        connector.command_log().lines_for(SG1).last().unwrap(),
        "ENBR 0"
    );
}

#[test]
fn test_failed_execution_releases_sources_and_machine() {
    let (mut expt, connector) = connected(DryRunManager::new().failing_execution());
    expt.setup_pulsed_odmr(&default_odmr_frequencies(), 1.0)
        .unwrap();

    let err = expt.execute(blocking(10), &mut NoopPlotter).unwrap_err();
    assert!(matches!(err, Error::Runtime(_)));
    assert_eq!(
        connector.runtime_log().events(),
        vec![RuntimeEvent::Open, RuntimeEvent::Execute, RuntimeEvent::Close]
    );
    let log = connector.command_log();
    assert_eq!(log.lines_for(SG1).last().unwrap(), "ENBR 0");
    assert_eq!(log.lines_for(SG2).last().unwrap(), "ENBR 0");
    assert!(expt.results().is_empty());
}

#[test]
fn test_invalid_sequence_never_reaches_the_runtime() {
    let (mut expt, connector) = connected(DryRunManager::new());
    let err = expt.execute(blocking(10), &mut NoopPlotter).unwrap_err();
    assert!(matches!(err, Error::Sequence(SequenceError::NoCommands)));

    expt.add_align();
    let err = expt.execute(blocking(10), &mut NoopPlotter).unwrap_err();
    assert!(matches!(err, Error::Sequence(SequenceError::NoSweep)));

    assert!(connector.runtime_log().events().is_empty());
    assert!(connector.command_log().lines().is_empty());
}

#[test]
fn test_execution_without_runtime() {
    let mut expt = Experiment::new(ConfigNv::from_parameters(NvParameters::default()));
    expt.setup_time_rabi(&default_rabi_durations()).unwrap();
    let err = expt.execute(blocking(10), &mut NoopPlotter).unwrap_err();
    assert!(matches!(err, Error::NotConnected(_)));
}

#[test]
fn test_simulation_follows_the_sequence() {
    let (mut expt, connector) = connected(DryRunManager::new());
    expt.setup_time_rabi(&default_rabi_durations()).unwrap();

    let samples = expt.simulate(4_000, 10, true).unwrap();
    assert_eq!(connector.runtime_log().events(), vec![RuntimeEvent::Simulate]);

    // Initialization laser, 600 ns wait, then the shortest (16 ns) π pulse.
    let laser = &samples.digital["con1:1"];
    let nv_i = &samples.analog["con1:1"];
    assert_eq!(laser.len(), 4_000);
    assert!(laser[0] && laser[2_999]);
    assert!(!laser[3_000]);
    assert_eq!(nv_i[3_599], 0.0);
    assert_eq!(nv_i[3_600], 0.238);
    assert_eq!(nv_i[3_615], 0.238);
    assert_eq!(nv_i[3_616], 0.0);
    assert!(laser[3_616]);
}

#[test]
fn test_oversized_simulation_is_rejected() {
    let (mut expt, _connector) = connected(DryRunManager::new());
    expt.setup_time_rabi(&default_rabi_durations()).unwrap();
    let err = expt.simulate(1_000_000_000, 10, true).unwrap_err();
    assert!(matches!(err, Error::Runtime(_)));
}

#[test]
fn test_save_load_round_trip() {
    let (mut expt, _connector) = connected(DryRunManager::new().with_response(odmr_response));
    expt.config_mut().update(|p| p.x180_len_nv = 48);
    expt.setup_pulsed_odmr(&default_odmr_frequencies(), 0.5)
        .unwrap();
    expt.execute(blocking(10), &mut NoopPlotter).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("p_odmr.expt");
    expt.try_save(&path).unwrap();

    let loaded = Experiment::load(&path).unwrap();
    assert_eq!(loaded.commands(), expt.commands());
    assert_eq!(loaded.sweep(), expt.sweep());
    assert_eq!(loaded.results(), expt.results());
    assert_eq!(loaded.labels(), expt.labels());
    assert_eq!(loaded.measurement(), expt.measurement());
    assert_eq!(loaded.laser_channel(), Some("AOM1"));
    assert!(loaded.initialize());
    assert_eq!(loaded.config().parameters(), expt.config().parameters());
    assert_eq!(
        loaded.config().hardware(),
        &HardwareConfig::from_parameters(loaded.config().parameters())
    );
    assert_eq!(loaded.config().hardware().operation("NV", "x180").unwrap().length, 48);
    assert!(loaded.config().runtime_manager().is_none());
    assert!(loaded.config().sg1().is_none());

    assert!(Experiment::load(dir.path().join("missing.expt")).is_none());
}
