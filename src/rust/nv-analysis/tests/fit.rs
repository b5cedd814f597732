// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use nv_analysis::{Bounds, DataFitter, Model};
use nv_experiment::presets::default_rabi_durations;
use nv_experiment::runtime::dry_run::{DryRunConnector, DryRunManager};
use nv_experiment::{ConfigNv, ConnectOptions, ExecuteOptions, Experiment, Figure, NoopPlotter, Plotter};
use nv_units::{MHZ, arange};

#[derive(Default)]
struct RecordingPlotter {
    figures: Vec<Figure>,
}

impl Plotter for RecordingPlotter {
    fn draw(&mut self, figure: &Figure, _live: bool) -> anyhow::Result<()> {
        self.figures.push(figure.clone());
        Ok(())
    }
}

fn run(manager: DryRunManager, setup: impl FnOnce(&mut Experiment), measure_contrast: bool) -> Experiment {
    let connector = DryRunConnector::with_manager(manager);
    let config = ConfigNv::new(ConnectOptions::default(), &connector).unwrap();
    let mut expt = Experiment::new(config);
    setup(&mut expt);
    let options = ExecuteOptions {
        n_avg: 100_000,
        measure_contrast,
        live_plot: false,
    };
    expt.execute(options, &mut NoopPlotter).unwrap();
    expt
}

/// Signal brightens by up to 4 counts around 80.3 MHz.
fn odmr_response(name: &str, x: f64) -> f64 {
    let peak = nv_analysis::lorentzian(x / MHZ, 4.0, 80.3, 0.4);
    if name == "counts0" { 30.0 + peak } else { 30.0 }
}

#[test]
fn test_pulsed_odmr_lorentzian_fit() {
    let expt = run(
        DryRunManager::new().with_response(odmr_response),
        |expt| {
            let frequencies = arange(75.0 * MHZ, 85.0 * MHZ, 0.2 * MHZ);
            expt.setup_pulsed_odmr(&frequencies, 1.0).unwrap();
        },
        true,
    );

    let mut fitter = DataFitter::new(&expt).unwrap();
    assert_eq!(fitter.x().len(), 50);
    assert!((fitter.x()[0] - 75.0).abs() < 1e-9);
    assert_eq!(fitter.y_label(), "Contrast [a.u.]");
    assert!(fitter.fit_results("lorentzian").is_none());

    let params = fitter
        .fit(
            Model::Lorentzian,
            Some(&[1.0, 80.0, 0.5]),
            &Bounds::uniform(0.0, f64::INFINITY),
        )
        .unwrap()
        .params
        .clone();
    assert_eq!(params.len(), 3);
    assert!((75.0..85.0).contains(&params[1]));
    assert!((params[0] - 4.0).abs() < 1e-4);
    assert!((params[1] - 80.3).abs() < 1e-4);
    assert!((params[2] - 0.4).abs() < 1e-4);
    assert_eq!(fitter.fit_results("lorentzian").unwrap().params, params);

    let mut plotter = RecordingPlotter::default();
    fitter.plot_fit(Model::Lorentzian, &mut plotter);
    assert_eq!(plotter.figures.len(), 1);
    let figure = &plotter.figures[0];
    assert_eq!(figure.title, "Pulsed ODMR");
    assert_eq!(figure.y_label, "Contrast [a.u.]");
    assert_eq!(figure.series[0].x.len(), 50);
    let curve = &figure.series[1];
    assert_eq!(curve.label, "lorentzian fit");
    assert_eq!(curve.x.len(), 500);
    assert!((curve.x[0] - 75.0).abs() < 1e-9);
    assert!((curve.x[499] - fitter.x()[49]).abs() < 1e-9);
}

#[test]
fn test_population_difference_and_failed_fit() {
    let expt = run(
        DryRunManager::new().with_response(|name, x| match name {
            "counts0" => 20.0 + x,
            "counts1" => 20.0 - x,
            _ => 20.0,
        }),
        |expt| expt.setup_time_rabi(&default_rabi_durations()).unwrap(),
        false,
    );

    let mut fitter = DataFitter::new(&expt).unwrap();
    assert_eq!(fitter.y_label(), "<σz> [a.u.]");
    // Durations in ns on the x axis, twice the swept cycle count as signal.
    assert_eq!(fitter.x()[0], 16.0);
    for (x, y) in fitter.x().iter().zip(fitter.y()) {
        assert!((y - x / 2.0).abs() < 1e-9);
    }

    assert!(fitter.fit(Model::Lorentzian, Some(&[1.0, 2.0]), &Bounds::default()).is_none());
    assert!(fitter.fit_results("lorentzian").is_none());

    // A unit-width Gaussian at x = 1 is flat zero over the data; the
    // covariance is undefined and nothing is drawn.
    let mut plotter = RecordingPlotter::default();
    fitter.plot_fit(Model::Gaussian, &mut plotter);
    assert!(plotter.figures.is_empty());
    assert!(fitter.fit_results("gaussian").is_none());
}
