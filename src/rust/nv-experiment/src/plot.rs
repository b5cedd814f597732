// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Plotting boundary.
//!
//! The crate describes what to draw as a [`Figure`]; rendering is left to a
//! [`Plotter`]. [`LogPlotter`] summarizes figures in the log, [`NoopPlotter`]
//! discards them.

use serde::{Deserialize, Serialize};

use crate::results::ExperimentResults;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesStyle {
    Line,
    Scatter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub style: SeriesStyle,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Series {
    pub fn line(label: impl Into<String>, x: Vec<f64>, y: Vec<f64>) -> Self {
        Series {
            label: label.into(),
            style: SeriesStyle::Line,
            x,
            y,
        }
    }

    pub fn scatter(label: impl Into<String>, x: Vec<f64>, y: Vec<f64>) -> Self {
        Series {
            label: label.into(),
            style: SeriesStyle::Scatter,
            x,
            y,
        }
    }

    fn range(&self) -> Option<(f64, f64)> {
        self.y.iter().fold(None, |acc, v| match acc {
            None => Some((*v, *v)),
            Some((lo, hi)) => Some((lo.min(*v), hi.max(*v))),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

pub trait Plotter {
    /// Draws `figure`. A live figure replaces the previous live one.
    fn draw(&mut self, figure: &Figure, live: bool) -> anyhow::Result<()>;

    /// Whether the user closed the live view and the run should stop.
    fn interrupted(&self) -> bool {
        false
    }
}

/// Drops every figure.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPlotter;

impl Plotter for NoopPlotter {
    fn draw(&mut self, _figure: &Figure, _live: bool) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Writes a one-line summary per series to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPlotter;

impl Plotter for LogPlotter {
    fn draw(&mut self, figure: &Figure, live: bool) -> anyhow::Result<()> {
        if live {
            nv_log::diagnostic!(
                "{}: {} series of {} points",
                figure.title,
                figure.series.len(),
                figure.series.first().map_or(0, |s| s.x.len())
            );
            return Ok(());
        }
        nv_log::info!("{} ({} vs {})", figure.title, figure.y_label, figure.x_label);
        for series in &figure.series {
            match series.range() {
                Some((lo, hi)) => {
                    nv_log::info!(
                        "  {}: {} points, {:.4} to {:.4}",
                        series.label,
                        series.y.len(),
                        lo,
                        hi
                    );
                }
                None => {
                    nv_log::info!("  {}: empty", series.label);
                }
            }
        }
        Ok(())
    }
}

/// Axis scaling and captions of an experiment's plots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotLabels {
    /// Multiplies the sweep values on the x axis.
    pub x_axis_scale: f64,
    pub x_axis_label: String,
    pub y_axis_label: String,
    pub title: String,
}

impl Default for PlotLabels {
    fn default() -> Self {
        PlotLabels {
            x_axis_scale: 1.0,
            x_axis_label: "Swept Variable [a.u.]".to_string(),
            y_axis_label: "Intensity [kcps]".to_string(),
            title: "Measurement Results".to_string(),
        }
    }
}

impl PlotLabels {
    pub fn scaled_axis(&self, sweep: &[f64]) -> Vec<f64> {
        sweep.iter().map(|x| x * self.x_axis_scale).collect()
    }
}

/// Converts counts in a `measure_len_ns` window to kilo-counts per second.
pub fn to_kcps(counts: &[f64], measure_len_ns: i64) -> Vec<f64> {
    let window_s = measure_len_ns as f64 * 1e-9;
    counts.iter().map(|c| c / 1_000.0 / window_s).collect()
}

/// Line plot of every available count array against the scaled sweep.
///
/// Counts are shown as rates when the acquisition window is known.
pub fn counts_figure(
    labels: &PlotLabels,
    sweep: &[f64],
    measure_len_ns: Option<i64>,
    results: &ExperimentResults,
) -> Figure {
    let x = labels.scaled_axis(sweep);
    let series = [
        ("sig0", &results.counts0),
        ("ref0", &results.counts_ref0),
        ("sig1", &results.counts1),
        ("ref1", &results.counts_ref1),
    ]
    .into_iter()
    .filter_map(|(label, counts)| {
        let counts = counts.as_deref()?;
        let y = match measure_len_ns {
            Some(len) if len > 0 => to_kcps(counts, len),
            _ => counts.to_vec(),
        };
        Some(Series::line(label, x.clone(), y))
    })
    .collect();
    Figure {
        title: labels.title.clone(),
        x_label: labels.x_axis_label.clone(),
        y_label: labels.y_axis_label.clone(),
        series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kcps() {
        // 30 counts in 600 ns is 50 Mcps.
        assert!((to_kcps(&[30.0], 600)[0] - 50_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_counts_figure() {
        let labels = PlotLabels {
            x_axis_scale: 0.5,
            title: "Pulsed ODMR".to_string(),
            ..Default::default()
        };
        let results = ExperimentResults {
            counts0: Some(vec![0.6, 1.2]),
            counts_ref0: Some(vec![0.6, 0.6]),
            ..Default::default()
        };
        let figure = counts_figure(&labels, &[150.0, 152.0], Some(600), &results);
        assert_eq!(figure.title, "Pulsed ODMR");
        assert_eq!(figure.y_label, "Intensity [kcps]");
        assert_eq!(figure.series.len(), 2);
        assert_eq!(figure.series[0].label, "sig0");
        assert_eq!(figure.series[0].x, vec![75.0, 76.0]);
        assert!((figure.series[0].y[1] - 2_000.0).abs() < 1e-6);
        assert_eq!(figure.series[1].label, "ref0");

        let raw = counts_figure(&labels, &[150.0, 152.0], None, &results);
        assert_eq!(raw.series[0].y, vec![0.6, 1.2]);
    }

    #[test]
    fn test_log_plotter_accepts_empty_series() {
        let figure = Figure {
            series: vec![Series::scatter("data", vec![], vec![])],
            ..Default::default()
        };
        assert!(LogPlotter.draw(&figure, false).is_ok());
        assert!(LogPlotter.draw(&figure, true).is_ok());
        assert!(!NoopPlotter.interrupted());
    }
}
