// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use indexmap::IndexMap;
use nv_experiment::{Experiment, Figure, Plotter, Series};

use crate::least_squares::{Bounds, FitResult, least_squares};
use crate::models::Model;
use crate::{Error, Result};

const FIT_POINTS: usize = 500;

/// Fits the contrast of a finished experiment.
///
/// The x data is the sweep scaled to plot units, so initial guesses and
/// fitted positions are in the units shown on the x axis.
pub struct DataFitter<'a> {
    experiment: &'a Experiment,
    x: Vec<f64>,
    y: Vec<f64>,
    y_label: &'static str,
    fit_results: IndexMap<&'static str, FitResult>,
}

impl<'a> DataFitter<'a> {
    pub fn new(experiment: &'a Experiment) -> Result<Self> {
        let sweep = experiment
            .sweep()
            .values()
            .ok_or(Error::MissingData("sweep"))?;
        let results = experiment.results();
        let y = results.contrast().ok_or(Error::MissingData("counts"))?;
        if y.len() != sweep.len() {
            return Err(Error::LengthMismatch {
                expected: sweep.len(),
                found: y.len(),
            });
        }
        let y_label = if results.has_second_state() {
            "<σz> [a.u.]"
        } else {
            "Contrast [a.u.]"
        };
        Ok(DataFitter {
            experiment,
            x: experiment.labels().scaled_axis(sweep),
            y,
            y_label,
            fit_results: IndexMap::new(),
        })
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn y_label(&self) -> &str {
        self.y_label
    }

    /// Fits `model`, starting from `initial` (all ones when omitted), and
    /// caches the result under the model name.
    ///
    /// A failed fit is logged and leaves any earlier result in place.
    pub fn fit(&mut self, model: Model, initial: Option<&[f64]>, bounds: &Bounds) -> Option<&FitResult> {
        let ones = vec![1.0; model.param_count()];
        let p0 = initial.unwrap_or(ones.as_slice());
        match least_squares(model, &self.x, &self.y, p0, bounds) {
            Ok(result) => {
                nv_log::info!("Fitted {}: {:?}", model, result.params);
                self.fit_results.insert(model.name(), result);
                self.fit_results.get(model.name())
            }
            Err(e) => {
                nv_log::error!("Error during fitting {}: {}", model, e);
                None
            }
        }
    }

    pub fn fit_results(&self, model_name: &str) -> Option<&FitResult> {
        self.fit_results.get(model_name)
    }

    /// Draws the data with the fitted curve on top, fitting with default
    /// settings first when `model` has no result yet.
    pub fn plot_fit(&mut self, model: Model, plotter: &mut dyn Plotter) {
        if !self.fit_results.contains_key(model.name()) {
            self.fit(model, None, &Bounds::default());
        }
        let Some(result) = self.fit_results.get(model.name()) else {
            nv_log::error!("No {} fit to plot", model);
            return;
        };
        let figure = self.fit_figure(model, result);
        if let Err(e) = plotter.draw(&figure, false) {
            nv_log::error!("Failed to plot {} fit: {}", model, e);
        }
    }

    fn fit_figure(&self, model: Model, result: &FitResult) -> Figure {
        let (lo, hi) = self
            .x
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(*x), hi.max(*x)));
        let step = (hi - lo) / (FIT_POINTS - 1) as f64;
        let fit_x: Vec<f64> = (0..FIT_POINTS).map(|i| lo + step * i as f64).collect();
        let fit_y = fit_x.iter().map(|x| model.eval(*x, &result.params)).collect();

        let labels = self.experiment.labels();
        Figure {
            title: labels.title.clone(),
            x_label: labels.x_axis_label.clone(),
            y_label: self.y_label.to_string(),
            series: vec![
                Series::scatter("data", self.x.clone(), self.y.clone()),
                Series::line(format!("{model} fit"), fit_x, fit_y),
            ],
        }
    }
}
