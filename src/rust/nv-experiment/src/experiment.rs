// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Command-sequence builder.
//!
//! Commands are appended in emission order. At most one numeric argument
//! per command may be a vector; every such vector is registered on the
//! single [`SweepAxis`] and the command stores its scale relative to the
//! axis. [`Experiment::create_program`] lowers the list into a [`Program`]
//! with an averaging loop around a scanning loop over the axis.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use nv_units::{ns_to_cycles, ns_to_cycles_f64};
use serde::{Deserialize, Serialize};

use crate::command::{Command, PulseName, Sweepable, ValueOrSweep};
use crate::config::ConfigNv;
use crate::error::{Error, Result, SequenceError};
use crate::plot::{PlotLabels, Plotter, counts_figure};
use crate::program::{Block, Expr, Program, StreamOutput, VariableType};
use crate::results::{COUNTS_REF0, COUNTS_REF1, COUNTS0, COUNTS1, ExperimentResults, ITERATION};
use crate::runtime::{Job, Machine, SimulatedSamples, StreamValue};
use crate::sweep::SweepAxis;

const LOOP_VAR: &str = "var";
const AVG_VAR: &str = "n";
const AVG_STREAM: &str = "n_st";
const TIMES: &str = "times";
/// Capacity of the time-tag array of one measurement.
const TIME_TAG_BUFFER: usize = 100;
const LASER_OPERATION: &str = "laser_ON";
const CW_OPERATION: &str = "cw";
/// Element receiving the π pulse of the reference measurement.
const REFERENCE_ELEMENT: &str = "NV";

/// Acquisition shared by every measurement of a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    pub mode: String,
    pub channel: String,
    /// Nanoseconds.
    pub length: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteOptions {
    pub n_avg: u32,
    /// Measure only the bright state. Otherwise the sequence is replayed
    /// with cycle pulses inverted to measure the dark state too.
    pub measure_contrast: bool,
    pub live_plot: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        ExecuteOptions {
            n_avg: 100_000,
            measure_contrast: true,
            live_plot: true,
        }
    }
}

fn stream_name(variable: &str) -> String {
    format!("{variable}_st")
}

fn amplitude_expr(amplitude: &ValueOrSweep<f64>) -> Expr {
    match amplitude {
        ValueOrSweep::Value(value) => Expr::Fixed(*value),
        ValueOrSweep::Swept { scale } => Expr::swept(LOOP_VAR, *scale),
    }
}

fn duration_expr(cycles: &ValueOrSweep<i64>) -> Expr {
    match cycles {
        ValueOrSweep::Value(value) => Expr::Int(*value),
        ValueOrSweep::Swept { scale } => Expr::swept(LOOP_VAR, *scale),
    }
}

pub struct Experiment {
    config: ConfigNv,
    commands: Vec<Command>,
    sweep: SweepAxis,
    use_fixed: bool,
    measurement: Option<Measurement>,
    initialize: bool,
    /// Clock cycles.
    measure_delay: i64,
    laser_channel: Option<String>,
    results: ExperimentResults,
    labels: PlotLabels,
    file_prefix: String,
}

impl Experiment {
    pub fn new(config: ConfigNv) -> Self {
        Experiment {
            config,
            commands: Vec::new(),
            sweep: SweepAxis::new(),
            use_fixed: false,
            measurement: None,
            initialize: false,
            measure_delay: 0,
            laser_channel: None,
            results: ExperimentResults::default(),
            labels: PlotLabels::default(),
            file_prefix: "expt".to_string(),
        }
    }

    pub fn config(&self) -> &ConfigNv {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigNv {
        &mut self.config
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn sweep(&self) -> &SweepAxis {
        &self.sweep
    }

    /// Whether the loop variable is fixed-point, which it is once an
    /// amplitude is swept.
    pub fn use_fixed(&self) -> bool {
        self.use_fixed
    }

    pub fn measurement(&self) -> Option<&Measurement> {
        self.measurement.as_ref()
    }

    pub fn initialize(&self) -> bool {
        self.initialize
    }

    /// Delay before the reference readout, in clock cycles.
    pub fn measure_delay(&self) -> i64 {
        self.measure_delay
    }

    pub fn laser_channel(&self) -> Option<&str> {
        self.laser_channel.as_deref()
    }

    pub fn results(&self) -> &ExperimentResults {
        &self.results
    }

    pub fn labels(&self) -> &PlotLabels {
        &self.labels
    }

    pub fn labels_mut(&mut self) -> &mut PlotLabels {
        &mut self.labels
    }

    pub fn file_prefix(&self) -> &str {
        &self.file_prefix
    }

    pub fn set_file_prefix(&mut self, prefix: impl Into<String>) {
        self.file_prefix = prefix.into();
    }

    /// Registers `values` on the sweep axis and returns their scale relative
    /// to the first registered vector.
    pub fn update_loop(&mut self, values: &[f64]) -> Result<f64, SequenceError> {
        self.sweep.register(values)
    }

    fn check_operation(&self, element: &str, operation: &str) -> Result<(), SequenceError> {
        if self.config.hardware().has_operation(element, operation) {
            Ok(())
        } else {
            Err(SequenceError::UnknownPulse(format!("{operation} on {element}")))
        }
    }

    /// Resolves an amplitude and a duration in ns, at most one of them swept.
    ///
    /// Swept durations are registered in clock cycles. Sweeping the
    /// amplitude switches the loop variable to fixed-point.
    fn resolve_drive(
        &mut self,
        amplitude: Sweepable,
        length_ns: Sweepable,
    ) -> Result<(ValueOrSweep<f64>, ValueOrSweep<i64>), SequenceError> {
        match (amplitude, length_ns) {
            (Sweepable::Sweep(_), Sweepable::Sweep(_)) => {
                Err(SequenceError::MultipleSweepsInCommand)
            }
            (Sweepable::Sweep(amplitudes), Sweepable::Value(length)) => {
                let scale = self.update_loop(&amplitudes)?;
                self.use_fixed = true;
                Ok((
                    ValueOrSweep::Swept { scale },
                    ValueOrSweep::Value(ns_to_cycles_f64(length) as i64),
                ))
            }
            (Sweepable::Value(amplitude), Sweepable::Sweep(lengths)) => {
                let cycles: Vec<f64> = lengths.iter().map(|ns| ns_to_cycles_f64(*ns)).collect();
                let scale = self.update_loop(&cycles)?;
                Ok((ValueOrSweep::Value(amplitude), ValueOrSweep::Swept { scale }))
            }
            (Sweepable::Value(amplitude), Sweepable::Value(length)) => Ok((
                ValueOrSweep::Value(amplitude),
                ValueOrSweep::Value(ns_to_cycles_f64(length) as i64),
            )),
        }
    }

    /// Appends a predefined rotation `[-](x|y)(90|180)` on `element`.
    ///
    /// `length` is in ns and defaults to the π-pulse length of the
    /// configuration. With `cycle` set, the pulse is inverted in the
    /// dark-state pass of a dual-state run.
    pub fn add_pulse(
        &mut self,
        name: &str,
        element: &str,
        amplitude: impl Into<Sweepable>,
        length: Option<Sweepable>,
        cycle: bool,
    ) -> Result<(), SequenceError> {
        let name: PulseName = name.parse()?;
        self.check_operation(element, &name.to_string())?;
        if cycle {
            self.check_operation(element, &name.inverted().to_string())?;
        }
        let length = length
            .unwrap_or_else(|| Sweepable::from(self.config.parameters().x180_len_nv));
        let (amplitude, length) = self.resolve_drive(amplitude.into(), length)?;
        self.commands.push(Command::Pulse {
            element: element.to_string(),
            name,
            amplitude,
            length,
            cycle,
        });
        Ok(())
    }

    /// Appends a continuous drive of `length` ns on `element`.
    pub fn add_cw_drive(
        &mut self,
        element: &str,
        length: impl Into<Sweepable>,
        amplitude: impl Into<Sweepable>,
    ) -> Result<(), SequenceError> {
        self.check_operation(element, CW_OPERATION)?;
        let (amplitude, length) = self.resolve_drive(amplitude.into(), length.into())?;
        self.commands.push(Command::Cw {
            element: element.to_string(),
            amplitude,
            length,
        });
        Ok(())
    }

    /// Appends an idle period of `length` ns on all elements.
    pub fn add_wait(&mut self, length: impl Into<Sweepable>) -> Result<(), SequenceError> {
        let length = match length.into() {
            Sweepable::Value(ns) => ValueOrSweep::Value(ns_to_cycles_f64(ns) as i64),
            Sweepable::Sweep(values) => {
                let cycles: Vec<f64> = values.iter().map(|ns| ns_to_cycles_f64(*ns)).collect();
                ValueOrSweep::Swept {
                    scale: self.update_loop(&cycles)?,
                }
            }
        };
        self.commands.push(Command::Wait { length });
        Ok(())
    }

    /// Appends a laser pulse. `length` is in ns and defaults to the
    /// initialization length of the configuration.
    ///
    /// The channel becomes the laser channel of the reference measurement.
    pub fn add_laser(
        &mut self,
        mode: &str,
        channel: &str,
        length: Option<i64>,
    ) -> Result<(), SequenceError> {
        self.check_operation(channel, mode)?;
        let length = length.unwrap_or(self.config.parameters().initialization_len_1);
        self.commands.push(Command::Laser {
            mode: mode.to_string(),
            channel: channel.to_string(),
            length: ns_to_cycles(length),
        });
        self.laser_channel = Some(channel.to_string());
        Ok(())
    }

    /// Appends a photon-counting measurement of `meas_len` ns, by default
    /// the readout length of the configuration.
    ///
    /// All measurements of a sequence share one acquisition; the first one
    /// fixes it and a later one with another length is rejected.
    pub fn add_measure(
        &mut self,
        mode: &str,
        channel: &str,
        meas_len: Option<i64>,
    ) -> Result<(), SequenceError> {
        self.check_operation(channel, mode)?;
        let meas_len = meas_len.unwrap_or(self.config.parameters().meas_len_1);
        match self.measurement.as_ref().map(|m| m.length) {
            Some(expected) if expected != meas_len => {
                return Err(SequenceError::InconsistentMeasureLength {
                    expected,
                    found: meas_len,
                });
            }
            Some(_) => {}
            None => {
                self.measurement = Some(Measurement {
                    mode: mode.to_string(),
                    channel: channel.to_string(),
                    length: meas_len,
                });
            }
        }
        self.commands.push(Command::Measure {
            mode: mode.to_string(),
            channel: channel.to_string(),
            meas_len,
        });
        Ok(())
    }

    /// Delays the reference readout by `length` ns, by default the readout
    /// length of the configuration.
    pub fn add_measure_delay(&mut self, length: Option<i64>) {
        let length = length.unwrap_or(self.config.parameters().meas_len_1);
        self.measure_delay = ns_to_cycles(length);
    }

    /// Steps the intermediate frequency of `element` through `frequencies`
    /// (Hz).
    pub fn add_frequency_update(
        &mut self,
        element: &str,
        frequencies: &[f64],
    ) -> Result<(), SequenceError> {
        let scale = self.update_loop(frequencies)?;
        self.commands.push(Command::UpdateFrequency {
            element: element.to_string(),
            scale,
        });
        Ok(())
    }

    pub fn add_align(&mut self) {
        self.commands.push(Command::Align);
    }

    /// Polarizes the spin with a laser pulse on `channel` before the first
    /// sequence.
    pub fn add_initialization(&mut self, channel: &str) {
        self.initialize = true;
        self.laser_channel = Some(channel.to_string());
    }

    fn check_ready(&self) -> Result<(&[f64], &Measurement, &str), SequenceError> {
        if self.commands.is_empty() {
            return Err(SequenceError::NoCommands);
        }
        let sweep = self.sweep.values().ok_or(SequenceError::NoSweep)?;
        let measurement = self
            .measurement
            .as_ref()
            .ok_or(SequenceError::NoMeasurement)?;
        let laser = self
            .laser_channel
            .as_deref()
            .ok_or(SequenceError::NoLaserChannel)?;
        Ok((sweep, measurement, laser))
    }

    /// Lowers the command list into a program averaging `n_avg` times.
    ///
    /// Without `measure_contrast`, every point is measured twice: once as
    /// defined and once with cycle pulses inverted, each followed by its
    /// reference measurement.
    pub fn create_program(&self, n_avg: u32, measure_contrast: bool) -> Result<Program, SequenceError> {
        let (sweep, measurement, laser) = self.check_ready()?;
        let params = self.config.parameters();
        let wait_between_runs = ns_to_cycles(params.wait_between_runs);
        let wait_for_initialization = ns_to_cycles(params.wait_for_initialization);

        let mut passes = vec![(COUNTS0, COUNTS_REF0)];
        if !measure_contrast {
            passes.push((COUNTS1, COUNTS_REF1));
        }

        let mut body = Block::new();
        for (signal, reference) in &passes {
            for name in [signal, reference] {
                body.add_declaration(*name, VariableType::Int);
                body.add_stream_declaration(stream_name(name));
            }
        }
        body.add_array_declaration(TIMES, VariableType::Int, TIME_TAG_BUFFER);
        let var_type = if self.use_fixed {
            VariableType::Fixed
        } else {
            VariableType::Int
        };
        body.add_declaration(LOOP_VAR, var_type);
        body.add_declaration(AVG_VAR, VariableType::Int);
        body.add_stream_declaration(AVG_STREAM);

        if self.initialize {
            body.add_play(LASER_OPERATION, laser, None, None);
            body.add_wait(Expr::Int(wait_for_initialization), Some(laser));
        }

        let mut scan = Block::new();
        for (pass, (signal, reference)) in passes.iter().enumerate() {
            let dark = pass == 1;
            for command in &self.commands {
                lower_command(&mut scan, command, dark, signal);
            }
            let reference_run = ReferenceRun {
                measurement,
                laser,
                wait_between_runs,
                measure_delay: self.measure_delay,
            };
            reference_run.lower(&mut scan, reference, if dark { 1.0 } else { 0.0 });
        }

        let mut averaging = Block::new();
        averaging.add_for_each(LOOP_VAR, sweep.to_vec(), scan);
        averaging.add_save(AVG_VAR, AVG_STREAM);
        body.add_for(AVG_VAR, 0, i64::from(n_avg), averaging);

        let mut streams: Vec<StreamOutput> = passes
            .iter()
            .flat_map(|(signal, reference)| [*signal, *reference])
            .map(|name| StreamOutput {
                stream: stream_name(name),
                buffer: Some(sweep.len()),
                average: true,
                name: name.to_string(),
            })
            .collect();
        streams.push(StreamOutput {
            stream: AVG_STREAM.to_string(),
            buffer: None,
            average: false,
            name: ITERATION.to_string(),
        });
        Ok(Program::new(body, streams))
    }

    /// Runs the sequence and stores the results.
    ///
    /// The microwave sources are on only while the program runs: they are
    /// switched off, and the machine closed, on every exit path. Results are
    /// plotted live when requested and once more at the end; plot failures
    /// are logged.
    pub fn execute(&mut self, options: ExecuteOptions, plotter: &mut dyn Plotter) -> Result<()> {
        let program = self.create_program(options.n_avg, options.measure_contrast)?;
        let manager = self
            .config
            .runtime_manager()
            .ok_or(Error::NotConnected("Runtime manager"))?;
        let machine = manager
            .open_machine(self.config.hardware())
            .map_err(Error::Runtime)?;
        let mut session = MachineSession::new(machine);
        let names = program.result_names();
        nv_log::info!(
            "Running {} averages over {} points",
            options.n_avg,
            self.sweep.len()
        );

        let values = {
            let _sources = self.config.enable_sources()?;
            let mut job = session.machine.execute(&program).map_err(Error::Runtime)?;
            if options.live_plot {
                let view = LiveView {
                    labels: &self.labels,
                    sweep: self.sweep.values().unwrap_or_default(),
                    measure_len: self.measurement.as_ref().map(|m| m.length),
                    n_avg: options.n_avg,
                };
                fetch_live(job.as_mut(), &names, &view, plotter)?
            } else {
                job.wait_for_all_values().map_err(Error::Runtime)?;
                job.fetch(&names).map_err(Error::Runtime)?
            }
        };

        self.results = ExperimentResults::from_values(&values).map_err(Error::Runtime)?;
        session.close().map_err(Error::Runtime)?;
        self.plot_results(plotter);
        Ok(())
    }

    /// Samples the first `duration_ns` of the program on every controller
    /// port.
    pub fn simulate(
        &self,
        duration_ns: i64,
        n_avg: u32,
        measure_contrast: bool,
    ) -> Result<SimulatedSamples> {
        let program = self.create_program(n_avg, measure_contrast)?;
        let manager = self
            .config
            .runtime_manager()
            .ok_or(Error::NotConnected("Runtime manager"))?;
        manager
            .simulate(self.config.hardware(), &program, ns_to_cycles(duration_ns))
            .map_err(Error::Runtime)
    }

    /// Draws the stored results. Missing results and plot failures are
    /// logged.
    pub fn plot_results(&self, plotter: &mut dyn Plotter) {
        let Some(sweep) = self.sweep.values() else {
            nv_log::warn!("No sweep defined, nothing to plot");
            return;
        };
        if self.results.is_empty() {
            nv_log::warn!("No results to plot");
            return;
        }
        let measure_len = self.measurement.as_ref().map(|m| m.length);
        let figure = counts_figure(&self.labels, sweep, measure_len, &self.results);
        if let Err(e) = plotter.draw(&figure, false) {
            nv_log::error!("Failed to plot results: {}", e);
        }
    }

    /// Writes the builder state, the results and the configuration to
    /// `path`.
    pub fn try_save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = ExperimentFile {
            commands: self.commands.clone(),
            sweep: self.sweep.clone(),
            use_fixed: self.use_fixed,
            measurement: self.measurement.clone(),
            initialize: self.initialize,
            measure_delay: self.measure_delay,
            laser_channel: self.laser_channel.clone(),
            results: self.results.clone(),
            labels: self.labels.clone(),
            file_prefix: self.file_prefix.clone(),
            config: self.config.to_json()?,
        };
        fs::write(path.as_ref(), serde_json::to_string_pretty(&file)?)?;
        nv_log::info!("Saved experiment to {}", path.as_ref().display());
        Ok(())
    }

    /// Like [`Experiment::try_save`], logging the error instead of returning
    /// it.
    pub fn save(&self, path: impl AsRef<Path>) {
        if let Err(e) = self.try_save(path.as_ref()) {
            nv_log::error!("Error saving file {}: {}", path.as_ref().display(), e);
        }
    }

    /// Reads an experiment written by [`Experiment::save`].
    ///
    /// The configuration is rebuilt from its constants without connections.
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let file: ExperimentFile = serde_json::from_str(&text)?;
        Ok(Experiment {
            config: ConfigNv::from_json(file.config)?,
            commands: file.commands,
            sweep: file.sweep,
            use_fixed: file.use_fixed,
            measurement: file.measurement,
            initialize: file.initialize,
            measure_delay: file.measure_delay,
            laser_channel: file.laser_channel,
            results: file.results,
            labels: file.labels,
            file_prefix: file.file_prefix,
        })
    }

    /// Like [`Experiment::try_load`], logging the error instead of returning
    /// it.
    pub fn load(path: impl AsRef<Path>) -> Option<Self> {
        match Self::try_load(path.as_ref()) {
            Ok(experiment) => Some(experiment),
            Err(e) => {
                nv_log::error!("Error loading file {}: {}", path.as_ref().display(), e);
                None
            }
        }
    }
}

fn lower_command(block: &mut Block, command: &Command, dark: bool, target: &str) {
    match command {
        Command::Pulse {
            element,
            name,
            amplitude,
            length,
            cycle,
        } => {
            let name = if dark && *cycle { name.inverted() } else { *name };
            block.add_play(
                name.to_string(),
                element,
                Some(amplitude_expr(amplitude)),
                Some(duration_expr(length)),
            );
        }
        Command::Cw {
            element,
            amplitude,
            length,
        } => block.add_play(
            CW_OPERATION,
            element,
            Some(amplitude_expr(amplitude)),
            Some(duration_expr(length)),
        ),
        Command::Wait { length } => block.add_wait(duration_expr(length), None),
        Command::Laser {
            mode,
            channel,
            length,
        } => block.add_play(mode, channel, None, Some(Expr::Int(*length))),
        Command::Measure {
            mode,
            channel,
            meas_len,
        } => {
            block.add_measure(mode, channel, TIMES, *meas_len, target);
            block.add_save(target, &stream_name(target));
        }
        Command::UpdateFrequency { element, scale } => {
            block.add_update_frequency(element, Expr::swept(LOOP_VAR, *scale));
        }
        Command::Align => block.add_align(),
    }
}

/// The readout after every pass, normalizing against slow drift.
struct ReferenceRun<'a> {
    measurement: &'a Measurement,
    laser: &'a str,
    wait_between_runs: i64,
    measure_delay: i64,
}

impl ReferenceRun<'_> {
    fn lower(&self, block: &mut Block, target: &str, pi_amplitude: f64) {
        let Measurement {
            mode,
            channel,
            length,
        } = self.measurement;
        block.add_wait(Expr::Int(self.wait_between_runs), None);
        block.add_align();
        block.add_play(
            PulseName::X180.to_string(),
            REFERENCE_ELEMENT,
            Some(Expr::Fixed(pi_amplitude)),
            None,
        );
        block.add_align();
        if self.measure_delay > 0 {
            block.add_wait(Expr::Int(self.measure_delay), Some(channel.as_str()));
            block.add_play(
                LASER_OPERATION,
                self.laser,
                None,
                Some(Expr::Int(ns_to_cycles(*length))),
            );
        } else {
            block.add_play(LASER_OPERATION, self.laser, None, None);
        }
        block.add_measure(mode, channel, TIMES, *length, target);
        block.add_save(target, &stream_name(target));
        block.add_wait(Expr::Int(self.wait_between_runs), Some(self.laser));
    }
}

/// An open machine, closed when dropped unless closed explicitly.
struct MachineSession {
    machine: Box<dyn Machine>,
    closed: bool,
}

impl MachineSession {
    fn new(machine: Box<dyn Machine>) -> Self {
        MachineSession {
            machine,
            closed: false,
        }
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.closed = true;
        self.machine.close()
    }
}

impl Drop for MachineSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.machine.close() {
            nv_log::error!("Failed to close machine: {}", e);
        }
    }
}

struct LiveView<'a> {
    labels: &'a PlotLabels,
    sweep: &'a [f64],
    measure_len: Option<i64>,
    n_avg: u32,
}

/// Redraws partial results while the job runs. A plotter reporting an
/// interruption halts the job; the values at that point are returned.
fn fetch_live(
    job: &mut dyn Job,
    names: &[&str],
    view: &LiveView<'_>,
    plotter: &mut dyn Plotter,
) -> Result<IndexMap<String, StreamValue>> {
    while job.is_processing() {
        let values = job.fetch(names).map_err(Error::Runtime)?;
        let partial = ExperimentResults::from_values(&values).map_err(Error::Runtime)?;
        if let Some(iteration) = partial.iteration {
            nv_log::diagnostic!(
                "Progress: {:.1}% ({} of {} averages)",
                100.0 * (iteration + 1.0) / f64::from(view.n_avg.max(1)),
                iteration + 1.0,
                view.n_avg
            );
        }
        let figure = counts_figure(view.labels, view.sweep, view.measure_len, &partial);
        if let Err(e) = plotter.draw(&figure, true) {
            nv_log::warn!("Live plot failed: {}", e);
        }
        if plotter.interrupted() {
            nv_log::info!("Live view closed, halting the running program");
            job.halt().map_err(Error::Runtime)?;
            break;
        }
    }
    job.fetch(names).map_err(Error::Runtime)
}

/// On-disk form of an [`Experiment`].
#[derive(Serialize, Deserialize)]
struct ExperimentFile {
    commands: Vec<Command>,
    sweep: SweepAxis,
    use_fixed: bool,
    measurement: Option<Measurement>,
    initialize: bool,
    measure_delay: i64,
    laser_channel: Option<String>,
    results: ExperimentResults,
    labels: PlotLabels,
    file_prefix: String,
    config: serde_json::Value,
}
