// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! In-memory runtime for dry runs and tests.
//!
//! Executing a program produces, for every buffered result stream, one value
//! per sweep point from a response function. Simulation walks the program
//! on a single sequential timeline: elements do not run in parallel and
//! `align` is a no-op.

use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, bail};
use indexmap::IndexMap;
use nv_units::clock_cycles;
use sg384::TransportFactory;
use sg384::mock::{CommandLog, MockFactory};

use crate::config::{Connector, NvParameters};
use crate::hardware::{HardwareConfig, Port, Pulse, Waveform};
use crate::program::{Block, Program, Statement};
use crate::runtime::{Job, Machine, RuntimeManager, SimulatedSamples, StreamValue};

/// Longest simulation the dry run will sample, 10 ms.
pub const MAX_SIMULATION_CYCLES: i64 = 2_500_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    Open,
    Execute,
    Halt,
    Close,
    Simulate,
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeLog(Rc<RefCell<Vec<RuntimeEvent>>>);

impl RuntimeLog {
    pub fn events(&self) -> Vec<RuntimeEvent> {
        self.0.borrow().clone()
    }

    fn push(&self, event: RuntimeEvent) {
        self.0.borrow_mut().push(event);
    }
}

/// Value of result stream `name` at sweep point `x`.
pub type Response = Rc<dyn Fn(&str, f64) -> f64>;

#[derive(Clone)]
pub struct DryRunManager {
    log: RuntimeLog,
    response: Response,
    polls: usize,
    fail_execution: bool,
}

impl Default for DryRunManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DryRunManager {
    /// A runtime returning flat counts and finishing immediately.
    pub fn new() -> Self {
        DryRunManager {
            log: RuntimeLog::default(),
            response: Rc::new(|_, _| 20.0),
            polls: 0,
            fail_execution: false,
        }
    }

    pub fn with_response(mut self, response: impl Fn(&str, f64) -> f64 + 'static) -> Self {
        self.response = Rc::new(response);
        self
    }

    /// Jobs report `is_processing` for this many polls before finishing.
    pub fn with_live_polls(mut self, polls: usize) -> Self {
        self.polls = polls;
        self
    }

    /// Machines reject every program.
    pub fn failing_execution(mut self) -> Self {
        self.fail_execution = true;
        self
    }

    pub fn log(&self) -> RuntimeLog {
        self.log.clone()
    }
}

impl RuntimeManager for DryRunManager {
    fn open_machine(&self, _config: &HardwareConfig) -> anyhow::Result<Box<dyn Machine>> {
        self.log.push(RuntimeEvent::Open);
        Ok(Box::new(DryRunMachine {
            manager: self.clone(),
        }))
    }

    fn simulate(
        &self,
        config: &HardwareConfig,
        program: &Program,
        duration_cycles: i64,
    ) -> anyhow::Result<SimulatedSamples> {
        self.log.push(RuntimeEvent::Simulate);
        if duration_cycles > MAX_SIMULATION_CYCLES {
            bail!(
                "Simulation of {} clock cycles exceeds the limit of {}",
                duration_cycles,
                MAX_SIMULATION_CYCLES
            );
        }
        let duration_ns = usize::try_from(to_ns(duration_cycles))
            .map_err(|_| anyhow!("Simulation duration must not be negative"))?;
        let mut timeline = Timeline::new(config, duration_ns);
        timeline.run(program.body());
        Ok(timeline.samples)
    }
}

struct DryRunMachine {
    manager: DryRunManager,
}

impl Machine for DryRunMachine {
    fn execute(&mut self, program: &Program) -> anyhow::Result<Box<dyn Job>> {
        let manager = &self.manager;
        manager.log.push(RuntimeEvent::Execute);
        if manager.fail_execution {
            bail!("Program rejected by the dry-run runtime");
        }
        let sweep = program
            .sweep_values()
            .ok_or_else(|| anyhow!("Program has no scanning loop"))?;
        let averages = program.averages().unwrap_or(1).max(1) as f64;
        let values = program
            .stream_outputs()
            .iter()
            .map(|output| {
                let value = match output.buffer {
                    Some(_) => StreamValue::Array(
                        sweep
                            .iter()
                            .map(|x| (manager.response)(&output.name, *x))
                            .collect(),
                    ),
                    None => StreamValue::Scalar(averages - 1.0),
                };
                (output.name.clone(), value)
            })
            .collect();
        Ok(Box::new(DryRunJob {
            log: manager.log.clone(),
            values,
            polls_total: manager.polls,
            polls_left: manager.polls,
        }))
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.manager.log.push(RuntimeEvent::Close);
        Ok(())
    }
}

struct DryRunJob {
    log: RuntimeLog,
    values: IndexMap<String, StreamValue>,
    polls_total: usize,
    polls_left: usize,
}

impl DryRunJob {
    /// Scalars count up with the polls; arrays are returned as they are.
    fn current(&self, value: &StreamValue) -> StreamValue {
        match value {
            StreamValue::Scalar(last) if self.polls_left > 0 => {
                let done = (self.polls_total - self.polls_left) as f64 / self.polls_total as f64;
                StreamValue::Scalar((last * done).floor())
            }
            other => other.clone(),
        }
    }
}

impl Job for DryRunJob {
    fn is_processing(&mut self) -> bool {
        if self.polls_left == 0 {
            return false;
        }
        self.polls_left -= 1;
        true
    }

    fn fetch(&mut self, names: &[&str]) -> anyhow::Result<IndexMap<String, StreamValue>> {
        names
            .iter()
            .map(|name| {
                let value = self
                    .values
                    .get(*name)
                    .ok_or_else(|| anyhow!("No result named '{}'", name))?;
                Ok((name.to_string(), self.current(value)))
            })
            .collect()
    }

    fn wait_for_all_values(&mut self) -> anyhow::Result<()> {
        self.polls_left = 0;
        Ok(())
    }

    fn halt(&mut self) -> anyhow::Result<()> {
        self.log.push(RuntimeEvent::Halt);
        self.polls_left = 0;
        Ok(())
    }
}

fn to_ns(cycles: i64) -> i64 {
    clock_cycles(cycles).to_nanoseconds().value()
}

fn port_key(port: &Port) -> String {
    format!("{}:{}", port.0, port.1)
}

struct Timeline<'a> {
    hardware: &'a HardwareConfig,
    end: usize,
    cursor: usize,
    var: f64,
    samples: SimulatedSamples,
}

impl<'a> Timeline<'a> {
    fn new(hardware: &'a HardwareConfig, end: usize) -> Self {
        let mut samples = SimulatedSamples::default();
        for (name, controller) in &hardware.controllers {
            for port in controller.analog_outputs.keys() {
                samples
                    .analog
                    .insert(format!("{name}:{port}"), vec![0.0; end]);
            }
            for port in controller.digital_outputs.keys() {
                samples
                    .digital
                    .insert(format!("{name}:{port}"), vec![false; end]);
            }
        }
        Timeline {
            hardware,
            end,
            cursor: 0,
            var: 0.0,
            samples,
        }
    }

    fn is_done(&self) -> bool {
        self.cursor >= self.end
    }

    fn advance(&mut self, length_ns: i64) {
        self.cursor = self
            .cursor
            .saturating_add(usize::try_from(length_ns).unwrap_or(0));
    }

    fn run(&mut self, block: &Block) {
        let hardware = self.hardware;
        for statement in block.statements() {
            if self.is_done() {
                return;
            }
            match statement {
                Statement::Play {
                    operation,
                    element,
                    amplitude,
                    duration,
                } => {
                    let Some(pulse) = hardware.operation(element, operation) else {
                        nv_log::warn!("No operation '{}' on element '{}'", operation, element);
                        continue;
                    };
                    let length = duration
                        .as_ref()
                        .map_or(pulse.length, |d| to_ns(d.evaluate(self.var) as i64));
                    let scale = amplitude.as_ref().map_or(1.0, |a| a.evaluate(self.var));
                    self.play(element, pulse, scale, length);
                    self.advance(length);
                }
                Statement::Measure {
                    operation,
                    element,
                    length,
                    ..
                } => {
                    if let Some(pulse) = hardware.operation(element, operation) {
                        self.play(element, pulse, 1.0, *length);
                    }
                    self.advance(*length);
                }
                Statement::Wait { duration, .. } => {
                    self.advance(to_ns(duration.evaluate(self.var) as i64));
                }
                Statement::For {
                    start, stop, body, ..
                } => {
                    for _ in *start..*stop {
                        if self.is_done() {
                            break;
                        }
                        self.run(body);
                    }
                }
                Statement::ForEach { values, body, .. } => {
                    for value in values {
                        if self.is_done() {
                            break;
                        }
                        self.var = *value;
                        self.run(body);
                    }
                }
                _ => {}
            }
        }
    }

    fn window(&self, length_ns: i64) -> Range<usize> {
        let length = usize::try_from(length_ns).unwrap_or(0);
        self.cursor..self.cursor.saturating_add(length).min(self.end)
    }

    fn waveform_sample(&self, pulse: &Pulse, key: &str) -> f64 {
        pulse
            .waveforms
            .as_ref()
            .and_then(|w| w.get(key))
            .and_then(|name| self.hardware.waveforms.get(name))
            .map_or(0.0, Waveform::sample)
    }

    fn play(&mut self, element: &str, pulse: &Pulse, scale: f64, length_ns: i64) {
        let hardware = self.hardware;
        let Some(element) = hardware.elements.get(element) else {
            return;
        };
        let window = self.window(length_ns);
        let mut analog = Vec::new();
        if let Some(mix) = &element.mix_inputs {
            analog.push((&mix.i, self.waveform_sample(pulse, "I")));
            analog.push((&mix.q, self.waveform_sample(pulse, "Q")));
        } else if let Some(single) = &element.single_input {
            analog.push((&single.port, self.waveform_sample(pulse, "single")));
        }
        for (port, sample) in analog {
            if let Some(trace) = self.samples.analog.get_mut(&port_key(port)) {
                trace[window.clone()].fill(scale * sample);
            }
        }
        if pulse.digital_marker.is_some() {
            for input in element.digital_inputs.iter().flat_map(|inputs| inputs.values()) {
                if let Some(trace) = self.samples.digital.get_mut(&port_key(&input.port)) {
                    trace[window.clone()].fill(true);
                }
            }
        }
    }
}

/// Connects configurations to a [`DryRunManager`] and mock signal
/// generators.
#[derive(Clone)]
pub struct DryRunConnector {
    manager: DryRunManager,
    factory: MockFactory,
}

impl Default for DryRunConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl DryRunConnector {
    pub fn new() -> Self {
        Self::with_manager(DryRunManager::new())
    }

    pub fn with_manager(manager: DryRunManager) -> Self {
        DryRunConnector {
            manager,
            factory: MockFactory::new(),
        }
    }

    /// Signal generators refuse every connection.
    pub fn unreachable_sources() -> Self {
        DryRunConnector {
            manager: DryRunManager::new(),
            factory: MockFactory::unreachable(),
        }
    }

    /// Commands received by the mock signal generators.
    pub fn command_log(&self) -> CommandLog {
        self.factory.log()
    }

    pub fn runtime_log(&self) -> RuntimeLog {
        self.manager.log()
    }
}

impl Connector for DryRunConnector {
    fn runtime_manager(&self, params: &NvParameters) -> anyhow::Result<Box<dyn RuntimeManager>> {
        nv_log::info!(
            "Dry run in place of runtime at {} ({})",
            params.qop_ip,
            params.cluster_name
        );
        Ok(Box::new(self.manager.clone()))
    }

    fn transport_factory(&self) -> &dyn TransportFactory {
        &self.factory
    }

    fn settle_delay(&self) -> Duration {
        Duration::ZERO
    }
}
