// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Boundary to the real-time program compiler and executor.
//!
//! The vendor runtime is reached only through these traits. [`dry_run`]
//! provides an in-memory implementation.

pub mod dry_run;

use indexmap::IndexMap;

use crate::hardware::HardwareConfig;
use crate::program::Program;

/// A fetched result stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamValue {
    Array(Vec<f64>),
    Scalar(f64),
}

/// Samples produced by a simulation, keyed by controller port
/// (`con1:1`, ...), one sample per nanosecond.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatedSamples {
    pub analog: IndexMap<String, Vec<f64>>,
    pub digital: IndexMap<String, Vec<bool>>,
}

/// Entry point to the runtime, opened once per configuration.
pub trait RuntimeManager {
    /// Opens a machine with `config` as its hardware document.
    fn open_machine(&self, config: &HardwareConfig) -> anyhow::Result<Box<dyn Machine>>;

    /// Simulates the first `duration_cycles` clock cycles of `program`.
    fn simulate(
        &self,
        config: &HardwareConfig,
        program: &Program,
        duration_cycles: i64,
    ) -> anyhow::Result<SimulatedSamples>;
}

pub trait Machine {
    fn execute(&mut self, program: &Program) -> anyhow::Result<Box<dyn Job>>;

    fn close(&mut self) -> anyhow::Result<()>;
}

/// A running program.
pub trait Job {
    /// Whether results are still being produced.
    fn is_processing(&mut self) -> bool;

    /// Current values of the named results.
    fn fetch(&mut self, names: &[&str]) -> anyhow::Result<IndexMap<String, StreamValue>>;

    /// Blocks until the program has finished.
    fn wait_for_all_values(&mut self) -> anyhow::Result<()>;

    /// Aborts the program.
    fn halt(&mut self) -> anyhow::Result<()>;
}
