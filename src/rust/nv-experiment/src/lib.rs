// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Authoring and execution of NV-centre magnetic resonance experiments.
//!
//! An [`Experiment`] accumulates commands against a [`ConfigNv`], resolves
//! the single swept axis and lowers the sequence into a [`Program`] for the
//! real-time runtime. Execution drives the runtime and the SG384 sources
//! through the traits in [`runtime`] and [`config::Connector`].

pub mod command;
pub mod config;
pub mod error;
pub mod experiment;
pub mod hardware;
pub mod plot;
pub mod presets;
pub mod program;
pub mod results;
pub mod runtime;
pub mod sweep;

pub use crate::command::{Command, PulseName, Sweepable, ValueOrSweep};
pub use crate::config::{ConfigNv, ConnectOptions, Connector, NvParameters};
pub use crate::error::{Error, Result, SequenceError};
pub use crate::experiment::{ExecuteOptions, Experiment, Measurement};
pub use crate::hardware::{HardwareConfig, iq_imbalance};
pub use crate::plot::{Figure, LogPlotter, NoopPlotter, PlotLabels, Plotter, Series};
pub use crate::program::Program;
pub use crate::results::ExperimentResults;
pub use crate::sweep::SweepAxis;
