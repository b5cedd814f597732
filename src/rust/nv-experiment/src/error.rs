// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

/// Problems with the command sequence itself.
///
/// These are raised while the sequence is being defined or lowered, always
/// before anything is sent to the runtime or the instruments.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SequenceError {
    #[error("No commands have been added to the experiment")]
    NoCommands,
    #[error("No sweep has been defined for the inner loop")]
    NoSweep,
    #[error("Inconsistent measurement lengths: {expected} ns already in use, got {found} ns")]
    InconsistentMeasureLength { expected: i64, found: i64 },
    #[error("Inconsistent loop variables")]
    InconsistentSweep,
    #[error("Sweep vector cannot be all zeros")]
    ZeroSweep,
    #[error("Sweep vector cannot be empty")]
    EmptySweep,
    #[error("At most one field of a command can be swept")]
    MultipleSweepsInCommand,
    #[error("The sequence contains no measurement")]
    NoMeasurement,
    #[error("The sequence uses no laser channel")]
    NoLaserChannel,
    #[error("Unknown pulse '{0}'")]
    UnknownPulse(String),
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error(transparent)]
    Instrument(#[from] sg384::Error),
    #[error("Runtime error: {0}")]
    Runtime(anyhow::Error),
    #[error("{0} is not connected")]
    NotConnected(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Unknown configuration parameter '{0}'")]
    UnknownParameter(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
