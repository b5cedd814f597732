// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Logging macros for the NV crates.
//!
//! Records go through the `log` facade with the target
//! `nv.rust::<module path>`, so a backend filters the whole stack with a
//! single `nv.rust` directive. Diagnostics are info records that are only
//! emitted once [`init_logging`] enabled them.

use std::sync::atomic::{AtomicBool, Ordering};

#[doc(hidden)]
pub use log as _log;

static DIAGNOSTICS_ENABLED: AtomicBool = AtomicBool::new(false);

#[doc(hidden)]
#[macro_export]
macro_rules! __record {
    ($level:ident, $msg:literal $(, $arg:expr)*) => {
        $crate::_log::$level!(target: concat!("nv.rust::", module_path!()), $msg $(, $arg)*)
    };
}

#[macro_export]
macro_rules! info {
    ($msg:literal $(, $arg:expr)* $(,)?) => {
        $crate::__record!(info, $msg $(, $arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($msg:literal $(, $arg:expr)* $(,)?) => {
        $crate::__record!(warn, $msg $(, $arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($msg:literal $(, $arg:expr)* $(,)?) => {
        $crate::__record!(error, $msg $(, $arg)*)
    };
}

#[macro_export]
macro_rules! debug {
    ($msg:literal $(, $arg:expr)* $(,)?) => {
        $crate::__record!(debug, $msg $(, $arg)*)
    };
}

/// Per-iteration progress during live acquisition; too chatty for the
/// default level.
#[macro_export]
macro_rules! diagnostic {
    ($msg:literal $(, $arg:expr)* $(,)?) => {
        if $crate::is_diagnostics_enabled() {
            $crate::__record!(info, $msg $(, $arg)*)
        }
    };
}

pub fn is_diagnostics_enabled() -> bool {
    DIAGNOSTICS_ENABLED.load(Ordering::Acquire)
}

/// Switches diagnostics on or off.
///
/// The logger backend itself is installed by the binary (`nvctl` uses
/// `env_logger`); libraries never install one.
pub fn init_logging(with_diagnostics: bool) {
    DIAGNOSTICS_ENABLED.store(with_diagnostics, Ordering::Release);
}
