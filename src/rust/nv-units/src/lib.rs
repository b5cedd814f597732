// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Units used across the NV experiment stack.
//!
//! The real-time processor runs on a 4 ns clock; every duration handed to it
//! is expressed in whole clock cycles. Users, configuration files and plots
//! speak nanoseconds, hertz and dBm. This crate keeps both worlds apart with
//! unit-tagged quantities and provides plain scalar factors for building
//! sweep vectors.

use std::fmt::{self, Display, Formatter};

#[macro_use]
pub mod unit;

quantity!(Duration);
quantity!(Frequency);
quantity!(Power);

/// Length of one real-time clock cycle.
pub const CLOCK_CYCLE_NS: i64 = 4;

pub const NS: f64 = 1.0;

pub const MHZ: f64 = 1e6;
pub const GHZ: f64 = 1e9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Nanosecond;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockCycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hertz;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dbm;

impl Display for Nanosecond {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ns")
    }
}

impl Display for ClockCycle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "cycles")
    }
}

impl Display for Hertz {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Hz")
    }
}

impl Display for Dbm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "dBm")
    }
}

pub const fn nanoseconds(value: i64) -> Duration<Nanosecond, i64> {
    Duration {
        value,
        unit: Nanosecond,
    }
}

pub const fn clock_cycles(value: i64) -> Duration<ClockCycle, i64> {
    Duration {
        value,
        unit: ClockCycle,
    }
}

pub const fn hertz(value: f64) -> Frequency<Hertz> {
    Frequency { value, unit: Hertz }
}

pub fn megahertz(value: f64) -> Frequency<Hertz> {
    hertz(value * MHZ)
}

pub fn gigahertz(value: f64) -> Frequency<Hertz> {
    hertz(value * GHZ)
}

pub const fn dbm(value: f64) -> Power<Dbm> {
    Power { value, unit: Dbm }
}

impl Duration<Nanosecond, i64> {
    /// Floors to whole clock cycles, matching integer division on the
    /// processor.
    pub fn to_clock_cycles(self) -> Duration<ClockCycle, i64> {
        clock_cycles(self.value.div_euclid(CLOCK_CYCLE_NS))
    }
}

impl Duration<ClockCycle, i64> {
    pub fn to_nanoseconds(self) -> Duration<Nanosecond, i64> {
        nanoseconds(self.value.saturating_mul(CLOCK_CYCLE_NS))
    }
}

impl Frequency<Hertz> {
    pub fn to_megahertz(self) -> f64 {
        self.value / MHZ
    }
}

/// Converts a nanosecond value to clock cycles.
pub fn ns_to_cycles(ns: i64) -> i64 {
    nanoseconds(ns).to_clock_cycles().value()
}

/// Floors a (possibly fractional) nanosecond value to clock cycles.
pub fn ns_to_cycles_f64(ns: f64) -> f64 {
    (ns / CLOCK_CYCLE_NS as f64).floor()
}

/// Half-open range `[start, stop)` with the given step.
///
/// Values are computed as `start + i * step` rather than by accumulation.
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if step == 0.0 || !step.is_finite() {
        return Vec::new();
    }
    let count = ((stop - start) / step).ceil();
    if count <= 0.0 || !count.is_finite() {
        return Vec::new();
    }
    (0..count as usize)
        .map(|i| start + i as f64 * step)
        .collect()
}
