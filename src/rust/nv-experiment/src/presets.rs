// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Canned NV sequences.

use nv_units::{CLOCK_CYCLE_NS, MHZ, arange};

use crate::command::Sweepable;
use crate::error::SequenceError;
use crate::experiment::Experiment;

/// Wait after the drive of a CW ODMR run; exceeds the metastable lifetime.
pub const DEFAULT_CW_WAIT_NS: i64 = 1_000;

/// Pulse durations of a time Rabi run, in ns.
pub fn default_rabi_durations() -> Vec<f64> {
    arange(16.0, 100.0, 4.0)
}

/// Pulse amplitude scalings of a power Rabi run.
pub fn default_rabi_amplitudes() -> Vec<f64> {
    arange(0.1, 2.0, 0.02)
}

/// Drive frequencies of a pulsed ODMR run, in Hz.
pub fn default_odmr_frequencies() -> Vec<f64> {
    arange(60.0 * MHZ, 100.0 * MHZ, 1.0 * MHZ)
}

impl Experiment {
    /// Continuous drive swept over `frequencies` (Hz) during a long
    /// readout of `readout_len` ns, by default the long readout length.
    pub fn setup_cw_odmr(
        &mut self,
        frequencies: &[f64],
        readout_len: Option<i64>,
        wait_time: i64,
        amplitude: f64,
    ) -> Result<(), SequenceError> {
        let readout_len = readout_len.unwrap_or(self.config().parameters().long_meas_len_1);
        self.add_align();
        self.add_frequency_update("NV", frequencies)?;
        self.add_laser("laser_ON", "AOM1", Some(readout_len))?;
        self.add_cw_drive("NV", readout_len, amplitude)?;
        self.add_wait(wait_time)?;
        self.add_measure("long_readout", "SPCM1", Some(readout_len))?;
        self.add_measure_delay(Some(1_000));

        let labels = self.labels_mut();
        labels.x_axis_scale = 1.0 / MHZ;
        labels.x_axis_label = "MW frequency [MHz]".to_string();
        labels.title = "CW ODMR".to_string();
        Ok(())
    }

    /// Rabi sequence swept over the pulse duration, `durations` in ns.
    ///
    /// Durations below 16 ns or off the 4 ns grid are floored to whole
    /// clock cycles.
    pub fn setup_time_rabi(&mut self, durations: &[f64]) -> Result<(), SequenceError> {
        self.rabi_sequence(None, Sweepable::Value(1.0), Some(durations.into()))?;

        let labels = self.labels_mut();
        labels.x_axis_scale = CLOCK_CYCLE_NS as f64;
        labels.x_axis_label = "Rabi pulse duration [ns]".to_string();
        labels.title = "Time Rabi".to_string();
        Ok(())
    }

    /// Rabi sequence swept over the pulse amplitude scaling.
    pub fn setup_power_rabi(&mut self, amplitudes: &[f64]) -> Result<(), SequenceError> {
        self.rabi_sequence(None, amplitudes.into(), None)?;

        let x180_amp = self.config().parameters().x180_amp_nv;
        let labels = self.labels_mut();
        labels.x_axis_scale = x180_amp;
        labels.x_axis_label = "Rabi pulse amplitude [V]".to_string();
        labels.title = "Power Rabi".to_string();
        Ok(())
    }

    /// π pulse swept over `frequencies` (Hz).
    pub fn setup_pulsed_odmr(
        &mut self,
        frequencies: &[f64],
        amplitude: f64,
    ) -> Result<(), SequenceError> {
        self.rabi_sequence(Some(frequencies), Sweepable::Value(amplitude), None)?;

        let labels = self.labels_mut();
        labels.x_axis_scale = 1.0 / MHZ;
        labels.x_axis_label = "MW frequency [MHz]".to_string();
        labels.title = "Pulsed ODMR".to_string();
        Ok(())
    }

    /// Initialization, an `x180` pulse on the NV, then laser readout.
    ///
    /// Exactly one of `frequency`, `amplitude` and `length` should be a
    /// sweep. `length` is in ns and defaults to the π-pulse length.
    pub fn rabi_sequence(
        &mut self,
        frequency: Option<&[f64]>,
        amplitude: Sweepable,
        length: Option<Sweepable>,
    ) -> Result<(), SequenceError> {
        if let Some(frequency) = frequency {
            self.add_frequency_update("NV", frequency)?;
        }
        self.add_initialization("AOM1");
        self.add_pulse("x180", "NV", amplitude, length, false)?;
        self.add_align();
        self.add_laser("laser_ON", "AOM1", None)?;
        self.add_measure("readout", "SPCM1", None)?;
        Ok(())
    }
}
