// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Fitting of NV contrast curves to lineshape models.

pub mod error;
pub mod fitter;
pub mod least_squares;
pub mod models;

pub use crate::error::{Error, Result};
pub use crate::fitter::DataFitter;
pub use crate::least_squares::{Bounds, FitResult, curve_fit, least_squares};
pub use crate::models::{Model, exp_damped_cosine, gaussian, lorentzian};
