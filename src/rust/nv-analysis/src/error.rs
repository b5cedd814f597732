// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No {0} to fit")]
    MissingData(&'static str),
    #[error("Length mismatch: expected {expected} values, found {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("Normal matrix is singular, covariance is undefined")]
    Singular,
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),
    #[error("Optimal parameters not found within {0} iterations")]
    Diverged(usize),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
