// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Bounded nonlinear least squares.
//!
//! Levenberg-Marquardt with Marquardt diagonal scaling and a forward
//! difference Jacobian. Trial steps are projected back into the feasible
//! box, and a parameter resting on a bound it is pushed against is held
//! fixed for that iteration.

use std::cmp::Ordering;

use nalgebra::{DMatrix, DVector};

use crate::models::Model;
use crate::{Error, Result};

const MAX_ITERATIONS: usize = 200;
const FTOL: f64 = 1e-10;
const XTOL: f64 = 1e-10;
const GTOL: f64 = 1e-14;
const INITIAL_DAMPING: f64 = 1e-3;
const MIN_DAMPING: f64 = 1e-12;
const MAX_DAMPING: f64 = 1e16;
const MIN_DIAGONAL: f64 = 1e-12;

/// Box constraints on the fit parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Bounds {
    /// The same interval for every parameter.
    Uniform { lower: f64, upper: f64 },
    PerParameter(Vec<(f64, f64)>),
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds::unbounded()
    }
}

impl Bounds {
    pub fn unbounded() -> Self {
        Bounds::uniform(f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn uniform(lower: f64, upper: f64) -> Self {
        Bounds::Uniform { lower, upper }
    }

    fn resolve(&self, n_params: usize) -> Result<Vec<(f64, f64)>> {
        let limits = match self {
            Bounds::Uniform { lower, upper } => vec![(*lower, *upper); n_params],
            Bounds::PerParameter(limits) => {
                if limits.len() != n_params {
                    return Err(Error::InvalidBounds(format!(
                        "{} intervals for {} parameters",
                        limits.len(),
                        n_params
                    )));
                }
                limits.clone()
            }
        };
        if let Some(i) = limits
            .iter()
            .position(|(lo, hi)| lo.partial_cmp(hi) != Some(Ordering::Less))
        {
            return Err(Error::InvalidBounds(format!(
                "lower bound of parameter {i} is not below its upper bound"
            )));
        }
        Ok(limits)
    }
}

/// Best-fit parameters and their estimated covariance.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub params: Vec<f64>,
    /// `(JᵀJ)⁻¹ · s²`; infinite when there are no more points than
    /// parameters.
    pub covariance: DMatrix<f64>,
    /// Half the residual sum of squares.
    pub cost: f64,
}

impl FitResult {
    /// One standard deviation per parameter.
    pub fn std_errors(&self) -> Vec<f64> {
        self.covariance.diagonal().iter().map(|v| v.sqrt()).collect()
    }
}

/// Fits one of the named lineshapes.
pub fn least_squares(
    model: Model,
    x: &[f64],
    y: &[f64],
    p0: &[f64],
    bounds: &Bounds,
) -> Result<FitResult> {
    if p0.len() != model.param_count() {
        return Err(Error::LengthMismatch {
            expected: model.param_count(),
            found: p0.len(),
        });
    }
    curve_fit(|x, p| model.eval(x, p), x, y, p0, bounds)
}

/// Fits `f(x, params)` to the points `(x, y)`, starting from `p0`.
pub fn curve_fit<F>(f: F, x: &[f64], y: &[f64], p0: &[f64], bounds: &Bounds) -> Result<FitResult>
where
    F: Fn(f64, &[f64]) -> f64,
{
    if x.is_empty() {
        return Err(Error::MissingData("data points"));
    }
    if p0.is_empty() {
        return Err(Error::MissingData("parameters"));
    }
    if x.len() != y.len() {
        return Err(Error::LengthMismatch {
            expected: x.len(),
            found: y.len(),
        });
    }
    let limits = bounds.resolve(p0.len())?;
    if let Some(i) = p0
        .iter()
        .zip(&limits)
        .position(|(p, (lo, hi))| !(lo..=hi).contains(&p))
    {
        return Err(Error::InvalidBounds(format!(
            "initial value of parameter {i} lies outside its bounds"
        )));
    }

    let problem = Problem {
        f: &f,
        x,
        y,
        limits: &limits,
    };
    let n_params = p0.len();
    let mut params = DVector::from_column_slice(p0);
    let mut residuals = problem.residuals(&params);
    let mut cost = residuals.norm_squared() / 2.0;
    if !cost.is_finite() {
        return Err(Error::Diverged(0));
    }
    let mut damping = INITIAL_DAMPING;

    for _ in 0..MAX_ITERATIONS {
        let jacobian = problem.jacobian(&params, &residuals);
        let gradient = jacobian.transpose() * &residuals;
        let pinned = problem.pinned(&params, &gradient);
        let free_gradient = gradient
            .iter()
            .zip(&pinned)
            .filter(|(_, pinned)| !**pinned)
            .fold(0.0_f64, |acc, (g, _)| acc.max(g.abs()));
        if free_gradient <= GTOL {
            return problem.finish(params, &jacobian, cost);
        }
        let normal = jacobian.transpose() * &jacobian;
        let mut rhs = -gradient;

        loop {
            let mut damped = normal.clone();
            for i in 0..n_params {
                damped[(i, i)] += damping * normal[(i, i)].max(MIN_DIAGONAL);
            }
            // Parameters held at a bound do not move.
            for (i, _) in pinned.iter().enumerate().filter(|(_, pinned)| **pinned) {
                damped.row_mut(i).fill(0.0);
                damped.column_mut(i).fill(0.0);
                damped[(i, i)] = 1.0;
                rhs[i] = 0.0;
            }
            let step = damped.cholesky().map(|c| c.solve(&rhs));
            if let Some(step) = step {
                let candidate = problem.project(&params + step);
                let candidate_residuals = problem.residuals(&candidate);
                let candidate_cost = candidate_residuals.norm_squared() / 2.0;
                if candidate_cost.is_finite() && candidate_cost < cost {
                    let converged = cost - candidate_cost <= FTOL * cost
                        || (&candidate - &params).norm() <= XTOL * (params.norm() + XTOL);
                    params = candidate;
                    residuals = candidate_residuals;
                    cost = candidate_cost;
                    damping = (damping / 10.0).max(MIN_DAMPING);
                    if converged {
                        let jacobian = problem.jacobian(&params, &residuals);
                        return problem.finish(params, &jacobian, cost);
                    }
                    break;
                }
            }
            damping *= 10.0;
            if damping > MAX_DAMPING {
                // No downhill step left at any damping.
                return problem.finish(params, &jacobian, cost);
            }
        }
    }
    Err(Error::Diverged(MAX_ITERATIONS))
}

struct Problem<'a> {
    f: &'a dyn Fn(f64, &[f64]) -> f64,
    x: &'a [f64],
    y: &'a [f64],
    limits: &'a [(f64, f64)],
}

impl Problem<'_> {
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        let p = params.as_slice();
        DVector::from_iterator(
            self.x.len(),
            self.x.iter().zip(self.y).map(|(x, y)| (self.f)(*x, p) - y),
        )
    }

    /// Parameters sitting on a bound that the descent direction points
    /// through.
    fn pinned(&self, params: &DVector<f64>, gradient: &DVector<f64>) -> Vec<bool> {
        self.limits
            .iter()
            .enumerate()
            .map(|(j, &(lower, upper))| {
                (params[j] <= lower && gradient[j] > 0.0) || (params[j] >= upper && gradient[j] < 0.0)
            })
            .collect()
    }

    fn project(&self, params: DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            params.len(),
            params
                .iter()
                .zip(self.limits)
                .map(|(p, (lo, hi))| p.clamp(*lo, *hi)),
        )
    }

    /// Forward differences, stepping backwards at an upper bound.
    fn jacobian(&self, params: &DVector<f64>, residuals: &DVector<f64>) -> DMatrix<f64> {
        let mut jacobian = DMatrix::zeros(self.x.len(), params.len());
        let mut shifted = params.clone();
        for (j, &(_, upper)) in self.limits.iter().enumerate() {
            let mut h = f64::EPSILON.sqrt() * params[j].abs().max(1.0);
            if params[j] + h > upper {
                h = -h;
            }
            shifted[j] = params[j] + h;
            let column = (self.residuals(&shifted) - residuals) / h;
            jacobian.set_column(j, &column);
            shifted[j] = params[j];
        }
        jacobian
    }

    fn finish(&self, params: DVector<f64>, jacobian: &DMatrix<f64>, cost: f64) -> Result<FitResult> {
        let (n_points, n_params) = jacobian.shape();
        let covariance = if n_points > n_params {
            let inverse = (jacobian.transpose() * jacobian)
                .try_inverse()
                .ok_or(Error::Singular)?;
            inverse * (2.0 * cost / (n_points - n_params) as f64)
        } else {
            DMatrix::from_element(n_params, n_params, f64::INFINITY)
        };
        Ok(FitResult {
            params: params.iter().copied().collect(),
            covariance,
            cost,
        })
    }
}
