//! Binary logistic regression with L1 / L2 penalties.
//!
//! Minimizes `mean log-loss + R(w) / (C * n)` where `R` is `½‖w‖²` (l2),
//! `‖w‖₁` (l1) or zero (none). The intercept is never penalized.

use crate::error::MlError;
use crate::models::{Classifier, check_fit_input, param_f64, param_usize, type_error};
use crate::search::params::ParamSet;
use ndarray::{Array1, Array2, Zip};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Penalty {
    L1,
    L2,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Solver {
    /// Plain full-batch gradient descent; smooth penalties only.
    GradientDescent,
    /// Accelerated proximal gradient (FISTA) with soft thresholding.
    ProximalGradient,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegressionConfig {
    /// Inverse regularization strength.
    pub c: f64,
    pub penalty: Penalty,
    pub solver: Solver,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for LogisticRegressionConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            penalty: Penalty::L2,
            solver: Solver::ProximalGradient,
            max_iter: 1000,
            tol: 1e-4,
        }
    }
}

impl LogisticRegressionConfig {
    pub fn from_params(params: &ParamSet) -> Result<Self, MlError> {
        let defaults = Self::default();
        let c = param_f64(params, "C", defaults.c)?;
        if !(c > 0.0 && c.is_finite()) {
            return Err(MlError::invalid_input(format!("C must be positive, got {c}")));
        }

        let penalty = match params.get("penalty") {
            None => defaults.penalty,
            Some(v) => match v.as_str() {
                Some("l1") => Penalty::L1,
                Some("l2") => Penalty::L2,
                Some("none") => Penalty::None,
                _ => return Err(type_error("penalty", "one of \"l1\", \"l2\", \"none\"", v)),
            },
        };
        let solver = match params.get("solver") {
            None => defaults.solver,
            Some(v) => match v.as_str() {
                Some("gradient_descent") => Solver::GradientDescent,
                Some("proximal_gradient") => Solver::ProximalGradient,
                _ => {
                    return Err(type_error(
                        "solver",
                        "one of \"gradient_descent\", \"proximal_gradient\"",
                        v,
                    ));
                }
            },
        };

        let max_iter = param_usize(params, "max_iter", defaults.max_iter)?;
        let tol = param_f64(params, "tol", defaults.tol)?;
        if max_iter == 0 || !(tol > 0.0) {
            return Err(MlError::invalid_input("max_iter and tol must be positive"));
        }

        let config = Self {
            c,
            penalty,
            solver,
            max_iter,
            tol,
        };
        config.check_compatible()?;
        Ok(config)
    }

    pub fn check_compatible(&self) -> Result<(), MlError> {
        if self.solver == Solver::GradientDescent && self.penalty == Penalty::L1 {
            return Err(MlError::model(
                "solver gradient_descent supports only l2 or none penalties, got l1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    config: LogisticRegressionConfig,
    weights: Option<Array1<f64>>,
    intercept: f64,
}

impl LogisticRegression {
    pub fn new(config: LogisticRegressionConfig) -> Self {
        Self {
            config,
            weights: None,
            intercept: 0.0,
        }
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.weights.as_ref()
    }

    fn decision(&self, x: &Array2<f64>) -> Result<Array1<f64>, MlError> {
        let w = self
            .weights
            .as_ref()
            .ok_or_else(|| MlError::model("logistic regression used before fit"))?;
        if x.ncols() != w.len() {
            return Err(MlError::model(format!(
                "model fitted on {} features, got {}",
                w.len(),
                x.ncols()
            )));
        }
        Ok(x.dot(w) + self.intercept)
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), MlError> {
        self.config.check_compatible()?;
        let n_classes = check_fit_input(x, y)?;
        if n_classes > 2 {
            return Err(MlError::model(format!(
                "logistic regression is binary, got {n_classes} classes"
            )));
        }
        if !y.contains(&0) || !y.contains(&1) {
            return Err(MlError::model("logistic regression needs samples of both classes"));
        }

        let (n, p) = x.dim();
        let nf = n as f64;
        let targets: Array1<f64> = y.iter().map(|&t| t as f64).collect();
        let lambda = match self.config.penalty {
            Penalty::None => 0.0,
            Penalty::L1 | Penalty::L2 => 1.0 / (self.config.c * nf),
        };
        let smooth_l2 = if self.config.penalty == Penalty::L2 { lambda } else { 0.0 };

        // Lipschitz bound of the smooth part, intercept column included.
        let lipschitz = 0.25 * (1.0 + x.iter().map(|v| v * v).sum::<f64>() / nf) + smooth_l2;
        let step = 1.0 / lipschitz;

        let gradient = |w: &Array1<f64>, b: f64| -> (Array1<f64>, f64) {
            let mut residual = x.dot(w) + b;
            Zip::from(&mut residual)
                .and(&targets)
                .for_each(|r, &t| *r = sigmoid(*r) - t);
            let gw = x.t().dot(&residual) / nf + w * smooth_l2;
            let gb = residual.sum() / nf;
            (gw, gb)
        };

        let mut w = Array1::<f64>::zeros(p);
        let mut b = 0.0;
        let mut iterations = 0;

        match self.config.solver {
            Solver::GradientDescent => {
                for it in 1..=self.config.max_iter {
                    iterations = it;
                    let (gw, gb) = gradient(&w, b);
                    let w_next = &w - &(gw * step);
                    let b_next = b - step * gb;
                    let delta = max_change(&w, &w_next, b, b_next);
                    w = w_next;
                    b = b_next;
                    if delta < self.config.tol {
                        break;
                    }
                }
            }
            Solver::ProximalGradient => {
                let threshold = if self.config.penalty == Penalty::L1 {
                    step * lambda
                } else {
                    0.0
                };
                let mut vw = w.clone();
                let mut vb = b;
                let mut t = 1.0_f64;
                for it in 1..=self.config.max_iter {
                    iterations = it;
                    let (gw, gb) = gradient(&vw, vb);
                    let mut w_next = &vw - &(gw * step);
                    if threshold > 0.0 {
                        w_next.mapv_inplace(|v| soft_threshold(v, threshold));
                    }
                    let b_next = vb - step * gb;

                    let t_next = (1.0 + (1.0 + 4.0 * t * t).sqrt()) / 2.0;
                    let momentum = (t - 1.0) / t_next;
                    vw = &w_next + &((&w_next - &w) * momentum);
                    vb = b_next + momentum * (b_next - b);

                    let delta = max_change(&w, &w_next, b, b_next);
                    w = w_next;
                    b = b_next;
                    t = t_next;
                    if delta < self.config.tol {
                        break;
                    }
                }
            }
        }

        if iterations == self.config.max_iter {
            tracing::debug!(max_iter = self.config.max_iter, "logistic regression hit max_iter");
        }
        self.weights = Some(w);
        self.intercept = b;
        tracing::trace!(iterations, intercept = b, "fitted logistic regression");
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, MlError> {
        let scores = self.decision(x)?;
        let mut proba = Array2::zeros((x.nrows(), 2));
        for (i, &s) in scores.iter().enumerate() {
            let p = sigmoid(s);
            proba[[i, 0]] = 1.0 - p;
            proba[[i, 1]] = p;
        }
        Ok(proba)
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn soft_threshold(v: f64, t: f64) -> f64 {
    if v > t {
        v - t
    } else if v < -t {
        v + t
    } else {
        0.0
    }
}

fn max_change(w: &Array1<f64>, w_next: &Array1<f64>, b: f64, b_next: f64) -> f64 {
    w.iter()
        .zip(w_next.iter())
        .map(|(a, c)| (a - c).abs())
        .fold((b - b_next).abs(), f64::max)
}
