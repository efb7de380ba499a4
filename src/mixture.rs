//! Two-component lognormal mixture fitted by Expectation-Maximization.
//!
//! Values are moved to log space, where the mixture is a pair of weighted normals.
//! Each iteration computes per-value responsibilities (E-step) and re-estimates
//! every component from its responsibility-weighted mean and standard deviation
//! (M-step). The loop stops once the total log-likelihood improves by less than the
//! configured tolerance. Fitted parameters are reported both in log space and as
//! linear-space lognormal moments.

use crate::{error::ContamError, math::log_sum_exp};
use serde::{Deserialize, Serialize};
use statrs::{
    distribution::{Continuous, LogNormal, Normal},
    statistics::Distribution,
};

/// Floor for a component's log-space standard deviation.
///
/// A component that captures only identical values would otherwise reach zero width
/// and an undefined density.
pub const MIN_LOG_SD: f64 = 1e-6;

/// EM hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmParams {
    /// Starting log-space means of the two components.
    pub initial_means: (f64, f64),
    /// Starting log-space standard deviation shared by both components.
    pub initial_scale: f64,
    /// Minimum log-likelihood improvement required to keep iterating.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for EmParams {
    fn default() -> Self {
        Self {
            initial_means: (0.0, 0.5),
            initial_scale: 1.0,
            tolerance: 1e-6,
            max_iterations: 1000,
        }
    }
}

impl EmParams {
    pub fn validate(&self) -> Result<(), ContamError> {
        let (m1, m2) = self.initial_means;
        if !m1.is_finite() || !m2.is_finite() {
            return Err(ContamError::invalid_parameter(format!(
                "initial means must be finite, got ({}, {})",
                m1, m2
            )));
        }
        if !(self.initial_scale.is_finite() && self.initial_scale > 0.0) {
            return Err(ContamError::invalid_parameter(format!(
                "initial scale must be positive, got {}",
                self.initial_scale
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(ContamError::invalid_parameter(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(ContamError::invalid_parameter(
                "max iterations must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Converts log-space parameters to the arithmetic mean of the lognormal.
///
/// # Arguments
///
/// * `logmu` - Mean of the underlying normal.
/// * `logsd` - Standard deviation of the underlying normal, must be positive.
///
/// # Returns
///
/// `exp(logmu + logsd^2 / 2)`, or an error for a non-positive or non-finite `logsd`.
pub fn logmu_to_mu(logmu: f64, logsd: f64) -> Result<f64, ContamError> {
    let dist = LogNormal::new(logmu, logsd)?;
    dist.mean()
        .ok_or_else(|| ContamError::invalid_parameter("lognormal mean is undefined"))
}

/// Converts log-space parameters to the arithmetic standard deviation of the lognormal.
///
/// # Arguments
///
/// * `logmu` - Mean of the underlying normal.
/// * `logsd` - Standard deviation of the underlying normal, must be positive.
///
/// # Returns
///
/// `sqrt((exp(logsd^2) - 1) * exp(2 * logmu + logsd^2))`, or an error for a
/// non-positive or non-finite `logsd`.
pub fn logsd_to_sd(logmu: f64, logsd: f64) -> Result<f64, ContamError> {
    let dist = LogNormal::new(logmu, logsd)?;
    dist.std_dev()
        .ok_or_else(|| ContamError::invalid_parameter("lognormal standard deviation is undefined"))
}

/// One weighted lognormal component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogNormalComponent {
    /// Mean of the underlying normal.
    pub log_mu: f64,
    /// Standard deviation of the underlying normal.
    pub log_sd: f64,
    pub weight: f64,
}

impl LogNormalComponent {
    /// Linear-space mean.
    pub fn mean(&self) -> Result<f64, ContamError> {
        logmu_to_mu(self.log_mu, self.log_sd)
    }

    /// Linear-space standard deviation.
    pub fn sd(&self) -> Result<f64, ContamError> {
        logsd_to_sd(self.log_mu, self.log_sd)
    }

    fn density(&self) -> Result<WeightedNormal, ContamError> {
        Ok(WeightedNormal {
            ln_weight: self.weight.ln(),
            normal: Normal::new(self.log_mu, self.log_sd)?,
        })
    }
}

/// A component's log-space normal with its log weight, built once per E-step.
struct WeightedNormal {
    ln_weight: f64,
    normal: Normal,
}

impl WeightedNormal {
    /// Log of weight times the normal density at a log-space value.
    fn ln_density(&self, log_value: f64) -> f64 {
        if self.ln_weight == f64::NEG_INFINITY {
            return f64::NEG_INFINITY;
        }
        self.ln_weight + self.normal.ln_pdf(log_value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixtureModel {
    pub components: [LogNormalComponent; 2],
}

impl MixtureModel {
    pub fn initial(params: &EmParams) -> Self {
        let (m1, m2) = params.initial_means;
        let component = |log_mu| LogNormalComponent {
            log_mu,
            log_sd: params.initial_scale,
            weight: 0.5,
        };
        Self {
            components: [component(m1), component(m2)],
        }
    }

    pub fn weights(&self) -> [f64; 2] {
        [self.components[0].weight, self.components[1].weight]
    }

    fn densities(&self) -> Result<[WeightedNormal; 2], ContamError> {
        Ok([self.components[0].density()?, self.components[1].density()?])
    }

    /// Total log-likelihood of log-space values under the mixture.
    ///
    /// # Arguments
    ///
    /// * `log_values` - Natural logs of the observed MAFs.
    ///
    /// # Returns
    ///
    /// The summed log of the mixture density, or an error if a component's scale
    /// cannot parameterise a normal.
    pub fn log_likelihood(&self, log_values: &[f64]) -> Result<f64, ContamError> {
        let [d1, d2] = self.densities()?;
        Ok(log_values
            .iter()
            .map(|&y| log_sum_exp(&[d1.ln_density(y), d2.ln_density(y)]))
            .sum())
    }

    /// Fills `responsibilities` with per-value posteriors and returns the log-likelihood.
    fn expectation(
        &self,
        log_values: &[f64],
        responsibilities: &mut [[f64; 2]],
    ) -> Result<f64, ContamError> {
        let [d1, d2] = self.densities()?;
        let mut log_likelihood = 0.0;
        for (&y, resp) in log_values.iter().zip(responsibilities.iter_mut()) {
            let joint = [d1.ln_density(y), d2.ln_density(y)];
            let total = log_sum_exp(&joint);
            resp[0] = (joint[0] - total).exp();
            resp[1] = (joint[1] - total).exp();
            log_likelihood += total;
        }
        Ok(log_likelihood)
    }

    /// Re-estimates every component from the responsibilities.
    ///
    /// A component left with no responsibility keeps its location and scale with a
    /// zero weight.
    fn maximization(&self, log_values: &[f64], responsibilities: &[[f64; 2]]) -> Self {
        let n = log_values.len() as f64;
        let mut components = self.components;
        for (k, component) in components.iter_mut().enumerate() {
            let total: f64 = responsibilities.iter().map(|r| r[k]).sum();
            if total <= f64::MIN_POSITIVE {
                component.weight = 0.0;
                continue;
            }
            let log_mu = log_values
                .iter()
                .zip(responsibilities)
                .map(|(y, r)| r[k] * y)
                .sum::<f64>()
                / total;
            let var = log_values
                .iter()
                .zip(responsibilities)
                .map(|(y, r)| r[k] * (y - log_mu).powi(2))
                .sum::<f64>()
                / total;
            *component = LogNormalComponent {
                log_mu,
                log_sd: var.sqrt().max(MIN_LOG_SD),
                weight: total / n,
            };
        }
        Self { components }
    }
}

/// Outcome of an EM run.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureFit {
    pub model: MixtureModel,
    /// M-steps performed.
    pub iterations: usize,
    pub converged: bool,
    /// Log-likelihood before the first M-step and after each one.
    pub log_likelihoods: Vec<f64>,
}

impl MixtureFit {
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihoods
            .last()
            .copied()
            .unwrap_or(f64::NEG_INFINITY)
    }

    /// The fitted model, or a convergence error carrying it as a best-effort estimate.
    pub fn into_model(self) -> Result<MixtureModel, ContamError> {
        if self.converged {
            Ok(self.model)
        } else {
            Err(ContamError::Convergence {
                iterations: self.iterations,
                best_effort: Box::new(self.model),
            })
        }
    }
}

fn count_distinct(sorted: &[f64]) -> usize {
    if sorted.is_empty() {
        return 0;
    }
    1 + sorted.windows(2).filter(|w| w[0] != w[1]).count()
}

/// Fits a two-component lognormal mixture to `values`.
///
/// Zero, negative and non-finite values carry no log-space information and are
/// dropped first. Fails when fewer than two distinct values remain. Hitting
/// `max_iterations` is not an error here: the returned fit has `converged == false`,
/// and `MixtureFit::into_model` turns that into `ContamError::Convergence`.
///
/// # Arguments
///
/// * `values` - Linear-space minor allele fractions.
/// * `params` - Starting means, starting scale, tolerance and iteration cap.
///
/// # Returns
///
/// A `MixtureFit` with the final model, the iteration count, the likelihood trace and
/// the convergence flag.
pub fn fit_lognormal_mixture(values: &[f64], params: &EmParams) -> Result<MixtureFit, ContamError> {
    params.validate()?;

    let log_values: Vec<f64> = values
        .iter()
        .filter(|v| v.is_finite() && **v > 0.0)
        .map(|v| v.ln())
        .collect();

    let mut sorted = log_values.clone();
    sorted.sort_by(f64::total_cmp);
    let distinct = count_distinct(&sorted);
    if distinct < 2 {
        return Err(ContamError::InsufficientData { distinct });
    }

    let mut model = MixtureModel::initial(params);
    let mut responsibilities = vec![[0.0; 2]; log_values.len()];
    let mut log_likelihood = model.expectation(&log_values, &mut responsibilities)?;
    let mut log_likelihoods = vec![log_likelihood];
    let mut converged = false;
    let mut iterations = 0;

    while iterations < params.max_iterations {
        iterations += 1;
        model = model.maximization(&log_values, &responsibilities);
        let next = model.expectation(&log_values, &mut responsibilities)?;
        log_likelihoods.push(next);
        let improvement = next - log_likelihood;
        log_likelihood = next;
        if improvement < params.tolerance {
            converged = true;
            break;
        }
    }

    log::debug!(
        "Mixture fit on {} values: {} iterations, converged={}, log-likelihood={:.4}",
        log_values.len(),
        iterations,
        converged,
        log_likelihood
    );

    Ok(MixtureFit {
        model,
        iterations,
        converged,
        log_likelihoods,
    })
}
