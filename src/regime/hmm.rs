//! Univariate Gaussian Hidden Markov Model fitted with Baum-Welch

use super::algorithms::{
    backward, baum_welch_step, forward, log_emissions, state_posteriors, viterbi, LOG_EPS,
};
use crate::error::{Error, Result};
use crate::stats::{validate_series, variance};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// HMM fitting parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HmmConfig {
    /// Number of hidden states, 2 to 4
    pub n_states: usize,
    /// EM iteration cap
    pub max_iterations: usize,
    /// Stop when the log-likelihood changes by less than this
    pub tolerance: f64,
}

impl Default for HmmConfig {
    fn default() -> Self {
        Self {
            n_states: 3,
            max_iterations: 50,
            tolerance: 1e-6,
        }
    }
}

impl HmmConfig {
    pub const STATE_RANGE: (usize, usize) = (2, 4);

    pub fn with_n_states(mut self, n_states: usize) -> Self {
        self.n_states = n_states;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = Self::STATE_RANGE;
        if !(lo..=hi).contains(&self.n_states) {
            return Err(Error::config(format!(
                "n_states must be in [{lo}, {hi}], got {}",
                self.n_states
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::config("max_iterations must be at least 1"));
        }
        if !(self.tolerance > 0.0) {
            return Err(Error::config("tolerance must be positive"));
        }
        Ok(())
    }

    /// Observations needed for a fit
    pub fn min_observations(&self) -> usize {
        10.max(2 * self.n_states)
    }
}

/// HMM parameters with one Gaussian emission per state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HmmParams {
    /// Emission means
    pub means: Array1<f64>,
    /// Emission variances
    pub variances: Array1<f64>,
    /// Row-stochastic transition matrix `[from, to]`
    pub transition: Array2<f64>,
    /// Initial state distribution
    pub start: Array1<f64>,
}

impl HmmParams {
    /// Quantile initialization.
    ///
    /// Means are the sorted observations at indices `floor(i * n / n_states)`,
    /// so state 0 has the lowest mean. Every variance is the overall
    /// variance; transitions put 0.9 on the diagonal and spread 0.1 over
    /// the other states; start probabilities are uniform.
    pub fn initialize(observations: &[f64], n_states: usize) -> Self {
        let mut sorted = observations.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len();

        let mut means: Vec<f64> = (0..n_states).map(|i| sorted[i * n / n_states]).collect();
        means.sort_by(|a, b| a.total_cmp(b));

        let off_diagonal = 0.1 / (n_states - 1) as f64;
        let transition = Array2::from_shape_fn((n_states, n_states), |(i, j)| {
            if i == j {
                0.9
            } else {
                off_diagonal
            }
        });

        Self {
            means: Array1::from_vec(means),
            variances: Array1::from_elem(n_states, variance(observations)),
            transition,
            start: Array1::from_elem(n_states, 1.0 / n_states as f64),
        }
    }

    pub fn n_states(&self) -> usize {
        self.means.len()
    }

    pub fn log_start(&self) -> Array1<f64> {
        self.start.mapv(|p| (p + LOG_EPS).ln())
    }

    pub fn log_transition(&self) -> Array2<f64> {
        self.transition.mapv(|p| (p + LOG_EPS).ln())
    }

    /// Emission standard deviations
    pub fn std_devs(&self) -> Array1<f64> {
        self.variances.mapv(f64::sqrt)
    }
}

/// Outcome of [`GaussianHmm::fit`]
#[derive(Debug, Clone, Serialize)]
pub struct HmmFit {
    pub params: HmmParams,
    /// Viterbi path under the final parameters
    pub states: Vec<usize>,
    /// Log-likelihood at the start of each EM iteration
    pub log_likelihoods: Vec<f64>,
    pub iterations: usize,
    /// `false` when the iteration cap was hit first
    pub converged: bool,
}

impl HmmFit {
    pub fn final_log_likelihood(&self) -> f64 {
        self.log_likelihoods.last().copied().unwrap_or(f64::NEG_INFINITY)
    }
}

/// Gaussian Hidden Markov Model over a 1-D series
#[derive(Debug, Clone)]
pub struct GaussianHmm {
    config: HmmConfig,
    params: Option<HmmParams>,
}

impl GaussianHmm {
    /// Create an unfitted model
    pub fn new(config: HmmConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            params: None,
        })
    }

    /// Create a model from known parameters
    pub fn with_params(params: HmmParams) -> Self {
        Self {
            config: HmmConfig {
                n_states: params.n_states(),
                ..HmmConfig::default()
            },
            params: Some(params),
        }
    }

    pub fn config(&self) -> &HmmConfig {
        &self.config
    }

    pub fn params(&self) -> Option<&HmmParams> {
        self.params.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    /// Run Baum-Welch from the quantile initialization, then decode with
    /// Viterbi. The last parameters are always returned; hitting the
    /// iteration cap is reported through `converged`, not as an error.
    pub fn fit(&mut self, observations: &[f64]) -> Result<HmmFit> {
        let required = self.config.min_observations();
        if observations.len() < required {
            return Err(Error::InsufficientData {
                context: "gaussian hmm",
                required,
                actual: observations.len(),
            });
        }
        validate_series(observations)?;

        let mut params = HmmParams::initialize(observations, self.config.n_states);
        let mut log_likelihoods: Vec<f64> = Vec::with_capacity(self.config.max_iterations);
        let mut converged = false;

        for iter in 0..self.config.max_iterations {
            let (updated, log_likelihood, _) = baum_welch_step(observations, &params);
            params = updated;

            if let Some(&prev) = log_likelihoods.last() {
                if (log_likelihood - prev).abs() < self.config.tolerance {
                    log_likelihoods.push(log_likelihood);
                    converged = true;
                    tracing::debug!(iteration = iter + 1, log_likelihood, "EM converged");
                    break;
                }
            }
            log_likelihoods.push(log_likelihood);

            if (iter + 1) % 10 == 0 {
                tracing::debug!("Iteration {}: log-likelihood = {:.4}", iter + 1, log_likelihood);
            }
        }

        if !converged {
            tracing::warn!(
                max_iterations = self.config.max_iterations,
                "EM stopped at iteration cap"
            );
        }

        let (states, _) = viterbi(
            &log_emissions(observations, &params),
            &params.log_start(),
            &params.log_transition(),
        );

        let fit = HmmFit {
            iterations: log_likelihoods.len(),
            params: params.clone(),
            states,
            log_likelihoods,
            converged,
        };

        tracing::info!(
            n_states = self.config.n_states,
            iterations = fit.iterations,
            converged,
            log_likelihood = fit.final_log_likelihood(),
            "gaussian hmm fitted"
        );

        self.params = Some(params);
        Ok(fit)
    }

    /// Most likely state sequence under the fitted parameters
    pub fn decode(&self, observations: &[f64]) -> Result<Vec<usize>> {
        let params = self.fitted(observations)?;
        let (states, _) = viterbi(
            &log_emissions(observations, params),
            &params.log_start(),
            &params.log_transition(),
        );
        Ok(states)
    }

    /// State occupancy posteriors (T x N)
    pub fn posteriors(&self, observations: &[f64]) -> Result<Array2<f64>> {
        let params = self.fitted(observations)?;
        let log_emission = log_emissions(observations, params);
        let log_trans = params.log_transition();
        let (log_alpha, _) = forward(&log_emission, &params.log_start(), &log_trans);
        let log_beta = backward(&log_emission, &log_trans);
        Ok(state_posteriors(&log_alpha, &log_beta))
    }

    /// Log-likelihood of the observations
    pub fn score(&self, observations: &[f64]) -> Result<f64> {
        let params = self.fitted(observations)?;
        let (_, log_likelihood) = forward(
            &log_emissions(observations, params),
            &params.log_start(),
            &params.log_transition(),
        );
        Ok(log_likelihood)
    }

    fn fitted(&self, observations: &[f64]) -> Result<&HmmParams> {
        let params = self.params.as_ref().ok_or(Error::NotFitted)?;
        if observations.is_empty() {
            return Err(Error::InsufficientData {
                context: "gaussian hmm decoding",
                required: 1,
                actual: 0,
            });
        }
        validate_series(observations)?;
        Ok(params)
    }
}
