//! HMM algorithms in log space: forward-backward, Baum-Welch and Viterbi
//!
//! All matrices are indexed `[time, state]` (or `[from, to]` for
//! transitions). Probabilities are shifted by `LOG_EPS` before taking a log
//! so that zero entries never produce `-inf`.

use super::hmm::HmmParams;
use crate::stats::logsumexp;
use ndarray::{Array1, Array2};
use std::f64::consts::PI;

/// Additive epsilon applied before every `ln` of a probability
pub const LOG_EPS: f64 = 1e-10;

/// Lower bound on emission variances
pub const VARIANCE_FLOOR: f64 = 1e-10;

/// Log density of `N(mean, variance)` at `x`
#[inline]
pub fn gaussian_log_pdf(x: f64, mean: f64, variance: f64) -> f64 {
    let variance = if variance <= 0.0 { VARIANCE_FLOOR } else { variance };
    -0.5 * (2.0 * PI * variance).ln() - 0.5 * (x - mean).powi(2) / variance
}

/// Per-timestep, per-state emission log-likelihoods (T x N)
pub fn log_emissions(observations: &[f64], params: &HmmParams) -> Array2<f64> {
    let n = params.n_states();
    Array2::from_shape_fn((observations.len(), n), |(t, s)| {
        gaussian_log_pdf(observations[t], params.means[s], params.variances[s])
    })
}

/// Forward recursion. Returns `log_alpha` and the total log-likelihood.
pub fn forward(
    log_emission: &Array2<f64>,
    log_start: &Array1<f64>,
    log_trans: &Array2<f64>,
) -> (Array2<f64>, f64) {
    let (t_len, n) = log_emission.dim();
    let mut log_alpha = Array2::zeros((t_len, n));
    if t_len == 0 {
        return (log_alpha, 0.0);
    }

    for s in 0..n {
        log_alpha[[0, s]] = log_start[s] + log_emission[[0, s]];
    }

    let mut terms = vec![0.0; n];
    for t in 1..t_len {
        for s in 0..n {
            for i in 0..n {
                terms[i] = log_alpha[[t - 1, i]] + log_trans[[i, s]];
            }
            log_alpha[[t, s]] = logsumexp(&terms) + log_emission[[t, s]];
        }
    }

    let last: Vec<f64> = log_alpha.row(t_len - 1).to_vec();
    (log_alpha, logsumexp(&last))
}

/// Backward recursion. `log_beta` of the final timestep is 0.
pub fn backward(log_emission: &Array2<f64>, log_trans: &Array2<f64>) -> Array2<f64> {
    let (t_len, n) = log_emission.dim();
    let mut log_beta = Array2::zeros((t_len, n));
    if t_len < 2 {
        return log_beta;
    }

    let mut terms = vec![0.0; n];
    for t in (0..t_len - 1).rev() {
        for s in 0..n {
            for j in 0..n {
                terms[j] = log_trans[[s, j]] + log_emission[[t + 1, j]] + log_beta[[t + 1, j]];
            }
            log_beta[[t, s]] = logsumexp(&terms);
        }
    }
    log_beta
}

/// State occupancy posteriors `gamma[t, s]`, each row summing to 1
pub fn state_posteriors(log_alpha: &Array2<f64>, log_beta: &Array2<f64>) -> Array2<f64> {
    let mut log_gamma = log_alpha + log_beta;
    for mut row in log_gamma.rows_mut() {
        let norm = logsumexp(&row.to_vec());
        row.mapv_inplace(|v| (v - norm).exp());
    }
    log_gamma
}

/// Transition posteriors `xi[t, i, j]`, normalized per timestep and summed
/// over time (N x N)
pub fn transition_posteriors(
    log_alpha: &Array2<f64>,
    log_beta: &Array2<f64>,
    log_emission: &Array2<f64>,
    log_trans: &Array2<f64>,
) -> Array2<f64> {
    let (t_len, n) = log_emission.dim();
    let mut xi_sum = Array2::zeros((n, n));
    let mut log_xi = Array2::zeros((n, n));

    for t in 0..t_len.saturating_sub(1) {
        for i in 0..n {
            for j in 0..n {
                log_xi[[i, j]] = log_alpha[[t, i]]
                    + log_trans[[i, j]]
                    + log_emission[[t + 1, j]]
                    + log_beta[[t + 1, j]];
            }
        }
        let flat: Vec<f64> = log_xi.iter().copied().collect();
        let norm = logsumexp(&flat);
        xi_sum.zip_mut_with(&log_xi, |acc, &v| *acc += (v - norm).exp());
    }
    xi_sum
}

/// One EM iteration.
///
/// Returns the re-estimated parameters, the log-likelihood of the data under
/// the *input* parameters and the state posteriors.
pub fn baum_welch_step(observations: &[f64], params: &HmmParams) -> (HmmParams, f64, Array2<f64>) {
    let n = params.n_states();
    let log_emission = log_emissions(observations, params);
    let log_start = params.log_start();
    let log_trans = params.log_transition();

    let (log_alpha, log_likelihood) = forward(&log_emission, &log_start, &log_trans);
    let log_beta = backward(&log_emission, &log_trans);
    let gamma = state_posteriors(&log_alpha, &log_beta);
    let xi_sum = transition_posteriors(&log_alpha, &log_beta, &log_emission, &log_trans);

    let mut start = gamma.row(0).mapv(|p| p + LOG_EPS);
    let start_total = start.sum();
    start /= start_total;

    let mut transition = xi_sum.mapv(|p| p + LOG_EPS);
    for mut row in transition.rows_mut() {
        let total = row.sum();
        row /= total;
    }

    let mut means = Array1::zeros(n);
    let mut variances = Array1::zeros(n);
    for s in 0..n {
        let weights = gamma.column(s);
        let weight_sum = weights.sum() + LOG_EPS;
        let mean = weights
            .iter()
            .zip(observations)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            / weight_sum;
        let variance = weights
            .iter()
            .zip(observations)
            .map(|(w, x)| w * (x - mean).powi(2))
            .sum::<f64>()
            / weight_sum;
        means[s] = mean;
        variances[s] = variance.max(VARIANCE_FLOOR);
    }

    let updated = HmmParams {
        means,
        variances,
        transition,
        start,
    };
    (updated, log_likelihood, gamma)
}

/// Most likely state sequence and its log probability.
///
/// Ties resolve to the lowest state index.
pub fn viterbi(
    log_emission: &Array2<f64>,
    log_start: &Array1<f64>,
    log_trans: &Array2<f64>,
) -> (Vec<usize>, f64) {
    let (t_len, n) = log_emission.dim();
    if t_len == 0 {
        return (Vec::new(), 0.0);
    }

    let mut log_delta = Array2::zeros((t_len, n));
    let mut psi = Array2::<usize>::zeros((t_len, n));

    for s in 0..n {
        log_delta[[0, s]] = log_start[s] + log_emission[[0, s]];
    }

    for t in 1..t_len {
        for s in 0..n {
            let (best_state, best_val) = argmax((0..n).map(|i| log_delta[[t - 1, i]] + log_trans[[i, s]]));
            psi[[t, s]] = best_state;
            log_delta[[t, s]] = best_val + log_emission[[t, s]];
        }
    }

    let (last_state, best_log_prob) = argmax(log_delta.row(t_len - 1).iter().copied());
    let mut path = vec![0; t_len];
    path[t_len - 1] = last_state;
    for t in (0..t_len - 1).rev() {
        path[t] = psi[[t + 1, path[t + 1]]];
    }

    (path, best_log_prob)
}

/// Index and value of the first maximum
fn argmax(values: impl Iterator<Item = f64>) -> (usize, f64) {
    values
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best_i, best_v), (i, v)| {
            if v > best_v {
                (i, v)
            } else {
                (best_i, best_v)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn two_state_params() -> HmmParams {
        HmmParams {
            means: array![-1.0, 1.0],
            variances: array![0.25, 0.25],
            transition: array![[0.9, 0.1], [0.1, 0.9]],
            start: array![0.5, 0.5],
        }
    }

    #[test]
    fn test_gaussian_log_pdf() {
        let expected = -0.5 * (2.0 * PI).ln();
        assert_abs_diff_eq!(gaussian_log_pdf(0.0, 0.0, 1.0), expected, epsilon = 1e-12);
        assert!(gaussian_log_pdf(0.0, 0.0, 0.0).is_finite());
    }

    #[test]
    fn test_posteriors_normalized() {
        let params = two_state_params();
        let obs = [-1.1, -0.9, 1.2, 0.8, 1.0];
        let log_e = log_emissions(&obs, &params);
        let (alpha, ll) = forward(&log_e, &params.log_start(), &params.log_transition());
        let beta = backward(&log_e, &params.log_transition());
        let gamma = state_posteriors(&alpha, &beta);

        assert!(ll.is_finite());
        for row in gamma.rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
        }
        assert!(gamma[[0, 0]] > 0.9);
        assert!(gamma[[4, 1]] > 0.9);

        let xi = transition_posteriors(&alpha, &beta, &log_e, &params.log_transition());
        assert_abs_diff_eq!(xi.sum(), (obs.len() - 1) as f64, epsilon = 1e-9);
    }

    #[test]
    fn test_forward_backward_agree() {
        let params = two_state_params();
        let obs = [0.3, -0.2, 0.9, -1.4];
        let log_e = log_emissions(&obs, &params);
        let log_start = params.log_start();
        let (_, ll_forward) = forward(&log_e, &log_start, &params.log_transition());
        let beta = backward(&log_e, &params.log_transition());

        let ll_backward = logsumexp(
            &(0..2)
                .map(|s| log_start[s] + log_e[[0, s]] + beta[[0, s]])
                .collect::<Vec<_>>(),
        );
        assert_abs_diff_eq!(ll_forward, ll_backward, epsilon = 1e-9);
    }

    #[test]
    fn test_viterbi_segments() {
        let params = two_state_params();
        let obs = [-1.0, -1.1, -0.9, 1.0, 1.1, 0.9];
        let log_e = log_emissions(&obs, &params);
        let (path, log_prob) = viterbi(&log_e, &params.log_start(), &params.log_transition());
        assert_eq!(path, vec![0, 0, 0, 1, 1, 1]);
        assert!(log_prob.is_finite());
    }

    #[test]
    fn test_argmax_first_wins() {
        assert_eq!(argmax([1.0, 3.0, 3.0].into_iter()).0, 1);
    }
}
