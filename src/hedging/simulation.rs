//! Price path simulation and hedge P&L accounting

use super::black_scholes::{payoff, OptionType};
use crate::error::{Error, Result};
use crate::random::RandomSource;
use serde::Serialize;

/// Geometric Brownian motion path of `n_steps + 1` prices starting at `s0`
pub fn simulate_gbm_path(
    s0: f64,
    rate: f64,
    volatility: f64,
    maturity: f64,
    n_steps: usize,
    rng: &mut RandomSource,
) -> Vec<f64> {
    let dt = maturity / n_steps as f64;
    let drift = (rate - 0.5 * volatility * volatility) * dt;
    let diffusion = volatility * dt.sqrt();

    let mut prices = Vec::with_capacity(n_steps + 1);
    prices.push(s0);
    let mut spot = s0;
    for _ in 0..n_steps {
        spot *= (drift + diffusion * rng.normal()).exp();
        prices.push(spot);
    }
    prices
}

/// Accounting of one hedged path
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HedgeOutcome {
    pub option_payoff: f64,
    /// `Σ hedge[t] * (S[t+1] - S[t])`
    pub hedge_pnl: f64,
    /// Rebalancing costs from step 1 onward
    pub transaction_costs: f64,
    /// `option_payoff - hedge_pnl - transaction_costs`
    pub hedging_error: f64,
}

/// Hedge P&L of holding `hedges[t]` units over `[t, t+1]`.
///
/// `hedges` has one position per step (`prices.len() - 1`). Rebalancing
/// from `hedges[t-1]` to `hedges[t]` costs `|Δh| * S[t] * transaction_cost`.
pub fn hedge_pnl(
    prices: &[f64],
    hedges: &[f64],
    strike: f64,
    option_type: OptionType,
    transaction_cost: f64,
) -> Result<HedgeOutcome> {
    if prices.len() < 2 {
        return Err(Error::InsufficientData {
            context: "hedge pnl",
            required: 2,
            actual: prices.len(),
        });
    }
    if hedges.len() != prices.len() - 1 {
        return Err(Error::DimensionMismatch {
            expected: prices.len() - 1,
            actual: hedges.len(),
        });
    }

    let mut pnl = 0.0;
    let mut costs = 0.0;
    for t in 0..hedges.len() {
        pnl += hedges[t] * (prices[t + 1] - prices[t]);
        if t > 0 {
            costs += (hedges[t] - hedges[t - 1]).abs() * prices[t] * transaction_cost;
        }
    }

    let option_payoff = payoff(option_type, prices[prices.len() - 1], strike);
    Ok(HedgeOutcome {
        option_payoff,
        hedge_pnl: pnl,
        transaction_costs: costs,
        hedging_error: option_payoff - pnl - costs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_gbm_path_shape() {
        let mut rng = RandomSource::new(42);
        let path = simulate_gbm_path(100.0, 0.05, 0.2, 0.25, 50, &mut rng);
        assert_eq!(path.len(), 51);
        assert_eq!(path[0], 100.0);
        assert!(path.iter().all(|&p| p > 0.0));
    }

    #[test]
    fn test_zero_vol_path_grows_at_rate() {
        let mut rng = RandomSource::new(1);
        let path = simulate_gbm_path(100.0, 0.05, 0.0, 1.0, 10, &mut rng);
        assert_abs_diff_eq!(path[10], 100.0 * 0.05_f64.exp(), epsilon = 1e-9);
    }

    #[test]
    fn test_hedge_pnl_accounting() {
        let prices = [100.0, 102.0, 101.0, 105.0];
        let hedges = [0.5, 0.6, 0.7];
        let outcome = hedge_pnl(&prices, &hedges, 100.0, OptionType::Call, 0.01).unwrap();

        // 0.5*2 + 0.6*(-1) + 0.7*4
        assert_abs_diff_eq!(outcome.hedge_pnl, 3.2, epsilon = 1e-12);
        // 0.1*102*0.01 + 0.1*101*0.01
        assert_abs_diff_eq!(outcome.transaction_costs, 0.203, epsilon = 1e-12);
        assert_abs_diff_eq!(outcome.option_payoff, 5.0);
        assert_abs_diff_eq!(outcome.hedging_error, 5.0 - 3.2 - 0.203, epsilon = 1e-12);
    }

    #[test]
    fn test_hedge_length_mismatch() {
        assert!(matches!(
            hedge_pnl(&[100.0, 101.0], &[0.5, 0.5], 100.0, OptionType::Call, 0.0),
            Err(Error::DimensionMismatch { expected: 1, actual: 2 })
        ));
    }
}
