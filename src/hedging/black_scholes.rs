//! Black-Scholes pricing of European options
//!
//! Call = S × N(d₁) - K × e^(-rT) × N(d₂)
//! Put  = K × e^(-rT) × N(-d₂) - S × N(-d₁)
//!
//! where d₁ = [ln(S/K) + (r + σ²/2)T] / (σ√T) and d₂ = d₁ - σ√T

use serde::{Deserialize, Serialize};
use statrs::function::erf::erf;
use std::f64::consts::SQRT_2;

/// Option side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    #[default]
    Call,
    Put,
}

/// Standard normal CDF
pub fn norm_cdf(x: f64) -> f64 {
    if x.is_infinite() {
        return if x > 0.0 { 1.0 } else { 0.0 };
    }
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Black-Scholes inputs for one valuation point
#[derive(Debug, Clone, Copy)]
pub struct BlackScholes {
    /// Current underlying price
    pub spot: f64,
    pub strike: f64,
    /// Time to expiry in years
    pub time_to_expiry: f64,
    pub risk_free_rate: f64,
    /// Annualized volatility
    pub volatility: f64,
}

impl BlackScholes {
    pub fn new(spot: f64, strike: f64, time_to_expiry: f64, risk_free_rate: f64, volatility: f64) -> Self {
        Self {
            spot,
            strike,
            time_to_expiry,
            risk_free_rate,
            volatility,
        }
    }

    pub fn d1(&self) -> f64 {
        let numerator = (self.spot / self.strike).ln()
            + (self.risk_free_rate + 0.5 * self.volatility.powi(2)) * self.time_to_expiry;
        let denominator = self.volatility * self.time_to_expiry.sqrt();

        if denominator.abs() < 1e-10 {
            if self.spot > self.strike {
                f64::INFINITY
            } else if self.spot < self.strike {
                f64::NEG_INFINITY
            } else {
                0.0
            }
        } else {
            numerator / denominator
        }
    }

    pub fn d2(&self) -> f64 {
        self.d1() - self.volatility * self.time_to_expiry.sqrt()
    }

    fn discount(&self) -> f64 {
        (-self.risk_free_rate * self.time_to_expiry).exp()
    }

    pub fn call_price(&self) -> f64 {
        if self.time_to_expiry <= 0.0 {
            return (self.spot - self.strike).max(0.0);
        }
        self.spot * norm_cdf(self.d1()) - self.strike * self.discount() * norm_cdf(self.d2())
    }

    pub fn put_price(&self) -> f64 {
        if self.time_to_expiry <= 0.0 {
            return (self.strike - self.spot).max(0.0);
        }
        self.strike * self.discount() * norm_cdf(-self.d2()) - self.spot * norm_cdf(-self.d1())
    }

    /// Call delta; a step function of moneyness at expiry
    pub fn call_delta(&self) -> f64 {
        if self.time_to_expiry <= 0.0 {
            return if self.spot > self.strike { 1.0 } else { 0.0 };
        }
        norm_cdf(self.d1())
    }

    /// Put delta; a step function of moneyness at expiry
    pub fn put_delta(&self) -> f64 {
        if self.time_to_expiry <= 0.0 {
            return if self.spot < self.strike { -1.0 } else { 0.0 };
        }
        norm_cdf(self.d1()) - 1.0
    }

    pub fn price(&self, option_type: OptionType) -> f64 {
        match option_type {
            OptionType::Call => self.call_price(),
            OptionType::Put => self.put_price(),
        }
    }

    pub fn delta(&self, option_type: OptionType) -> f64 {
        match option_type {
            OptionType::Call => self.call_delta(),
            OptionType::Put => self.put_delta(),
        }
    }
}

/// Payoff at expiry
pub fn payoff(option_type: OptionType, spot: f64, strike: f64) -> f64 {
    match option_type {
        OptionType::Call => (spot - strike).max(0.0),
        OptionType::Put => (strike - spot).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_norm_cdf() {
        assert_abs_diff_eq!(norm_cdf(0.0), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(norm_cdf(1.96), 0.9750021, epsilon = 1e-6);
        assert_eq!(norm_cdf(f64::INFINITY), 1.0);
    }

    #[test]
    fn test_put_call_parity() {
        let bs = BlackScholes::new(100.0, 105.0, 0.5, 0.05, 0.25);
        let parity = bs.call_price() - bs.put_price();
        let expected = 100.0 - 105.0 * (-0.05_f64 * 0.5).exp();
        assert_abs_diff_eq!(parity, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_known_call_price() {
        // S=100, K=100, T=1, r=5%, σ=20%
        let bs = BlackScholes::new(100.0, 100.0, 1.0, 0.05, 0.2);
        assert_abs_diff_eq!(bs.call_price(), 10.4506, epsilon = 1e-3);
        assert_abs_diff_eq!(bs.call_delta(), 0.6368, epsilon = 1e-3);
        assert_abs_diff_eq!(bs.put_delta(), bs.call_delta() - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_expiry_is_intrinsic() {
        let itm = BlackScholes::new(110.0, 100.0, 0.0, 0.05, 0.2);
        assert_eq!(itm.call_price(), 10.0);
        assert_eq!(itm.call_delta(), 1.0);
        assert_eq!(itm.put_delta(), 0.0);

        let otm = BlackScholes::new(90.0, 100.0, 0.0, 0.05, 0.2);
        assert_eq!(otm.call_delta(), 0.0);
        assert_eq!(otm.put_delta(), -1.0);
        assert_eq!(payoff(OptionType::Put, 90.0, 100.0), 10.0);
    }
}
