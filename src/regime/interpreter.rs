//! Regime interpretation from fitted state statistics

use super::hmm::HmmParams;
use crate::data::TRADING_DAYS;
use crate::error::{Error, Result};
use crate::stats::{mean, std_dev};
use serde::{Serialize, Serializer};
use std::fmt;

/// Named market regime for an HMM state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegimeLabel {
    BullMarket,
    HighVolBull,
    CrisisBear,
    BearMarket,
    HighVolatility,
    LowVolatility,
    /// No bucket matched; carries the state index
    Other(usize),
}

impl RegimeLabel {
    /// Bucket a state by its annualized mean return and volatility, both in
    /// percent. Checked in order: strong positive drift, strong negative
    /// drift, then volatility level.
    pub fn classify(state: usize, mean_pct: f64, vol_pct: f64) -> Self {
        if mean_pct > 10.0 && vol_pct < 20.0 {
            RegimeLabel::BullMarket
        } else if mean_pct > 10.0 {
            RegimeLabel::HighVolBull
        } else if mean_pct < -10.0 && vol_pct > 25.0 {
            RegimeLabel::CrisisBear
        } else if mean_pct < -10.0 {
            RegimeLabel::BearMarket
        } else if vol_pct > 30.0 {
            RegimeLabel::HighVolatility
        } else if vol_pct < 15.0 {
            RegimeLabel::LowVolatility
        } else {
            RegimeLabel::Other(state)
        }
    }
}

impl fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegimeLabel::BullMarket => write!(f, "Bull Market"),
            RegimeLabel::HighVolBull => write!(f, "High-Vol Bull"),
            RegimeLabel::CrisisBear => write!(f, "Crisis/Bear"),
            RegimeLabel::BearMarket => write!(f, "Bear Market"),
            RegimeLabel::HighVolatility => write!(f, "High Volatility"),
            RegimeLabel::LowVolatility => write!(f, "Low Volatility"),
            RegimeLabel::Other(state) => write!(f, "Regime {}", state + 1),
        }
    }
}

impl Serialize for RegimeLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Annualized percentage mean of daily log returns
pub fn annualized_return_pct(daily_mean: f64) -> f64 {
    daily_mean * TRADING_DAYS * 100.0
}

/// Annualized percentage volatility of a daily standard deviation
pub fn annualized_vol_pct(daily_std: f64) -> f64 {
    daily_std * TRADING_DAYS.sqrt() * 100.0
}

/// Label and annualized emission statistics of one state
#[derive(Debug, Clone, Serialize)]
pub struct StateLabel {
    pub state: usize,
    pub label: RegimeLabel,
    pub mean_pct: f64,
    pub vol_pct: f64,
}

impl StateLabel {
    pub fn description(&self) -> String {
        format!("Avg Return: {:.1}%, Vol: {:.1}%", self.mean_pct, self.vol_pct)
    }
}

/// Label every state of a fitted model
pub fn label_states(params: &HmmParams) -> Vec<StateLabel> {
    params
        .means
        .iter()
        .zip(params.std_devs().iter())
        .enumerate()
        .map(|(state, (&m, &s))| {
            let mean_pct = annualized_return_pct(m);
            let vol_pct = annualized_vol_pct(s);
            StateLabel {
                state,
                label: RegimeLabel::classify(state, mean_pct, vol_pct),
                mean_pct,
                vol_pct,
            }
        })
        .collect()
}

/// Realized statistics of the days assigned to one state
#[derive(Debug, Clone, Serialize)]
pub struct RegimeStats {
    pub state: usize,
    pub days: usize,
    pub pct_time: f64,
    pub avg_return_annualized: f64,
    pub volatility_annualized: f64,
    pub sharpe_ratio: f64,
}

/// Per-state realized statistics over a decoded path.
///
/// States with no assigned days are omitted.
pub fn regime_statistics(
    returns: &[f64],
    states: &[usize],
    n_states: usize,
) -> Result<Vec<RegimeStats>> {
    if returns.len() != states.len() {
        return Err(Error::DimensionMismatch {
            expected: returns.len(),
            actual: states.len(),
        });
    }

    Ok((0..n_states)
        .filter_map(|state| {
            let in_state: Vec<f64> = returns
                .iter()
                .zip(states)
                .filter(|(_, &s)| s == state)
                .map(|(&r, _)| r)
                .collect();
            if in_state.is_empty() {
                return None;
            }

            let avg_return = annualized_return_pct(mean(&in_state));
            let volatility = annualized_vol_pct(std_dev(&in_state));
            Some(RegimeStats {
                state,
                days: in_state.len(),
                pct_time: in_state.len() as f64 / states.len() as f64 * 100.0,
                avg_return_annualized: avg_return,
                volatility_annualized: volatility,
                sharpe_ratio: if volatility > 0.0 {
                    avg_return / volatility
                } else {
                    0.0
                },
            })
        })
        .collect())
}

/// Number of positions where the state changes
pub fn count_transitions(states: &[usize]) -> usize {
    states.windows(2).filter(|w| w[0] != w[1]).count()
}

/// Headline view of a decoded path
#[derive(Debug, Clone, Serialize)]
pub struct RegimeSummary {
    pub current_state: usize,
    pub current_label: RegimeLabel,
    pub total_transitions: usize,
    /// `len / max(transitions, 1)`
    pub avg_regime_duration: f64,
}

impl RegimeSummary {
    /// `None` for an empty path
    pub fn from_path(states: &[usize], labels: &[StateLabel]) -> Option<Self> {
        let current_state = *states.last()?;
        let current_label = labels
            .iter()
            .find(|l| l.state == current_state)
            .map(|l| l.label)
            .unwrap_or(RegimeLabel::Other(current_state));
        let total_transitions = count_transitions(states);

        Some(Self {
            current_state,
            current_label,
            total_transitions,
            avg_regime_duration: states.len() as f64 / total_transitions.max(1) as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classify_buckets() {
        assert_eq!(RegimeLabel::classify(0, 15.0, 12.0), RegimeLabel::BullMarket);
        assert_eq!(RegimeLabel::classify(0, 15.0, 25.0), RegimeLabel::HighVolBull);
        assert_eq!(RegimeLabel::classify(0, -20.0, 40.0), RegimeLabel::CrisisBear);
        assert_eq!(RegimeLabel::classify(0, -20.0, 18.0), RegimeLabel::BearMarket);
        assert_eq!(RegimeLabel::classify(0, 0.0, 35.0), RegimeLabel::HighVolatility);
        assert_eq!(RegimeLabel::classify(0, 0.0, 10.0), RegimeLabel::LowVolatility);
        assert_eq!(RegimeLabel::classify(2, 0.0, 20.0), RegimeLabel::Other(2));
        assert_eq!(RegimeLabel::Other(2).to_string(), "Regime 3");
    }

    #[test]
    fn test_label_serializes_as_text() {
        let json = serde_json::to_string(&RegimeLabel::CrisisBear).unwrap();
        assert_eq!(json, "\"Crisis/Bear\"");
    }

    #[test]
    fn test_label_states() {
        let params = HmmParams {
            means: array![-0.002, 0.001],
            variances: array![0.0009, 0.0001],
            transition: array![[0.9, 0.1], [0.1, 0.9]],
            start: array![0.5, 0.5],
        };
        let labels = label_states(&params);
        // -50.4% mean, 47.6% vol
        assert_eq!(labels[0].label, RegimeLabel::CrisisBear);
        // 25.2% mean, 15.9% vol
        assert_eq!(labels[1].label, RegimeLabel::BullMarket);
    }

    #[test]
    fn test_regime_statistics_and_summary() {
        let returns = [0.01, 0.02, -0.01, -0.03, 0.0];
        let states = [1, 1, 0, 0, 1];
        let stats = regime_statistics(&returns, &states, 3).unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].days, 2);
        assert!((stats[1].pct_time - 60.0).abs() < 1e-12);

        let summary = RegimeSummary::from_path(&states, &[]).unwrap();
        assert_eq!(summary.total_transitions, 2);
        assert!((summary.avg_regime_duration - 2.5).abs() < 1e-12);
        assert_eq!(summary.current_state, 1);
        assert!(RegimeSummary::from_path(&[], &[]).is_none());

        assert!(regime_statistics(&returns, &states[..3], 2).is_err());
    }
}
