//! Per-cluster summaries and equal-weight cluster portfolios

use crate::data::TRADING_DAYS;
use crate::error::{Error, Result};
use crate::stats::{mean, std_dev};
use ndarray::Array2;
use serde::Serialize;

/// Members and mean feature values of one cluster
#[derive(Debug, Clone, Serialize)]
pub struct ClusterStats {
    pub cluster: usize,
    pub size: usize,
    /// Row indices of the members
    pub members: Vec<usize>,
    /// Mean of each feature column over the members
    pub feature_means: Vec<f64>,
}

/// Summaries of every non-empty cluster
pub fn cluster_statistics(data: &Array2<f64>, labels: &[usize], k: usize) -> Result<Vec<ClusterStats>> {
    if labels.len() != data.nrows() {
        return Err(Error::DimensionMismatch {
            expected: data.nrows(),
            actual: labels.len(),
        });
    }

    Ok((0..k)
        .filter_map(|cluster| {
            let members: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter_map(|(i, &l)| (l == cluster).then_some(i))
                .collect();
            if members.is_empty() {
                return None;
            }
            let feature_means = (0..data.ncols())
                .map(|col| mean(&members.iter().map(|&i| data[[i, col]]).collect::<Vec<_>>()))
                .collect();
            Some(ClusterStats {
                cluster,
                size: members.len(),
                members,
                feature_means,
            })
        })
        .collect())
}

/// Equal-weight portfolio of a cluster's members
#[derive(Debug, Clone, Serialize)]
pub struct ClusterPortfolio {
    pub cluster: usize,
    pub tickers: Vec<String>,
    /// `(exp(Σ r) - 1) * 100`
    pub total_return: f64,
    /// Annualized volatility in percent
    pub volatility: f64,
    pub sharpe_ratio: f64,
    /// Running sum of daily log returns, in percent
    pub cumulative_returns: Vec<f64>,
}

/// Build an equal-weight portfolio per non-empty cluster.
///
/// Member log-return series are aligned on their common tail before
/// averaging.
pub fn cluster_portfolios(
    returns: &[Vec<f64>],
    tickers: &[String],
    labels: &[usize],
    k: usize,
) -> Result<Vec<ClusterPortfolio>> {
    if returns.len() != labels.len() || tickers.len() != labels.len() {
        return Err(Error::DimensionMismatch {
            expected: labels.len(),
            actual: returns.len().min(tickers.len()),
        });
    }

    let mut portfolios = Vec::new();
    for cluster in 0..k {
        let members: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == cluster).collect();
        if members.is_empty() {
            continue;
        }

        let len = members.iter().map(|&i| returns[i].len()).min().unwrap_or(0);
        let daily: Vec<f64> = (0..len)
            .map(|t| {
                members
                    .iter()
                    .map(|&i| {
                        let series = &returns[i];
                        series[series.len() - len + t]
                    })
                    .sum::<f64>()
                    / members.len() as f64
            })
            .collect();

        let daily_std = std_dev(&daily);
        let sharpe_ratio = if daily_std > 0.0 {
            mean(&daily) * TRADING_DAYS / (daily_std * TRADING_DAYS.sqrt())
        } else {
            0.0
        };
        let cumulative_returns = daily
            .iter()
            .scan(0.0, |acc, r| {
                *acc += r;
                Some(*acc * 100.0)
            })
            .collect();

        portfolios.push(ClusterPortfolio {
            cluster,
            tickers: members.iter().map(|&i| tickers[i].clone()).collect(),
            total_return: (daily.iter().sum::<f64>().exp() - 1.0) * 100.0,
            volatility: daily_std * TRADING_DAYS.sqrt() * 100.0,
            sharpe_ratio,
            cumulative_returns,
        });
    }

    Ok(portfolios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_cluster_statistics() {
        let data = array![[1.0, 10.0], [3.0, 20.0], [5.0, 30.0]];
        let stats = cluster_statistics(&data, &[0, 0, 2], 3).unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].members, vec![0, 1]);
        assert_eq!(stats[0].feature_means, vec![2.0, 15.0]);
        assert_eq!(stats[1].cluster, 2);
    }

    #[test]
    fn test_portfolio_aligns_tails() {
        let returns = vec![vec![0.5, 0.01, 0.02], vec![0.03, 0.04]];
        let tickers = vec!["A".to_string(), "B".to_string()];
        let portfolios = cluster_portfolios(&returns, &tickers, &[0, 0], 2).unwrap();

        assert_eq!(portfolios.len(), 1);
        let p = &portfolios[0];
        assert_eq!(p.tickers, vec!["A", "B"]);
        assert_eq!(p.cumulative_returns.len(), 2);
        // daily = [0.02, 0.03]
        assert_abs_diff_eq!(p.cumulative_returns[1], 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.total_return, (0.05_f64.exp() - 1.0) * 100.0, epsilon = 1e-9);
        assert!(p.sharpe_ratio > 0.0);
    }
}
