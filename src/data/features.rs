//! Feature engineering from price history
//!
//! Two feature sets are built here:
//! - Daily market-condition features for anomaly detection
//! - Per-ticker behaviour features for clustering

use super::types::{log_returns, simple_returns, PriceHistory};
use crate::error::{Error, Result};
use crate::stats::{mean, std_dev, variance};
use chrono::NaiveDate;
use ndarray::Array2;
use serde::Serialize;

/// Trailing window used by the anomaly features
pub const ANOMALY_LOOKBACK: usize = 20;

/// Trading days per year
pub const TRADING_DAYS: f64 = 252.0;

/// Daily feature matrix for anomaly detection
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyFeatures {
    /// One row per day from index `ANOMALY_LOOKBACK` onward
    pub data: Array2<f64>,
    pub dates: Vec<NaiveDate>,
    pub prices: Vec<f64>,
    pub names: Vec<String>,
}

impl AnomalyFeatures {
    pub const NAMES: [&'static str; 6] = [
        "Daily Return",
        "Volume Spike",
        "5d Volatility",
        "20d Volatility",
        "Gap",
        "Intraday Range",
    ];

    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }
}

/// Build the six daily anomaly features:
/// daily return, volume spike vs trailing 20-day mean, 5-day and 20-day
/// return volatility, opening gap and intraday range.
pub fn anomaly_features(history: &PriceHistory) -> Result<AnomalyFeatures> {
    let n = history.len();
    if n <= ANOMALY_LOOKBACK {
        return Err(Error::InsufficientData {
            context: "anomaly features",
            required: ANOMALY_LOOKBACK + 1,
            actual: n,
        });
    }

    let closes = history.closes();
    let bars = &history.bars;
    let rows = n - ANOMALY_LOOKBACK;
    let mut data = Array2::zeros((rows, AnomalyFeatures::NAMES.len()));
    let mut dates = Vec::with_capacity(rows);
    let mut prices = Vec::with_capacity(rows);

    for (row, i) in (ANOMALY_LOOKBACK..n).enumerate() {
        let prev_close = closes[i - 1];
        let daily_return = (closes[i] - prev_close) / prev_close;

        let avg_volume = mean(
            &bars[i - ANOMALY_LOOKBACK..i]
                .iter()
                .map(|b| b.volume)
                .collect::<Vec<_>>(),
        );
        let volume_spike = if avg_volume > 0.0 {
            bars[i].volume / avg_volume
        } else {
            1.0
        };

        let vol_5d = std_dev(&simple_returns(&closes[i - 5..=i]));
        let vol_20d = std_dev(&simple_returns(&closes[i - ANOMALY_LOOKBACK..=i]));
        let gap = (bars[i].open - prev_close) / prev_close;
        let range = bars[i].range_pct();

        for (col, value) in [daily_return, volume_spike, vol_5d, vol_20d, gap, range]
            .into_iter()
            .enumerate()
        {
            data[[row, col]] = value;
        }
        dates.push(bars[i].date);
        prices.push(closes[i]);
    }

    Ok(AnomalyFeatures {
        data,
        dates,
        prices,
        names: AnomalyFeatures::NAMES.iter().map(|s| s.to_string()).collect(),
    })
}

/// Per-ticker behaviour features for clustering
#[derive(Debug, Clone, Serialize)]
pub struct ClusteringFeatures {
    /// One row per ticker
    pub data: Array2<f64>,
    pub tickers: Vec<String>,
    pub names: Vec<String>,
    /// Daily log returns per ticker, in row order
    pub returns: Vec<Vec<f64>>,
}

impl ClusteringFeatures {
    pub const NAMES: [&'static str; 5] = ["Avg Return", "Volatility", "Mom 20d", "Mom 60d", "Beta"];
}

/// Build clustering features: annualized mean log return, annualized
/// volatility, 20-day and 60-day momentum and beta against `market`.
///
/// Beta falls back to 1.0 when no market series is given or the market
/// variance is zero.
pub fn clustering_features(
    histories: &[PriceHistory],
    market: Option<&PriceHistory>,
) -> Result<ClusteringFeatures> {
    if histories.is_empty() {
        return Err(Error::InsufficientData {
            context: "clustering features",
            required: 1,
            actual: 0,
        });
    }

    let market_returns = market.map(|m| m.log_returns());
    let mut data = Array2::zeros((histories.len(), ClusteringFeatures::NAMES.len()));
    let mut tickers = Vec::with_capacity(histories.len());
    let mut all_returns = Vec::with_capacity(histories.len());

    for (row, history) in histories.iter().enumerate() {
        if history.len() < 3 {
            return Err(Error::InsufficientData {
                context: "clustering features",
                required: 3,
                actual: history.len(),
            });
        }

        let prices = history.closes();
        let returns = log_returns(&prices);
        let last = prices[prices.len() - 1];

        let avg_return = mean(&returns) * TRADING_DAYS;
        let volatility = std_dev(&returns) * TRADING_DAYS.sqrt();
        let momentum = |days: usize| {
            if prices.len() > days + 1 {
                last / prices[prices.len() - days - 1] - 1.0
            } else {
                0.0
            }
        };
        let beta = market_returns
            .as_deref()
            .map(|m| beta(&returns, m))
            .unwrap_or(1.0);

        for (col, value) in [avg_return, volatility, momentum(20), momentum(60), beta]
            .into_iter()
            .enumerate()
        {
            data[[row, col]] = value;
        }
        tickers.push(history.ticker.clone());
        all_returns.push(returns);
    }

    Ok(ClusteringFeatures {
        data,
        tickers,
        names: ClusteringFeatures::NAMES.iter().map(|s| s.to_string()).collect(),
        returns: all_returns,
    })
}

/// Beta of `asset` against `market` over their aligned tails.
///
/// Sample covariance (n - 1) over population market variance (n), so a
/// series equal to `c * market` has beta `c * n / (n - 1)`.
pub fn beta(asset: &[f64], market: &[f64]) -> f64 {
    let len = asset.len().min(market.len());
    if len < 2 {
        return 1.0;
    }
    let a = &asset[asset.len() - len..];
    let m = &market[market.len() - len..];

    let market_var = variance(m);
    if market_var <= 0.0 {
        return 1.0;
    }

    let (mean_a, mean_m) = (mean(a), mean(m));
    let covariance = a
        .iter()
        .zip(m)
        .map(|(x, y)| (x - mean_a) * (y - mean_m))
        .sum::<f64>()
        / (len - 1) as f64;

    covariance / market_var
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic_history;
    use crate::random::RandomSource;

    #[test]
    fn test_anomaly_features_shape() {
        let mut rng = RandomSource::new(42);
        let history = synthetic_history("SPY", 120, 0.08, 0.2, &mut rng);
        let features = anomaly_features(&history).unwrap();

        assert_eq!(features.n_samples(), 100);
        assert_eq!(features.data.ncols(), 6);
        assert_eq!(features.dates.len(), 100);
        assert_eq!(features.dates[0], history.bars[20].date);
        assert!(features.data.iter().all(|v| v.is_finite()));
        // volume spike is a ratio around 1
        assert!(features.data.column(1).iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_anomaly_features_needs_lookback() {
        let mut rng = RandomSource::new(1);
        let history = synthetic_history("SPY", 20, 0.0, 0.2, &mut rng);
        assert!(matches!(
            anomaly_features(&history),
            Err(Error::InsufficientData { required: 21, .. })
        ));
    }

    #[test]
    fn test_beta_scales_with_sample_covariance() {
        let m = vec![0.01, -0.02, 0.015, 0.003, -0.007];
        let n = m.len() as f64;
        assert!((beta(&m, &m) - n / (n - 1.0)).abs() < 1e-12);
        let doubled: Vec<f64> = m.iter().map(|r| 2.0 * r).collect();
        assert!((beta(&doubled, &m) - 2.0 * n / (n - 1.0)).abs() < 1e-12);
        assert_eq!(beta(&m, &[0.0; 5]), 1.0);

        // only the aligned tail counts
        let longer: Vec<f64> = [0.5, -0.5].iter().chain(&doubled).copied().collect();
        assert!((beta(&longer, &m) - beta(&doubled, &m)).abs() < 1e-12);
    }

    #[test]
    fn test_clustering_features() {
        let mut rng = RandomSource::new(5);
        let a = synthetic_history("AAA", 100, 0.1, 0.2, &mut rng);
        let b = synthetic_history("BBB", 100, -0.1, 0.4, &mut rng);
        let market = synthetic_history("SPY", 100, 0.05, 0.15, &mut rng);

        let features = clustering_features(&[a, b], Some(&market)).unwrap();
        assert_eq!(features.data.dim(), (2, 5));
        assert_eq!(features.tickers, vec!["AAA", "BBB"]);
        assert_eq!(features.returns[0].len(), 99);

        let no_market = clustering_features(&features_input(&mut rng), None).unwrap();
        assert!(no_market.data.column(4).iter().all(|&b| b == 1.0));
    }

    fn features_input(rng: &mut RandomSource) -> Vec<PriceHistory> {
        vec![synthetic_history("CCC", 30, 0.0, 0.3, rng)]
    }
}
