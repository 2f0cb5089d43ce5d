//! Price history types and the market-data provider seam

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Single daily OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Intraday range as a fraction of the close
    pub fn range_pct(&self) -> f64 {
        if self.close > 0.0 {
            (self.high - self.low) / self.close
        } else {
            0.0
        }
    }
}

/// Aligned daily bars for one ticker, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub ticker: String,
    pub bars: Vec<Bar>,
}

impl PriceHistory {
    /// Create a history from bars
    pub fn new(ticker: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            ticker: ticker.into(),
            bars,
        }
    }

    /// Load a JSON-encoded history
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Closing prices
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Trading dates
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    /// Log returns of closes (length `len - 1`)
    pub fn log_returns(&self) -> Vec<f64> {
        log_returns(&self.closes())
    }

    /// Simple returns of closes (length `len - 1`)
    pub fn simple_returns(&self) -> Vec<f64> {
        simple_returns(&self.closes())
    }

    /// Last `n` bars (all of them when `n >= len`)
    pub fn tail(&self, n: usize) -> Self {
        let start = self.bars.len().saturating_sub(n);
        Self::new(self.ticker.clone(), self.bars[start..].to_vec())
    }
}

/// `ln(p[t] / p[t-1])`
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

/// `(p[t] - p[t-1]) / p[t-1]`
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect()
}

/// Number of trading days in a lookback period such as `"6mo"`, `"1y"` or `"30d"`.
///
/// `"max"` returns `None` (no limit).
pub fn period_to_bars(period: &str) -> Result<Option<usize>> {
    let period = period.trim().to_ascii_lowercase();
    if period == "max" {
        return Ok(None);
    }

    let split = period
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| Error::config(format!("period '{period}' has no unit")))?;
    let (count, unit) = period.split_at(split);
    let count: usize = count
        .parse()
        .map_err(|_| Error::config(format!("period '{period}' has no count")))?;

    let per_unit = match unit {
        "d" => 1,
        "wk" => 5,
        "mo" => 21,
        "y" => 252,
        _ => return Err(Error::config(format!("unknown period unit '{unit}'"))),
    };
    Ok(Some(count * per_unit))
}

/// Source of daily price history for a ticker and lookback period
pub trait MarketDataProvider {
    /// Fetch aligned OHLCV bars
    fn history(&self, ticker: &str, period: &str) -> Result<PriceHistory>;
}

/// Provider backed by histories held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    histories: HashMap<String, PriceHistory>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a history under its (upper-cased) ticker
    pub fn insert(&mut self, history: PriceHistory) {
        self.histories
            .insert(history.ticker.to_ascii_uppercase(), history);
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_history(mut self, history: PriceHistory) -> Self {
        self.insert(history);
        self
    }
}

impl MarketDataProvider for InMemoryProvider {
    fn history(&self, ticker: &str, period: &str) -> Result<PriceHistory> {
        let history = self
            .histories
            .get(&ticker.to_ascii_uppercase())
            .ok_or_else(|| Error::UnknownTicker(ticker.to_string()))?;

        Ok(match period_to_bars(period)? {
            Some(n) => history.tail(n),
            None => history.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_returns() {
        let h = PriceHistory::new("SPY", vec![bar(1, 100.0), bar(2, 110.0), bar(3, 99.0)]);
        let simple = h.simple_returns();
        assert_eq!(simple.len(), 2);
        assert!((simple[0] - 0.1).abs() < 1e-12);
        assert!((simple[1] + 0.1).abs() < 1e-12);
        assert!((h.log_returns()[0] - 1.1_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_period_to_bars() {
        assert_eq!(period_to_bars("1y").unwrap(), Some(252));
        assert_eq!(period_to_bars("6mo").unwrap(), Some(126));
        assert_eq!(period_to_bars("max").unwrap(), None);
        assert!(period_to_bars("abc").is_err());
        assert!(period_to_bars("3q").is_err());
    }

    #[test]
    fn test_in_memory_provider() {
        let h = PriceHistory::new("spy", (1..=10).map(|d| bar(d, 100.0 + d as f64)).collect());
        let provider = InMemoryProvider::new().with_history(h);

        let tail = provider.history("SPY", "5d").unwrap();
        assert_eq!(tail.len(), 5);
        assert_eq!(tail.bars[4].close, 110.0);

        assert!(matches!(
            provider.history("QQQ", "1y"),
            Err(Error::UnknownTicker(_))
        ));
    }
}
