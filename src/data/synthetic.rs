//! Synthetic daily bars for demos and tests

use super::types::{Bar, PriceHistory};
use crate::random::RandomSource;
use chrono::{Datelike, NaiveDate, Weekday};

/// Generate `n_bars` business-day OHLCV bars from a geometric Brownian
/// motion with annualized `drift` and `volatility`, starting at 100.
pub fn synthetic_history(
    ticker: &str,
    n_bars: usize,
    drift: f64,
    volatility: f64,
    rng: &mut RandomSource,
) -> PriceHistory {
    let dt: f64 = 1.0 / 252.0;
    let daily_vol = volatility * dt.sqrt();
    let step_drift = (drift - 0.5 * volatility * volatility) * dt;

    let mut date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap_or(NaiveDate::MIN);
    let mut prev_close = 100.0;
    let mut bars = Vec::with_capacity(n_bars);

    for _ in 0..n_bars {
        let open = prev_close * (0.2 * daily_vol * rng.normal()).exp();
        let close = prev_close * (step_drift + daily_vol * rng.normal()).exp();
        let high = open.max(close) * (1.0 + 0.25 * daily_vol * rng.normal().abs());
        let low = open.min(close) * (1.0 - 0.25 * daily_vol * rng.normal().abs());
        let volume = 1_000_000.0 * (0.3 * rng.normal()).exp();

        bars.push(Bar {
            date,
            open,
            high,
            low,
            close,
            volume,
        });
        prev_close = close;
        date = next_business_day(date);
    }

    PriceHistory::new(ticker, bars)
}

fn next_business_day(date: NaiveDate) -> NaiveDate {
    let mut next = date.succ_opt().unwrap_or(date);
    while matches!(next.weekday(), Weekday::Sat | Weekday::Sun) {
        next = next.succ_opt().unwrap_or(next);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_bars_are_consistent() {
        let mut rng = RandomSource::new(42);
        let history = synthetic_history("TEST", 60, 0.05, 0.3, &mut rng);

        assert_eq!(history.len(), 60);
        for bar in &history.bars {
            assert!(bar.high >= bar.open.max(bar.close));
            assert!(bar.low <= bar.open.min(bar.close));
            assert!(bar.volume > 0.0);
            assert!(!matches!(bar.date.weekday(), Weekday::Sat | Weekday::Sun));
        }
        assert!(history.bars.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_synthetic_is_seeded() {
        let a = synthetic_history("A", 30, 0.0, 0.2, &mut RandomSource::new(9));
        let b = synthetic_history("A", 30, 0.0, 0.2, &mut RandomSource::new(9));
        assert_eq!(a, b);
    }
}
