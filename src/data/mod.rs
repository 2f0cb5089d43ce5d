//! Market data: price history, provider trait and feature engineering

mod features;
mod synthetic;
mod types;

pub use features::{
    anomaly_features, beta, clustering_features, AnomalyFeatures, ClusteringFeatures,
    ANOMALY_LOOKBACK, TRADING_DAYS,
};
pub use synthetic::synthetic_history;
pub use types::{
    log_returns, period_to_bars, simple_returns, Bar, InMemoryProvider, MarketDataProvider,
    PriceHistory,
};
