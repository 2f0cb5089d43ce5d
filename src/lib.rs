//! # Quant Engines
//!
//! Four independent analytic engines over daily market data:
//!
//! - Isolation Forest anomaly detection on daily market-condition features
//! - Gaussian HMM market regime detection on log returns (Baum-Welch + Viterbi)
//! - K-means clustering of assets by return behaviour, with silhouette and PCA
//! - Tabular Q-learning for hedging a European option, compared against
//!   Black-Scholes delta hedging
//!
//! ## Modules
//!
//! - `anomaly` - Isolation Forest, anomaly reports and feature importance
//! - `regime` - Gaussian HMM, forward-backward and Viterbi, regime labelling
//! - `clustering` - K-means++, silhouette, PCA and cluster portfolios
//! - `hedging` - Black-Scholes, GBM simulation and the Q-learning hedger
//! - `data` - Price history, market data providers and feature engineering
//! - `stats` - Shared numeric helpers
//! - `config` - Aggregate engine configuration
//!
//! ## Example
//!
//! ```no_run
//! use quant_engines::prelude::*;
//!
//! let mut rng = RandomSource::new(42);
//! let history = synthetic_history("SPY", 500, 0.08, 0.2, &mut rng);
//!
//! let features = anomaly_features(&history).unwrap();
//! let forest = IsolationForest::fit(&features.data, &IsolationForestConfig::default()).unwrap();
//! let report = forest.detect(&features.data).unwrap();
//! println!("{} anomalies", report.n_anomalies);
//! ```

pub mod anomaly;
pub mod clustering;
pub mod config;
pub mod data;
pub mod error;
pub mod hedging;
pub mod random;
pub mod regime;
pub mod stats;

pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    // Anomaly detection
    pub use crate::anomaly::{
        feature_importance, tag_known_events, AnomalyReport, FeatureImportance, IsolationForest,
        IsolationForestConfig,
    };

    // Regime detection
    pub use crate::regime::{
        label_states, regime_statistics, GaussianHmm, HmmConfig, HmmFit, HmmParams, RegimeLabel,
        RegimeStats, RegimeSummary,
    };

    // Clustering
    pub use crate::clustering::{
        cluster_portfolios, cluster_statistics, pca_project, silhouette_score, KMeans, KMeansConfig,
        KMeansFit, Pca,
    };

    // Hedging
    pub use crate::hedging::{
        BlackScholes, EvaluationReport, HedgeConfig, OptionContract, OptionType, QLearningHedger,
        QTable, TrainingReport,
    };

    // Data
    pub use crate::data::{
        anomaly_features, clustering_features, synthetic_history, Bar, InMemoryProvider,
        MarketDataProvider, PriceHistory,
    };

    pub use crate::config::EngineConfig;
    pub use crate::error::{Error, Result};
    pub use crate::random::RandomSource;
    pub use crate::stats::standardize;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
