//! Engine configuration.

use crate::anomaly::IsolationForestConfig;
use crate::clustering::KMeansConfig;
use crate::error::{Error, Result};
use crate::hedging::HedgeConfig;
use crate::regime::HmmConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Configuration of all four engines
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Isolation Forest anomaly detection
    #[serde(default)]
    pub anomaly: IsolationForestConfig,
    /// Gaussian HMM regime detection
    #[serde(default)]
    pub regime: HmmConfig,
    /// K-means asset clustering
    #[serde(default)]
    pub clustering: KMeansConfig,
    /// Q-learning option hedging
    #[serde(default)]
    pub hedging: HedgeConfig,
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Defaults overridden by `QE_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    ///
    /// `QE_SEED` seeds every randomized engine. Values that do not parse are
    /// reported as `InvalidConfig`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(seed) = parse_var::<u64, _>(&lookup, "QE_SEED")? {
            self.anomaly.seed = seed;
            self.clustering.seed = seed;
            self.hedging.seed = seed;
        }
        if let Some(n_trees) = parse_var(&lookup, "QE_N_TREES")? {
            self.anomaly.n_trees = n_trees;
        }
        if let Some(contamination) = parse_var(&lookup, "QE_CONTAMINATION")? {
            self.anomaly.contamination = contamination;
        }
        if let Some(n_states) = parse_var(&lookup, "QE_N_STATES")? {
            self.regime.n_states = n_states;
        }
        if let Some(k) = parse_var(&lookup, "QE_N_CLUSTERS")? {
            self.clustering.k = k;
        }
        if let Some(n_episodes) = parse_var(&lookup, "QE_EPISODES")? {
            self.hedging.n_episodes = n_episodes;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.anomaly.validate()?;
        self.regime.validate()?;
        self.clustering.validate()?;
        self.hedging.validate()
    }

    /// Clamp request parameters into the ranges the engines accept.
    ///
    /// `n_tickers` bounds the cluster count to `min(6, n_tickers / 2)`.
    pub fn clamp_to_request_limits(&mut self, n_tickers: usize) {
        let (lo, hi) = HmmConfig::STATE_RANGE;
        self.regime.n_states = self.regime.n_states.clamp(lo, hi);

        let (lo, hi) = IsolationForestConfig::CONTAMINATION_RANGE;
        self.anomaly.contamination = self.anomaly.contamination.clamp(lo, hi);
        self.anomaly.n_trees = self.anomaly.n_trees.clamp(50, 200);

        self.hedging.n_episodes = self.hedging.n_episodes.clamp(1, 500);

        let max_k = (n_tickers / 2).min(6).max(2);
        self.clustering.k = self.clustering.k.clamp(2, max_k);
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::config(format!("{name}: cannot parse {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.anomaly.n_trees, 100);
        assert_eq!(config.regime.n_states, 3);
        assert_eq!(config.clustering.k, 4);
        assert_eq!(config.hedging.n_episodes, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let loaded: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.hedging.action_multipliers, [0.8, 1.0, 1.2]);
        assert_eq!(loaded.anomaly.contamination, config.anomaly.contamination);

        let partial: EngineConfig = serde_json::from_str(r#"{"regime": {"n_states": 2, "max_iterations": 10, "tolerance": 1e-4}}"#).unwrap();
        assert_eq!(partial.regime.n_states, 2);
        assert_eq!(partial.clustering.k, 4);
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("quant_engines_config_{}.json", std::process::id()));
        let mut config = EngineConfig::default();
        config.hedging.n_steps = 30;
        config.to_file(&path).unwrap();

        let loaded = EngineConfig::from_file(&path).unwrap();
        assert_eq!(loaded.hedging.n_steps, 30);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [("QE_SEED", "7"), ("QE_N_STATES", "2"), ("QE_CONTAMINATION", "0.1")]
            .into_iter()
            .collect();
        let mut config = EngineConfig::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.anomaly.seed, 7);
        assert_eq!(config.hedging.seed, 7);
        assert_eq!(config.regime.n_states, 2);
        assert_eq!(config.anomaly.contamination, 0.1);
        assert_eq!(config.anomaly.n_trees, 100);

        let bad = |name: &str| (name == "QE_EPISODES").then(|| "many".to_string());
        assert!(matches!(
            EngineConfig::default().apply_overrides(bad),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_clamp_to_request_limits() {
        let mut config = EngineConfig::default();
        config.regime.n_states = 9;
        config.anomaly.contamination = 0.5;
        config.anomaly.n_trees = 10;
        config.hedging.n_episodes = 5000;
        config.clustering.k = 8;

        config.clamp_to_request_limits(7);
        assert_eq!(config.regime.n_states, 4);
        assert_eq!(config.anomaly.contamination, 0.2);
        assert_eq!(config.anomaly.n_trees, 50);
        assert_eq!(config.hedging.n_episodes, 500);
        assert_eq!(config.clustering.k, 3);

        config.clamp_to_request_limits(2);
        assert_eq!(config.clustering.k, 2);
        assert!(config.validate().is_ok());
    }
}
