//! Quant Engines CLI
//!
//! Runs one engine on a price history read from JSON (or a synthetic one)
//! and prints the result as pretty JSON.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use quant_engines::prelude::*;
use quant_engines::regime::count_transitions;
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "quant_engines")]
#[command(about = "Anomaly, regime, clustering and hedging engines for market data")]
struct Cli {
    /// JSON engine configuration (defaults and QE_* variables otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override every engine seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Source {
    /// Price history JSON file (ticker + bars)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Generate a synthetic history with this many bars instead
    #[arg(long, value_name = "BARS")]
    synthetic: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect anomalous trading days with an Isolation Forest
    Anomaly {
        #[command(flatten)]
        source: Source,

        /// Expected share of anomalies
        #[arg(long)]
        contamination: Option<f64>,

        /// Number of isolation trees
        #[arg(long)]
        n_trees: Option<usize>,

        /// Number of top anomalies to list
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Fit a Gaussian HMM to daily log returns
    Regime {
        #[command(flatten)]
        source: Source,

        /// Number of hidden states (2-4)
        #[arg(short = 'n', long)]
        n_states: Option<usize>,
    },

    /// Cluster assets by return behaviour
    Cluster {
        /// Price history JSON files, one per ticker
        #[arg(short, long, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Market benchmark history for beta
        #[arg(short, long)]
        market: Option<PathBuf>,

        /// Generate this many synthetic tickers instead
        #[arg(long, value_name = "TICKERS")]
        synthetic: Option<usize>,

        /// Number of clusters
        #[arg(short = 'k', long)]
        n_clusters: Option<usize>,
    },

    /// Train a Q-learning hedger and compare it with delta hedging
    Hedge {
        /// Training episodes
        #[arg(short, long)]
        episodes: Option<usize>,

        /// Proportional transaction cost
        #[arg(long)]
        transaction_cost: Option<f64>,

        /// Save the learned Q-table to this file
        #[arg(long)]
        save_q_table: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => EngineConfig::from_env()?,
    };
    if let Some(seed) = cli.seed {
        config.anomaly.seed = seed;
        config.clustering.seed = seed;
        config.hedging.seed = seed;
    }

    let output = match cli.command {
        Commands::Anomaly {
            source,
            contamination,
            n_trees,
            top,
        } => {
            if let Some(c) = contamination {
                config.anomaly.contamination = c;
            }
            if let Some(n) = n_trees {
                config.anomaly.n_trees = n;
            }
            config.clamp_to_request_limits(0);
            let history = load_history(&source, &config)?;
            run_anomaly(&history, &config, top)?
        }
        Commands::Regime { source, n_states } => {
            if let Some(n) = n_states {
                config.regime.n_states = n;
            }
            config.clamp_to_request_limits(0);
            let history = load_history(&source, &config)?;
            run_regime(&history, &config)?
        }
        Commands::Cluster {
            inputs,
            market,
            synthetic,
            n_clusters,
        } => {
            let (histories, market) = load_universe(&inputs, market.as_ref(), synthetic, &config)?;
            if let Some(k) = n_clusters {
                config.clustering.k = k;
            }
            config.clamp_to_request_limits(histories.len());
            run_cluster(&histories, market.as_ref(), &config)?
        }
        Commands::Hedge {
            episodes,
            transaction_cost,
            save_q_table,
        } => {
            if let Some(n) = episodes {
                config.hedging.n_episodes = n;
            }
            if let Some(tc) = transaction_cost {
                config.hedging.transaction_cost = tc;
            }
            config.clamp_to_request_limits(0);
            run_hedge(&config, save_q_table)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_history(source: &Source, config: &EngineConfig) -> Result<PriceHistory> {
    match (&source.input, source.synthetic) {
        (Some(path), _) => PriceHistory::from_file(path)
            .with_context(|| format!("failed to read price history from {}", path.display())),
        (None, Some(n_bars)) => {
            let mut rng = RandomSource::new(config.anomaly.seed);
            info!("Generating {} synthetic bars", n_bars);
            Ok(synthetic_history("SYNTH", n_bars, 0.08, 0.2, &mut rng))
        }
        (None, None) => bail!("either --input or --synthetic is required"),
    }
}

fn load_universe(
    inputs: &[PathBuf],
    market: Option<&PathBuf>,
    synthetic: Option<usize>,
    config: &EngineConfig,
) -> Result<(Vec<PriceHistory>, Option<PriceHistory>)> {
    if !inputs.is_empty() {
        let histories = inputs
            .iter()
            .map(|path| {
                PriceHistory::from_file(path)
                    .with_context(|| format!("failed to read {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;
        let market = market.map(PriceHistory::from_file).transpose()?;
        return Ok((histories, market));
    }

    let Some(n_tickers) = synthetic else {
        bail!("either --inputs or --synthetic is required");
    };

    // four behaviour groups: (drift, volatility)
    let profiles = [(0.15, 0.15), (0.05, 0.35), (-0.10, 0.45), (0.10, 0.25)];
    let mut rng = RandomSource::new(config.clustering.seed);
    let histories = (0..n_tickers)
        .map(|i| {
            let (drift, vol) = profiles[i % profiles.len()];
            synthetic_history(&format!("T{:02}", i + 1), 300, drift, vol, &mut rng)
        })
        .collect();
    let market = synthetic_history("MKT", 300, 0.08, 0.18, &mut rng);
    Ok((histories, Some(market)))
}

fn run_anomaly(history: &PriceHistory, config: &EngineConfig, top: usize) -> Result<serde_json::Value> {
    let features = anomaly_features(history)?;
    let scaled = standardize(&features.data)?;

    let forest = IsolationForest::fit(&scaled, &config.anomaly)?;
    let report = forest.detect(&scaled)?;
    let importance = feature_importance(&features.data, &report.scores, &features.names, report.threshold)?;
    let events = tag_known_events(&features.dates, &report.is_anomaly);

    let top_anomalies: Vec<_> = report
        .ranked_anomalies()
        .into_iter()
        .take(top)
        .map(|i| {
            json!({
                "date": features.dates[i],
                "price": features.prices[i],
                "score": report.scores[i],
            })
        })
        .collect();

    Ok(json!({
        "ticker": history.ticker,
        "n_samples": features.n_samples(),
        "threshold": report.threshold,
        "n_anomalies": report.n_anomalies,
        "anomaly_rate": report.anomaly_rate,
        "mean_score": report.mean_score,
        "max_score": report.max_score,
        "top_anomalies": top_anomalies,
        "feature_importance": importance,
        "known_events": events,
    }))
}

fn run_regime(history: &PriceHistory, config: &EngineConfig) -> Result<serde_json::Value> {
    let returns = history.log_returns();
    let mut hmm = GaussianHmm::new(config.regime.clone())?;
    let fit = hmm.fit(&returns)?;

    let labels = label_states(&fit.params);
    let stats = regime_statistics(&returns, &fit.states, fit.params.n_states())?;
    let summary = RegimeSummary::from_path(&fit.states, &labels);
    let transition: Vec<Vec<f64>> = fit
        .params
        .transition
        .rows()
        .into_iter()
        .map(|row| row.to_vec())
        .collect();

    Ok(json!({
        "ticker": history.ticker,
        "n_observations": returns.len(),
        "iterations": fit.iterations,
        "converged": fit.converged,
        "log_likelihood": fit.final_log_likelihood(),
        "states": labels,
        "statistics": stats,
        "transition_matrix": transition,
        "n_transitions": count_transitions(&fit.states),
        "summary": summary,
        "state_path": fit.states,
    }))
}

fn run_cluster(
    histories: &[PriceHistory],
    market: Option<&PriceHistory>,
    config: &EngineConfig,
) -> Result<serde_json::Value> {
    let features = clustering_features(histories, market)?;
    let scaled = standardize(&features.data)?;

    let fit = KMeans::fit(&scaled, &config.clustering)?;
    let silhouette = silhouette_score(&scaled, &fit.labels)?;
    let k = fit.k();
    let portfolios = cluster_portfolios(&features.returns, &features.tickers, &fit.labels, k)?;
    let stats = cluster_statistics(&features.data, &fit.labels, k)?;

    let pca = Pca::fit(&scaled, scaled.ncols().min(2))?;
    let to_rows = |m: ndarray::Array2<f64>| -> Vec<Vec<f64>> {
        m.rows().into_iter().map(|row| row.to_vec()).collect()
    };
    let points = to_rows(pca.transform(&scaled)?);
    let centroids = to_rows(pca.transform(&fit.centroids)?);

    let assignments: Vec<_> = features
        .tickers
        .iter()
        .zip(&fit.labels)
        .zip(&points)
        .map(|((ticker, label), xy)| json!({ "ticker": ticker, "cluster": label, "pca": xy }))
        .collect();

    Ok(json!({
        "n_clusters": k,
        "inertia": fit.inertia,
        "iterations": fit.iterations,
        "silhouette_score": silhouette,
        "feature_names": features.names,
        "assignments": assignments,
        "cluster_statistics": stats,
        "portfolios": portfolios,
        "pca_centroids": centroids,
        "explained_variance_ratio": pca.explained_variance_ratio().to_vec(),
    }))
}

fn run_hedge(config: &EngineConfig, save_q_table: Option<PathBuf>) -> Result<serde_json::Value> {
    let mut hedger = QLearningHedger::new(config.hedging.clone())?;
    let (training, evaluation) = hedger.run()?;

    if let Some(path) = save_q_table {
        training.q_table.save(&path)?;
        info!("Q-table saved to {}", path.display());
    }

    Ok(json!({
        "contract": config.hedging.contract,
        "episodes": training.episode_errors.len(),
        "states_visited": training.q_table.len(),
        "final_epsilon": training.final_epsilon,
        "learning_curve": training.learning_curve(20),
        "rl": evaluation.rl,
        "bs_delta": evaluation.bs_delta,
        "improvement": evaluation.improvement,
        "histogram": evaluation.histogram,
        "sample_path": evaluation.sample_path,
    }))
}
