//! Tabular Q-learning agent for discrete delta hedging
//!
//! At every rebalancing step the agent picks a multiple of the
//! Black-Scholes delta (under-hedge, delta, over-hedge). Rewards are the
//! hedge P&L of the previous position net of rebalancing cost and a
//! penalty on the deviation from delta.

use super::black_scholes::{BlackScholes, OptionType};
use super::evaluation::{learning_curve, ErrorHistogram, ErrorStats, Improvement, LearningCurve};
use super::q_table::QTable;
use super::simulation::{hedge_pnl, simulate_gbm_path};
use super::state::{HedgeAction, HedgeState, N_ACTIONS};
use crate::error::{Error, Result};
use crate::random::RandomSource;
use crate::stats::mean;
use serde::{Deserialize, Serialize};

/// European option being hedged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionContract {
    /// Initial underlying price
    pub spot: f64,
    pub strike: f64,
    /// Maturity in years
    pub maturity: f64,
    pub rate: f64,
    /// Annualized volatility used for both simulation and deltas
    pub volatility: f64,
    pub option_type: OptionType,
}

impl Default for OptionContract {
    fn default() -> Self {
        Self {
            spot: 100.0,
            strike: 100.0,
            maturity: 0.25,
            rate: 0.05,
            volatility: 0.2,
            option_type: OptionType::Call,
        }
    }
}

/// Q-learning hedging parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeConfig {
    pub contract: OptionContract,
    pub n_episodes: usize,
    /// Rebalancing steps per path
    pub n_steps: usize,
    /// Proportional cost per unit of notional traded
    pub transaction_cost: f64,
    pub learning_rate: f64,
    pub discount: f64,
    pub epsilon_start: f64,
    pub epsilon_end: f64,
    /// Delta multiples for under-hedge, delta and over-hedge
    pub action_multipliers: [f64; N_ACTIONS],
    /// Reward penalty per unit of `|delta - hedge|`
    pub deviation_penalty: f64,
    pub n_eval_paths: usize,
    pub seed: u64,
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            contract: OptionContract::default(),
            n_episodes: 200,
            n_steps: 50,
            transaction_cost: 0.001,
            learning_rate: 0.1,
            discount: 0.95,
            epsilon_start: 1.0,
            epsilon_end: 0.1,
            action_multipliers: [0.8, 1.0, 1.2],
            deviation_penalty: 0.01,
            n_eval_paths: 100,
            seed: 42,
        }
    }
}

impl HedgeConfig {
    pub fn with_episodes(mut self, n_episodes: usize) -> Self {
        self.n_episodes = n_episodes;
        self
    }

    pub fn with_transaction_cost(mut self, transaction_cost: f64) -> Self {
        self.transaction_cost = transaction_cost;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.contract;
        if !(c.spot > 0.0 && c.strike > 0.0) {
            return Err(Error::config("spot and strike must be positive"));
        }
        if !(c.maturity > 0.0) {
            return Err(Error::config("maturity must be positive"));
        }
        if !(c.volatility >= 0.0) || !c.rate.is_finite() {
            return Err(Error::config("volatility must be non-negative and rate finite"));
        }
        if self.n_episodes == 0 || self.n_steps == 0 || self.n_eval_paths == 0 {
            return Err(Error::config("episodes, steps and evaluation paths must be at least 1"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(Error::config("learning_rate must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(Error::config("discount must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.epsilon_start)
            || !(0.0..=1.0).contains(&self.epsilon_end)
            || self.epsilon_end > self.epsilon_start
        {
            return Err(Error::config("epsilon must satisfy 0 <= end <= start <= 1"));
        }
        if !(self.transaction_cost >= 0.0) || !(self.deviation_penalty >= 0.0) {
            return Err(Error::config("transaction_cost and deviation_penalty must be non-negative"));
        }
        if self.action_multipliers.iter().any(|m| !m.is_finite()) {
            return Err(Error::config("action multipliers must be finite"));
        }
        Ok(())
    }

    fn dt(&self) -> f64 {
        self.contract.maturity / self.n_steps as f64
    }
}

/// Output of [`QLearningHedger::train`]
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub q_table: QTable,
    /// Summed reward per episode
    pub episode_rewards: Vec<f64>,
    /// Absolute hedging error per episode
    pub episode_errors: Vec<f64>,
    pub final_epsilon: f64,
}

impl TrainingReport {
    /// Windowed mean of episode errors over `n_buckets` windows
    pub fn learning_curve(&self, n_buckets: usize) -> LearningCurve {
        learning_curve(&self.episode_errors, n_buckets)
    }
}

/// Prices and hedge ratios of the first evaluation path
#[derive(Debug, Clone, Serialize)]
pub struct SamplePath {
    pub prices: Vec<f64>,
    pub rl_hedges: Vec<f64>,
    pub bs_hedges: Vec<f64>,
}

/// Learned policy vs Black-Scholes delta on fresh paths
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub rl: ErrorStats,
    pub bs_delta: ErrorStats,
    pub improvement: Improvement,
    pub histogram: ErrorHistogram,
    pub sample_path: SamplePath,
    /// Signed hedging error per path
    pub rl_errors: Vec<f64>,
    pub bs_errors: Vec<f64>,
}

/// Trains and evaluates a tabular hedging policy.
///
/// Owns its random source, so training followed by evaluation draws one
/// reproducible stream from `config.seed`.
#[derive(Debug, Clone)]
pub struct QLearningHedger {
    config: HedgeConfig,
    rng: RandomSource,
}

impl QLearningHedger {
    pub fn new(config: HedgeConfig) -> Result<Self> {
        config.validate()?;
        let rng = RandomSource::new(config.seed);
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &HedgeConfig {
        &self.config
    }

    /// Black-Scholes delta and discrete state at step `t` of a path
    fn observe(&self, spot: f64, t: usize) -> (f64, HedgeState) {
        let c = &self.config.contract;
        let time_remaining = c.maturity - t as f64 * self.config.dt();
        let delta = BlackScholes::new(spot, c.strike, time_remaining, c.rate, c.volatility)
            .delta(c.option_type);
        let state = HedgeState::discretize(spot, c.strike, time_remaining, c.maturity, delta);
        (delta, state)
    }

    /// Epsilon-greedy action; unvisited states exploit the plain delta hedge
    fn select_action(&mut self, q_table: &QTable, state: &HedgeState, epsilon: f64) -> usize {
        if self.rng.uniform() < epsilon {
            return self.rng.index(N_ACTIONS);
        }
        q_table
            .best_action(state)
            .unwrap_or(HedgeAction::Delta.index())
    }

    fn simulate_path(&mut self) -> Vec<f64> {
        let c = &self.config.contract;
        let (spot, rate, vol, maturity) = (c.spot, c.rate, c.volatility, c.maturity);
        simulate_gbm_path(spot, rate, vol, maturity, self.config.n_steps, &mut self.rng)
    }

    /// Run `n_episodes` of Q-learning on simulated paths
    pub fn train(&mut self) -> Result<TrainingReport> {
        let cfg = self.config.clone();
        let contract = &cfg.contract;
        let epsilon_decay = (cfg.epsilon_start - cfg.epsilon_end) / cfg.n_episodes as f64;

        let mut q_table = QTable::new();
        let mut epsilon = cfg.epsilon_start;
        let mut episode_rewards = Vec::with_capacity(cfg.n_episodes);
        let mut episode_errors = Vec::with_capacity(cfg.n_episodes);

        for episode in 0..cfg.n_episodes {
            let prices = self.simulate_path();
            let mut hedges: Vec<f64> = Vec::with_capacity(cfg.n_steps);
            let mut total_reward = 0.0;

            for t in 0..cfg.n_steps {
                let spot = prices[t];
                let (delta, state) = self.observe(spot, t);
                let action = self.select_action(&q_table, &state, epsilon);
                let hedge = delta * cfg.action_multipliers[action];

                let reward = match hedges.last() {
                    Some(&prev) => {
                        let hedge_return = prev * (spot - prices[t - 1]);
                        let cost = (hedge - prev).abs() * spot * cfg.transaction_cost;
                        hedge_return - cost - cfg.deviation_penalty * (delta - hedge).abs()
                    }
                    None => 0.0,
                };
                hedges.push(hedge);
                total_reward += reward;

                q_table.entry(state);
                let max_next_q = if t + 1 < cfg.n_steps {
                    let (_, next_state) = self.observe(prices[t + 1], t + 1);
                    q_table.entry(next_state);
                    q_table.max_value(&next_state)
                } else {
                    0.0
                };

                let q = q_table.entry(state);
                q[action] += cfg.learning_rate * (reward + cfg.discount * max_next_q - q[action]);
            }

            let outcome = hedge_pnl(
                &prices,
                &hedges,
                contract.strike,
                contract.option_type,
                cfg.transaction_cost,
            )?;
            episode_rewards.push(total_reward);
            episode_errors.push(outcome.hedging_error.abs());

            epsilon = (epsilon - epsilon_decay).max(cfg.epsilon_end);

            if (episode + 1) % 50 == 0 {
                tracing::debug!(
                    episode = episode + 1,
                    epsilon,
                    states = q_table.len(),
                    "Episode {}: |error| = {:.4}",
                    episode + 1,
                    outcome.hedging_error.abs()
                );
            }
        }

        let tail = (episode_errors.len() / 10).max(1);
        tracing::info!(
            episodes = cfg.n_episodes,
            states = q_table.len(),
            final_epsilon = epsilon,
            tail_error = mean(&episode_errors[episode_errors.len() - tail..]),
            "q-learning hedger trained"
        );

        Ok(TrainingReport {
            q_table,
            episode_rewards,
            episode_errors,
            final_epsilon: epsilon,
        })
    }

    /// Greedy hedge ratios along `prices`; unvisited states use plain delta
    pub fn policy_hedges(&self, q_table: &QTable, prices: &[f64]) -> Vec<f64> {
        (0..self.config.n_steps)
            .map(|t| {
                let (delta, state) = self.observe(prices[t], t);
                let action = q_table
                    .best_action(&state)
                    .unwrap_or(HedgeAction::Delta.index());
                delta * self.config.action_multipliers[action]
            })
            .collect()
    }

    /// Black-Scholes delta along `prices`
    pub fn delta_hedges(&self, prices: &[f64]) -> Vec<f64> {
        (0..self.config.n_steps)
            .map(|t| self.observe(prices[t], t).0)
            .collect()
    }

    /// Compare the greedy policy of `q_table` against the delta hedge on
    /// `n_eval_paths` fresh paths
    pub fn evaluate(&mut self, q_table: &QTable) -> Result<EvaluationReport> {
        let contract = self.config.contract.clone();
        let tc = self.config.transaction_cost;
        let mut rl_errors = Vec::with_capacity(self.config.n_eval_paths);
        let mut bs_errors = Vec::with_capacity(self.config.n_eval_paths);
        let mut sample_path = None;

        for _ in 0..self.config.n_eval_paths {
            let prices = self.simulate_path();
            let rl_hedges = self.policy_hedges(q_table, &prices);
            let bs_hedges = self.delta_hedges(&prices);

            let rl = hedge_pnl(&prices, &rl_hedges, contract.strike, contract.option_type, tc)?;
            let bs = hedge_pnl(&prices, &bs_hedges, contract.strike, contract.option_type, tc)?;
            rl_errors.push(rl.hedging_error);
            bs_errors.push(bs.hedging_error);

            if sample_path.is_none() {
                sample_path = Some(SamplePath {
                    prices,
                    rl_hedges,
                    bs_hedges,
                });
            }
        }

        let sample_path = sample_path.ok_or(Error::InsufficientData {
            context: "hedge evaluation",
            required: 1,
            actual: 0,
        })?;
        let rl = ErrorStats::from_errors(&rl_errors);
        let bs_delta = ErrorStats::from_errors(&bs_errors);

        tracing::info!(
            rl_mae = rl.mean_abs_error,
            bs_mae = bs_delta.mean_abs_error,
            "hedging policy evaluated"
        );

        Ok(EvaluationReport {
            improvement: Improvement::between(&bs_delta, &rl),
            histogram: ErrorHistogram::new(&rl_errors, &bs_errors),
            rl,
            bs_delta,
            sample_path,
            rl_errors,
            bs_errors,
        })
    }

    /// Train, then evaluate the learned table
    pub fn run(&mut self) -> Result<(TrainingReport, EvaluationReport)> {
        let training = self.train()?;
        let evaluation = self.evaluate(&training.q_table)?;
        Ok((training, evaluation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> HedgeConfig {
        HedgeConfig {
            n_episodes: 60,
            n_steps: 20,
            n_eval_paths: 20,
            ..HedgeConfig::default()
        }
    }

    #[test]
    fn test_training_shapes() {
        let mut hedger = QLearningHedger::new(quick_config()).unwrap();
        let report = hedger.train().unwrap();

        assert_eq!(report.episode_rewards.len(), 60);
        assert_eq!(report.episode_errors.len(), 60);
        assert!(report.episode_errors.iter().all(|e| e.is_finite() && *e >= 0.0));
        assert!(!report.q_table.is_empty());
        assert!(report.q_table.len() <= 125);
        assert!((report.final_epsilon - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_empty_table_matches_delta_hedge() {
        let mut hedger = QLearningHedger::new(quick_config()).unwrap();
        let report = hedger.evaluate(&QTable::new()).unwrap();

        assert_eq!(report.rl_errors, report.bs_errors);
        assert_eq!(report.sample_path.rl_hedges, report.sample_path.bs_hedges);
        assert_eq!(report.improvement.mae_reduction, 0.0);
        assert_eq!(report.sample_path.prices.len(), 21);
    }

    #[test]
    fn test_epsilon_never_below_floor() {
        let config = HedgeConfig {
            n_episodes: 5,
            n_steps: 5,
            epsilon_start: 0.5,
            epsilon_end: 0.3,
            ..HedgeConfig::default()
        };
        let report = QLearningHedger::new(config).unwrap().train().unwrap();
        assert!(report.final_epsilon >= 0.3 - 1e-12);
    }

    #[test]
    fn test_invalid_config() {
        let bad_eps = HedgeConfig {
            epsilon_start: 0.1,
            epsilon_end: 0.5,
            ..HedgeConfig::default()
        };
        assert!(matches!(QLearningHedger::new(bad_eps), Err(Error::InvalidConfig(_))));

        let bad_strike = HedgeConfig {
            contract: OptionContract {
                strike: 0.0,
                ..OptionContract::default()
            },
            ..HedgeConfig::default()
        };
        assert!(QLearningHedger::new(bad_strike).is_err());
    }

    #[test]
    fn test_greedy_policy_uses_table() {
        let hedger = QLearningHedger::new(quick_config()).unwrap();
        let prices = vec![100.0; 21];

        let mut table = QTable::new();
        for t in 0..20 {
            let (_, state) = hedger.observe(100.0, t);
            table.entry(state)[HedgeAction::OverHedge.index()] = 1.0;
        }

        let rl = hedger.policy_hedges(&table, &prices);
        let bs = hedger.delta_hedges(&prices);
        for (r, b) in rl.iter().zip(&bs) {
            assert!((r - 1.2 * b).abs() < 1e-12);
        }
    }
}
