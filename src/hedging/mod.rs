//! Reinforcement-learning delta hedging
//!
//! A tabular Q-learning agent chooses between under-hedging, delta hedging
//! and over-hedging a European option on simulated GBM paths, and is
//! compared against the pure Black-Scholes delta hedge.

mod agent;
mod black_scholes;
mod evaluation;
mod q_table;
mod simulation;
mod state;

pub use agent::*;
pub use black_scholes::*;
pub use evaluation::*;
pub use q_table::QTable;
pub use simulation::*;
pub use state::*;
