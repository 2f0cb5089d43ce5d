//! Market regime detection
//!
//! Gaussian HMM over daily log returns, fitted with Baum-Welch and decoded
//! with Viterbi, plus labeling of the fitted states.

pub mod algorithms;
mod hmm;
mod interpreter;

pub use hmm::{GaussianHmm, HmmConfig, HmmFit, HmmParams};
pub use interpreter::*;
