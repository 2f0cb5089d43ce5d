//! Discrete hedging state and actions

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Buckets per state dimension
pub const N_BUCKETS: u8 = 5;

/// Upper bounds of the first four moneyness (`S / K`) buckets
const MONEYNESS_BOUNDS: [f64; 4] = [0.9, 0.97, 1.03, 1.1];

/// Bucketed (moneyness, remaining time, delta) triple, 5 × 5 × 5 values
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HedgeState {
    /// 0 deep OTM, 1 OTM, 2 ATM, 3 ITM, 4 deep ITM
    pub moneyness: u8,
    /// Fifths of remaining maturity, 4 at inception
    pub time: u8,
    /// Fifths of `[0, 1]` delta
    pub delta: u8,
}

impl HedgeState {
    /// Bucket a continuous observation.
    ///
    /// `delta` is bucketed by magnitude so put deltas land in the same
    /// bands as call deltas. Bucketing the signed value would send every
    /// put delta to bucket 0.
    pub fn discretize(spot: f64, strike: f64, time_remaining: f64, maturity: f64, delta: f64) -> Self {
        let ratio = spot / strike;
        let moneyness = MONEYNESS_BOUNDS
            .iter()
            .position(|&bound| ratio < bound)
            .unwrap_or(MONEYNESS_BOUNDS.len()) as u8;

        let time_frac = if maturity > 0.0 {
            time_remaining / maturity
        } else {
            0.0
        };

        Self {
            moneyness,
            time: bucket(time_frac),
            delta: bucket(delta.abs()),
        }
    }
}

/// `min(4, max(0, floor(x * 5)))`
fn bucket(fraction: f64) -> u8 {
    let scaled = (fraction * f64::from(N_BUCKETS)).floor();
    if scaled.is_nan() || scaled < 0.0 {
        0
    } else {
        (scaled as u8).min(N_BUCKETS - 1)
    }
}

impl fmt::Display for HedgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.moneyness, self.time, self.delta)
    }
}

impl FromStr for HedgeState {
    type Err = Error;

    /// Parse the `"(m, t, d)"` form written by `Display`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::config(format!("invalid hedge state key '{s}'"));
        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(invalid)?;

        let parts: Vec<u8> = inner
            .split(',')
            .map(|p| p.trim().parse::<u8>())
            .collect::<Result<_, _>>()
            .map_err(|_| invalid())?;

        match parts.as_slice() {
            &[moneyness, time, delta] if parts.iter().all(|&b| b < N_BUCKETS) => Ok(Self {
                moneyness,
                time,
                delta,
            }),
            _ => Err(invalid()),
        }
    }
}

/// Number of hedge actions
pub const N_ACTIONS: usize = 3;

/// Hedge ratio choice relative to the Black-Scholes delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HedgeAction {
    UnderHedge,
    Delta,
    OverHedge,
}

impl HedgeAction {
    pub const ALL: [HedgeAction; N_ACTIONS] =
        [HedgeAction::UnderHedge, HedgeAction::Delta, HedgeAction::OverHedge];

    pub fn index(self) -> usize {
        match self {
            HedgeAction::UnderHedge => 0,
            HedgeAction::Delta => 1,
            HedgeAction::OverHedge => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}
