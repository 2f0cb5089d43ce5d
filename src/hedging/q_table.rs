//! Sparse Q-table over hedging states

use super::state::{HedgeState, N_ACTIONS};
use crate::error::Result;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Action values per visited state.
///
/// Only visited states are stored; a missing state reads as all zeros.
/// Serialized as a map keyed by `"(m, t, d)"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QTable {
    values: BTreeMap<HedgeState, [f64; N_ACTIONS]>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, state: &HedgeState) -> Option<&[f64; N_ACTIONS]> {
        self.values.get(state)
    }

    /// Values of `state`, inserting zeros on first visit
    pub fn entry(&mut self, state: HedgeState) -> &mut [f64; N_ACTIONS] {
        self.values.entry(state).or_insert([0.0; N_ACTIONS])
    }

    /// Greedy action of a visited state (first maximum on ties)
    pub fn best_action(&self, state: &HedgeState) -> Option<usize> {
        self.values.get(state).map(|q| {
            q.iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |(best, best_q), (a, &v)| {
                    if v > best_q {
                        (a, v)
                    } else {
                        (best, best_q)
                    }
                })
                .0
        })
    }

    /// Largest action value of `state`
    pub fn max_value(&self, state: &HedgeState) -> f64 {
        self.values
            .get(state)
            .map(|q| q.iter().copied().fold(f64::NEG_INFINITY, f64::max))
            .unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HedgeState, &[f64; N_ACTIONS])> {
        self.values.iter()
    }

    /// Save as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Load from JSON
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl Serialize for QTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.values.iter().map(|(state, q)| (state.to_string(), q)))
    }
}

impl<'de> Deserialize<'de> for QTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, [f64; N_ACTIONS]>::deserialize(deserializer)?;
        let values = raw
            .into_iter()
            .map(|(key, q)| {
                key.parse::<HedgeState>()
                    .map(|state| (state, q))
                    .map_err(D::Error::custom)
            })
            .collect::<std::result::Result<_, _>>()?;
        Ok(Self { values })
    }
}
