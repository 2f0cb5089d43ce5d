//! Anomaly detection
//!
//! - Isolation Forest scoring and thresholding
//! - Feature importance heuristic and known-event tagging for flagged days

mod importance;
mod isolation_forest;

pub use importance::*;
pub use isolation_forest::*;

use serde::Serialize;

/// Scores and flags of a detection run
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyReport {
    /// Anomaly scores in `[0, 1]` (higher = more anomalous)
    pub scores: Vec<f64>,
    /// `score > threshold`
    pub is_anomaly: Vec<bool>,
    pub threshold: f64,
    pub n_anomalies: usize,
    /// Percentage of flagged rows
    pub anomaly_rate: f64,
    pub mean_score: f64,
    pub max_score: f64,
}

impl AnomalyReport {
    pub fn new(scores: Vec<f64>, threshold: f64) -> Self {
        let is_anomaly: Vec<bool> = scores.iter().map(|&s| s > threshold).collect();
        let n_anomalies = is_anomaly.iter().filter(|&&a| a).count();
        let anomaly_rate = if scores.is_empty() {
            0.0
        } else {
            n_anomalies as f64 / scores.len() as f64 * 100.0
        };

        Self {
            mean_score: crate::stats::mean(&scores),
            max_score: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            scores,
            is_anomaly,
            threshold,
            n_anomalies,
            anomaly_rate,
        }
    }

    /// Indices of flagged rows
    pub fn anomaly_indices(&self) -> Vec<usize> {
        self.is_anomaly
            .iter()
            .enumerate()
            .filter_map(|(i, &flag)| flag.then_some(i))
            .collect()
    }

    /// Flagged indices ordered by descending score
    pub fn ranked_anomalies(&self) -> Vec<usize> {
        let mut indices = self.anomaly_indices();
        indices.sort_by(|&a, &b| self.scores[b].total_cmp(&self.scores[a]));
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_summary() {
        let report = AnomalyReport::new(vec![0.4, 0.7, 0.45, 0.9], 0.6);
        assert_eq!(report.n_anomalies, 2);
        assert_eq!(report.anomaly_indices(), vec![1, 3]);
        assert_eq!(report.ranked_anomalies(), vec![3, 1]);
        assert!((report.anomaly_rate - 50.0).abs() < 1e-12);
        assert_eq!(report.max_score, 0.9);
    }
}
