//! Feature attribution and event tagging for detected anomalies

use crate::error::{Error, Result};
use crate::stats::mean_abs;
use chrono::NaiveDate;
use ndarray::Array2;
use serde::Serialize;

/// Relative weight of one feature in the anomalous rows
#[derive(Debug, Clone, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    /// `anomaly_mean / normal_mean`
    pub importance: f64,
    pub anomaly_mean: f64,
    pub normal_mean: f64,
}

/// Rank features by the ratio of their mean absolute value in anomalous
/// rows (`score > threshold`) to that in normal rows.
///
/// A plain magnitude comparison, not a per-prediction attribution. When
/// either group is empty every importance is 0; a feature whose normal
/// mean is 0 gets importance 1.
pub fn feature_importance(
    data: &Array2<f64>,
    scores: &[f64],
    names: &[String],
    threshold: f64,
) -> Result<Vec<FeatureImportance>> {
    if scores.len() != data.nrows() {
        return Err(Error::DimensionMismatch {
            expected: data.nrows(),
            actual: scores.len(),
        });
    }
    if names.len() != data.ncols() {
        return Err(Error::DimensionMismatch {
            expected: data.ncols(),
            actual: names.len(),
        });
    }

    let anomalous: Vec<bool> = scores.iter().map(|&s| s > threshold).collect();
    let n_anomalous = anomalous.iter().filter(|&&a| a).count();

    if n_anomalous == 0 || n_anomalous == anomalous.len() {
        return Ok(names
            .iter()
            .map(|name| FeatureImportance {
                feature: name.clone(),
                importance: 0.0,
                anomaly_mean: 0.0,
                normal_mean: 0.0,
            })
            .collect());
    }

    let mut ranking: Vec<FeatureImportance> = names
        .iter()
        .enumerate()
        .map(|(col, name)| {
            let (abnormal, normal): (Vec<f64>, Vec<f64>) = {
                let mut a = Vec::with_capacity(n_anomalous);
                let mut n = Vec::with_capacity(anomalous.len() - n_anomalous);
                for (&value, &flag) in data.column(col).iter().zip(&anomalous) {
                    if flag {
                        a.push(value);
                    } else {
                        n.push(value);
                    }
                }
                (a, n)
            };
            let anomaly_mean = mean_abs(&abnormal);
            let normal_mean = mean_abs(&normal);
            FeatureImportance {
                feature: name.clone(),
                importance: if normal_mean > 0.0 {
                    anomaly_mean / normal_mean
                } else {
                    1.0
                },
                anomaly_mean,
                normal_mean,
            }
        })
        .collect();

    ranking.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    Ok(ranking)
}

/// Market event matched to an anomalous day
#[derive(Debug, Clone, Serialize)]
pub struct DetectedEvent {
    pub date: NaiveDate,
    pub event: &'static str,
    pub anomaly_index: usize,
}

/// Well-known stress months, keyed by `(year, month)`
pub const KNOWN_EVENTS: [((i32, u32), &str); 6] = [
    ((2020, 2), "COVID-19 Start"),
    ((2020, 3), "COVID-19 Crash"),
    ((2022, 1), "Tech Selloff"),
    ((2022, 6), "Inflation Crisis"),
    ((2023, 3), "Banking Crisis"),
    ((2024, 8), "Yen Carry Unwind"),
];

/// Tag flagged days that fall in a known stress month
pub fn tag_known_events(dates: &[NaiveDate], flags: &[bool]) -> Vec<DetectedEvent> {
    use chrono::Datelike;

    dates
        .iter()
        .zip(flags)
        .enumerate()
        .filter(|(_, (_, flag))| **flag)
        .filter_map(|(i, (date, _))| {
            KNOWN_EVENTS
                .iter()
                .find(|((y, m), _)| date.year() == *y && date.month() == *m)
                .map(|(_, event)| DetectedEvent {
                    date: *date,
                    event: *event,
                    anomaly_index: i,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn names() -> Vec<String> {
        vec!["return".to_string(), "volume".to_string()]
    }

    #[test]
    fn test_importance_ranks_separating_feature() {
        let data = array![[0.1, 1.0], [0.1, 1.0], [0.1, 1.0], [1.0, 1.0]];
        let scores = [0.4, 0.4, 0.4, 0.8];
        let ranking = feature_importance(&data, &scores, &names(), 0.5).unwrap();

        assert_eq!(ranking[0].feature, "return");
        assert_abs_diff_eq!(ranking[0].importance, 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ranking[1].importance, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_importance_without_anomalies() {
        let data = array![[0.1, 1.0], [0.2, 1.0]];
        let ranking = feature_importance(&data, &[0.4, 0.4], &names(), 0.5).unwrap();
        assert!(ranking.iter().all(|f| f.importance == 0.0));
    }

    #[test]
    fn test_importance_zero_normal_mean() {
        let data = array![[0.0, 1.0], [0.5, 2.0]];
        let ranking = feature_importance(&data, &[0.1, 0.9], &names(), 0.5).unwrap();
        let ret = ranking.iter().find(|f| f.feature == "return").unwrap();
        assert_eq!(ret.importance, 1.0);
    }

    #[test]
    fn test_tag_known_events() {
        let dates = vec![
            NaiveDate::from_ymd_opt(2020, 3, 16).unwrap(),
            NaiveDate::from_ymd_opt(2020, 3, 17).unwrap(),
            NaiveDate::from_ymd_opt(2021, 5, 3).unwrap(),
        ];
        let events = tag_known_events(&dates, &[true, false, true]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "COVID-19 Crash");
        assert_eq!(events[0].anomaly_index, 0);
    }
}
