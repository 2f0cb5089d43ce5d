//! Scalar statistics over slices

/// Arithmetic mean (0 for an empty slice)
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (denominator `n`)
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Percentile `q` in `[0, 100]` with linear interpolation between order statistics
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// `ln(Σ exp(x_i))` computed with a max shift.
///
/// Returns `-inf` when every input is `-inf` (or the slice is empty).
pub fn logsumexp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Mean of absolute values
pub fn mean_abs(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| v.abs()).sum::<f64>() / values.len() as f64
}

/// `n` evenly spaced points from `start` to `end` inclusive.
///
/// The last point is exactly `end`.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mean_and_variance() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(mean(&v), 2.5);
        assert_abs_diff_eq!(variance(&v), 1.25);
        assert_abs_diff_eq!(std_dev(&v), 1.25_f64.sqrt());
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let v = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_abs_diff_eq!(percentile(&v, 0.0), 1.0);
        assert_abs_diff_eq!(percentile(&v, 50.0), 3.0);
        assert_abs_diff_eq!(percentile(&v, 100.0), 5.0);
        assert_abs_diff_eq!(percentile(&v, 95.0), 4.8, epsilon = 1e-12);
    }

    #[test]
    fn test_logsumexp_stable() {
        let v = [1000.0, 1000.0];
        assert_abs_diff_eq!(logsumexp(&v), 1000.0 + 2.0_f64.ln(), epsilon = 1e-9);
        assert_eq!(logsumexp(&[f64::NEG_INFINITY, f64::NEG_INFINITY]), f64::NEG_INFINITY);
        assert_abs_diff_eq!(logsumexp(&[0.0_f64.ln(), 1.0_f64.ln()]), 0.0);
    }

    #[test]
    fn test_linspace() {
        let v = linspace(0.0, 1.0, 5);
        assert_eq!(v.len(), 5);
        assert_abs_diff_eq!(v[4], 1.0);
        assert_abs_diff_eq!(v[1], 0.25);
    }
}
