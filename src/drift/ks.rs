//! Two-sample Kolmogorov-Smirnov test.

use serde::{Deserialize, Serialize};

/// Result of a two-sample KS test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsOutcome {
    /// Supremum distance between the two empirical CDFs.
    pub statistic: f64,
    /// Asymptotic probability of a distance at least this large under H0.
    pub p_value: f64,
}

/// Run the test on two samples. Returns `None` if either side is empty.
///
/// Non-finite values are ignored.
pub fn two_sample(reference: &[f64], current: &[f64]) -> Option<KsOutcome> {
    let a = sorted_finite(reference);
    let b = sorted_finite(current);
    if a.is_empty() || b.is_empty() {
        return None;
    }

    let n = a.len() as f64;
    let m = b.len() as f64;
    let statistic = ecdf_distance(&a, &b);

    // Stephens' small-sample correction to the asymptotic distribution.
    let ne = (n * m / (n + m)).sqrt();
    let lambda = (ne + 0.12 + 0.11 / ne) * statistic;

    Some(KsOutcome {
        statistic,
        p_value: kolmogorov_survival(lambda),
    })
}

fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    out.sort_by(|x, y| x.total_cmp(y));
    out
}

/// Both inputs must be sorted. Tied values advance both sides together so
/// discrete features are not reported as drifted against themselves.
fn ecdf_distance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let m = b.len() as f64;
    let (mut i, mut j) = (0usize, 0usize);
    let mut d_max = 0.0f64;

    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        let diff = (i as f64 / n - j as f64 / m).abs();
        d_max = d_max.max(diff);
    }

    d_max
}

/// Q_KS(lambda) = 2 * sum_{k>=1} (-1)^(k-1) exp(-2 k^2 lambda^2)
fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    let a2 = -2.0 * lambda * lambda;
    let mut fac = 2.0;
    let mut sum = 0.0;
    let mut prev_term = 0.0f64;

    for k in 1..=100 {
        let kf = f64::from(k);
        let term = fac * (a2 * kf * kf).exp();
        sum += term;
        if term.abs() <= 0.001 * prev_term || term.abs() <= 1e-8 * sum {
            return sum.clamp(0.0, 1.0);
        }
        fac = -fac;
        prev_term = term.abs();
    }

    // Series did not converge: lambda is tiny, distributions are indistinguishable.
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_samples_do_not_differ() {
        let a: Vec<f64> = (0..200).map(|i| (i % 10) as f64).collect();
        let out = two_sample(&a, &a).unwrap();
        assert_eq!(out.statistic, 0.0);
        assert_eq!(out.p_value, 1.0);
    }

    #[test]
    fn test_disjoint_samples_differ() {
        let a: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..50).map(|i| 1000.0 + i as f64).collect();
        let out = two_sample(&a, &b).unwrap();
        assert_eq!(out.statistic, 1.0);
        assert!(out.p_value < 1e-6, "p = {}", out.p_value);
    }

    #[test]
    fn test_discrete_ties() {
        // Same {-1, 0, 1} proportions in both, different sizes.
        let a = vec![-1.0, 0.0, 1.0, -1.0, 0.0, 1.0];
        let b = vec![1.0, 0.0, -1.0];
        let out = two_sample(&a, &b).unwrap();
        assert!(out.statistic.abs() < 1e-12);
        assert_eq!(out.p_value, 1.0);

        // Half the mass moved from -1 to 1.
        let c = vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        let out = two_sample(&a, &c).unwrap();
        assert!((out.statistic - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial_overlap_p_value() {
        // Half the mass shifted: D = 0.5, n = m = 10, so
        // lambda = (sqrt(5) + 0.12 + 0.11 / sqrt(5)) * 0.5 ~= 1.20263.
        let a: Vec<f64> = (0..10).map(f64::from).collect();
        let b: Vec<f64> = (5..15).map(f64::from).collect();
        let out = two_sample(&a, &b).unwrap();
        assert!((out.statistic - 0.5).abs() < 1e-12);
        assert!((out.p_value - 0.110840).abs() < 1e-5, "p = {}", out.p_value);
    }

    #[test]
    fn test_empty_side_is_skipped() {
        assert!(two_sample(&[], &[1.0]).is_none());
        assert!(two_sample(&[1.0], &[f64::NAN]).is_none());
    }

    #[test]
    fn test_survival_function() {
        assert_eq!(kolmogorov_survival(0.0), 1.0);
        // Q(1.36) is the classic 5% critical value.
        let q = kolmogorov_survival(1.36);
        assert!((q - 0.05).abs() < 0.002, "Q(1.36) = {}", q);
        assert!(kolmogorov_survival(3.0) < 1e-6);
    }
}
