//! Replicate aggregation and the baseline comparison.
//!
//! Missing replicates (empty sub-graphs) are excluded from every statistic
//! and counted separately; they are never treated as zero.

use serde::Serialize;
use std::fmt;

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator), `None` below two values.
pub fn sample_sd(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mu = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - mu).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Error function, Abramowitz & Stegun 7.1.26 (|error| < 1.5e-7).
pub fn erf(x: f64) -> f64 {
    let sign = x.signum();
    let x = x.abs();
    let t = 1.0 / 0.327_591_1_f64.mul_add(x, 1.0);
    let poly = 1.061_405_429_f64
        .mul_add(t, -1.453_152_027)
        .mul_add(t, 1.421_413_741)
        .mul_add(t, -0.284_496_736)
        .mul_add(t, 0.254_829_592);
    sign * (poly * t).mul_add(-(-x * x).exp(), 1.0)
}

/// Standard normal CDF.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Result of a one-sample Wilcoxon signed-rank test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignedRankTest {
    /// Sum of ranks of positive differences (V).
    pub statistic: f64,
    /// Non-zero differences used.
    pub n: usize,
    /// Continuity-corrected normal deviate.
    pub z: f64,
    /// Two-sided p-value.
    pub p_value: f64,
}

/// One-sample Wilcoxon signed-rank test of `values` against `mu`.
///
/// Normal approximation with tie correction and continuity correction; zero
/// differences are dropped. Returns `None` when nothing is left to rank or
/// the variance vanishes.
pub fn wilcoxon_signed_rank(values: &[f64], mu: f64) -> Option<SignedRankTest> {
    let mut diffs: Vec<f64> = values.iter().map(|v| v - mu).filter(|d| *d != 0.0).collect();
    let n = diffs.len();
    if n == 0 {
        return None;
    }
    diffs.sort_by(|a, b| a.abs().total_cmp(&b.abs()));

    let mut statistic = 0.0;
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && diffs[j + 1].abs() == diffs[i].abs() {
            j += 1;
        }
        // ranks i+1..=j+1 share their average
        let rank = (i + j + 2) as f64 / 2.0;
        statistic += rank * diffs[i..=j].iter().filter(|d| **d > 0.0).count() as f64;
        let t = (j - i + 1) as f64;
        tie_term += t * t * t - t;
        i = j + 1;
    }

    let nf = n as f64;
    let expected = nf * (nf + 1.0) / 4.0;
    let variance = nf * (nf + 1.0) * (2.0 * nf + 1.0) / 24.0 - tie_term / 48.0;
    if variance <= 0.0 {
        return None;
    }

    let diff = statistic - expected;
    let z = (diff - 0.5 * diff.signum()) / variance.sqrt();
    let p_value = (2.0 * normal_cdf(z).min(1.0 - normal_cdf(z))).min(1.0);

    Some(SignedRankTest {
        statistic,
        n,
        z,
        p_value,
    })
}

/// Aggregate view of an experiment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Modularity of the full network.
    pub baseline: Option<f64>,
    /// Replicates run.
    pub replicates: usize,
    /// Replicates with a modularity score.
    pub scored: usize,
    /// Replicates whose sub-graph had no edges.
    pub missing: usize,
    pub mean: Option<f64>,
    pub sd: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Share of scored replicates at or above the baseline.
    pub fraction_at_least_baseline: Option<f64>,
    /// Replicate scores against the baseline.
    pub wilcoxon: Option<SignedRankTest>,
}

impl Summary {
    /// Summarise replicate scores (`None` = missing) against `baseline`.
    pub fn new(baseline: Option<f64>, scores: &[Option<f64>]) -> Self {
        let scored: Vec<f64> = scores.iter().flatten().copied().collect();
        let min = scored.iter().copied().reduce(f64::min);
        let max = scored.iter().copied().reduce(f64::max);

        let (fraction_at_least_baseline, wilcoxon) = match baseline {
            Some(b) if !scored.is_empty() => {
                let above = scored.iter().filter(|&&q| q >= b).count();
                (
                    Some(above as f64 / scored.len() as f64),
                    wilcoxon_signed_rank(&scored, b),
                )
            }
            _ => (None, None),
        };

        Self {
            baseline,
            replicates: scores.len(),
            scored: scored.len(),
            missing: scores.len() - scored.len(),
            mean: mean(&scored),
            sd: sample_sd(&scored),
            min,
            max,
            fraction_at_least_baseline,
            wilcoxon,
        }
    }
}

struct Maybe(Option<f64>);

impl fmt::Display for Maybe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v:.4}"),
            None => write!(f, "NA"),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Baseline modularity:    {}", Maybe(self.baseline))?;
        writeln!(
            f,
            "Replicate modularity:   {} ± {}",
            Maybe(self.mean),
            Maybe(self.sd)
        )?;
        writeln!(
            f,
            "Replicates:             {} ({} scored, {} missing)",
            self.replicates, self.scored, self.missing
        )?;
        writeln!(
            f,
            "Range:                  [{}, {}]",
            Maybe(self.min),
            Maybe(self.max)
        )?;
        write!(
            f,
            "Fraction >= baseline:   {}",
            Maybe(self.fraction_at_least_baseline)
        )?;
        if let Some(test) = &self.wilcoxon {
            write!(
                f,
                "\nWilcoxon signed-rank:   V = {}, p = {:.4e}",
                test.statistic, test.p_value
            )?;
        }
        Ok(())
    }
}
