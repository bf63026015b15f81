//! Partition agreement metrics.
//!
//! | Metric | Range | Best | Properties |
//! |--------|-------|------|------------|
//! | [`ari`] | [-1, 1] | 1 | Adjusted Rand Index, chance-corrected |
//! | [`nmi`] | [0, 1] | 1 | Normalized mutual information |
//!
//! Used to compare operational clusters against taxonomic ranks and the
//! detected communities against phylum labels.
//!
//! # References
//!
//! - Hubert & Arabie (1985). "Comparing partitions" (ARI)
//! - Strehl & Ghosh (2002). "Cluster ensembles" (NMI)

use std::collections::HashMap;
use std::hash::Hash;

/// Adjusted Rand Index between two labelings.
///
/// 0 is the agreement expected by chance, 1 is identical partitions.
/// Returns 0 for empty or length-mismatched input, and 1 when the index is
/// degenerate (both labelings trivially identical).
///
/// ```rust
/// use phylonet::metrics::ari;
///
/// let pred = [0, 0, 1, 1];
/// let truth = [0, 0, 1, 1];
/// assert!((ari(&pred, &truth) - 1.0).abs() < 1e-12);
/// ```
pub fn ari<A: Eq + Hash, B: Eq + Hash>(pred: &[A], truth: &[B]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }

    let table = Contingency::new(pred, truth);

    let sum_comb_ij: f64 = table.joint.values().map(|&c| comb2(c)).sum();
    let sum_comb_a: f64 = table.rows.values().map(|&a| comb2(a)).sum();
    let sum_comb_b: f64 = table.cols.values().map(|&b| comb2(b)).sum();

    let expected = sum_comb_a * sum_comb_b / comb2(table.n);
    let max_index = (sum_comb_a + sum_comb_b) / 2.0;

    let denom = max_index - expected;
    if denom.abs() < 1e-10 {
        return 1.0;
    }
    (sum_comb_ij - expected) / denom
}

/// Normalized Mutual Information, `2 I(U;V) / (H(U) + H(V))`.
///
/// Returns 1 when both labelings are constant.
pub fn nmi<A: Eq + Hash, B: Eq + Hash>(pred: &[A], truth: &[B]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }

    let table = Contingency::new(pred, truth);
    let n = table.n as f64;
    let entropy = |counts: &HashMap<usize, usize>| -> f64 {
        counts
            .values()
            .map(|&c| {
                let p = c as f64 / n;
                -p * p.ln()
            })
            .sum()
    };
    let h_pred = entropy(&table.rows);
    let h_truth = entropy(&table.cols);

    let mut mi = 0.0;
    for (&(p, t), &count) in &table.joint {
        let p_joint = count as f64 / n;
        let p_p = table.rows[&p] as f64 / n;
        let p_t = table.cols[&t] as f64 / n;
        mi += p_joint * (p_joint / (p_p * p_t)).ln();
    }

    let denom = h_pred + h_truth;
    if denom > 0.0 {
        2.0 * mi / denom
    } else {
        1.0
    }
}

/// Label-interned contingency table.
struct Contingency {
    joint: HashMap<(usize, usize), usize>,
    rows: HashMap<usize, usize>,
    cols: HashMap<usize, usize>,
    n: usize,
}

impl Contingency {
    fn new<A: Eq + Hash, B: Eq + Hash>(pred: &[A], truth: &[B]) -> Self {
        let pred = intern(pred);
        let truth = intern(truth);
        let mut joint = HashMap::new();
        let mut rows = HashMap::new();
        let mut cols = HashMap::new();
        for (&p, &t) in pred.iter().zip(&truth) {
            *joint.entry((p, t)).or_insert(0) += 1;
            *rows.entry(p).or_insert(0) += 1;
            *cols.entry(t).or_insert(0) += 1;
        }
        Self {
            joint,
            rows,
            cols,
            n: pred.len(),
        }
    }
}

fn intern<T: Eq + Hash>(labels: &[T]) -> Vec<usize> {
    let mut codes: HashMap<&T, usize> = HashMap::new();
    labels
        .iter()
        .map(|label| {
            let next = codes.len();
            *codes.entry(label).or_insert(next)
        })
        .collect()
}

fn comb2(n: usize) -> f64 {
    if n < 2 {
        0.0
    } else {
        (n * (n - 1) / 2) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ari_perfect() {
        assert!((ari(&[0, 0, 1, 1], &[0, 0, 1, 1]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ari_permuted_string_labels() {
        let pred = ["c1", "c1", "c2", "c2", "c3", "c3"];
        let truth = ["Genus B", "Genus B", "Genus A", "Genus A", "Genus C", "Genus C"];
        assert!((ari(&pred, &truth) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ari_known_value() {
        // sklearn: adjusted_rand_score([0,0,1,1],[0,0,1,2]) = 0.5714285714285715
        let score = ari(&[0, 0, 1, 1], &[0, 0, 1, 2]);
        assert!((score - 0.571_428_571_428_571_5).abs() < 1e-12);
    }

    #[test]
    fn test_ari_independent_is_negative_or_zero() {
        let score = ari(&[0, 1, 0, 1], &[0, 0, 1, 1]);
        assert!(score <= 0.0);
    }

    #[test]
    fn test_nmi_perfect_and_permuted() {
        assert!((nmi(&[0, 0, 1, 1, 2, 2], &[0, 0, 1, 1, 2, 2]) - 1.0).abs() < 1e-12);
        assert!((nmi(&[1, 1, 0, 0, 2, 2], &[0, 0, 1, 1, 2, 2]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mismatched_lengths() {
        assert_eq!(ari(&[0, 1], &[0]), 0.0);
        assert_eq!(nmi::<usize, usize>(&[], &[]), 0.0);
    }
}
