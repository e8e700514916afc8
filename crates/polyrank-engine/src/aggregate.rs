//! Polyscore and polyrank aggregation.

use polyrank_common::{PolyrankError, Result};

use crate::index::CohortIndex;
use crate::percentile::PercentileTable;

/// Mean percentile over each student's subjects, in cohort order.
pub fn polyscores(index: &CohortIndex, table: &PercentileTable) -> Result<Vec<f64>> {
    (0..index.n_students())
        .map(|si| {
            let sittings = index.student_subjects(si);
            if sittings.is_empty() {
                return Err(PolyrankError::InvalidInput(format!(
                    "student {} has no results",
                    index.student_ids()[si]
                )));
            }
            let mut total = 0.0;
            for s in sittings {
                total += table.get(s.subject, s.slot)?;
            }
            Ok(total / sittings.len() as f64)
        })
        .collect()
}

/// Competition ("1-2-2-4") ranks, largest value first.
/// Tied values share a rank; the next value skips by the tie group size.
pub fn competition_rank(values: &[f64]) -> Vec<usize> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    let mut ranks = vec![0usize; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        for &k in &order[i..=j] {
            ranks[k] = i + 1;
        }
        i = j + 1;
    }
    ranks
}

/// `(n + 1 - rank) / n`: the best student maps to 1.0, the worst to 1/n.
pub fn polyranks(polyscores: &[f64]) -> Vec<f64> {
    let n = polyscores.len() as f64;
    competition_rank(polyscores)
        .into_iter()
        .map(|r| (n + 1.0 - r as f64) / n)
        .collect()
}

/// Largest absolute per-student difference between two polyrank vectors.
pub fn max_abs_change(old: &[f64], new: &[f64]) -> f64 {
    old.iter()
        .zip(new)
        .map(|(a, b)| (b - a).abs())
        .fold(0.0, f64::max)
}
