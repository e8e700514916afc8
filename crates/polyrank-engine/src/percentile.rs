//! Percentile table and raw mid-rank seeding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use polyrank_common::{PolyrankError, Result, SubjectId};

use crate::index::CohortIndex;

/// One row of the reported percentile table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileRow {
    pub subject_id: SubjectId,
    pub result: f64,
    pub percentile: f64,
}

/// Percentile per distinct (subject, result) pair.
///
/// Entries for a subject are stored in the same order as
/// `CohortIndex::subject_results`, so a `Sitting::slot` addresses its entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PercentileTable {
    entries: BTreeMap<SubjectId, Vec<f64>>,
}

impl PercentileTable {
    /// Mid-rank seeding: `(cum + c/2) / n_students`, where `c` is the number
    /// of students on a result and `cum` the number strictly below it.
    /// The denominator is the whole cohort, not the subject's candidature.
    pub fn seed(index: &CohortIndex) -> Self {
        let n = index.n_students() as f64;
        let entries = index
            .subjects()
            .map(|(subject, entry)| {
                let mut counts = vec![0usize; entry.results.len()];
                for &(_, result) in &entry.students {
                    if let Ok(slot) = entry.results.binary_search_by(|p| p.total_cmp(&result)) {
                        counts[slot] += 1;
                    }
                }

                let mut cum = 0usize;
                let percentiles = counts
                    .iter()
                    .map(|&c| {
                        let p = (cum as f64 + c as f64 / 2.0) / n;
                        cum += c;
                        p
                    })
                    .collect();
                (subject, percentiles)
            })
            .collect();

        Self { entries }
    }

    /// Replace a subject's entries wholesale.
    pub(crate) fn insert_subject(&mut self, subject: SubjectId, percentiles: Vec<f64>) {
        self.entries.insert(subject, percentiles);
    }

    pub fn get(&self, subject: SubjectId, slot: usize) -> Result<f64> {
        self.entries
            .get(&subject)
            .and_then(|v| v.get(slot))
            .copied()
            .ok_or(PolyrankError::MissingPercentile { subject, slot })
    }

    pub fn subject(&self, subject: SubjectId) -> Option<&[f64]> {
        self.entries.get(&subject).map(|v| v.as_slice())
    }

    /// Number of (subject, result) entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into report rows, ordered by subject then result.
    pub fn rows(&self, index: &CohortIndex) -> Vec<PercentileRow> {
        let mut rows = Vec::with_capacity(self.len());
        for (&subject_id, percentiles) in &self.entries {
            let results = index.subject_results(subject_id);
            for (&result, &percentile) in results.iter().zip(percentiles) {
                rows.push(PercentileRow {
                    subject_id,
                    result,
                    percentile,
                });
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyrank_common::{DuplicatePolicy, ResultTriple};

    fn index(triples: &[(i64, i64, f64)]) -> CohortIndex {
        let triples: Vec<ResultTriple> = triples
            .iter()
            .map(|&(s, j, r)| ResultTriple::new(s, j, r))
            .collect();
        CohortIndex::build(&triples, DuplicatePolicy::Reject).unwrap()
    }

    #[test]
    fn test_mid_rank_distinct() {
        let idx = index(&[(1, 1, 10.0), (2, 1, 20.0), (3, 1, 30.0)]);
        let table = PercentileTable::seed(&idx);
        let p = table.subject(1).unwrap();
        assert!((p[0] - 1.0 / 6.0).abs() < 1e-12);
        assert!((p[1] - 3.0 / 6.0).abs() < 1e-12);
        assert!((p[2] - 5.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_ties_share_block_centre() {
        // 10, 20, 20, 30 -> 1/8, (1 + 1)/4, (3 + 0.5)/4
        let idx = index(&[(1, 1, 10.0), (2, 1, 20.0), (3, 1, 20.0), (4, 1, 30.0)]);
        let table = PercentileTable::seed(&idx);
        assert_eq!(table.len(), 3);
        assert!((table.get(1, 0).unwrap() - 0.125).abs() < 1e-12);
        assert!((table.get(1, 1).unwrap() - 0.5).abs() < 1e-12);
        assert!((table.get(1, 2).unwrap() - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_scaled_by_whole_cohort() {
        // subject 2 is sat by two of four students
        let idx = index(&[
            (1, 1, 1.0),
            (2, 1, 2.0),
            (3, 1, 3.0),
            (4, 1, 4.0),
            (1, 2, 50.0),
            (2, 2, 60.0),
        ]);
        let table = PercentileTable::seed(&idx);
        assert!((table.get(2, 0).unwrap() - 0.125).abs() < 1e-12);
        assert!((table.get(2, 1).unwrap() - 0.375).abs() < 1e-12);
    }

    #[test]
    fn test_single_value_subject() {
        let idx = index(&[(1, 1, 7.0), (2, 1, 7.0)]);
        let table = PercentileTable::seed(&idx);
        assert_eq!(table.get(1, 0).unwrap(), 0.5);
    }

    #[test]
    fn test_missing_entry_is_error() {
        let idx = index(&[(1, 1, 7.0)]);
        let table = PercentileTable::seed(&idx);
        assert!(matches!(
            table.get(1, 3),
            Err(PolyrankError::MissingPercentile { subject: 1, slot: 3 })
        ));
        assert!(table.get(2, 0).is_err());
    }

    #[test]
    fn test_rows_ordered() {
        let idx = index(&[(1, 2, 5.0), (2, 2, 1.0), (1, 1, 3.0)]);
        let rows = PercentileTable::seed(&idx).rows(&idx);
        let keys: Vec<(i64, f64)> = rows.iter().map(|r| (r.subject_id, r.result)).collect();
        assert_eq!(keys, vec![(1, 3.0), (2, 1.0), (2, 5.0)]);
        assert!(rows.iter().all(|r| (0.0..=1.0).contains(&r.percentile)));
    }
}
