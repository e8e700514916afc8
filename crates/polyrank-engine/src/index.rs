//! Cohort index: lookup structures built once per run over the raw triples.
//!
//! Students keep the order in which they first appear in the input; that
//! order fixes the layout of every per-student vector the engine produces.
//! Subjects are kept in ascending id order.

use std::collections::{BTreeMap, HashMap};

use polyrank_common::{DuplicatePolicy, PolyrankError, Result, ResultTriple, StudentId, SubjectId};

/// One subject sat by one student.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sitting {
    pub subject: SubjectId,
    pub result: f64,
    /// Position of `result` in the subject's sorted distinct results.
    pub slot: usize,
}

/// Per-subject view of the cohort.
#[derive(Debug, Clone, Default)]
pub struct SubjectEntry {
    /// Sorted distinct raw results.
    pub results: Vec<f64>,
    /// (student index, raw result) for every student who sat the subject.
    pub students: Vec<(usize, f64)>,
}

#[derive(Debug, Clone)]
pub struct CohortIndex {
    student_ids: Vec<StudentId>,
    student_subjects: Vec<Vec<Sitting>>,
    subjects: BTreeMap<SubjectId, SubjectEntry>,
}

impl CohortIndex {
    /// Build the index in one pass over `triples` plus a per-subject sort.
    pub fn build(triples: &[ResultTriple], policy: DuplicatePolicy) -> Result<Self> {
        if triples.is_empty() {
            return Err(PolyrankError::InvalidInput("result table is empty".to_string()));
        }

        let mut student_pos: HashMap<StudentId, usize> = HashMap::new();
        let mut student_ids: Vec<StudentId> = Vec::new();
        let mut raw: Vec<Vec<(SubjectId, f64)>> = Vec::new();
        // (student index, subject) -> position in raw[student]
        let mut seen: HashMap<(usize, SubjectId), usize> = HashMap::new();

        for t in triples {
            if !t.result.is_finite() {
                return Err(PolyrankError::InvalidInput(format!(
                    "non-finite result for student {} in subject {}",
                    t.student_id, t.subject_id
                )));
            }
            let result = polyrank_common::triple::canonical_result(t.result);

            let si = *student_pos.entry(t.student_id).or_insert_with(|| {
                student_ids.push(t.student_id);
                raw.push(Vec::new());
                student_ids.len() - 1
            });

            match seen.get(&(si, t.subject_id)) {
                Some(&pos) => match policy {
                    DuplicatePolicy::Reject => {
                        return Err(PolyrankError::DuplicateResult {
                            student: t.student_id,
                            subject: t.subject_id,
                        });
                    }
                    DuplicatePolicy::LastWins => raw[si][pos].1 = result,
                },
                None => {
                    seen.insert((si, t.subject_id), raw[si].len());
                    raw[si].push((t.subject_id, result));
                }
            }
        }

        let mut subjects: BTreeMap<SubjectId, SubjectEntry> = BTreeMap::new();
        for (si, sittings) in raw.iter().enumerate() {
            for &(subject, result) in sittings {
                subjects.entry(subject).or_default().students.push((si, result));
            }
        }
        for entry in subjects.values_mut() {
            let mut results: Vec<f64> = entry.students.iter().map(|&(_, r)| r).collect();
            results.sort_by(f64::total_cmp);
            results.dedup();
            entry.results = results;
        }

        let student_subjects = raw
            .into_iter()
            .map(|sittings| {
                sittings
                    .into_iter()
                    .map(|(subject, result)| {
                        let slot = slot_of(&subjects[&subject].results, result);
                        Sitting { subject, result, slot }
                    })
                    .collect()
            })
            .collect();

        Ok(Self {
            student_ids,
            student_subjects,
            subjects,
        })
    }

    pub fn n_students(&self) -> usize {
        self.student_ids.len()
    }

    pub fn n_subjects(&self) -> usize {
        self.subjects.len()
    }

    /// Student ids in output order.
    pub fn student_ids(&self) -> &[StudentId] {
        &self.student_ids
    }

    /// Subject ids in ascending order.
    pub fn subject_ids(&self) -> impl Iterator<Item = SubjectId> + '_ {
        self.subjects.keys().copied()
    }

    pub fn subject(&self, subject: SubjectId) -> Option<&SubjectEntry> {
        self.subjects.get(&subject)
    }

    pub fn subjects(&self) -> impl Iterator<Item = (SubjectId, &SubjectEntry)> + '_ {
        self.subjects.iter().map(|(&id, entry)| (id, entry))
    }

    /// Sorted distinct results recorded for `subject`.
    pub fn subject_results(&self, subject: SubjectId) -> &[f64] {
        self.subjects
            .get(&subject)
            .map(|e| e.results.as_slice())
            .unwrap_or(&[])
    }

    /// (student index, result) pairs for `subject`.
    pub fn subject_students(&self, subject: SubjectId) -> &[(usize, f64)] {
        self.subjects
            .get(&subject)
            .map(|e| e.students.as_slice())
            .unwrap_or(&[])
    }

    /// Subjects sat by the student at `index`.
    pub fn student_subjects(&self, index: usize) -> &[Sitting] {
        self.student_subjects
            .get(index)
            .map(|s| s.as_slice())
            .unwrap_or(&[])
    }

    /// Total number of distinct (subject, result) pairs.
    pub fn n_distinct_results(&self) -> usize {
        self.subjects.values().map(|e| e.results.len()).sum()
    }
}

fn slot_of(results: &[f64], result: f64) -> usize {
    // every result was inserted into `results` above
    results
        .binary_search_by(|probe| probe.total_cmp(&result))
        .unwrap_or_else(|insert_at| insert_at)
}
