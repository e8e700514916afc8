//! Raw result triples, the source of truth for a scaling run.

use serde::{Deserialize, Serialize};

pub type StudentId = i64;
pub type SubjectId = i64;

/// One raw (student, subject, result) observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultTriple {
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub result: f64,
}

impl ResultTriple {
    pub fn new(student_id: StudentId, subject_id: SubjectId, result: f64) -> Self {
        Self {
            student_id,
            subject_id,
            result: canonical_result(result),
        }
    }
}

/// Fold `-0.0` onto `0.0` so equal marks always compare as ties.
pub fn canonical_result(result: f64) -> f64 {
    if result == 0.0 {
        0.0
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_zero_is_folded() {
        let t = ResultTriple::new(1, 2, -0.0);
        assert!(t.result.is_sign_positive());
        assert_eq!(t.result, 0.0);
    }

    #[test]
    fn test_other_values_untouched() {
        assert_eq!(canonical_result(-3.5), -3.5);
        assert_eq!(canonical_result(42.0), 42.0);
    }
}
