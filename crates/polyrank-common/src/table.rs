//! CSV loading for the raw result table.
//!
//! The table needs three named columns: `student_id`, `subject_id` and
//! `result`. Column order is free and any other columns are ignored.

use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::{PolyrankError, Result};
use crate::triple::{ResultTriple, StudentId, SubjectId};

pub const REQUIRED_COLUMNS: [&str; 3] = ["student_id", "subject_id", "result"];

#[derive(Debug, Deserialize)]
struct RawRow {
    student_id: StudentId,
    subject_id: SubjectId,
    result: f64,
}

/// Read result triples from any CSV source with a header row.
pub fn read_triples<R: Read>(source: R) -> Result<Vec<ResultTriple>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(PolyrankError::InvalidInput(format!(
            "missing required column(s): {}",
            missing.join(", ")
        )));
    }

    let mut triples = Vec::new();
    for (i, row) in reader.deserialize::<RawRow>().enumerate() {
        let row = row?;
        if !row.result.is_finite() {
            // header is line 1
            return Err(PolyrankError::InvalidInput(format!(
                "non-finite result '{}' on line {} (student {}, subject {})",
                row.result,
                i + 2,
                row.student_id,
                row.subject_id
            )));
        }
        triples.push(ResultTriple::new(row.student_id, row.subject_id, row.result));
    }

    if triples.is_empty() {
        return Err(PolyrankError::InvalidInput("result table is empty".to_string()));
    }

    debug!("Read {} result rows", triples.len());
    Ok(triples)
}

/// Read result triples from a CSV file on disk.
pub fn read_triples_from_path(path: impl AsRef<Path>) -> Result<Vec<ResultTriple>> {
    let file = std::fs::File::open(path.as_ref())?;
    read_triples(std::io::BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_rows_in_order() {
        let csv = "student_id,subject_id,result\n1,10,55.5\n2,10,60\n1,11,-0\n";
        let triples = read_triples(csv.as_bytes()).unwrap();
        assert_eq!(triples.len(), 3);
        assert_eq!(triples[0], ResultTriple::new(1, 10, 55.5));
        assert_eq!(triples[1].result, 60.0);
        assert!(triples[2].result.is_sign_positive());
    }

    #[test]
    fn test_column_order_and_extra_columns() {
        let csv = "result,name,subject_id,student_id\n71.0,Ada,3,9\n";
        let triples = read_triples(csv.as_bytes()).unwrap();
        assert_eq!(triples, vec![ResultTriple::new(9, 3, 71.0)]);
    }

    #[test]
    fn test_missing_columns_named() {
        let csv = "student_id,score\n1,2\n";
        let err = read_triples(csv.as_bytes()).unwrap_err();
        match err {
            PolyrankError::InvalidInput(msg) => {
                assert!(msg.contains("subject_id"));
                assert!(msg.contains("result"));
                assert!(!msg.contains("student_id"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_table_rejected() {
        let csv = "student_id,subject_id,result\n";
        assert!(matches!(
            read_triples(csv.as_bytes()),
            Err(PolyrankError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_finite_result_rejected() {
        let csv = "student_id,subject_id,result\n1,1,50\n2,1,NaN\n";
        let err = read_triples(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn test_unparsable_row_is_csv_error() {
        let csv = "student_id,subject_id,result\nabc,1,50\n";
        assert!(matches!(read_triples(csv.as_bytes()), Err(PolyrankError::Csv(_))));
    }
}
