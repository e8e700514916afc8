use thiserror::Error;

use crate::triple::{StudentId, SubjectId};

#[derive(Debug, Error)]
pub enum PolyrankError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Duplicate result for student {student} in subject {subject}")]
    DuplicateResult { student: StudentId, subject: SubjectId },

    #[error("No percentile recorded for subject {subject} at slot {slot}")]
    MissingPercentile { subject: SubjectId, slot: usize },

    #[error("Non-finite value while fitting subject {subject}: {detail}")]
    NonFinite { subject: SubjectId, detail: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PolyrankError>;
