//! polyrank-engine — Iterative cross-subject scaling.
//!
//! Raw subject results are turned into mid-rank percentiles, averaged into a
//! per-student polyscore, ranked into a polyrank, and every subject is then
//! refitted against the polyrank with a logistic curve until the ranking
//! settles.

pub mod index;
pub mod percentile;
pub mod aggregate;
pub mod rescale;
pub mod observer;
pub mod engine;

pub use engine::{run_scaling, Scaler, ScalingOutcome, ScalingState, StudentRank};
pub use index::CohortIndex;
pub use observer::{IterationObserver, NoopObserver, RecordingObserver, TracingObserver};
pub use percentile::{PercentileRow, PercentileTable};
pub use rescale::SubjectFit;
