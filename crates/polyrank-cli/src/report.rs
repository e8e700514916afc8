//! Run report and its on-disk renderings.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use polyrank_common::ScalingConfig;
use polyrank_engine::{PercentileRow, ScalingOutcome, StudentRank};

/// Everything a scaling run produced, plus the settings that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub input: String,
    pub config: ScalingConfig,
    #[serde(flatten)]
    pub outcome: ScalingOutcome,
}

impl ScalingReport {
    pub fn new(input: impl Into<String>, config: ScalingConfig, outcome: ScalingOutcome) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            input: input.into(),
            config,
            outcome,
        }
    }

    /// Pretty JSON to any writer.
    pub fn write_json<W: Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        Ok(())
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create report file: {:?}", path))?;
        self.write_json(std::io::BufWriter::new(file))
    }
}

/// `subject_id,result,percentile`, one row per distinct (subject, result).
pub fn write_percentiles_csv(path: &Path, rows: &[PercentileRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create percentile file: {:?}", path))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// `student_id,polyscore,polyrank` in cohort order.
pub fn write_ranks_csv(path: &Path, ranks: &[StudentRank]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create rank file: {:?}", path))?;
    for rank in ranks {
        writer.serialize(rank)?;
    }
    writer.flush()?;
    Ok(())
}
