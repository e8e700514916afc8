//! Per-subject logistic rescaling.
//!
//! Each subject is fitted independently: the logit of every candidate's
//! current polyrank is regressed on their raw result, and the subject's
//! percentile scale is rebuilt as `expit(b0 + b1 * result)` over all of its
//! distinct results.

use serde::{Deserialize, Serialize};

use polyrank_common::{PolyrankError, Result, SubjectId};

use crate::index::{CohortIndex, SubjectEntry};
use crate::percentile::PercentileTable;

/// Fitted logistic curve for one subject.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubjectFit {
    pub subject_id: SubjectId,
    pub intercept: f64,
    pub slope: f64,
    pub n_students: usize,
    /// All results identical; the slope is pinned to zero.
    pub degenerate: bool,
}

impl SubjectFit {
    pub fn percentile(&self, result: f64) -> f64 {
        expit(self.intercept + self.slope * result)
    }
}

/// Log-odds. Callers clamp `x` into (0, 1) first.
pub fn logit(x: f64) -> f64 {
    (x / (1.0 - x)).ln()
}

/// Logistic sigmoid, evaluated on the side that cannot overflow.
pub fn expit(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Fit one subject and return its new percentiles in slot order.
pub fn fit_subject(
    subject_id: SubjectId,
    entry: &SubjectEntry,
    polyranks: &[f64],
    eps: f64,
) -> Result<(SubjectFit, Vec<f64>)> {
    let n = entry.students.len();
    if n == 0 {
        return Err(PolyrankError::InvalidInput(format!(
            "subject {subject_id} has no candidates"
        )));
    }

    let mut xs = Vec::with_capacity(n);
    let mut ys = Vec::with_capacity(n);
    for &(si, result) in &entry.students {
        let target = polyranks.get(si).copied().ok_or_else(|| {
            PolyrankError::InvalidInput(format!("student index {si} outside polyrank vector"))
        })?;
        xs.push(result);
        ys.push(logit(target.clamp(eps, 1.0 - eps)));
    }

    let nf = n as f64;
    let x_bar = xs.iter().sum::<f64>() / nf;
    let y_bar = ys.iter().sum::<f64>() / nf;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (x, y) in xs.iter().zip(&ys) {
        sxy += (x - x_bar) * (y - y_bar);
        sxx += (x - x_bar) * (x - x_bar);
    }

    // a single distinct result can still leave rounding noise in sxx
    let degenerate = entry.results.len() < 2 || sxx <= 0.0;
    let slope = if degenerate { 0.0 } else { sxy / sxx };
    let intercept = y_bar - slope * x_bar;

    if !slope.is_finite() || !intercept.is_finite() {
        return Err(PolyrankError::NonFinite {
            subject: subject_id,
            detail: format!("intercept {intercept}, slope {slope}"),
        });
    }

    let fit = SubjectFit {
        subject_id,
        intercept,
        slope,
        n_students: n,
        degenerate,
    };

    let percentiles: Vec<f64> = entry.results.iter().map(|&r| fit.percentile(r)).collect();
    if let Some(bad) = percentiles.iter().position(|p| !p.is_finite()) {
        return Err(PolyrankError::NonFinite {
            subject: subject_id,
            detail: format!("percentile at result {}", entry.results[bad]),
        });
    }

    Ok((fit, percentiles))
}

/// Refit every subject against `polyranks` and build a fresh table.
///
/// With the `parallel` feature and `parallel == true`, subjects are fitted on
/// the rayon pool. Output is identical either way.
pub fn rescale_subjects(
    index: &CohortIndex,
    polyranks: &[f64],
    eps: f64,
    parallel: bool,
) -> Result<(PercentileTable, Vec<SubjectFit>)> {
    let subjects: Vec<(SubjectId, &SubjectEntry)> = index.subjects().collect();

    #[cfg(feature = "parallel")]
    {
        if parallel {
            use rayon::prelude::*;
            let fitted = subjects
                .par_iter()
                .map(|&(id, entry)| fit_subject(id, entry, polyranks, eps))
                .collect::<Result<Vec<_>>>()?;
            return Ok(assemble(fitted));
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    let fitted = subjects
        .iter()
        .map(|&(id, entry)| fit_subject(id, entry, polyranks, eps))
        .collect::<Result<Vec<_>>>()?;
    Ok(assemble(fitted))
}

fn assemble(fitted: Vec<(SubjectFit, Vec<f64>)>) -> (PercentileTable, Vec<SubjectFit>) {
    let mut table = PercentileTable::default();
    let mut fits = Vec::with_capacity(fitted.len());
    for (fit, percentiles) in fitted {
        table.insert_subject(fit.subject_id, percentiles);
        fits.push(fit);
    }
    (table, fits)
}
