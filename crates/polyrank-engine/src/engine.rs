//! Convergence loop: repeated rescale -> aggregate cycles.
//!
//! `Scaler::new` performs the one-off work (seeding and the first
//! aggregation). Each `step` runs one full iteration; percentiles,
//! polyscores and polyranks are only readable between steps.

use serde::{Deserialize, Serialize};

use polyrank_common::{Result, ResultTriple, ScalingConfig, StudentId};

use crate::aggregate::{max_abs_change, polyranks, polyscores};
use crate::index::CohortIndex;
use crate::observer::{IterationObserver, IterationReport, RunStart};
use crate::percentile::{PercentileRow, PercentileTable};
use crate::rescale::{rescale_subjects, SubjectFit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalingState {
    /// Seeded, no iteration scheduled yet.
    Init,
    Iterating { completed: usize },
    /// `converged` is set only when the swing threshold stopped the loop.
    Done { converged: bool },
}

// ── Result summary ────────────────────────────────────────────────────────────

/// Final snapshot of a scaling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingOutcome {
    #[serde(rename = "r")]
    pub percentiles: Vec<PercentileRow>,
    #[serde(rename = "p")]
    pub polyscores: Vec<f64>,
    #[serde(rename = "pdash")]
    pub polyranks: Vec<f64>,
    pub max_rank_changes: Vec<f64>,
    /// Order of `p` and `pdash`.
    pub student_ids: Vec<StudentId>,
    /// Fits from the last iteration; empty when no iteration ran.
    pub fits: Vec<SubjectFit>,
    pub iterations_run: usize,
    /// Stopped early on the swing threshold.
    pub converged: bool,
}

/// One student's line in the final ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StudentRank {
    pub student_id: StudentId,
    pub polyscore: f64,
    pub polyrank: f64,
}

impl ScalingOutcome {
    /// Students in input order with their final polyscore and polyrank.
    pub fn student_ranks(&self) -> Vec<StudentRank> {
        self.student_ids
            .iter()
            .zip(self.polyscores.iter().zip(&self.polyranks))
            .map(|(&student_id, (&polyscore, &polyrank))| StudentRank {
                student_id,
                polyscore,
                polyrank,
            })
            .collect()
    }

    pub fn polyrank_of(&self, student_id: StudentId) -> Option<f64> {
        self.student_ids
            .iter()
            .position(|&s| s == student_id)
            .map(|i| self.polyranks[i])
    }
}

// ── Loop driver ───────────────────────────────────────────────────────────────

pub struct Scaler {
    index: CohortIndex,
    config: ScalingConfig,
    table: PercentileTable,
    polyscores: Vec<f64>,
    polyranks: Vec<f64>,
    fits: Vec<SubjectFit>,
    trace: Vec<f64>,
    state: ScalingState,
}

impl Scaler {
    /// Seed raw percentiles and compute the initial polyscores/polyranks.
    pub fn new(index: CohortIndex, config: ScalingConfig) -> Result<Self> {
        config.validate()?;

        let table = PercentileTable::seed(&index);
        let scores = polyscores(&index, &table)?;
        let ranks = polyranks(&scores);

        let state = if config.iterations == 0 {
            ScalingState::Done { converged: false }
        } else {
            ScalingState::Init
        };

        Ok(Self {
            index,
            config,
            table,
            polyscores: scores,
            polyranks: ranks,
            fits: Vec::new(),
            trace: Vec::new(),
            state,
        })
    }

    pub fn state(&self) -> ScalingState {
        self.state
    }

    pub fn index(&self) -> &CohortIndex {
        &self.index
    }

    pub fn config(&self) -> &ScalingConfig {
        &self.config
    }

    pub fn percentiles(&self) -> &PercentileTable {
        &self.table
    }

    pub fn polyscores(&self) -> &[f64] {
        &self.polyscores
    }

    pub fn polyranks(&self) -> &[f64] {
        &self.polyranks
    }

    pub fn max_rank_changes(&self) -> &[f64] {
        &self.trace
    }

    /// Polyrank-fraction threshold implied by the swing, if early stopping is on.
    pub fn change_threshold(&self) -> Option<f64> {
        self.config
            .early_stopping()
            .then(|| self.config.swing / self.index.n_students() as f64)
    }

    /// Run one iteration. A no-op once the run is `Done`.
    pub fn step(&mut self, observer: &mut dyn IterationObserver) -> Result<ScalingState> {
        let completed = match self.state {
            ScalingState::Done { .. } => return Ok(self.state),
            ScalingState::Init => 0,
            ScalingState::Iterating { completed } => completed,
        };
        let iteration = completed + 1;

        let (table, fits) = rescale_subjects(
            &self.index,
            &self.polyranks,
            self.config.clamp_eps,
            self.config.parallel,
        )?;
        for fit in fits.iter().filter(|f| f.degenerate) {
            observer.on_degenerate_fit(iteration, fit.subject_id);
        }

        let scores = polyscores(&self.index, &table)?;
        let ranks = polyranks(&scores);
        let max_change = max_abs_change(&self.polyranks, &ranks);

        self.table = table;
        self.fits = fits;
        self.polyscores = scores;
        self.polyranks = ranks;
        self.trace.push(max_change);

        let report = IterationReport {
            iteration,
            max_change,
            max_swing_positions: max_change * self.index.n_students() as f64,
        };
        observer.on_iteration(&report);

        self.state = match self.change_threshold() {
            Some(threshold) if max_change < threshold => {
                observer.on_converged(&report);
                ScalingState::Done { converged: true }
            }
            _ if iteration >= self.config.iterations => ScalingState::Done { converged: false },
            _ => ScalingState::Iterating { completed: iteration },
        };
        Ok(self.state)
    }

    /// Drive `step` until the run is done.
    pub fn run(&mut self, observer: &mut dyn IterationObserver) -> Result<()> {
        observer.on_start(&RunStart {
            n_students: self.index.n_students(),
            n_subjects: self.index.n_subjects(),
            n_distinct_results: self.index.n_distinct_results(),
            iterations: self.config.iterations,
            swing: self.config.swing,
        });

        while !matches!(self.state, ScalingState::Done { .. }) {
            self.step(observer)?;
        }

        let converged = matches!(self.state, ScalingState::Done { converged: true });
        observer.on_finish(self.trace.len(), converged);
        Ok(())
    }

    pub fn finish(self) -> ScalingOutcome {
        let converged = matches!(self.state, ScalingState::Done { converged: true });
        ScalingOutcome {
            percentiles: self.table.rows(&self.index),
            polyscores: self.polyscores,
            polyranks: self.polyranks,
            iterations_run: self.trace.len(),
            max_rank_changes: self.trace,
            student_ids: self.index.student_ids().to_vec(),
            fits: self.fits,
            converged,
        }
    }
}

/// Index `triples`, run the loop to completion and return the final snapshot.
pub fn run_scaling(
    triples: &[ResultTriple],
    config: &ScalingConfig,
    observer: &mut dyn IterationObserver,
) -> Result<ScalingOutcome> {
    config.validate()?;
    let index = CohortIndex::build(triples, config.duplicate_policy)?;
    let mut scaler = Scaler::new(index, config.clone())?;
    scaler.run(observer)?;
    Ok(scaler.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{NoopObserver, ObserverEvent, RecordingObserver};
    use polyrank_common::{DuplicatePolicy, PolyrankError};

    fn cohort() -> Vec<ResultTriple> {
        // student 1 leads in two subjects, student 3 trails in two
        [
            (1, 1, 90.0),
            (1, 2, 75.0),
            (1, 3, 60.5),
            (2, 1, 70.0),
            (2, 2, 80.0),
            (2, 3, 55.0),
            (3, 1, 50.0),
            (3, 2, 65.0),
            (3, 3, 58.0),
        ]
        .iter()
        .map(|&(s, j, r)| ResultTriple::new(s, j, r))
        .collect()
    }

    fn config(iterations: usize, swing: f64) -> ScalingConfig {
        ScalingConfig {
            iterations,
            swing,
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_iterations_is_raw_seed() {
        let index = CohortIndex::build(&cohort(), DuplicatePolicy::Reject).unwrap();
        let seeded = PercentileTable::seed(&index).rows(&index);

        let out = run_scaling(&cohort(), &config(0, 0.0), &mut NoopObserver).unwrap();
        assert!(out.max_rank_changes.is_empty());
        assert_eq!(out.iterations_run, 0);
        assert!(out.fits.is_empty());
        assert_eq!(out.percentiles, seeded);
        assert_eq!(out.polyranks, vec![1.0, 2.0 / 3.0, 1.0 / 3.0]);
        assert!((out.polyscores[0] - 13.0 / 18.0).abs() < 1e-12);
        assert!((out.polyscores[2] - 5.0 / 18.0).abs() < 1e-12);
    }

    #[test]
    fn test_new_with_zero_iterations_is_done() {
        let index = CohortIndex::build(&cohort(), DuplicatePolicy::Reject).unwrap();
        let mut scaler = Scaler::new(index, config(0, 0.0)).unwrap();
        assert_eq!(scaler.state(), ScalingState::Done { converged: false });
        let before = scaler.polyranks().to_vec();
        assert_eq!(
            scaler.step(&mut NoopObserver).unwrap(),
            ScalingState::Done { converged: false }
        );
        assert_eq!(scaler.polyranks(), before.as_slice());
    }

    #[test]
    fn test_step_advances_state() {
        let index = CohortIndex::build(&cohort(), DuplicatePolicy::Reject).unwrap();
        let mut scaler = Scaler::new(index, config(2, 0.0)).unwrap();
        assert_eq!(scaler.state(), ScalingState::Init);
        assert_eq!(
            scaler.step(&mut NoopObserver).unwrap(),
            ScalingState::Iterating { completed: 1 }
        );
        assert_eq!(scaler.max_rank_changes().len(), 1);
        assert_eq!(
            scaler.step(&mut NoopObserver).unwrap(),
            ScalingState::Done { converged: false }
        );
        assert_eq!(scaler.finish().iterations_run, 2);
    }

    #[test]
    fn test_no_early_stop_runs_every_iteration() {
        let out = run_scaling(&cohort(), &config(10, 0.0), &mut NoopObserver).unwrap();
        assert_eq!(out.max_rank_changes.len(), 10);
        assert!(!out.converged);
        assert_eq!(out.fits.len(), 3);
    }

    #[test]
    fn test_large_swing_stops_after_first_iteration() {
        let mut obs = RecordingObserver::new();
        let out = run_scaling(&cohort(), &config(10, 2.0), &mut obs).unwrap();
        assert_eq!(out.max_rank_changes.len(), 1);
        assert!(out.converged);
        assert!(matches!(obs.events.first(), Some(ObserverEvent::Start(_))));
        assert!(obs
            .events
            .iter()
            .any(|e| matches!(e, ObserverEvent::Converged(r) if r.iteration == 1)));
        assert_eq!(
            obs.events.last(),
            Some(&ObserverEvent::Finish { iterations_run: 1, converged: true })
        );
    }

    #[test]
    fn test_change_threshold_conversion() {
        let index = CohortIndex::build(&cohort(), DuplicatePolicy::Reject).unwrap();
        let scaler = Scaler::new(index.clone(), config(5, 1.5)).unwrap();
        assert_eq!(scaler.change_threshold(), Some(0.5));
        let scaler = Scaler::new(index, config(5, 0.0)).unwrap();
        assert_eq!(scaler.change_threshold(), None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = run_scaling(&cohort(), &config(5, -1.0), &mut NoopObserver).unwrap_err();
        assert!(matches!(err, PolyrankError::Config(_)));
    }

    #[test]
    fn test_student_ranks_join_ids() {
        let out = run_scaling(&cohort(), &config(3, 0.0), &mut NoopObserver).unwrap();
        let ranks = out.student_ranks();
        assert_eq!(ranks.len(), 3);
        assert_eq!(ranks[0].student_id, 1);
        assert_eq!(out.polyrank_of(1), Some(ranks[0].polyrank));
        assert_eq!(out.polyrank_of(42), None);
    }

    #[test]
    fn test_outcome_serialises_contract_names() {
        let out = run_scaling(&cohort(), &config(1, 0.0), &mut NoopObserver).unwrap();
        let json = serde_json::to_value(&out).unwrap();
        for key in ["r", "p", "pdash", "max_rank_changes"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["r"].as_array().unwrap().len(), 9);
    }
}
