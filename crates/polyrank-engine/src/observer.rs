//! Progress reporting for the convergence loop.
//!
//! The loop calls an `IterationObserver` at iteration boundaries only.
//! Observers see post-iteration values and cannot influence the run.

use tracing::{debug, info, warn};

use polyrank_common::SubjectId;

/// Shape of the run, reported once before the first iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStart {
    pub n_students: usize,
    pub n_subjects: usize,
    pub n_distinct_results: usize,
    pub iterations: usize,
    /// Swing threshold in positions; 0 when early stopping is off.
    pub swing: f64,
}

/// Polyrank movement for one completed iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationReport {
    /// 1-based.
    pub iteration: usize,
    pub max_change: f64,
    /// `max_change` expressed in student positions.
    pub max_swing_positions: f64,
}

/// Hooks invoked by the convergence loop. All methods default to no-ops.
pub trait IterationObserver {
    fn on_start(&mut self, _start: &RunStart) {}

    fn on_iteration(&mut self, _report: &IterationReport) {}

    fn on_degenerate_fit(&mut self, _iteration: usize, _subject: SubjectId) {}

    fn on_converged(&mut self, _report: &IterationReport) {}

    fn on_finish(&mut self, _iterations_run: usize, _converged: bool) {}
}

// ── Observers ─────────────────────────────────────────────────────────────────

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl IterationObserver for NoopObserver {}

/// Logs progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl IterationObserver for TracingObserver {
    fn on_start(&mut self, start: &RunStart) {
        info!(
            "Scaling {} students across {} subjects ({} distinct results), up to {} iterations",
            start.n_students, start.n_subjects, start.n_distinct_results, start.iterations
        );
        if start.swing > 0.0 {
            info!("Early stopping below a swing of {} positions", start.swing);
        }
    }

    fn on_iteration(&mut self, report: &IterationReport) {
        debug!(
            iteration = report.iteration,
            max_change = report.max_change,
            "Iteration {}: max swing {:.4} positions",
            report.iteration,
            report.max_swing_positions
        );
    }

    fn on_degenerate_fit(&mut self, iteration: usize, subject: SubjectId) {
        warn!(
            "Subject {} has a single distinct result; fitted a flat curve (iteration {})",
            subject, iteration
        );
    }

    fn on_converged(&mut self, report: &IterationReport) {
        info!(
            "Converged after {} iteration(s): max swing {:.4} positions",
            report.iteration, report.max_swing_positions
        );
    }

    fn on_finish(&mut self, iterations_run: usize, converged: bool) {
        if !converged {
            info!("Finished {} iteration(s) without early stopping", iterations_run);
        }
    }
}

/// Everything an observer can be told, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    Start(RunStart),
    Iteration(IterationReport),
    DegenerateFit { iteration: usize, subject: SubjectId },
    Converged(IterationReport),
    Finish { iterations_run: usize, converged: bool },
}

/// Keeps every event; used by tests and callers that want a trace.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub events: Vec<ObserverEvent>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iterations(&self) -> Vec<IterationReport> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ObserverEvent::Iteration(r) => Some(*r),
                _ => None,
            })
            .collect()
    }

    pub fn degenerate_subjects(&self) -> Vec<SubjectId> {
        let mut subjects: Vec<SubjectId> = self
            .events
            .iter()
            .filter_map(|e| match e {
                ObserverEvent::DegenerateFit { subject, .. } => Some(*subject),
                _ => None,
            })
            .collect();
        subjects.sort_unstable();
        subjects.dedup();
        subjects
    }
}

impl IterationObserver for RecordingObserver {
    fn on_start(&mut self, start: &RunStart) {
        self.events.push(ObserverEvent::Start(start.clone()));
    }

    fn on_iteration(&mut self, report: &IterationReport) {
        self.events.push(ObserverEvent::Iteration(*report));
    }

    fn on_degenerate_fit(&mut self, iteration: usize, subject: SubjectId) {
        self.events.push(ObserverEvent::DegenerateFit { iteration, subject });
    }

    fn on_converged(&mut self, report: &IterationReport) {
        self.events.push(ObserverEvent::Converged(*report));
    }

    fn on_finish(&mut self, iterations_run: usize, converged: bool) {
        self.events.push(ObserverEvent::Finish {
            iterations_run,
            converged,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_keeps_order() {
        let mut obs = RecordingObserver::new();
        let report = IterationReport {
            iteration: 1,
            max_change: 0.0,
            max_swing_positions: 0.0,
        };
        obs.on_iteration(&report);
        obs.on_degenerate_fit(1, 4);
        obs.on_degenerate_fit(2, 4);
        obs.on_converged(&report);
        obs.on_finish(1, true);

        assert_eq!(obs.iterations(), vec![report]);
        assert_eq!(obs.degenerate_subjects(), vec![4]);
        assert_eq!(
            obs.events.last(),
            Some(&ObserverEvent::Finish { iterations_run: 1, converged: true })
        );
    }
}
