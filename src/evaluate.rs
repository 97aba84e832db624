// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The parallel evaluator.  Grid cells are independent of one another,
//! so the work model is a plain pool: one worker per core, all of them
//! pulling the next unit off a shared, mutex-guarded iterator until
//! the queue runs dry or somebody asks us to stop.  The only other
//! shared state is a completed-unit counter and the timestamp of the
//! last progress report, both behind a single small mutex.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::debug;

use crate::grid::EvaluationUnit;
use crate::planes::ComplexPoint;
use crate::stability::StabilityTest;

/// A cooperative cancellation flag.  Workers poll it between unit
/// evaluations, never mid-iteration, so a single long-running point
/// can delay the response by up to its full iteration budget.
#[derive(Clone, Debug, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    /// A fresh, unsignalled flag.
    pub fn new() -> Self {
        CancelSignal(Arc::new(AtomicBool::new(false)))
    }

    /// Requests that the run stop picking up new units.  Units already
    /// being evaluated run to completion; their results stay valid.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A snapshot of run progress, handed to the progress callback.
#[derive(Clone, Debug)]
pub struct ProgressReport {
    /// Seconds since the run started.
    pub elapsed_seconds: f64,
    /// How many units have completed so far.
    pub current_step: usize,
    /// How many units the run will visit in total.
    pub total_steps: usize,
    /// The world position of the unit that triggered this report.
    pub current_position: ComplexPoint<f64>,
}

/// The progress callback type.  Reports are advisory; the callback is
/// invoked from whichever worker happens to cross the rate limit, so
/// it has to be callable from any thread.
pub type ProgressFn<'a> = &'a (dyn Fn(&ProgressReport) + Sync);

/// The shared progress accounting: how many units are done, and when
/// the callback last fired.  Hold time on the guarding mutex is a few
/// arithmetic comparisons plus, occasionally, the callback itself.
pub(crate) struct ProgressState {
    pub(crate) completed: usize,
    pub(crate) last_report: Instant,
}

/// Records `finished` newly completed units and fires the callback if
/// at least `interval` has passed since the last report.
pub(crate) fn record_completed(
    state: &Mutex<ProgressState>,
    started: Instant,
    finished: usize,
    total_steps: usize,
    position: ComplexPoint<f64>,
    progress: Option<ProgressFn<'_>>,
    interval: Duration,
) {
    let mut state = state.lock().unwrap();
    state.completed += finished;
    if let Some(report) = progress {
        if state.last_report.elapsed() >= interval {
            state.last_report = Instant::now();
            report(&ProgressReport {
                elapsed_seconds: started.elapsed().as_secs_f64(),
                current_step: state.completed,
                total_steps,
                current_position: position,
            });
        }
    }
}

/// Runs the stability test across every unit using a pool of workers.
/// Every unit is visited exactly once; completion order between units
/// is unspecified.  Returns `false` if cancellation was observed, in
/// which case whichever units completed keep their results and the
/// rest stay unevaluated.
pub(crate) fn evaluate_units(
    units: &mut [EvaluationUnit],
    test: &StabilityTest,
    max_iterations: u32,
    threshold: f64,
    cancel: &CancelSignal,
    progress: Option<ProgressFn<'_>>,
    interval: Duration,
) -> bool {
    let total_steps = units.len();
    let started = Instant::now();
    let state = Mutex::new(ProgressState {
        completed: 0,
        last_report: started,
    });
    let interrupted = AtomicBool::new(false);
    let queue = Arc::new(Mutex::new(units.iter_mut()));
    let workers = num_cpus::get();
    debug!(
        "evaluating {} units with {:?} across {} workers",
        total_steps, test, workers
    );

    crossbeam::scope(|spawner| {
        for _ in 0..workers {
            let queue = queue.clone();
            let state = &state;
            let interrupted = &interrupted;
            spawner.spawn(move |_| loop {
                if cancel.is_cancelled() {
                    interrupted.store(true, Ordering::Relaxed);
                    break;
                }
                let unit = { queue.lock().unwrap().next() };
                match unit {
                    Some(unit) => {
                        let stable = test.evaluate(unit, max_iterations, threshold);
                        unit.is_stable = Some(stable);
                        let position = unit.world_position;
                        record_completed(state, started, 1, total_steps, position, progress, interval);
                    }
                    None => {
                        break;
                    }
                }
            });
        }
    })
    .unwrap();

    !interrupted.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{build_units, RunSettings};
    use std::sync::atomic::AtomicUsize;

    fn settings(step_width: usize, step_height: usize) -> RunSettings {
        RunSettings {
            origin: ComplexPoint::new(-0.5, 0.0),
            fractal_width: 4.0,
            fractal_height: 4.0,
            step_width,
            step_height,
            max_iterations: 50,
            escape_threshold: Some(4.0),
            histogram: false,
        }
    }

    #[test]
    fn every_unit_is_visited_exactly_once() {
        let mut units = build_units(&settings(20, 20)).unwrap();
        let completed = evaluate_units(
            &mut units,
            &StabilityTest::Classic,
            50,
            4.0,
            &CancelSignal::new(),
            None,
            Duration::from_secs(1),
        );
        assert!(completed);
        assert!(units.iter().all(|unit| unit.is_stable.is_some()));
    }

    #[test]
    fn repeated_runs_are_deterministic() {
        let config = settings(16, 16);
        let mut first = build_units(&config).unwrap();
        let mut second = build_units(&config).unwrap();
        for units in vec![&mut first, &mut second] {
            evaluate_units(
                units.as_mut_slice(),
                &StabilityTest::Classic,
                50,
                4.0,
                &CancelSignal::new(),
                None,
                Duration::from_secs(1),
            );
        }
        assert_eq!(first, second);
    }

    #[test]
    fn cancellation_leaves_a_strict_subset() {
        let mut units = build_units(&settings(100, 100)).unwrap();
        let cancel = CancelSignal::new();
        let canceller = |_report: &ProgressReport| cancel.cancel();
        let completed = evaluate_units(
            &mut units,
            &StabilityTest::Classic,
            50,
            4.0,
            &cancel,
            Some(&canceller),
            Duration::from_secs(0),
        );
        assert!(!completed);
        let evaluated = units.iter().filter(|unit| unit.is_stable.is_some()).count();
        assert!(evaluated >= 1, "at least one unit completed");
        assert!(evaluated < 10_000, "progress did not silently complete");
    }

    #[test]
    fn pre_cancelled_run_touches_nothing() {
        let mut units = build_units(&settings(10, 10)).unwrap();
        let cancel = CancelSignal::new();
        cancel.cancel();
        let completed = evaluate_units(
            &mut units,
            &StabilityTest::Classic,
            50,
            4.0,
            &cancel,
            None,
            Duration::from_secs(1),
        );
        assert!(!completed);
        assert!(units.iter().all(|unit| unit.is_stable.is_none()));
    }

    #[test]
    fn progress_reports_carry_sane_counts() {
        let mut units = build_units(&settings(8, 8)).unwrap();
        let reports = AtomicUsize::new(0);
        let highest = Mutex::new(0usize);
        let watcher = |report: &ProgressReport| {
            assert_eq!(report.total_steps, 64);
            assert!(report.current_step >= 1);
            assert!(report.current_step <= 64);
            assert!(report.elapsed_seconds >= 0.0);
            reports.fetch_add(1, Ordering::Relaxed);
            let mut highest = highest.lock().unwrap();
            assert!(report.current_step >= *highest, "counter is monotonic");
            *highest = report.current_step;
        };
        let completed = evaluate_units(
            &mut units,
            &StabilityTest::Classic,
            50,
            4.0,
            &CancelSignal::new(),
            Some(&watcher),
            Duration::from_secs(0),
        );
        assert!(completed);
        assert!(reports.load(Ordering::Relaxed) >= 1);
    }
}
