//! The staged pipeline: configure, build the grid, evaluate, then
//! color.  The engine owns the unit collection and is the only way to
//! reach it, which is what enforces the ordering contract; results
//! are never visible to a caller while an evaluation could still be
//! writing them.

use std::time::Duration;

use log::debug;

use crate::colors::{Color, ColorRamp};
use crate::errors::EngineError;
use crate::evaluate::{self, CancelSignal, ProgressFn};
use crate::grid::{self, EvaluationUnit, RunSettings};
use crate::histogram;
use crate::render::{self, PixelBuffer};
use crate::stability::StabilityTest;

/// Drives one fractal run from configuration to pixels.
///
/// The stages must run in order; anything out of sequence fails with
/// an ordering error rather than producing half-initialized output.
/// Reconfiguring with different settings discards the stages built on
/// the old ones, while reconfiguring with identical settings is a
/// no-op and keeps the cached grid.
#[derive(Default)]
pub struct FractalEngine {
    settings: Option<RunSettings>,
    units: Vec<EvaluationUnit>,
    grid_ready: bool,
    run_finished: bool,
    fully_evaluated: bool,
    histogram_ready: bool,
}

impl FractalEngine {
    /// An unconfigured engine.
    pub fn new() -> Self {
        FractalEngine::default()
    }

    /// Installs the settings for the next run.  Changing anything
    /// invalidates the grid and every later stage; submitting the
    /// settings already installed changes nothing.
    pub fn configure(&mut self, settings: RunSettings) {
        if self.settings.as_ref() == Some(&settings) {
            return;
        }
        self.settings = Some(settings);
        self.units.clear();
        self.grid_ready = false;
        self.run_finished = false;
        self.fully_evaluated = false;
        self.histogram_ready = false;
    }

    /// The currently installed settings, if any.
    pub fn settings(&self) -> Option<&RunSettings> {
        self.settings.as_ref()
    }

    /// Builds the evaluation grid from the installed settings.
    /// Validates before allocating anything; idempotent while the
    /// settings stay unchanged.
    pub fn build_grid(&mut self) -> Result<(), EngineError> {
        let settings = self
            .settings
            .as_ref()
            .ok_or(EngineError::Ordering("grid built before configuration"))?;
        if self.grid_ready {
            debug!("grid unchanged, reusing {} units", self.units.len());
            return Ok(());
        }
        self.units = grid::build_units(settings)?;
        self.grid_ready = true;
        self.run_finished = false;
        self.fully_evaluated = false;
        self.histogram_ready = false;
        Ok(())
    }

    /// Runs the stability test across the grid.  Returns `Ok(false)`
    /// when the run observed cancellation, in which case the units
    /// that completed keep their results and nothing is rolled back.
    /// After a complete run with the histogram flag set, the
    /// normalization pass follows immediately; a cancelled run never
    /// gets one, since the distribution would be meaningless.
    pub fn evaluate(
        &mut self,
        test: &StabilityTest,
        cancel: &CancelSignal,
        progress: Option<ProgressFn<'_>>,
        interval: Duration,
    ) -> Result<bool, EngineError> {
        if !self.grid_ready {
            return Err(EngineError::Ordering("evaluation before grid construction"));
        }
        let settings = self
            .settings
            .as_ref()
            .ok_or(EngineError::Ordering("evaluation before configuration"))?;
        let threshold = settings.escape_threshold.ok_or_else(|| {
            EngineError::Configuration("escape threshold is unset".to_string())
        })?;

        for unit in &mut self.units {
            unit.reset();
        }
        self.run_finished = false;
        self.fully_evaluated = false;
        self.histogram_ready = false;

        let completed = evaluate::evaluate_units(
            &mut self.units,
            test,
            settings.max_iterations,
            threshold,
            cancel,
            progress,
            interval,
        );
        self.run_finished = true;
        self.fully_evaluated = completed;
        if completed && settings.histogram {
            histogram::apply(&mut self.units, settings.max_iterations);
            self.histogram_ready = true;
        }
        debug!(
            "evaluation {} over {} units",
            if completed { "completed" } else { "cancelled" },
            self.units.len()
        );
        Ok(completed)
    }

    /// The evaluated units, row-major from the bottom of the region.
    /// Unavailable until an evaluation run has finished; after a
    /// cancelled run this exposes the partial write-set, with the
    /// untouched units still marked unevaluated.
    pub fn units(&self) -> Result<&[EvaluationUnit], EngineError> {
        if !self.run_finished {
            return Err(EngineError::Ordering(
                "results read before evaluation finished",
            ));
        }
        Ok(&self.units)
    }

    /// Colors the evaluated grid into an RGBA pixel buffer.  Requires
    /// a fully evaluated grid; histogram coloring additionally
    /// requires that the histogram pass ran, meaning the settings had
    /// the flag set and the run was not cancelled.
    pub fn render(
        &self,
        ramp: &ColorRamp,
        stable_color: Color,
        use_histogram: bool,
        progress: Option<ProgressFn<'_>>,
        interval: Duration,
    ) -> Result<PixelBuffer, EngineError> {
        if !self.fully_evaluated {
            return Err(EngineError::Ordering(
                "render requires a completed evaluation",
            ));
        }
        if use_histogram && !self.histogram_ready {
            return Err(EngineError::Ordering(
                "histogram coloring without a completed histogram pass",
            ));
        }
        let settings = self
            .settings
            .as_ref()
            .ok_or(EngineError::Ordering("render before configuration"))?;
        render::render_scene(
            &self.units,
            settings,
            ramp,
            stable_color,
            use_histogram,
            progress,
            interval,
        )
    }
}
