//! Run configuration and the evaluation grid.  A `RunSettings` maps a
//! rectangular region of the complex plane onto a column-by-row grid
//! of `EvaluationUnit`s, one per output pixel, in row-major order with
//! row zero at the bottom of the region.

use std::mem;

use itertools::iproduct;
use log::debug;

use crate::errors::{self, EngineError};
use crate::planes::{ComplexPoint, GridIndex};

/// The immutable-per-run configuration.  Constructed before a run and
/// read concurrently by every worker; nothing here changes while an
/// evaluation is in flight.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSettings {
    /// The center of the rendered region on the complex plane.
    pub origin: ComplexPoint<f64>,
    /// The world-space width of the region.  Must be positive.
    pub fractal_width: f64,
    /// The world-space height of the region.  Must be positive.
    pub fractal_height: f64,
    /// The number of grid columns.  Must be positive.
    pub step_width: usize,
    /// The number of grid rows.  Must be positive.
    pub step_height: usize,
    /// The iteration budget per point.  Must be positive.
    pub max_iterations: u32,
    /// The iteration-break bound, compared directly against the
    /// squared magnitude of the trajectory (so 4.0 corresponds to the
    /// textbook escape radius of 2).  `None` means unset, which is a
    /// configuration error.
    pub escape_threshold: Option<f64>,
    /// Whether a histogram normalization pass should follow a
    /// completed evaluation.
    pub histogram: bool,
}

impl RunSettings {
    /// Checks every invariant the rest of the engine relies on.
    /// Called before any allocation happens.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.fractal_width > 0.0) {
            return Err(EngineError::Configuration(format!(
                "fractal width must be positive, got {}",
                self.fractal_width
            )));
        }
        if !(self.fractal_height > 0.0) {
            return Err(EngineError::Configuration(format!(
                "fractal height must be positive, got {}",
                self.fractal_height
            )));
        }
        if self.step_width == 0 {
            return Err(EngineError::Configuration(
                "step width must be positive".to_string(),
            ));
        }
        if self.step_height == 0 {
            return Err(EngineError::Configuration(
                "step height must be positive".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(EngineError::Configuration(
                "max iterations must be positive".to_string(),
            ));
        }
        if self.escape_threshold.is_none() {
            return Err(EngineError::Configuration(
                "escape threshold is unset".to_string(),
            ));
        }
        Ok(())
    }

    /// The total number of grid cells a run over these settings visits.
    pub fn total_steps(&self) -> usize {
        self.step_width * self.step_height
    }
}

/// One grid cell's state: where it sits in the grid, which complex
/// value it evaluates, and what the evaluation found out.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationUnit {
    /// The cell's position in the output grid.  Fixed at creation.
    pub index: GridIndex,
    /// The complex value this cell evaluates.  Fixed at creation.
    pub world_position: ComplexPoint<f64>,
    /// `None` until evaluated; `Some(true)` if the point never escaped
    /// within the iteration budget, `Some(false)` if it escaped.
    pub is_stable: Option<bool>,
    /// The number of iterations performed before escape, or the loop
    /// bound if the point never escaped.  Written once per run.
    pub iteration_count: u32,
    /// The trajectory value at escape, or at loop end.  Written once
    /// per run.
    pub last_position: ComplexPoint<f64>,
    /// The normalized smooth-coloring value in [0, 1].  Set only by
    /// the histogram pass, which requires the whole grid to have been
    /// evaluated first.
    pub histogram_value: f64,
}

impl EvaluationUnit {
    /// A fresh, unevaluated unit for the given cell.
    pub fn new(index: GridIndex, world_position: ComplexPoint<f64>) -> Self {
        EvaluationUnit {
            index,
            world_position,
            is_stable: None,
            iteration_count: 0,
            last_position: ComplexPoint::new(0.0, 0.0),
            histogram_value: 0.0,
        }
    }

    /// Clears everything a previous evaluation run wrote, so the
    /// write-once contract holds across repeated runs.
    pub(crate) fn reset(&mut self) {
        self.is_stable = None;
        self.iteration_count = 0;
        self.last_position = ComplexPoint::new(0.0, 0.0);
        self.histogram_value = 0.0;
    }
}

/// Builds the row-major unit sequence for a validated configuration.
/// Row zero sits at the bottom of the world region; the renderer flips
/// rows when it writes pixels.  The grid is half-open: the last column
/// and row stop one step short of the region's far edge.
pub(crate) fn build_units(settings: &RunSettings) -> Result<Vec<EvaluationUnit>, EngineError> {
    settings.validate()?;
    let total = errors::guarded_allocation(
        "evaluation grid",
        settings.step_width,
        settings.step_height,
        mem::size_of::<EvaluationUnit>(),
    )?;

    let start_x = settings.origin.re - settings.fractal_width / 2.0;
    let start_y = settings.origin.im - settings.fractal_height / 2.0;
    let step_x = settings.fractal_width / settings.step_width as f64;
    let step_y = settings.fractal_height / settings.step_height as f64;

    let mut units = Vec::with_capacity(total);
    for (row, col) in iproduct!(0..settings.step_height, 0..settings.step_width) {
        let position = ComplexPoint::new(
            start_x + col as f64 * step_x,
            start_y + row as f64 * step_y,
        );
        units.push(EvaluationUnit::new(GridIndex(col, row), position));
    }
    debug!(
        "built {} evaluation units ({} x {})",
        units.len(),
        settings.step_width,
        settings.step_height
    );
    Ok(units)
}
