//! Maps evaluated units and a color ramp into an RGBA pixel buffer.
//! Each unit owns exactly one pixel, so rows can be written in
//! parallel without any locking around the buffer itself; the only
//! shared state is the usual progress accounting.
//!
//! Grid row zero sits at the bottom of world space, image row zero at
//! the top, so rows are flipped on the way out: grid row `r` lands on
//! image row `height - 1 - r`.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam::thread::ScopedJoinHandle;
use log::debug;

use crate::colors::{Color, ColorRamp};
use crate::errors::{self, EngineError};
use crate::evaluate::{record_completed, ProgressFn, ProgressState};
use crate::grid::{EvaluationUnit, RunSettings};

/// A fully populated RGBA8888 image, row zero at the top.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The raw bytes, four per pixel, rows top to bottom.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the buffer and hands the bytes to an encoder.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// The color at an image coordinate, row zero at the top, or
    /// `None` outside the buffer.
    pub fn pixel(&self, column: usize, row: usize) -> Option<Color> {
        if column >= self.width || row >= self.height {
            return None;
        }
        let offset = (row * self.width + column) * 4;
        Some(Color::rgba(
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ))
    }
}

fn color_for(
    unit: &EvaluationUnit,
    ramp: &ColorRamp,
    stable_color: Color,
    use_histogram: bool,
    max_iterations: u32,
) -> Result<Color, EngineError> {
    match unit.is_stable {
        Some(true) => Ok(stable_color),
        Some(false) => {
            let value = if use_histogram {
                unit.histogram_value
            } else {
                f64::from(unit.iteration_count) / f64::from(max_iterations)
            };
            ramp.interpolate(value)
        }
        None => Err(EngineError::Ordering(
            "unit read for coloring before evaluation completed",
        )),
    }
}

/// Renders every unit to its pixel.  Rows are handed out to a worker
/// pool through a shared queue; since the grid is row-major and the
/// image is top-down, the queue pairs unit rows with pixel rows taken
/// from the bottom of the buffer up.
pub(crate) fn render_scene(
    units: &[EvaluationUnit],
    settings: &RunSettings,
    ramp: &ColorRamp,
    stable_color: Color,
    use_histogram: bool,
    progress: Option<ProgressFn<'_>>,
    interval: Duration,
) -> Result<PixelBuffer, EngineError> {
    if ramp.is_empty() {
        return Err(EngineError::Configuration(
            "color ramp has no keyframes".to_string(),
        ));
    }
    if units.is_empty() {
        return Err(EngineError::Configuration(
            "no evaluation units to render".to_string(),
        ));
    }
    let width = settings.step_width;
    let height = settings.step_height;
    if units.len() != width * height {
        return Err(EngineError::Configuration(format!(
            "unit collection of {} does not fill a {} x {} grid",
            units.len(),
            width,
            height
        )));
    }

    let pixel_count = errors::guarded_allocation("pixel buffer", width, height, 4)?;
    let mut data = vec![0u8; pixel_count * 4];
    let row_bytes = width * 4;
    let max_iterations = settings.max_iterations;
    let total_steps = units.len();
    let started = Instant::now();
    let state = Mutex::new(ProgressState {
        completed: 0,
        last_report: started,
    });
    let rows = Arc::new(Mutex::new(
        units.chunks(width).zip(data.chunks_mut(row_bytes).rev()),
    ));
    let workers = num_cpus::get();
    debug!(
        "rendering {} x {} pixels across {} workers",
        width, height, workers
    );

    let outcome: Result<(), EngineError> = crossbeam::scope(|spawner| {
        let handles: Vec<ScopedJoinHandle<Result<(), EngineError>>> = (0..workers)
            .map(|_| {
                let rows = rows.clone();
                let state = &state;
                spawner.spawn(move |_| -> Result<(), EngineError> {
                    loop {
                        let next = { rows.lock().unwrap().next() };
                        match next {
                            Some((unit_row, pixel_row)) => {
                                for (unit, pixel) in
                                    unit_row.iter().zip(pixel_row.chunks_mut(4))
                                {
                                    let color = color_for(
                                        unit,
                                        ramp,
                                        stable_color,
                                        use_histogram,
                                        max_iterations,
                                    )?;
                                    pixel[0] = color.r;
                                    pixel[1] = color.g;
                                    pixel[2] = color.b;
                                    pixel[3] = color.a;
                                }
                                if let Some(last) = unit_row.last() {
                                    record_completed(
                                        state,
                                        started,
                                        unit_row.len(),
                                        total_steps,
                                        last.world_position,
                                        progress,
                                        interval,
                                    );
                                }
                            }
                            None => break,
                        }
                    }
                    Ok(())
                })
            })
            .collect();

        let mut result = Ok(());
        for handle in handles {
            if let Err(error) = handle.join().unwrap() {
                if result.is_ok() {
                    result = Err(error);
                }
            }
        }
        result
    })
    .unwrap();
    drop(rows);
    outcome?;

    Ok(PixelBuffer {
        width,
        height,
        data,
    })
}
