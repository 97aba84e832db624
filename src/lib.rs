#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Escape-time fractal evaluation and coloring engine
//!
//! The Mandelbrot set and its relatives are drawn by asking, for each
//! point of a grid laid over the complex plane, whether the iterated
//! map `z <- z^2 + c` stays bounded when `c` is that point.  Points
//! that never escape form the familiar black interior; points that do
//! escape get colored by how long they held out, which is where all
//! the visual drama around the boundary comes from.
//!
//! This crate is the computational middle of such a renderer.  It
//! takes a region of the plane and a resolution, fans the per-point
//! iteration out over a pool of worker threads, and turns the results
//! into an RGBA pixel buffer through a keyframe color ramp, with an
//! optional histogram pass that spreads the ramp according to how
//! common each escape depth actually is.  Several iteration variants
//! are available, from the textbook test through a smooth
//! distance-estimator to an arbitrary-precision version for zooms
//! past the resolution of an `f64`.
//!
//! What it deliberately is not: a user interface.  Argument parsing,
//! session persistence, window management and image encoding all live
//! with the caller; the engine consumes settings, a stability test
//! and a color ramp, and produces evaluated units and pixels.
//!
//! The usual path through the crate is a [`FractalEngine`]:
//! configure it, build the grid, evaluate, render.

pub mod colors;
pub mod engine;
pub mod errors;
pub mod evaluate;
pub mod grid;
mod histogram;
pub mod planes;
pub mod render;
pub mod stability;

pub use crate::colors::{Color, ColorRamp, Keyframe};
pub use crate::engine::FractalEngine;
pub use crate::errors::EngineError;
pub use crate::evaluate::{CancelSignal, ProgressFn, ProgressReport};
pub use crate::grid::{EvaluationUnit, RunSettings};
pub use crate::planes::{ComplexPoint, GridIndex, Scalar};
pub use crate::render::PixelBuffer;
pub use crate::stability::StabilityTest;
