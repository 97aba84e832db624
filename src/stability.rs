// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The stability-test family.  Every variant answers the same
//! question for one grid cell: does the iterated map starting at this
//! complex value stay bounded within the iteration budget?  Along the
//! way it records how many iterations were performed and where the
//! trajectory ended up, because the coloring stage feeds on both.
//!
//! The configured break bound is compared directly against the
//! squared magnitude of the trajectory, so a bound of 4 corresponds
//! to the textbook escape radius of 2.
//!
//! A point counts as escaped only when the break condition fires
//! strictly inside `[1, max_iterations)`.  A loop that runs to
//! completion classifies the point as stable and leaves the iteration
//! count at the loop bound, `max_iterations - 1`.

use num::clamp;

use crate::grid::EvaluationUnit;
use crate::planes::{ComplexPoint, Scalar};

/// The escape bound used by the cosine map, replacing the configured
/// one.  A deliberate visual-effect deviation, kept distinct from the
/// standard test on purpose.
const COSINE_BOUND: f64 = 300.0;

/// The fold ladder of the bounded-wrap map.  After every iteration
/// step, each component is pulled back toward the origin by the first
/// breakpoint it reaches; at most one subtraction is applied.
const WRAP_LADDER: [f64; 5] = [21.0, 13.0, 8.0, 5.0, 3.0];

/// The closed set of per-point iteration variants, in increasing
/// order of sophistication.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StabilityTest {
    /// The standard `z <- z^2 + c` escape test over `f64`.
    Classic,
    /// The classic recurrence with derivative tracking.  On escape
    /// the iteration count is replaced by a normalized boundary
    /// distance estimate, which colors the escape boundary much more
    /// smoothly than the raw count.
    DistanceEstimate,
    /// Replaces the `2xy` cross term with `2 cos(xy)` and escapes
    /// against a fixed bound instead of the configured one.
    CosineMap,
    /// Folds both components back toward the origin after each step,
    /// producing a non-standard wrapped topology.
    BoundedWrap,
    /// The classic recurrence evaluated in arbitrary-precision
    /// arithmetic, for zooms past the resolution of `f64`.  Unlike
    /// the `f64` test this one also breaks when the squared magnitude
    /// collapses to zero or below, folding numeric underflow into the
    /// escaped branch; the policy is carried forward unchanged since
    /// changing it changes visual output.
    HighPrecision {
        /// Significand precision of the arithmetic, in bits.
        precision: u32,
    },
}

impl StabilityTest {
    /// Runs this variant against one unit.  Returns `true` when the
    /// point stayed bounded, and writes `iteration_count` and
    /// `last_position` into the unit as it goes; the caller records
    /// the stability verdict itself.
    pub fn evaluate(&self, unit: &mut EvaluationUnit, max_iterations: u32, threshold: f64) -> bool {
        match *self {
            StabilityTest::Classic => classic_escape(unit, max_iterations, threshold),
            StabilityTest::DistanceEstimate => distance_estimate(unit, max_iterations, threshold),
            StabilityTest::CosineMap => cosine_map(unit, max_iterations),
            StabilityTest::BoundedWrap => bounded_wrap(unit, max_iterations, threshold),
            StabilityTest::HighPrecision { precision } => {
                high_precision_escape(unit, max_iterations, threshold, precision)
            }
        }
    }
}

/// The shared escape recurrence, generic over the scalar so the
/// fixed-precision and arbitrary-precision variants run literally the
/// same code.  `underflow_guard` adds the `<= 0` break of the
/// arbitrary-precision test.
fn escape_recurrence<T: Scalar>(
    c: &ComplexPoint<T>,
    max_iterations: u32,
    break_bound: f64,
    underflow_guard: bool,
) -> (bool, u32, ComplexPoint<T>) {
    let zero = c.re.zero_like();
    let limit = c.re.with_value(break_bound);
    let mut z = ComplexPoint::new(zero.clone(), zero.clone());
    let mut count = max_iterations.saturating_sub(1);
    let mut stable = true;
    for i in 1..max_iterations {
        z = z.mul(&z).add(c);
        let break_value = z.magnitude_squared();
        if break_value >= limit || (underflow_guard && break_value <= zero) {
            count = i;
            stable = false;
            break;
        }
    }
    (stable, count, z)
}

fn classic_escape(unit: &mut EvaluationUnit, max_iterations: u32, threshold: f64) -> bool {
    let (stable, count, z) =
        escape_recurrence(&unit.world_position, max_iterations, threshold, false);
    unit.iteration_count = count;
    unit.last_position = z;
    stable
}

fn high_precision_escape(
    unit: &mut EvaluationUnit,
    max_iterations: u32,
    threshold: f64,
    precision: u32,
) -> bool {
    let c = unit.world_position.promote(precision);
    let (stable, count, z) = escape_recurrence(&c, max_iterations, threshold, true);
    unit.iteration_count = count;
    unit.last_position = z.collapse();
    stable
}

/// Classic escape loop with the first derivative carried alongside:
/// `dz <- 2 z dz + 1` before each `z <- z^2 + c`.  On escape, the
/// distance estimate `|z| ln|z| / |dz|` is reshaped into [0, 1] and
/// written back over the iteration count, floored at one since a
/// count of zero is never valid.
fn distance_estimate(unit: &mut EvaluationUnit, max_iterations: u32, threshold: f64) -> bool {
    let c = unit.world_position;
    let mut z = ComplexPoint::new(0.0, 0.0);
    let mut dz = ComplexPoint::new(0.0, 0.0);
    let mut count = max_iterations.saturating_sub(1);
    let mut stable = true;
    for i in 1..max_iterations {
        let w = z * dz;
        dz = ComplexPoint::new(2.0 * w.re + 1.0, 2.0 * w.im);
        z = z * z + c;
        if z.magnitude_squared() >= threshold {
            count = i;
            stable = false;
            break;
        }
    }
    unit.last_position = z;
    if stable {
        unit.iteration_count = count;
        return true;
    }

    let z_mag = z.magnitude();
    let dz_mag = dz.magnitude();
    let estimate = z_mag * z_mag.ln() / dz_mag;
    let reshaped = (4.0 * estimate).powf(0.25);
    let normalized = if reshaped.is_finite() {
        1.0 - clamp(reshaped, 0.0, 1.0)
    } else {
        0.0
    };
    let recount = (normalized * f64::from(max_iterations)).round() as u32;
    unit.iteration_count = recount.max(1);
    false
}

/// The cosine modification: `y' = 2 cos(xy) + c_im` instead of the
/// `2xy` cross term, escaping against `COSINE_BOUND` regardless of
/// what bound the run was configured with.
fn cosine_map(unit: &mut EvaluationUnit, max_iterations: u32) -> bool {
    let c = unit.world_position;
    let mut x = 0.0_f64;
    let mut y = 0.0_f64;
    let mut count = max_iterations.saturating_sub(1);
    let mut stable = true;
    for i in 1..max_iterations {
        let next_x = x * x - y * y + c.re;
        let next_y = 2.0 * (x * y).cos() + c.im;
        x = next_x;
        y = next_y;
        if x * x + y * y >= COSINE_BOUND {
            count = i;
            stable = false;
            break;
        }
    }
    unit.iteration_count = count;
    unit.last_position = ComplexPoint::new(x, y);
    stable
}

/// Pulls a component back by the first ladder breakpoint it reaches.
fn fold(value: f64) -> f64 {
    for breakpoint in &WRAP_LADDER {
        if value >= *breakpoint {
            return value - breakpoint;
        }
    }
    value
}

/// The classic step followed by a fold of both components, then the
/// configured escape test.  The fold keeps trajectories bouncing
/// around a bounded range, which yields a very different topology
/// from the standard set.
fn bounded_wrap(unit: &mut EvaluationUnit, max_iterations: u32, threshold: f64) -> bool {
    let c = unit.world_position;
    let mut x = 0.0_f64;
    let mut y = 0.0_f64;
    let mut count = max_iterations.saturating_sub(1);
    let mut stable = true;
    for i in 1..max_iterations {
        let next_x = x * x - y * y + c.re;
        let next_y = 2.0 * x * y + c.im;
        x = fold(next_x);
        y = fold(next_y);
        if x * x + y * y >= threshold {
            count = i;
            stable = false;
            break;
        }
    }
    unit.iteration_count = count;
    unit.last_position = ComplexPoint::new(x, y);
    stable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planes::GridIndex;

    fn unit_at(re: f64, im: f64) -> EvaluationUnit {
        EvaluationUnit::new(GridIndex(0, 0), ComplexPoint::new(re, im))
    }

    #[test]
    fn origin_never_escapes() {
        for &max_iterations in &[2, 50, 500] {
            let mut unit = unit_at(0.0, 0.0);
            assert!(StabilityTest::Classic.evaluate(&mut unit, max_iterations, 2.0));
            assert_eq!(unit.iteration_count, max_iterations - 1);
        }
    }

    #[test]
    fn two_escapes_within_one_iteration() {
        let mut unit = unit_at(2.0, 0.0);
        assert!(!StabilityTest::Classic.evaluate(&mut unit, 50, 4.0));
        assert_eq!(unit.iteration_count, 1);
        assert_eq!(unit.last_position, ComplexPoint::new(2.0, 0.0));
    }

    #[test]
    fn period_two_point_is_stable() {
        // The orbit of -1 alternates between -1 and 0 forever.
        let mut unit = unit_at(-1.0, 0.0);
        assert!(StabilityTest::Classic.evaluate(&mut unit, 1000, 4.0));
    }

    #[test]
    fn escape_count_grows_toward_the_boundary() {
        // Closer to the set means more iterations before escape.
        let mut far = unit_at(1.0, 1.0);
        let mut near = unit_at(-0.75, 0.2);
        assert!(!StabilityTest::Classic.evaluate(&mut far, 500, 4.0));
        assert!(!StabilityTest::Classic.evaluate(&mut near, 500, 4.0));
        assert!(near.iteration_count > far.iteration_count);
    }

    #[test]
    fn distance_estimate_floors_the_count_at_one() {
        let mut unit = unit_at(3.0, 3.0);
        assert!(!StabilityTest::DistanceEstimate.evaluate(&mut unit, 50, 4.0));
        assert!(unit.iteration_count >= 1);
        assert!(unit.iteration_count <= 50);
    }

    #[test]
    fn distance_estimate_keeps_the_stable_verdict() {
        let mut unit = unit_at(0.0, 0.0);
        assert!(StabilityTest::DistanceEstimate.evaluate(&mut unit, 50, 4.0));
        assert_eq!(unit.iteration_count, 49);
    }

    #[test]
    fn cosine_map_ignores_the_configured_bound() {
        // The origin is stable under the classic test but escapes the
        // cosine map, whose y-component jumps to 2 cos(0) immediately.
        let mut classic = unit_at(0.0, 0.0);
        assert!(StabilityTest::Classic.evaluate(&mut classic, 100, 4.0));

        let mut tight = unit_at(0.0, 0.0);
        let mut loose = unit_at(0.0, 0.0);
        assert!(!StabilityTest::CosineMap.evaluate(&mut tight, 100, 4.0));
        assert!(!StabilityTest::CosineMap.evaluate(&mut loose, 100, 1_000_000.0));
        assert_eq!(tight.iteration_count, loose.iteration_count);
    }

    #[test]
    fn wrap_ladder_delays_the_escape() {
        // c = 10: the classic test escapes on the first step, but the
        // fold pulls each step back under the bound twice first.
        let mut classic = unit_at(10.0, 0.0);
        assert!(!StabilityTest::Classic.evaluate(&mut classic, 50, 9.0));
        assert_eq!(classic.iteration_count, 1);

        let mut wrapped = unit_at(10.0, 0.0);
        assert!(!StabilityTest::BoundedWrap.evaluate(&mut wrapped, 50, 9.0));
        assert_eq!(wrapped.iteration_count, 3);
    }

    #[test]
    fn fold_applies_the_first_breakpoint_only() {
        assert_eq!(fold(25.0), 4.0);
        assert_eq!(fold(14.0), 1.0);
        assert_eq!(fold(8.0), 0.0);
        assert_eq!(fold(4.0), 1.0);
        assert_eq!(fold(2.5), 2.5);
        assert_eq!(fold(-7.0), -7.0);
    }

    #[test]
    fn high_precision_agrees_with_classic_on_shallow_points() {
        for &(re, im) in &[(1.0, 1.0), (2.0, 0.0), (0.5, 0.5), (-0.2, 0.2)] {
            let mut fast = unit_at(re, im);
            let mut precise = unit_at(re, im);
            let fast_verdict = StabilityTest::Classic.evaluate(&mut fast, 100, 4.0);
            let precise_verdict =
                StabilityTest::HighPrecision { precision: 128 }.evaluate(&mut precise, 100, 4.0);
            assert_eq!(fast_verdict, precise_verdict, "verdict for ({}, {})", re, im);
            assert_eq!(
                fast.iteration_count, precise.iteration_count,
                "count for ({}, {})",
                re, im
            );
        }
    }

    #[test]
    fn high_precision_underflow_guard_breaks_at_zero() {
        // The origin sits at exactly zero forever, which the
        // arbitrary-precision test folds into the escaped branch.
        let mut unit = unit_at(0.0, 0.0);
        assert!(!StabilityTest::HighPrecision { precision: 64 }.evaluate(&mut unit, 50, 4.0));
        assert_eq!(unit.iteration_count, 1);
    }
}
