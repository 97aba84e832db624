//! Histogram normalization.  Raw iteration counts cluster badly: most
//! escaping points leave within a handful of iterations, so a linear
//! mapping wastes nearly the whole color ramp on counts almost nobody
//! reaches.  Normalizing each count by the cumulative share of points
//! that escaped earlier spreads the ramp in proportion to how common
//! each escape depth actually is.
//!
//! This pass needs the full distribution before it can place a single
//! value, so it must only run once every unit has been evaluated.

use crate::grid::EvaluationUnit;

/// Rewrites `histogram_value` on every escaped unit with its
/// cumulative-distribution value: the fraction of all escaped units
/// that left at a strictly lower iteration count.  Stable units are
/// left untouched.
pub(crate) fn apply(units: &mut [EvaluationUnit], max_iterations: u32) {
    let mut frequency = vec![0u64; max_iterations as usize + 1];
    let mut total_escaped = 0u64;
    for unit in units.iter() {
        if unit.is_stable == Some(false) {
            frequency[unit.iteration_count as usize] += 1;
            total_escaped += 1;
        }
    }
    if total_escaped == 0 {
        return;
    }

    // cumulative[k] = share of escaped units with count < k
    let mut cumulative = vec![0.0f64; frequency.len()];
    let mut running = 0u64;
    for (count, slot) in frequency.iter().enumerate() {
        cumulative[count] = running as f64 / total_escaped as f64;
        running += slot;
    }

    for unit in units.iter_mut() {
        if unit.is_stable == Some(false) {
            unit.histogram_value = cumulative[unit.iteration_count as usize];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planes::{ComplexPoint, GridIndex};

    fn escaped_unit(count: u32) -> EvaluationUnit {
        let mut unit = EvaluationUnit::new(GridIndex(0, 0), ComplexPoint::new(0.0, 0.0));
        unit.is_stable = Some(false);
        unit.iteration_count = count;
        unit
    }

    fn stable_unit() -> EvaluationUnit {
        let mut unit = EvaluationUnit::new(GridIndex(0, 0), ComplexPoint::new(0.0, 0.0));
        unit.is_stable = Some(true);
        unit.iteration_count = 49;
        unit
    }

    #[test]
    fn values_follow_the_cumulative_distribution() {
        // Four units at count 1, two at 3, two at 7.
        let mut units = vec![
            escaped_unit(1),
            escaped_unit(1),
            escaped_unit(1),
            escaped_unit(1),
            escaped_unit(3),
            escaped_unit(3),
            escaped_unit(7),
            escaped_unit(7),
        ];
        apply(&mut units, 50);
        assert_eq!(units[0].histogram_value, 0.0);
        assert_eq!(units[4].histogram_value, 0.5);
        assert_eq!(units[6].histogram_value, 0.75);
    }

    #[test]
    fn lowest_count_lands_at_zero_and_values_are_monotonic() {
        let mut units: Vec<EvaluationUnit> = (0u32..20)
            .map(|i| escaped_unit(1 + (i * 7) % 13))
            .collect();
        apply(&mut units, 50);

        let mut sorted = units.clone();
        sorted.sort_by_key(|unit| unit.iteration_count);
        assert_eq!(sorted[0].histogram_value, 0.0);
        for pair in sorted.windows(2) {
            assert!(pair[0].histogram_value <= pair[1].histogram_value);
        }
    }

    #[test]
    fn stable_units_are_left_alone() {
        let mut units = vec![stable_unit(), escaped_unit(2), stable_unit()];
        apply(&mut units, 50);
        assert_eq!(units[0].histogram_value, 0.0);
        assert_eq!(units[2].histogram_value, 0.0);
        assert_eq!(units[1].histogram_value, 0.0); // the only escaper
    }

    #[test]
    fn an_all_stable_grid_is_a_no_op() {
        let mut units = vec![stable_unit(), stable_unit()];
        apply(&mut units, 50);
        assert!(units.iter().all(|unit| unit.histogram_value == 0.0));
    }
}
