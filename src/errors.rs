//! Error kinds surfaced by the engine.  All of them are deterministic
//! given their inputs; nothing in this crate retries.

use failure::Fail;
use log::error;

/// Everything that can go wrong between configuration and the finished
/// pixel buffer.
#[derive(Debug, Fail, PartialEq)]
pub enum EngineError {
    /// Invalid or missing run parameters: non-positive dimensions or
    /// iteration counts, an unset escape threshold, an empty keyframe
    /// set, an empty grid.  Surfaced before any computation starts.
    #[fail(display = "configuration error: {}", _0)]
    Configuration(String),

    /// An operation was invoked out of its required sequence, such as
    /// reading results before evaluation or evaluating before the grid
    /// exists.  A contract violation, not a runtime condition.
    #[fail(display = "operation out of order: {}", _0)]
    Ordering(&'static str),

    /// No keyframe contains the requested interpolation value.  The
    /// ramp supplied by the caller does not cover [0, 1].
    #[fail(display = "no keyframe covers interpolation value {}", _0)]
    Lookup(f64),

    /// A grid or pixel-buffer request was too large to address.  Fatal
    /// to the run; no partial state is returned.
    #[fail(
        display = "allocation of {} failed ({} bytes requested)",
        what, requested
    )]
    Allocation {
        /// What was being allocated when the request was rejected.
        what: &'static str,
        /// The size of the rejected request, in bytes.
        requested: usize,
    },
}

/// Checks that a two-dimensional allocation of `count_a * count_b`
/// elements of `elem_size` bytes is addressable before anything is
/// reserved.  Returns the element count; logs and rejects oversized
/// requests.
pub(crate) fn guarded_allocation(
    what: &'static str,
    count_a: usize,
    count_b: usize,
    elem_size: usize,
) -> Result<usize, EngineError> {
    let reject = |requested: usize| {
        error!(
            "allocation of {} rejected: {} x {} elements of {} bytes each",
            what, count_a, count_b, elem_size
        );
        EngineError::Allocation { what, requested }
    };
    let count = count_a
        .checked_mul(count_b)
        .ok_or_else(|| reject(usize::max_value()))?;
    let bytes = count
        .checked_mul(elem_size)
        .ok_or_else(|| reject(usize::max_value()))?;
    if bytes > isize::max_value() as usize {
        return Err(reject(bytes));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_request_is_rejected() {
        let result = guarded_allocation("test buffer", usize::max_value(), 2, 8);
        match result {
            Err(EngineError::Allocation { what, .. }) => assert_eq!(what, "test buffer"),
            other => panic!("expected an allocation failure, got {:?}", other),
        }
    }

    #[test]
    fn reasonable_request_passes() {
        assert_eq!(guarded_allocation("test buffer", 640, 480, 4), Ok(640 * 480));
    }
}
