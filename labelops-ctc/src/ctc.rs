//! Greedy CTC decoding primitives.

use crate::error::{DecodeError, Result};
use ndarray::{ArrayView2, Axis};
use ndarray_stats::QuantileExt;

/// Collapse a frame-level label path with the CTC rule.
///
/// Repeated labels are merged, then blanks are dropped. A label repeated
/// after an intervening blank is emitted again.
///
/// ```
/// use labelops_ctc::ctc::collapse;
///
/// assert_eq!(collapse(&[1, 1, 0, 2, 2, 2, 3, 1], 0), vec![1, 2, 3, 1]);
/// ```
pub fn collapse(path: &[u32], blank: u32) -> Vec<u32> {
    let mut collapsed = Vec::with_capacity(path.len());
    let mut last = blank;

    for &index in path {
        if index == last {
            continue;
        }
        if index != blank {
            collapsed.push(index);
        }
        last = index;
    }

    collapsed
}

/// Most likely label of every frame.
///
/// # Errors
///
/// Fails with [`DecodeError::MinMax`] when a frame contains NaN.
pub fn argmax_path(log_probs: ArrayView2<f32>) -> Result<Vec<u32>> {
    log_probs
        .axis_iter(Axis(0))
        .map(|frame| -> Result<u32> { Ok(frame.argmax()? as u32) })
        .collect()
}

/// Check that a log-probability matrix has one column per vocabulary label.
pub fn check_columns(log_probs: ArrayView2<f32>, vocab_size: usize) -> Result<()> {
    let got = log_probs.ncols();

    if got != vocab_size {
        return Err(DecodeError::ShapeMismatch {
            expected: vocab_size,
            got,
        }
        .into());
    }

    Ok(())
}
