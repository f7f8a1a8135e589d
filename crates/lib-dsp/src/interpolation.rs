//! Piecewise-linear interpolation and nearest-sample lookup.
//!
//! These are the cursor primitives behind the frequency-response metrics and
//! any marker readout on a decoded curve. Neither function sorts its input:
//! callers order the known points as their lookup requires.

use crate::error::{DspError, DspResult};

/// Interpolate `y` at `x_query` from the known points `(x_known, y_known)`.
///
/// Segments are scanned in order and the first one whose endpoints bracket
/// `x_query` (in either direction) is used. A zero-width segment yields its
/// left value. When no segment brackets the query, the result clamps to the
/// `y` at whichever end of `x_known` is closer, the first end on a tie.
pub fn interpolate(x_known: &[f64], y_known: &[f64], x_query: f64) -> DspResult<f64> {
    check_known(x_known, y_known)?;
    Ok(interpolate_single(x_known, y_known, x_query))
}

/// Interpolate several query points against the same known points.
pub fn interpolate_many(x_known: &[f64], y_known: &[f64], queries: &[f64]) -> DspResult<Vec<f64>> {
    check_known(x_known, y_known)?;
    Ok(queries
        .iter()
        .map(|&q| interpolate_single(x_known, y_known, q))
        .collect())
}

/// Index of the element closest to `x_query`, lowest index on ties.
///
/// Returns `None` for an empty slice. NaN elements never win.
pub fn nearest_index(x_known: &[f64], x_query: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &x) in x_known.iter().enumerate() {
        let distance = (x - x_query).abs();
        if distance.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((i, distance));
        }
    }
    best.map(|(i, _)| i)
}

/// Value of `y_known` at the sample nearest to `x_query`.
pub fn nearest_value(x_known: &[f64], y_known: &[f64], x_query: f64) -> DspResult<f64> {
    if x_known.len() != y_known.len() {
        return Err(DspError::LengthMismatch {
            expected: x_known.len(),
            actual: y_known.len(),
        });
    }
    nearest_index(x_known, x_query)
        .map(|i| y_known[i])
        .ok_or(DspError::InsufficientData { needed: 1, got: 0 })
}

fn check_known(x_known: &[f64], y_known: &[f64]) -> DspResult<()> {
    if x_known.len() != y_known.len() {
        return Err(DspError::LengthMismatch {
            expected: x_known.len(),
            actual: y_known.len(),
        });
    }
    if x_known.len() < 2 {
        return Err(DspError::InsufficientData { needed: 2, got: x_known.len() });
    }
    Ok(())
}

/// Interpolate a single point. Inputs are already validated.
fn interpolate_single(x: &[f64], y: &[f64], target: f64) -> f64 {
    for i in 0..x.len() - 1 {
        let (x0, x1) = (x[i], x[i + 1]);
        let brackets = (x0 <= target && target <= x1) || (x1 <= target && target <= x0);
        if !brackets {
            continue;
        }
        if x1 == x0 {
            return y[i];
        }
        let frac = (target - x0) / (x1 - x0);
        return y[i] + frac * (y[i + 1] - y[i]);
    }

    // Outside the known range: clamp to the nearer end.
    let last = x.len() - 1;
    if (target - x[last]).abs() < (target - x[0]).abs() {
        y[last]
    } else {
        y[0]
    }
}
