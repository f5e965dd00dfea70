//! Unit-interval rescaling shared by every energy model.

/// Spans narrower than this are treated as constant series.
pub const DEGENERATE_SPAN: f64 = 1e-12;

/// Rescale `values` to `[0, 1]` using the observed min/max.
///
/// NaN entries are ignored when computing the bounds and stay NaN in the
/// output. Empty input returns empty output. A constant series, or one whose
/// span is not finite (all-NaN, infinities, overflowing range), maps to all
/// zeros.
///
/// # Example
/// ```
/// use ecoproxy::normalize::normalize01;
///
/// assert_eq!(normalize01(&[10.0, 20.0, 30.0]), vec![0.0, 0.5, 1.0]);
/// assert_eq!(normalize01(&[5.0, 5.0, 5.0]), vec![0.0, 0.0, 0.0]);
/// assert!(normalize01(&[]).is_empty());
/// ```
#[must_use]
pub fn normalize01(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let (min, max) = nan_bounds(values);
    let span = max - min;
    if !span.is_finite() || span < DEGENERATE_SPAN {
        return vec![0.0; values.len()];
    }

    values.iter().map(|&x| (x - min) / span).collect()
}

/// Min and max ignoring NaN; `(NaN, NaN)` when nothing is left.
fn nan_bounds(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .copied()
        .filter(|x| !x.is_nan())
        .fold((f64::NAN, f64::NAN), |(lo, hi), x| {
            if lo.is_nan() {
                (x, x)
            } else {
                (lo.min(x), hi.max(x))
            }
        })
}

/// Clip `x` into `[lo, hi]`.
///
/// NaN in any argument propagates. When `lo > hi` the result is `hi`.
/// Unlike [`f64::clamp`] this never panics.
#[must_use]
pub fn clip(x: f64, lo: f64, hi: f64) -> f64 {
    minimum(maximum(x, lo), hi)
}

/// Element-wise minimum that propagates NaN (unlike [`f64::min`]).
#[must_use]
pub fn minimum(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.min(b)
    }
}

/// Element-wise maximum that propagates NaN (unlike [`f64::max`]).
#[must_use]
pub fn maximum(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}
